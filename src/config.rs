use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::render::Rgb;

pub const DEFAULT_DATA_URL: &str =
    "https://raw.githubusercontent.com/max-wittenberg-dbx/dash_app/main/dl_with_preds.csv";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub map: MapConfig,
    pub bar: BarConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// http(s) URL or local path of the CSV.
    pub source: String,
    pub country_column: String,
    pub city_column: String,
    pub lat_column: String,
    pub lng_column: String,
    /// Loaded as `sales`.
    pub sales_column: String,
    /// Loaded as `predicted_sales`.
    pub predicted_sales_column: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_DATA_URL.to_string(),
            country_column: "country".to_string(),
            city_column: "city".to_string(),
            lat_column: "lat".to_string(),
            lng_column: "lng".to_string(),
            sales_column: "population".to_string(),
            predicted_sales_column: "predicted_population".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub world_zoom: f64,
    pub country_zoom: f64,
    pub height: u32,
    pub style: String,
    pub color_stops: Vec<String>, // Hex codes, low to high
    pub min_marker_size: f64,
    pub max_marker_size: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            world_zoom: 1.8,
            country_zoom: 4.0,
            height: 800,
            style: "carto-darkmatter".to_string(),
            color_stops: ["#331a26", "#6e2a2f", "#a53b27", "#cf6a1b", "#e8a32b", "#f4e45a"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_marker_size: 4.0,
            max_marker_size: 20.0,
        }
    }
}

impl MapConfig {
    pub fn palette(&self) -> Result<Vec<Rgb>> {
        self.color_stops
            .iter()
            .map(|hex| Rgb::from_hex(hex).with_context(|| format!("Invalid colour stop: {}", hex)))
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BarConfig {
    pub top_n: usize,
    pub title: String,
    pub color: String,
    pub height: u32,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            title: "Top 10 Cities by Sales".to_string(),
            color: "#bd2b26".to_string(),
            height: 600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: [u8; 4],
    pub port: u16,
    pub title: String,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: [127, 0, 0, 1],
            port: 8050,
            title: "Global Sales by Country".to_string(),
            static_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Falls back to the built-in defaults when `path` does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bar.top_n == 0 {
            bail!("bar.top_n must be at least 1");
        }
        if self.map.country_zoom <= self.map.world_zoom {
            bail!(
                "map.country_zoom ({}) must be greater than map.world_zoom ({})",
                self.map.country_zoom,
                self.map.world_zoom
            );
        }
        if self.map.color_stops.len() < 2 {
            bail!("map.color_stops needs at least two colours");
        }
        self.map.palette()?;
        Rgb::from_hex(&self.bar.color)
            .with_context(|| format!("Invalid bar colour: {}", self.bar.color))?;
        if self.map.min_marker_size > self.map.max_marker_size {
            bail!("map.min_marker_size must not exceed map.max_marker_size");
        }
        Ok(())
    }
}
