use serde::Serialize;

/// One city observation, after the source columns have been renamed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub country: String,
    pub city: String,
    pub lat: f64,
    pub lng: f64,
    /// Blank cells in the source count as zero.
    pub sales: f64,
    /// `None` when the source cell was blank or not finite.
    pub predicted_sales: Option<f64>,
}

/// The table loaded at startup. Read-only for the rest of the process.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct countries in first-encountered order. These are the dropdown options.
    /// An empty country would collide with the "no selection" option, so it is left out.
    pub fn countries(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.rows
            .iter()
            .map(|row| row.country.as_str())
            .filter(|country| !country.is_empty() && seen.insert(*country))
            .collect()
    }
}

/// The dropdown value: a country, or nothing selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Country(String),
}

impl Selection {
    /// A cleared dropdown arrives as a missing or empty parameter. Anything
    /// else is compared verbatim against `Row::country`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            None | Some("") => Selection::All,
            Some(country) => Selection::Country(country.to_string()),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Selection::All => true,
            Selection::Country(country) => row.country == *country,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

/// One map point. Colour and size are already resolved from `predicted_sales`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lng: f64,
    pub city: String,
    pub country: String,
    pub predicted_sales: Option<f64>,
    pub color: String,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFigure {
    pub markers: Vec<Marker>,
    /// Min and max `predicted_sales` over the markers; `None` when no marker has one.
    pub domain: Option<(f64, f64)>,
    pub zoom: f64,
    pub center: (f64, f64),
    pub style: String,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityTotal {
    pub city: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarFigure {
    pub title: String,
    pub bars: Vec<CityTotal>,
    pub color: String,
    pub height: u32,
}
