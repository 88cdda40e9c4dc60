use crate::types::{BarFigure, MapFigure};
use anyhow::{anyhow, Result};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!("Expected #rrggbb, got '{}'", hex));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| anyhow!("Expected #rrggbb, got '{}'", hex))
        };
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

/// Position of `value` within `domain`, clamped to [0, 1].
/// A degenerate domain (every value equal) maps to the top of the scale.
pub fn normalize(value: f64, (min, max): (f64, f64)) -> f64 {
    let span = max - min;
    if span <= 0.0 || !span.is_finite() {
        return 1.0;
    }
    ((value - min) / span).clamp(0.0, 1.0)
}

/// Piecewise-linear interpolation across evenly spaced colour stops.
pub fn color_at(stops: &[Rgb], t: f64) -> Rgb {
    match stops {
        [] => Rgb(0, 0, 0),
        [only] => *only,
        _ => {
            let t = t.clamp(0.0, 1.0);
            let scaled = t * (stops.len() - 1) as f64;
            let lower = (scaled.floor() as usize).min(stops.len() - 2);
            stops[lower].lerp(stops[lower + 1], scaled - lower as f64)
        }
    }
}

pub fn marker_size(t: f64, min_size: f64, max_size: f64) -> f64 {
    min_size + t.clamp(0.0, 1.0) * (max_size - min_size)
}

impl MapFigure {
    /// Plotly figure description (`data` + `layout`) for a mapbox scatter.
    pub fn to_plotly(&self) -> Value {
        let lat: Vec<f64> = self.markers.iter().map(|m| m.lat).collect();
        let lon: Vec<f64> = self.markers.iter().map(|m| m.lng).collect();
        let text: Vec<&str> = self.markers.iter().map(|m| m.city.as_str()).collect();
        let customdata: Vec<Value> = self
            .markers
            .iter()
            .map(|m| json!([m.country, m.predicted_sales]))
            .collect();
        let colors: Vec<&str> = self.markers.iter().map(|m| m.color.as_str()).collect();
        let sizes: Vec<f64> = self.markers.iter().map(|m| m.size).collect();

        json!({
            "data": [{
                "type": "scattermapbox",
                "mode": "markers",
                "lat": lat,
                "lon": lon,
                "text": text,
                "customdata": customdata,
                "hovertemplate": "<b>%{text}</b><br>country=%{customdata[0]}<br>predicted_sales=%{customdata[1]}<extra></extra>",
                "marker": { "color": colors, "size": sizes },
            }],
            "layout": {
                "mapbox": {
                    "style": self.style,
                    "zoom": self.zoom,
                    "center": { "lat": self.center.0, "lon": self.center.1 },
                },
                "margin": { "r": 0, "t": 0, "l": 0, "b": 0 },
                "height": self.height,
                "showlegend": false,
            },
        })
    }
}

impl BarFigure {
    /// Horizontal bars, largest on top.
    pub fn to_plotly(&self) -> Value {
        let cities: Vec<&str> = self.bars.iter().map(|b| b.city.as_str()).collect();
        let sales: Vec<f64> = self.bars.iter().map(|b| b.sales).collect();

        json!({
            "data": [{
                "type": "bar",
                "orientation": "h",
                "x": sales,
                "y": cities,
                "text": sales,
                "texttemplate": "%{text:.3s}",
                "textposition": "auto",
                "marker": { "color": self.color },
            }],
            "layout": {
                "title": self.title,
                "xaxis": { "visible": false },
                "yaxis": {
                    "showgrid": false,
                    "zeroline": false,
                    "ticksuffix": " ",
                    "autorange": "reversed",
                },
                "bargap": 0.33,
                "height": self.height,
                "plot_bgcolor": "rgba(0,0,0,0)",
                "paper_bgcolor": "rgba(0,0,0,0)",
            },
        })
    }
}

/// The dashboard page. Dropdown options are embedded; the charts are fetched from the API.
pub fn index_page(title: &str, countries: &[&str]) -> String {
    // "</" would end the script element early.
    let options = serde_json::to_string(countries)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");
    let title = escape_html(title);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
body {{ margin: 0; font-family: "DM Sans", Arial, sans-serif; background: #1e1e1e; color: #d8d8d8; display: flex; }}
#controls {{ width: 33%; padding: 16px; box-sizing: border-box; }}
#charts {{ width: 67%; }}
select {{ width: 100%; padding: 6px; font-size: 16px; }}
</style>
</head>
<body>
<div id="controls">
  <h2>{title}</h2>
  <select id="country-dropdown"><option value="">Select a country</option></select>
  <div id="top-10-bar"></div>
</div>
<div id="charts"><div id="map-graph"></div></div>
<script>
const countries = {options};
const dropdown = document.getElementById("country-dropdown");
for (const c of countries) {{
  const opt = document.createElement("option");
  opt.value = c;
  opt.textContent = c;
  dropdown.appendChild(opt);
}}
async function draw(endpoint, target, country) {{
  const res = await fetch(endpoint + "?country=" + encodeURIComponent(country));
  const fig = await res.json();
  Plotly.react(target, fig.data, fig.layout);
}}
function refresh() {{
  const country = dropdown.value;
  draw("/api/map", "map-graph", country);
  draw("/api/bar", "top-10-bar", country);
}}
dropdown.addEventListener("change", refresh);
refresh();
</script>
</body>
</html>
"#
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
