//! Pure derivations from (dataset, selection) to chart figures.
//!
//! Nothing here knows about HTTP. Each derivation filters the dataset on its
//! own, so the map and the bar chart never share intermediate state.

use crate::config::{BarConfig, MapConfig};
use crate::render::{color_at, marker_size, normalize, Rgb};
use crate::types::{BarFigure, CityTotal, Dataset, MapFigure, Marker, Row, Selection};
use std::collections::HashMap;

/// Rows that survive the country filter, in dataset order.
pub fn working_set<'a>(dataset: &'a Dataset, selection: &Selection) -> Vec<&'a Row> {
    dataset
        .rows()
        .iter()
        .filter(|row| selection.matches(row))
        .collect()
}

/// Min/max `predicted_sales` of the working set. The colour meaning is relative to the filter.
fn predicted_domain(rows: &[&Row]) -> Option<(f64, f64)> {
    rows.iter().filter_map(|row| row.predicted_sales).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn mean_center(rows: &[&Row]) -> (f64, f64) {
    if rows.is_empty() {
        return (0.0, 0.0);
    }
    let n = rows.len() as f64;
    let lat = rows.iter().map(|row| row.lat).sum::<f64>() / n;
    let lng = rows.iter().map(|row| row.lng).sum::<f64>() / n;
    (lat, lng)
}

pub fn derive_map(
    dataset: &Dataset,
    selection: &Selection,
    config: &MapConfig,
    palette: &[Rgb],
) -> MapFigure {
    let rows = working_set(dataset, selection);
    let domain = predicted_domain(&rows);

    let markers = rows
        .iter()
        .map(|row| {
            // Rows without a prediction sit at the bottom of the scale.
            let t = match (row.predicted_sales, domain) {
                (Some(v), Some(d)) => normalize(v, d),
                _ => 0.0,
            };
            Marker {
                lat: row.lat,
                lng: row.lng,
                city: row.city.clone(),
                country: row.country.clone(),
                predicted_sales: row.predicted_sales,
                color: color_at(palette, t).to_hex(),
                size: marker_size(t, config.min_marker_size, config.max_marker_size),
            }
        })
        .collect();

    let zoom = if selection.is_all() {
        config.world_zoom
    } else {
        config.country_zoom
    };

    MapFigure {
        markers,
        domain,
        zoom,
        center: mean_center(&rows),
        style: config.style.clone(),
        height: config.height,
    }
}

/// Sums `sales` per city over the working set and keeps the `top_n` largest.
///
/// The sort is stable, so cities with equal totals stay in the order they were
/// first seen in the dataset.
pub fn top_cities(dataset: &Dataset, selection: &Selection, top_n: usize) -> Vec<CityTotal> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<CityTotal> = Vec::new();

    for row in working_set(dataset, selection) {
        match index.get(row.city.as_str()) {
            Some(&i) => totals[i].sales += row.sales,
            None => {
                index.insert(row.city.as_str(), totals.len());
                totals.push(CityTotal {
                    city: row.city.clone(),
                    sales: row.sales,
                });
            }
        }
    }

    totals.sort_by(|a, b| b.sales.total_cmp(&a.sales));
    totals.truncate(top_n);
    totals
}

pub fn derive_bar(dataset: &Dataset, selection: &Selection, config: &BarConfig) -> BarFigure {
    BarFigure {
        title: config.title.clone(),
        bars: top_cities(dataset, selection, config.top_n),
        color: config.color.clone(),
        height: config.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(country: &str, city: &str, lat: f64, lng: f64, sales: f64, predicted: f64) -> Row {
        Row {
            country: country.to_string(),
            city: city.to_string(),
            lat,
            lng,
            sales,
            predicted_sales: Some(predicted),
        }
    }

    fn example() -> Dataset {
        Dataset::new(vec![
            row("US", "NYC", 40.7, -74.0, 100.0, 120.0),
            row("US", "LA", 34.0, -118.2, 50.0, 40.0),
            row("FR", "Paris", 48.8, 2.3, 30.0, 35.0),
        ])
    }

    fn us() -> Selection {
        Selection::Country("US".to_string())
    }

    fn palette() -> Vec<Rgb> {
        MapConfig::default().palette().unwrap()
    }

    fn pairs(totals: &[CityTotal]) -> Vec<(&str, f64)> {
        totals.iter().map(|t| (t.city.as_str(), t.sales)).collect()
    }

    #[test]
    fn example_country_selection() {
        let dataset = example();
        let map = derive_map(&dataset, &us(), &MapConfig::default(), &palette());
        let cities: Vec<&str> = map.markers.iter().map(|m| m.city.as_str()).collect();
        assert_eq!(cities, vec!["NYC", "LA"]);
        assert_eq!(
            pairs(&top_cities(&dataset, &us(), 10)),
            vec![("NYC", 100.0), ("LA", 50.0)]
        );
    }

    #[test]
    fn example_no_selection_includes_everything() {
        let dataset = example();
        let map = derive_map(&dataset, &Selection::All, &MapConfig::default(), &palette());
        assert_eq!(map.markers.len(), 3);
        assert_eq!(
            pairs(&top_cities(&dataset, &Selection::All, 10)),
            vec![("NYC", 100.0), ("LA", 50.0), ("Paris", 30.0)]
        );
    }

    #[test]
    fn sums_only_rows_in_working_set() {
        let dataset = Dataset::new(vec![
            row("A", "X", 0.0, 0.0, 10.0, 1.0),
            row("A", "X", 0.0, 0.0, 5.0, 1.0),
            row("B", "X", 0.0, 0.0, 99.0, 1.0),
        ]);
        let selected = Selection::Country("A".to_string());
        assert_eq!(pairs(&top_cities(&dataset, &selected, 10)), vec![("X", 15.0)]);
        assert_eq!(
            pairs(&top_cities(&dataset, &Selection::All, 10)),
            vec![("X", 114.0)]
        );
    }

    #[test]
    fn truncates_to_top_n_and_stays_sorted() {
        let rows = (0..25)
            .map(|i| row("C", &format!("city{i}"), 0.0, 0.0, ((i * 7) % 13) as f64, 1.0))
            .collect();
        let dataset = Dataset::new(rows);
        let top = top_cities(&dataset, &Selection::All, 10);
        assert_eq!(top.len(), 10);
        assert!(top.windows(2).all(|w| w[0].sales >= w[1].sales));
        assert_eq!(top[0].sales, 12.0);
    }

    #[test]
    fn fewer_cities_than_limit_returns_all() {
        let dataset = example();
        assert_eq!(top_cities(&dataset, &Selection::All, 10).len(), 3);
        assert_eq!(top_cities(&dataset, &Selection::All, 2).len(), 2);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let dataset = Dataset::new(vec![
            row("C", "Beta", 0.0, 0.0, 5.0, 1.0),
            row("C", "Alpha", 0.0, 0.0, 9.0, 1.0),
            row("C", "Gamma", 0.0, 0.0, 5.0, 1.0),
            row("C", "Delta", 0.0, 0.0, 5.0, 1.0),
        ]);
        let top = top_cities(&dataset, &Selection::All, 10);
        assert_eq!(
            pairs(&top),
            vec![("Alpha", 9.0), ("Beta", 5.0), ("Gamma", 5.0), ("Delta", 5.0)]
        );
    }

    #[test]
    fn city_names_compare_exactly() {
        let dataset = Dataset::new(vec![
            row("C", "Springfield", 0.0, 0.0, 1.0, 1.0),
            row("C", "springfield", 0.0, 0.0, 2.0, 1.0),
        ]);
        assert_eq!(top_cities(&dataset, &Selection::All, 10).len(), 2);
    }

    #[test]
    fn unknown_country_gives_empty_figures() {
        let dataset = example();
        let nowhere = Selection::Country("Atlantis".to_string());
        let map = derive_map(&dataset, &nowhere, &MapConfig::default(), &palette());
        assert!(map.markers.is_empty());
        assert_eq!(map.domain, None);
        assert_eq!(map.center, (0.0, 0.0));
        assert!(top_cities(&dataset, &nowhere, 10).is_empty());
    }

    #[test]
    fn zoom_is_closer_for_a_country() {
        let dataset = example();
        let config = MapConfig::default();
        let world = derive_map(&dataset, &Selection::All, &config, &palette());
        let country = derive_map(&dataset, &us(), &config, &palette());
        assert!(country.zoom > world.zoom);
    }

    #[test]
    fn color_domain_follows_the_filter() {
        let dataset = example();
        let config = MapConfig::default();
        let world = derive_map(&dataset, &Selection::All, &config, &palette());
        let country = derive_map(&dataset, &us(), &config, &palette());
        assert_eq!(world.domain, Some((35.0, 120.0)));
        assert_eq!(country.domain, Some((40.0, 120.0)));

        // LA is the smallest in the US view, so it sits at the bottom of the scale there.
        let la = &country.markers[1];
        assert_eq!(la.size, config.min_marker_size);
        assert_eq!(la.color, palette()[0].to_hex());
        let nyc = &country.markers[0];
        assert_eq!(nyc.size, config.max_marker_size);
        assert_eq!(nyc.color, palette().last().unwrap().to_hex());
    }

    #[test]
    fn larger_prediction_means_larger_marker() {
        let dataset = example();
        let map = derive_map(&dataset, &Selection::All, &MapConfig::default(), &palette());
        let mut by_value: Vec<&Marker> = map.markers.iter().collect();
        by_value.sort_by(|a, b| {
            a.predicted_sales
                .unwrap_or(0.0)
                .total_cmp(&b.predicted_sales.unwrap_or(0.0))
        });
        assert!(by_value.windows(2).all(|w| w[0].size <= w[1].size));
    }

    #[test]
    fn missing_prediction_sits_at_bottom_of_scale() {
        let mut dataset_rows = example().rows().to_vec();
        dataset_rows[2].predicted_sales = None;
        let dataset = Dataset::new(dataset_rows);
        let config = MapConfig::default();

        let map = derive_map(&dataset, &Selection::All, &config, &palette());
        assert_eq!(map.markers.len(), 3);
        assert_eq!(map.domain, Some((40.0, 120.0)));
        let paris = &map.markers[2];
        assert_eq!(paris.predicted_sales, None);
        assert_eq!(paris.size, config.min_marker_size);
        assert_eq!(paris.color, palette()[0].to_hex());
    }

    #[test]
    fn derivations_are_idempotent() {
        let dataset = example();
        let map_config = MapConfig::default();
        let bar_config = BarConfig::default();
        for selection in [Selection::All, us()] {
            assert_eq!(
                derive_map(&dataset, &selection, &map_config, &palette()),
                derive_map(&dataset, &selection, &map_config, &palette())
            );
            assert_eq!(
                derive_bar(&dataset, &selection, &bar_config),
                derive_bar(&dataset, &selection, &bar_config)
            );
        }
    }

    #[test]
    fn center_is_mean_of_working_set() {
        let dataset = example();
        let map = derive_map(&dataset, &us(), &MapConfig::default(), &palette());
        assert!((map.center.0 - 37.35).abs() < 1e-9);
        assert!((map.center.1 - -96.1).abs() < 1e-9);
    }
}
