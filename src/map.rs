//! Link layer for web maps: GeoJSON with simplestyle properties, so any
//! Leaflet/MapLibre viewer can draw markers and colored link lines as-is.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::NaiveDate;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde_json::json;

use crate::error::Result;
use crate::geo::LatLon;
use crate::record::{ExpiryStatus, LinkRecord};

const STATION_COLOR: &str = "#2a81cb";
const OPPOSITE_COLOR: &str = "#2aad27";
const LINK_COLOR: &str = "#0000ff";
const EXPIRED_COLOR: &str = "#ff0000";

fn position(p: LatLon) -> Vec<f64> {
    vec![p.lon(), p.lat()]
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn props(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

fn or_blank<T: ToString>(x: Option<T>) -> String {
    x.map(|x| x.to_string()).unwrap_or_default()
}

fn status_name(status: ExpiryStatus) -> &'static str {
    match status {
        ExpiryStatus::Expired => "expired",
        ExpiryStatus::Valid => "valid",
        ExpiryStatus::Unknown => "unknown",
    }
}

/// Markers for both stations and the line between them. Records without
/// derived geometry have nothing to draw and are skipped.
pub fn link_features(record: &LinkRecord, today: NaiveDate) -> Vec<Feature> {
    let g = match record.geometry() {
        Some(g) => g,
        None => return Vec::new(),
    };
    let status = record.expiry_status(today);
    let color = if status == ExpiryStatus::Expired {
        EXPIRED_COLOR
    } else {
        LINK_COLOR
    };

    let station = props(json!({
        "role": "station",
        "name": record.station_name,
        "appl_id": record.appl_id,
        "freq": record.freq,
        "circuit_len": g.circuit_len,
        "marker-color": STATION_COLOR,
        "popup": format!(
            "{}<br>Frequency: {}<br>Distance: {} km",
            record.station_name,
            or_blank(record.freq),
            g.circuit_len
        ),
    }));
    let opposite = props(json!({
        "role": "opposite",
        "name": record.opposite_station,
        "freq_pair": record.freq_pair,
        "marker-color": OPPOSITE_COLOR,
        "popup": format!(
            "{}<br>Pair frequency: {}",
            record.opposite_station,
            or_blank(record.freq_pair)
        ),
    }));
    let link = props(json!({
        "role": "link",
        "from": record.station_name,
        "to": record.opposite_station,
        "circuit_len": g.circuit_len,
        "expiry": record.expiry.map(|d| d.format("%Y-%m-%d").to_string()),
        "status": status_name(status),
        "stroke": color,
        "stroke-width": 2.5,
        "stroke-opacity": 1.0,
        "popup": format!("Distance: {} km", g.circuit_len),
    }));

    vec![
        feature(Value::Point(position(g.origin)), station),
        feature(Value::Point(position(g.destination)), opposite),
        feature(
            Value::LineString(vec![position(g.origin), position(g.destination)]),
            link,
        ),
    ]
}

/// `[west, south, east, north]` around every drawn endpoint.
pub fn bounds<'a, I>(records: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a LinkRecord>,
{
    records
        .into_iter()
        .filter_map(LinkRecord::geometry)
        .flat_map(|g| vec![g.origin, g.destination])
        .fold(None, |acc: Option<[f64; 4]>, p| {
            let [w, s, e, n] = acc.unwrap_or([p.lon(), p.lat(), p.lon(), p.lat()]);
            Some([w.min(p.lon()), s.min(p.lat()), e.max(p.lon()), n.max(p.lat())])
        })
        .map(|b| b.to_vec())
}

pub fn link_layer<'a, I>(records: I, today: NaiveDate) -> FeatureCollection
where
    I: IntoIterator<Item = &'a LinkRecord> + Clone,
{
    FeatureCollection {
        bbox: bounds(records.clone()),
        features: records
            .into_iter()
            .flat_map(|r| link_features(r, today))
            .collect(),
        foreign_members: None,
    }
}

pub fn write_layer<P: AsRef<Path>>(path: P, layer: FeatureCollection) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, &GeoJson::FeatureCollection(layer))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::LinkDataset;
    use crate::record::tests::{row, table};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn dataset() -> LinkDataset {
        let mut old = row("A-2", "Painan", "Pariaman", 30.0, "S");
        old[5] = "2020-01-01".into();
        let mut ds = LinkDataset::from_table(&table(vec![
            row("A-1", "Padang", "Solok", 1.0, "N"),
            old,
        ]))
        .unwrap();
        // Leave one record without geometry.
        let mut broken = ds.records()[0].clone();
        broken.origin.lat.minutes = 61.0;
        let _ = ds.push(broken);
        ds
    }

    fn prop<'a>(f: &'a Feature, key: &str) -> &'a serde_json::Value {
        &f.properties.as_ref().unwrap()[key]
    }

    #[test]
    fn three_features_per_drawable_link() {
        let ds = dataset();
        let layer = link_layer(ds.records(), today());
        assert_eq!(layer.features.len(), 6);
        let roles = layer
            .features
            .iter()
            .map(|f| prop(f, "role").as_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            roles,
            vec!["station", "opposite", "link", "station", "opposite", "link"]
        );
    }

    #[test]
    fn line_color_follows_expiry() {
        let ds = dataset();
        let layer = link_layer(ds.records(), today());
        assert_eq!(prop(&layer.features[2], "stroke"), LINK_COLOR);
        assert_eq!(prop(&layer.features[2], "status"), "valid");
        assert_eq!(prop(&layer.features[5], "stroke"), EXPIRED_COLOR);
        assert_eq!(prop(&layer.features[5], "status"), "expired");
    }

    #[test]
    fn positions_are_lon_lat() {
        let ds = dataset();
        let features = link_features(&ds.records()[0], today());
        match &features[0].geometry.as_ref().unwrap().value {
            Value::Point(p) => assert_eq!(p, &vec![100.0, 0.0]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            prop(&features[0], "popup"),
            "Padang<br>Frequency: 7450<br>Distance: 0.031 km"
        );
    }

    #[test]
    fn bounds_cover_all_endpoints() {
        let ds = dataset();
        let b = bounds(ds.records()).unwrap();
        assert_eq!(b[0], 100.0);
        assert_eq!(b[2], 100.0);
        assert!(b[1] < 0.0 && b[3] > 0.0);
        assert!(bounds(&[]).is_none());
    }
}
