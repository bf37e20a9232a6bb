use crate::config::AppConfig;
use crate::error::{ChoroplethError, Result};
use crate::topology::Topology;
use crate::types::{parse_value, AttributeName, CountyRecord, GeoFeature};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use geojson::GeoJson;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use strum::IntoEnumIterator;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct LoadedData {
    pub records: Vec<CountyRecord>,
    pub counties: Vec<GeoFeature>,
    pub context: Vec<MultiPolygon<f64>>,
}

pub async fn load_data(config: &AppConfig) -> Result<LoadedData> {
    info!("Loading data...");
    let input = &config.input;

    // 1. Fetch all three concurrently; any failure fails the whole load
    let (csv_text, counties_text, context_text) = tokio::try_join!(
        read_source(&input.data_csv),
        read_source(&input.counties),
        read_source(&input.context),
    )?;

    // 2. Parse CSV rows
    let records = parse_records(&csv_text, &input.join_column)?;
    info!("Loaded CSV data for {} counties", records.len());

    // 3. Decode boundaries (TopoJSON or GeoJSON)
    let counties = parse_features(&counties_text, &input.counties_object, &input.join_column)?;
    info!("Loaded {} county boundaries", counties.len());

    let context = parse_features(&context_text, &input.context_object, &input.join_column)?
        .into_iter()
        .map(|f| f.geometry)
        .collect::<Vec<_>>();
    info!("Loaded {} context regions", context.len());

    Ok(LoadedData { records, counties, context })
}

/// Read a local file or, for http(s) locations, fetch it.
async fn read_source(location: &Path) -> Result<String> {
    let text = location.to_string_lossy();
    if text.starts_with("http://") || text.starts_with("https://") {
        debug!("Fetching {}", text);
        let fetch_err = |source| ChoroplethError::Fetch {
            url: text.to_string(),
            source,
        };
        let response = reqwest::get(&*text)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(fetch_err)?;
        return response.text().await.map_err(fetch_err);
    }

    debug!("Reading {:?}", location);
    tokio::fs::read_to_string(location)
        .await
        .map_err(|source| ChoroplethError::Io {
            path: text.to_string(),
            source,
        })
}

pub fn parse_records(csv_text: &str, join_column: &str) -> Result<Vec<CountyRecord>> {
    let mut rdr = ReaderBuilder::new().from_reader(csv_text.as_bytes());
    let headers = rdr.headers()?.clone();

    let col_indices: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim(), i))
        .collect();

    let key_idx = *col_indices
        .get(join_column)
        .ok_or_else(|| ChoroplethError::MissingColumn(join_column.to_string()))?;
    let name_idx = *col_indices
        .get("NAME")
        .ok_or_else(|| ChoroplethError::MissingColumn("NAME".to_string()))?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let geoid = row.get(key_idx).unwrap_or("").trim().to_string();
        if geoid.is_empty() {
            continue;
        }

        let values = AttributeName::iter()
            .map(|attr| {
                let cell = col_indices
                    .get(attr.to_string().as_str())
                    .and_then(|&idx| row.get(idx));
                (attr, parse_value(cell))
            })
            .collect();

        records.push(CountyRecord {
            geoid,
            name: row.get(name_idx).unwrap_or("").trim().to_string(),
            values,
        });
    }

    Ok(records)
}

/// Decode either a TopoJSON topology (using `object`) or a GeoJSON feature
/// collection into features keyed by `key_property`.
pub fn parse_features(text: &str, object: &str, key_property: &str) -> Result<Vec<GeoFeature>> {
    let document: Value = serde_json::from_str(text)?;
    let kind = document
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match kind.as_str() {
        "Topology" => {
            let topology = Topology::from_value(document)?;
            Ok(topology
                .features(object)?
                .into_iter()
                .map(|f| feature(f.geometry, &f.properties, key_property))
                .collect())
        }
        "FeatureCollection" => parse_geojson(document, key_property),
        other => Err(ChoroplethError::UnsupportedDocument(other.to_string())),
    }
}

fn parse_geojson(document: Value, key_property: &str) -> Result<Vec<GeoFeature>> {
    let collection = match GeoJson::from_json_value(document) {
        Ok(GeoJson::FeatureCollection(fc)) => fc,
        Ok(_) => {
            return Err(ChoroplethError::UnsupportedDocument(
                "GeoJSON must be a FeatureCollection".to_string(),
            ))
        }
        Err(e) => return Err(ChoroplethError::UnsupportedDocument(e.to_string())),
    };

    let mut features = Vec::new();
    for item in collection.features {
        let geometry = match item.geometry {
            Some(geom) => match geo::Geometry::<f64>::try_from(geom.value) {
                Ok(geo::Geometry::MultiPolygon(mp)) => mp,
                Ok(geo::Geometry::Polygon(p)) => MultiPolygon::new(vec![p]),
                _ => continue, // Skip points/lines
            },
            None => continue,
        };
        let properties = item.properties.unwrap_or_default();
        features.push(feature(geometry, &properties, key_property));
    }
    Ok(features)
}

fn feature(geometry: MultiPolygon<f64>, properties: &Map<String, Value>, key: &str) -> GeoFeature {
    let geoid = match properties.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    let name = properties
        .get("NAME")
        .and_then(Value::as_str)
        .map(str::to_string);

    GeoFeature {
        geoid,
        name,
        geometry,
        attributes: None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::InputConfig;
    use std::fs;
    use tempfile::TempDir;

    pub(crate) const CSV: &str = "\
GEOID,NAME,Age 0-9,Age 10-19,Age 20-29,Age 30-39,Age 40-49,Age 50-59,Age 60-69,Age 70-79,Age 80 Plus
34001,Atlantic,118,126,125,117,130,138,113,60,32
34003,Bergen,122,130,102,123,148,150,110,65,46
34005,Burlington,,128,119,117,140,150,116,68,36
";

    pub(crate) const TOPOLOGY: &str = r#"{
        "type": "Topology",
        "arcs": [
            [[-74.5, 39.5], [-74.5, 40.5]],
            [[-74.5, 40.5], [-75.5, 40.5], [-75.5, 39.5], [-74.5, 39.5]],
            [[-74.5, 39.5], [-73.5, 39.5], [-73.5, 40.5], [-74.5, 40.5]]
        ],
        "objects": {
            "NJ_Counties": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "arcs": [[0, 1]], "properties": { "GEOID": "34001", "NAME": "Atlantic" } },
                    { "type": "Polygon", "arcs": [[2, -1]], "properties": { "GEOID": 34099, "NAME": "Nowhere" } }
                ]
            },
            "states": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "arcs": [[1, 0]], "properties": { "NAME": "Pennsylvania" } }
                ]
            }
        }
    }"#;

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            input: InputConfig {
                data_csv: dir.join("data.csv"),
                counties: dir.join("counties.topojson"),
                counties_object: "NJ_Counties".to_string(),
                context: dir.join("states.topojson"),
                context_object: "states".to_string(),
                join_column: "GEOID".to_string(),
            },
            map: Default::default(),
            chart: Default::default(),
            output: Default::default(),
            server: Default::default(),
        }
    }

    #[test]
    fn csv_values_parse_with_nan_for_gaps() {
        let records = parse_records(CSV, "GEOID").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].name, "Bergen");
        assert_eq!(records[1].value(AttributeName::Age40To49), 148.0);
        assert!(records[2].value(AttributeName::Age0To9).is_nan());
        // No CSV column backs the placeholder.
        assert!(records[0].value(AttributeName::Placeholder).is_nan());
    }

    #[test]
    fn missing_key_column_is_reported() {
        let err = parse_records("NAME,Age 0-9\nAtlantic,3\n", "GEOID").unwrap_err();
        assert!(matches!(err, ChoroplethError::MissingColumn(c) if c == "GEOID"));
    }

    #[test]
    fn numeric_geoids_become_text() {
        let features = parse_features(TOPOLOGY, "NJ_Counties", "GEOID").unwrap();
        let ids: Vec<_> = features.iter().map(|f| f.geoid.as_str()).collect();
        assert_eq!(ids, vec!["34001", "34099"]);
        assert_eq!(features[0].name.as_deref(), Some("Atlantic"));
        assert!(features.iter().all(|f| f.attributes.is_none()));
    }

    #[test]
    fn geojson_collections_are_accepted() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "GEOID": "34001" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] }
            }, {
                "type": "Feature",
                "properties": { "GEOID": "pt" },
                "geometry": { "type": "Point", "coordinates": [0, 0] }
            }]
        }"#;
        let features = parse_features(text, "ignored", "GEOID").unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].geoid, "34001");
    }

    #[test]
    fn other_documents_are_rejected() {
        let err = parse_features(r#"{"type": "Feature"}"#, "x", "GEOID").unwrap_err();
        assert!(matches!(err, ChoroplethError::UnsupportedDocument(_)));
    }

    #[tokio::test]
    async fn loads_all_three_inputs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("data.csv"), CSV).unwrap();
        fs::write(dir.path().join("counties.topojson"), TOPOLOGY).unwrap();
        fs::write(dir.path().join("states.topojson"), TOPOLOGY).unwrap();

        let data = load_data(&config_in(dir.path())).await.unwrap();
        assert_eq!(data.records.len(), 3);
        assert_eq!(data.counties.len(), 2);
        assert_eq!(data.context.len(), 1);
    }

    #[tokio::test]
    async fn one_missing_input_fails_the_load() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("data.csv"), CSV).unwrap();
        fs::write(dir.path().join("counties.topojson"), TOPOLOGY).unwrap();

        let err = load_data(&config_in(dir.path())).await.unwrap_err();
        assert!(matches!(err, ChoroplethError::Io { path, .. } if path.ends_with("states.topojson")));
    }
}
