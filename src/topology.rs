use crate::error::{ChoroplethError, Result};
use geo::{LineString, MultiPolygon, Polygon};
use serde::{de, Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<Transform>,
    pub arcs: Vec<Vec<Vec<f64>>>,
    #[serde(deserialize_with = "nullable_objects")]
    pub objects: HashMap<String, TopoGeometry>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    Polygon {
        arcs: Vec<Vec<i64>>,
        #[serde(default)]
        properties: Option<Map<String, Value>>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i64>>>,
        #[serde(default)]
        properties: Option<Map<String, Value>>,
    },
    GeometryCollection {
        #[serde(deserialize_with = "nullable_geometries")]
        geometries: Vec<TopoGeometry>,
    },
    #[serde(other)]
    Unsupported,
}

/// A decoded polygon feature with its raw properties.
#[derive(Debug, Clone)]
pub struct TopoFeature {
    pub geometry: MultiPolygon<f64>,
    pub properties: Map<String, Value>,
}

impl Topology {
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Decode every polygon feature under the named object.
    pub fn features(&self, object: &str) -> Result<Vec<TopoFeature>> {
        let root = self
            .objects
            .get(object)
            .ok_or_else(|| ChoroplethError::MissingObject(object.to_string()))?;
        let arcs = self.decode_arcs();
        let mut features = Vec::new();
        collect_features(root, &arcs, &mut features)?;
        Ok(features)
    }

    /// Absolute coordinates for every arc, undoing quantization if present.
    fn decode_arcs(&self) -> Vec<Vec<(f64, f64)>> {
        self.arcs
            .iter()
            .map(|arc| match self.transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| {
                            x += p[0];
                            y += p[1];
                            (
                                x * t.scale[0] + t.translate[0],
                                y * t.scale[1] + t.translate[1],
                            )
                        })
                        .collect()
                }
                None => arc
                    .iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| (p[0], p[1]))
                    .collect(),
            })
            .collect()
    }
}

// `{"type": null}` is a legal TopoJSON geometry with no shape. Internally tagged
// enums can't match a null tag, so those become empty collections up front.
fn geometry_from_value(value: Value) -> serde_json::Result<TopoGeometry> {
    match value.get("type") {
        None | Some(Value::Null) => Ok(TopoGeometry::GeometryCollection { geometries: Vec::new() }),
        Some(_) => serde_json::from_value(value),
    }
}

fn nullable_geometries<'de, D>(deserializer: D) -> std::result::Result<Vec<TopoGeometry>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|v| geometry_from_value(v).map_err(de::Error::custom))
        .collect()
}

fn nullable_objects<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, TopoGeometry>, D::Error>
where
    D: Deserializer<'de>,
{
    HashMap::<String, Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(name, v)| geometry_from_value(v).map(|g| (name, g)).map_err(de::Error::custom))
        .collect()
}

fn collect_features(
    geometry: &TopoGeometry,
    arcs: &[Vec<(f64, f64)>],
    out: &mut Vec<TopoFeature>,
) -> Result<()> {
    match geometry {
        TopoGeometry::Polygon { arcs: rings, properties } => {
            out.push(TopoFeature {
                geometry: MultiPolygon::new(vec![polygon(rings, arcs)?]),
                properties: properties.clone().unwrap_or_default(),
            });
        }
        TopoGeometry::MultiPolygon { arcs: polygons, properties } => {
            let polygons = polygons
                .iter()
                .map(|rings| polygon(rings, arcs))
                .collect::<Result<Vec<_>>>()?;
            out.push(TopoFeature {
                geometry: MultiPolygon::new(polygons),
                properties: properties.clone().unwrap_or_default(),
            });
        }
        TopoGeometry::GeometryCollection { geometries } => {
            for child in geometries {
                collect_features(child, arcs, out)?;
            }
        }
        TopoGeometry::Unsupported => {}
    }
    Ok(())
}

fn polygon(rings: &[Vec<i64>], arcs: &[Vec<(f64, f64)>]) -> Result<Polygon<f64>> {
    let mut rings = rings
        .iter()
        .map(|ring| stitch(ring, arcs).map(LineString::from))
        .collect::<Result<Vec<_>>>()?
        .into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString::new(vec![]));
    Ok(Polygon::new(exterior, rings.collect()))
}

/// Join arcs end to end, dropping the point each arc shares with the previous one.
/// A negative index `i` is arc `!i` walked backwards.
fn stitch(indices: &[i64], arcs: &[Vec<(f64, f64)>]) -> Result<Vec<(f64, f64)>> {
    let mut points: Vec<(f64, f64)> = Vec::new();
    for &index in indices {
        let (position, reversed) = if index < 0 {
            (!index, true)
        } else {
            (index, false)
        };
        let arc = usize::try_from(position)
            .ok()
            .and_then(|i| arcs.get(i))
            .ok_or(ChoroplethError::InvalidArc(index))?;

        if !points.is_empty() {
            points.pop();
        }
        if reversed {
            points.extend(arc.iter().rev().copied());
        } else {
            points.extend(arc.iter().copied());
        }
    }
    Ok(points)
}
