//! Décodage des fichiers GeoJSON (limites et données annuelles)
//!
//! Les propriétés numériques deviennent des métriques, `null` une métrique
//! absente pour l'année, les chaînes des attributs. L'identifiant, le nom,
//! la région et l'année sont lus depuis des clés configurables.

use geo::Geometry;
use geojson::feature::Id;
use geojson::{GeoJson, JsonObject, JsonValue};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::ChoroplethError;
use crate::types::{Feature, FeatureCollection, FeatureId, Properties};

/// Clés des propriétés descriptives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyKeys {
    /// Identifiant de jointure (code FIPS)
    pub id: String,
    pub name: String,
    pub region: String,
    pub year: String,
}

impl Default for PropertyKeys {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            name: "county_name".to_string(),
            region: "state_name".to_string(),
            year: "year".to_string(),
        }
    }
}

/// Parse un document GeoJSON contenant une `FeatureCollection`
///
/// # Errors
///
/// Retourne [`ChoroplethError::GeoJson`] si le document est illisible, ou
/// [`ChoroplethError::InvalidGeoJson`] s'il ne s'agit pas d'une collection.
pub fn parse_collection(text: &str, keys: &PropertyKeys) -> Result<FeatureCollection, ChoroplethError> {
    match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => Ok(from_geojson(collection, keys)),
        GeoJson::Feature(_) => Err(ChoroplethError::invalid_geojson(
            "expected a FeatureCollection, found a single Feature",
        )),
        GeoJson::Geometry(_) => Err(ChoroplethError::invalid_geojson(
            "expected a FeatureCollection, found a bare Geometry",
        )),
    }
}

/// Convertit une collection `geojson` en collection du moteur
///
/// Les features sans identifiant sont ignorées. L'année de la collection est
/// celle de la première feature qui en porte une.
pub fn from_geojson(collection: geojson::FeatureCollection, keys: &PropertyKeys) -> FeatureCollection {
    let mut features = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;

    for feature in collection.features {
        let properties = feature.properties.unwrap_or_default();

        let Some(id) = read_id(&properties, feature.id.as_ref(), &keys.id) else {
            skipped += 1;
            continue;
        };

        let geometry = match feature.geometry {
            Some(geometry) => match Geometry::<f64>::try_from(geometry) {
                Ok(geometry) => Some(geometry),
                Err(e) => {
                    warn!(id = %id, error = %e, "Unsupported geometry, feature kept without geometry");
                    None
                }
            },
            None => None,
        };

        trace!(id = %id, "Decoded feature");
        features.push(Feature {
            properties: read_properties(properties, keys),
            id,
            geometry,
        });
    }

    if skipped > 0 {
        warn!(skipped = skipped, "Features without identifier skipped");
    }

    let year = features.iter().find_map(|f| f.properties.year);
    FeatureCollection::new(year, features)
}

/// Identifiant depuis les propriétés, sinon depuis l'`id` de la feature
fn read_id(properties: &JsonObject, feature_id: Option<&Id>, key: &str) -> Option<FeatureId> {
    let from_properties = match properties.get(key) {
        Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    from_properties.or_else(|| match feature_id {
        Some(Id::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Id::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn read_properties(properties: JsonObject, keys: &PropertyKeys) -> Properties {
    let mut out = Properties::default();

    for (key, value) in properties {
        if key == keys.id {
            continue;
        }
        if key == keys.name {
            out.name = as_text(value);
            continue;
        }
        if key == keys.region {
            out.region = as_text(value);
            continue;
        }
        if key == keys.year {
            out.year = read_year(&value);
            continue;
        }

        match value {
            JsonValue::Number(n) => {
                out.metrics.insert(key, n.as_f64());
            }
            JsonValue::Null => {
                out.metrics.insert(key, None);
            }
            JsonValue::String(s) => {
                out.attributes.insert(key, s);
            }
            JsonValue::Bool(b) => {
                out.attributes.insert(key, b.to_string());
            }
            JsonValue::Array(_) | JsonValue::Object(_) => {}
        }
    }

    out
}

fn as_text(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Année numérique, ou préfixe `YYYY` d'une date ISO (`1980-01-01T00:00:00`)
fn read_year(value: &JsonValue) -> Option<i32> {
    match value {
        JsonValue::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        JsonValue::String(s) => s.get(..4).and_then(|y| y.parse().ok()),
        _ => None,
    }
}
