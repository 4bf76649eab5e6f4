//! Geometry Enrichment
//!
//! Joins per-region totals onto a GeoJSON boundary dataset for the choropleth.
//! Geometry is opaque here: it is carried as raw JSON and never inspected or
//! transformed. Each feature is matched by a region-id property (`id` in the
//! bundled dataset) directly against the region codes in the totals.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use super::aggregate::RegionTotals;
use super::stats::ColorScale;
use crate::region::RegionCatalog;

/// Coarse outlines of the Philippine regions, keyed by `properties.id`
pub const BUNDLED_BOUNDARIES: &str = include_str!("../../data/philippines-regions.geojson");

/// Default feature property holding the region code
pub const DEFAULT_ID_PROPERTY: &str = "id";

/// Errors loading a boundary dataset
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Expected a FeatureCollection, found {0:?}")]
    NotFeatureCollection(String),
}

/// GeoJSON FeatureCollection with unknown members preserved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub foreign: Map<String, Value>,
}

/// GeoJSON Feature with opaque geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Value,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub foreign: Map<String, Value>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Feature {
    /// Region code stored under `id_property`, if it is a string
    pub fn region_id(&self, id_property: &str) -> Option<&str> {
        self.properties.get(id_property).and_then(Value::as_str)
    }
}

impl FeatureCollection {
    pub fn from_json(json: &str) -> Result<Self, GeoError> {
        let collection: FeatureCollection = serde_json::from_str(json)?;
        if collection.kind != "FeatureCollection" {
            return Err(GeoError::NotFeatureCollection(collection.kind));
        }
        Ok(collection)
    }

    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The dataset compiled into the binary
    pub fn bundled() -> Result<Self, GeoError> {
        Self::from_json(BUNDLED_BOUNDARIES)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Annotate every feature with `cases` and `deaths` from the totals.
///
/// Returns a new collection with the same features in the same order; features
/// whose id is missing or absent from `totals` get zeros.
pub fn enrich(
    boundaries: &FeatureCollection,
    totals: &RegionTotals,
    id_property: &str,
) -> FeatureCollection {
    let features = boundaries
        .features
        .iter()
        .map(|feature| {
            let region = feature
                .region_id(id_property)
                .and_then(|code| totals.get(code))
                .copied()
                .unwrap_or_default();

            let mut enriched = feature.clone();
            enriched
                .properties
                .insert("cases".to_string(), Value::from(region.cases));
            enriched
                .properties
                .insert("deaths".to_string(), Value::from(region.deaths));
            enriched
        })
        .collect();

    FeatureCollection {
        kind: boundaries.kind.clone(),
        features,
        foreign: boundaries.foreign.clone(),
    }
}

/// Add display properties to enriched features: `region_name` from the catalog
/// and `fill` from the color scale applied to `cases`.
pub fn decorate(
    collection: &mut FeatureCollection,
    catalog: &RegionCatalog,
    scale: &ColorScale,
    id_property: &str,
) {
    for feature in &mut collection.features {
        let name = feature
            .region_id(id_property)
            .and_then(|code| catalog.name_of(code))
            .map(str::to_string);
        let cases = feature
            .properties
            .get("cases")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        if let Some(name) = name {
            feature
                .properties
                .insert("region_name".to_string(), Value::String(name));
        }
        feature.properties.insert(
            "fill".to_string(),
            Value::String(scale.color_for(cases).to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::aggregate::Totals;
    use crate::region::RegionCode;
    use serde_json::json;

    fn boundaries() -> FeatureCollection {
        FeatureCollection::from_json(
            &json!({
                "type": "FeatureCollection",
                "crs": { "type": "name" },
                "features": [
                    { "type": "Feature", "id": 1, "properties": { "id": "PH13" },
                      "geometry": { "type": "Point", "coordinates": [125.5, 9.0] } },
                    { "type": "Feature", "properties": { "id": "PH99", "name": "Nowhere" },
                      "geometry": null },
                    { "type": "Feature", "properties": null,
                      "geometry": { "type": "Point", "coordinates": [0.0, 0.0] } }
                ]
            })
            .to_string(),
        )
        .unwrap()
    }

    fn totals() -> RegionTotals {
        let mut totals = RegionTotals::new();
        totals.insert(RegionCode::new("PH13"), Totals { cases: 15, deaths: 1 });
        totals
    }

    #[test]
    fn test_enrich_matches_and_defaults() {
        let enriched = enrich(&boundaries(), &totals(), DEFAULT_ID_PROPERTY);

        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched.features[0].properties["cases"], json!(15));
        assert_eq!(enriched.features[0].properties["deaths"], json!(1));
        assert_eq!(enriched.features[1].properties["cases"], json!(0));
        assert_eq!(enriched.features[1].properties["deaths"], json!(0));
        assert_eq!(enriched.features[2].properties["cases"], json!(0));
    }

    #[test]
    fn test_enrich_passes_geometry_and_members_through() {
        let input = boundaries();
        let enriched = enrich(&input, &totals(), DEFAULT_ID_PROPERTY);

        for (before, after) in input.features.iter().zip(&enriched.features) {
            assert_eq!(before.geometry, after.geometry);
            assert_eq!(before.foreign, after.foreign);
        }
        assert_eq!(enriched.foreign["crs"], json!({ "type": "name" }));
        assert_eq!(enriched.features[1].properties["name"], json!("Nowhere"));
    }

    #[test]
    fn test_enrich_does_not_mutate_input() {
        let input = boundaries();
        let snapshot = input.clone();
        let _ = enrich(&input, &totals(), DEFAULT_ID_PROPERTY);
        assert_eq!(input, snapshot);
    }

    #[test]
    fn test_enrich_with_empty_totals() {
        let enriched = enrich(&boundaries(), &RegionTotals::new(), DEFAULT_ID_PROPERTY);
        assert!(enriched
            .features
            .iter()
            .all(|f| f.properties["cases"] == json!(0) && f.properties["deaths"] == json!(0)));
    }

    #[test]
    fn test_custom_id_property() {
        let mut input = boundaries();
        input.features[0]
            .properties
            .insert("code".to_string(), json!("PH13"));
        input.features[0].properties.remove("id");

        let enriched = enrich(&input, &totals(), "code");
        assert_eq!(enriched.features[0].properties["cases"], json!(15));
    }

    #[test]
    fn test_decorate() {
        let mut enriched = enrich(&boundaries(), &totals(), DEFAULT_ID_PROPERTY);
        let scale = ColorScale::absolute();
        decorate(&mut enriched, RegionCatalog::philippines(), &scale, DEFAULT_ID_PROPERTY);

        assert_eq!(enriched.features[0].properties["region_name"], json!("CARAGA"));
        assert_eq!(enriched.features[0].properties["fill"], json!("#FED976"));
        assert!(enriched.features[1].properties.get("region_name").is_none());
        assert_eq!(enriched.features[1].properties["fill"], json!("#FFEDA0"));
    }

    #[test]
    fn test_rejects_non_collection() {
        let err = FeatureCollection::from_json(r#"{"type": "Feature", "features": []}"#).unwrap_err();
        assert!(matches!(err, GeoError::NotFeatureCollection(kind) if kind == "Feature"));
    }

    #[test]
    fn test_bundled_dataset_covers_catalog() {
        let bundled = FeatureCollection::bundled().unwrap();
        let catalog = RegionCatalog::philippines();

        assert_eq!(bundled.len(), catalog.len());
        for entry in catalog.entries() {
            assert!(
                bundled
                    .features
                    .iter()
                    .any(|f| f.region_id(DEFAULT_ID_PROPERTY) == Some(entry.code.as_str())),
                "no boundary for {}",
                entry.code
            );
        }
    }
}
