//! Vector features produced from rasters

use crate::crs::CRS;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&AttributeValue> for Value {
    fn from(value: &AttributeValue) -> Self {
        match value {
            AttributeValue::Null => Value::Null,
            AttributeValue::Bool(b) => Value::Bool(*b),
            AttributeValue::Int(i) => Value::from(*i),
            AttributeValue::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            AttributeValue::String(s) => Value::String(s.clone()),
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Geometry<f64>,
    /// Feature attributes, kept sorted so serialization is stable
    pub properties: BTreeMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<u64>,
}

impl Feature {
    /// Create a new feature with geometry and no attributes
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            properties: BTreeMap::new(),
            id: None,
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.set_property(key, value);
        self
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    fn to_geojson(&self) -> geojson::Feature {
        let properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v)))
            .collect();

        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: self.id.map(|id| geojson::feature::Id::Number(id.into())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Collection of features sharing one CRS
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    pub crs: Option<CRS>,
}

impl FeatureCollection {
    pub fn new(crs: Option<CRS>) -> Self {
        Self {
            features: Vec::new(),
            crs,
        }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Convert to a GeoJSON feature collection.
    ///
    /// A known EPSG code is recorded as a named `crs` member, the form GDAL
    /// and GeoPandas read back.
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let foreign_members = self.crs.as_ref().and_then(CRS::urn).map(|urn| {
            let mut crs = Map::new();
            crs.insert(
                "crs".to_string(),
                serde_json::json!({ "type": "name", "properties": { "name": urn } }),
            );
            crs
        });

        geojson::FeatureCollection {
            bbox: None,
            features: self.features.iter().map(Feature::to_geojson).collect(),
            foreign_members,
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    fn unit_square() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
            vec![],
        )
    }

    #[test]
    fn feature_properties_convert_to_json() {
        let feature = Feature::new(unit_square()).with_property("class", AttributeValue::Int(5));
        let json = feature.to_geojson();
        let props = json.properties.unwrap();
        assert_eq!(props.get("class"), Some(&Value::from(5)));
        assert!(json.geometry.is_some());
    }

    #[test]
    fn collection_records_crs_urn() {
        let mut fc = FeatureCollection::new(Some(CRS::wgs84()));
        fc.push(Feature::new(unit_square()));
        let gj = fc.to_geojson();

        let crs = gj.foreign_members.unwrap();
        assert_eq!(
            crs["crs"]["properties"]["name"],
            Value::from("urn:ogc:def:crs:EPSG::4326")
        );
        assert_eq!(gj.features.len(), 1);
    }

    #[test]
    fn collection_without_crs_has_no_foreign_members() {
        let fc = FeatureCollection::new(None);
        assert!(fc.to_geojson().foreign_members.is_none());
        assert!(fc.is_empty());
    }

    #[test]
    fn nan_float_attribute_becomes_null() {
        assert_eq!(Value::from(&AttributeValue::Float(f64::NAN)), Value::Null);
    }
}
