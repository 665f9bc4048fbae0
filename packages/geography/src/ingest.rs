//! Loads spatial partitions from boundary files.
//!
//! `GeoJSON` loading handles both `Polygon` and `MultiPolygon` features and
//! tolerates numeric id properties (WPRDC exports store ZIP codes as
//! numbers). Shapefile loading goes through the `shapefile` crate's
//! geo-types conversion, which classifies rings into outer boundaries and
//! holes by winding order.

use std::path::Path;

use geo::MultiPolygon;
use geojson::GeoJson;

use crate::{GeoError, Partition, Region};

/// Loads a partition from a `GeoJSON` `FeatureCollection` file.
///
/// `id_property` names the feature property holding the region identifier
/// (e.g. `"ZIP"`, `"hood"`, `"GEOID10"`).
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a feature lacks
/// the id property or a polygonal geometry, or the resulting partition
/// fails validation.
pub fn from_geojson_path(path: &Path, id_property: &str) -> Result<Partition, GeoError> {
    let raw = std::fs::read_to_string(path).map_err(|e| GeoError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let partition = from_geojson_str(&raw, id_property)?;
    log::info!(
        "Loaded {} regions from {}",
        partition.len(),
        path.display()
    );
    Ok(partition)
}

/// Loads a partition from `GeoJSON` text.
///
/// # Errors
///
/// See [`from_geojson_path`].
pub fn from_geojson_str(raw: &str, id_property: &str) -> Result<Partition, GeoError> {
    let geojson: GeoJson = raw.parse()?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(GeoError::NotAFeatureCollection);
    };

    let mut regions = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.into_iter().enumerate() {
        let id = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(id_property))
            .and_then(property_as_id)
            .ok_or_else(|| GeoError::MissingId {
                index,
                property: id_property.to_string(),
            })?;

        let Some(geometry) = feature.geometry else {
            return Err(GeoError::UnsupportedGeometry { id });
        };
        let polygon = geometry_to_multipolygon(geometry)
            .ok_or_else(|| GeoError::UnsupportedGeometry { id: id.clone() })?;

        regions.push(Region { id, polygon });
    }

    Partition::new(regions)
}

/// Loads a partition from an ESRI shapefile.
///
/// `id_field` names the attribute column holding the region identifier
/// (e.g. `"GEOID10"` for TIGER 2010 files).
///
/// # Errors
///
/// Returns an error if the shapefile (or its companion `.dbf`) cannot be
/// read, a record lacks the id field or a polygon shape, or the resulting
/// partition fails validation.
pub fn from_shapefile_path(path: &Path, id_field: &str) -> Result<Partition, GeoError> {
    let mut reader = shapefile::Reader::from_path(path)?;

    let mut regions = Vec::new();
    for (index, shape_record) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = shape_record?;

        let id = match record.get(id_field) {
            Some(shapefile::dbase::FieldValue::Character(Some(value))) => {
                value.trim().to_string()
            }
            Some(shapefile::dbase::FieldValue::Numeric(Some(value))) => {
                format!("{value}")
            }
            _ => {
                return Err(GeoError::MissingId {
                    index,
                    property: id_field.to_string(),
                });
            }
        };

        let polygon = match shape {
            shapefile::Shape::Polygon(polygon) => MultiPolygon::<f64>::from(polygon),
            _ => return Err(GeoError::UnsupportedGeometry { id }),
        };

        regions.push(Region { id, polygon });
    }

    let partition = Partition::new(regions)?;
    log::info!(
        "Loaded {} regions from {}",
        partition.len(),
        path.display()
    );
    Ok(partition)
}

/// Converts an id property value to a string id.
///
/// ZIP codes come through as numbers in some exports; integral values are
/// formatted without a decimal point.
fn property_as_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64().map(|f| f.to_string())
            }
        }
        _ => None,
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`], accepting both
/// `Polygon` and `MultiPolygon` types.
fn geometry_to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZIP_COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "ZIP": 15213 },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "ZIP": "15217" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[2.0, 0.0], [3.0, 0.0], [3.0, 1.0], [2.0, 1.0], [2.0, 0.0]]]]
                }
            }
        ]
    }"#;

    #[test]
    fn loads_features_with_string_and_numeric_ids() {
        let partition = from_geojson_str(ZIP_COLLECTION, "ZIP").unwrap();
        assert_eq!(partition.len(), 2);
        assert!(partition.get("15213").is_some());
        assert!(partition.get("15217").is_some());
    }

    #[test]
    fn missing_id_property_is_an_error() {
        let err = from_geojson_str(ZIP_COLLECTION, "GEOID").unwrap_err();
        assert!(matches!(
            err,
            GeoError::MissingId { index: 0, property } if property == "GEOID"
        ));
    }

    #[test]
    fn non_polygon_geometry_is_rejected() {
        let point_collection = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "ZIP": "15213" },
                    "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
                }
            ]
        }"#;
        let err = from_geojson_str(point_collection, "ZIP").unwrap_err();
        assert!(matches!(err, GeoError::UnsupportedGeometry { id } if id == "15213"));
    }
}
