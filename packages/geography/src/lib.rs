#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial partition loading and validation.
//!
//! A partition is a set of uniquely-identified polygons covering the area of
//! interest: census block groups, census tracts, ZIP code boundaries,
//! neighborhoods. Partitions load from `GeoJSON` `FeatureCollection`s (WPRDC
//! boundary exports) or ESRI shapefiles (Census TIGER), always in geographic
//! coordinates (EPSG:4326).

pub mod ingest;

use geo::{MultiPolygon, Validation as _};
use thiserror::Error;

/// Errors that can occur while loading or validating partitions.
#[derive(Debug, Error)]
pub enum GeoError {
    /// I/O error reading a boundary file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    Geojson(#[from] geojson::Error),

    /// The boundary file is valid `GeoJSON` but not a `FeatureCollection`.
    #[error("Expected a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    /// Shapefile parsing failed.
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// A feature is missing the configured id property.
    #[error("Feature {index} has no usable '{property}' property")]
    MissingId {
        /// Zero-based feature index in the source file.
        index: usize,
        /// Name of the id property that was looked up.
        property: String,
    },

    /// A feature carries a geometry type other than Polygon/`MultiPolygon`.
    #[error("Region {id} has unsupported geometry type")]
    UnsupportedGeometry {
        /// Region identifier.
        id: String,
    },

    /// A region polygon failed validity checks (e.g. self-intersection).
    #[error("Region {id} has invalid geometry")]
    InvalidGeometry {
        /// Region identifier.
        id: String,
    },

    /// Two regions in one partition share an identifier.
    #[error("Duplicate region id in partition: {id}")]
    DuplicateRegionId {
        /// The duplicated identifier.
        id: String,
    },
}

/// A single region of a partition: one identifier, one (multi)polygon.
///
/// Multi-part regions are treated as atomic; the parts are never addressed
/// individually.
#[derive(Debug, Clone)]
pub struct Region {
    /// Unique identifier within the partition (GEOID, ZIP code, name).
    pub id: String,
    /// Region geometry in geographic coordinates.
    pub polygon: MultiPolygon<f64>,
}

/// A set of regions with unique identifiers.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Member regions, in source-file order.
    pub regions: Vec<Region>,
}

impl Partition {
    /// Builds a partition, enforcing id uniqueness and geometry validity.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::DuplicateRegionId`] if two regions share an id,
    /// or [`GeoError::InvalidGeometry`] if a polygon fails validation.
    pub fn new(regions: Vec<Region>) -> Result<Self, GeoError> {
        let mut seen = std::collections::BTreeSet::new();
        for region in &regions {
            if !seen.insert(region.id.clone()) {
                return Err(GeoError::DuplicateRegionId {
                    id: region.id.clone(),
                });
            }
            if !region.polygon.is_valid() {
                return Err(GeoError::InvalidGeometry {
                    id: region.id.clone(),
                });
            }
        }
        Ok(Self { regions })
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the partition has no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Looks up a region by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.id == id)
    }
}
