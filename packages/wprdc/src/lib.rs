#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Western Pennsylvania Regional Data Center datasets.
//!
//! An embedded registry of WPRDC dump URLs plus cleanup of the three
//! tables the pipeline actually consumes: daily air quality (AQI, long
//! format), sensor locations, and accidental overdoses.

pub mod air;
pub mod overdose;
pub mod sensors;

use serde::Deserialize;
use thiserror::Error;

/// Errors from WPRDC table cleanup.
#[derive(Debug, Error)]
pub enum WprdcError {
    /// I/O error reading a dataset file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV parse error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An unparseable date or datetime value.
    #[error("Unparseable date: {value}")]
    BadDate {
        /// The offending raw value.
        value: String,
    },

    /// Two readings for the same site on the same day; the by-site pivot
    /// assumes one measurement per site per day.
    #[error("Duplicate reading for site {site} on {date}")]
    DuplicateReading {
        /// Measurement site name.
        site: String,
        /// Measurement date.
        date: chrono::NaiveDate,
    },

    /// A sensor has no usable coordinates.
    #[error("Sensor {site} has no location")]
    MissingSensorLocation {
        /// Site name of the offending sensor.
        site: String,
    },

    /// Passthrough from nearest-site resolution.
    #[error(transparent)]
    Spatial(#[from] airshed_spatial::SpatialError),
}

/// One named dataset dump.
#[derive(Debug, Clone, Deserialize)]
pub struct Dataset {
    /// Short dataset name, also used as the local filename stem.
    pub name: String,
    /// Full dump URL.
    pub url: String,
}

/// The embedded WPRDC dataset registry.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetRegistry {
    /// CSV dump datasets.
    pub csv: Vec<Dataset>,
    /// `GeoJSON` boundary datasets.
    pub geojson: Vec<Dataset>,
}

/// Embedded registry TOML.
const SOURCES_TOML: &str = include_str!("../sources.toml");

/// Returns the dataset registry.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse; a compile-time constant,
/// so failures are caught during CI.
#[must_use]
pub fn datasets() -> DatasetRegistry {
    toml::de::from_str(SOURCES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse WPRDC dataset registry: {e}"))
}
