#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! EJScreen source handling: the per-year configuration registry, the
//! schema normalizer that maps each vintage's raw columns onto the
//! canonical set, and the GeoNames gazetteer parser.

pub mod gazetteer;
pub mod normalize;
pub mod registry;

pub use normalize::{RawTable, normalize};

use thiserror::Error;

/// Errors from source normalization and parsing.
#[derive(Debug, Error)]
pub enum SourceError {
    /// I/O error reading a source file.
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

    /// A column required downstream is absent after renaming and
    /// derivation. This is a configuration error for that vintage, never
    /// silently skipped.
    #[error("Year {year} is missing required column '{column}'")]
    MissingColumn {
        /// Data vintage whose configuration failed.
        year: u16,
        /// The canonical column that could not be produced.
        column: String,
    },

    /// Passthrough from table construction (duplicate ids, row widths).
    #[error(transparent)]
    Aggregate(#[from] airshed_aggregate::AggregateError),
}
