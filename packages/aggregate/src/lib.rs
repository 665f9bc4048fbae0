#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weighted reaggregation of measurements between spatial units.
//!
//! One generic weighted group-by primitive ([`reaggregate`]) serves every
//! re-averaging in the pipeline: block group to census tract (truncation
//! crosswalk, area or population weights from the table itself) and block
//! group to ZIP code (overlay crosswalk, overlap-area weights). The
//! measurement side is an [`AttributeTable`], a plain numeric table keyed
//! by spatial unit id.

pub mod table;
pub mod tract;
pub mod weighted;

pub use table::AttributeTable;
pub use tract::tract_crosswalk;
pub use weighted::reaggregate;

use thiserror::Error;

/// Errors from table handling and reaggregation.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// I/O error reading or writing a table file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV parse or write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The table file has no column with the expected id header.
    #[error("Table has no id column '{column}'")]
    MissingIdColumn {
        /// The id column that was looked up.
        column: String,
    },

    /// A named attribute column is absent from the table.
    #[error("Table has no column '{column}'")]
    MissingColumn {
        /// The missing column name.
        column: String,
    },

    /// Two rows in one table share a spatial unit id.
    #[error("Duplicate unit id in table: {id}")]
    DuplicateId {
        /// The duplicated identifier.
        id: String,
    },

    /// A row was pushed with the wrong number of values.
    #[error("Row for {id} has {got} values, table has {expected} columns")]
    RowWidth {
        /// Unit id of the offending row.
        id: String,
        /// Number of values supplied.
        got: usize,
        /// Number of columns in the table.
        expected: usize,
    },

    /// Two joined tables share an attribute column name.
    #[error("Join would duplicate column '{column}'")]
    DuplicateColumn {
        /// The colliding column name.
        column: String,
    },

    /// A measured unit has no crosswalk row, i.e. no spatial context.
    #[error("Unit {id} is absent from the crosswalk")]
    MissingCrosswalk {
        /// The unmatched spatial unit id.
        id: String,
    },

    /// A unit id is too short to derive the target unit from.
    #[error("Unit id {id} is too short to truncate")]
    UntruncatableId {
        /// The offending identifier.
        id: String,
    },
}
