#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census GEOID helpers and spatial crosswalk types.
//!
//! A crosswalk relates spatial units of one partition (e.g. census block
//! groups) to spatial units of another (e.g. ZIP codes) together with an
//! overlap weight. It is plain data, no geometry attached, so both the
//! overlay builder and the reaggregator can share it without depending on
//! each other.

pub mod geoid;

use serde::{Deserialize, Serialize};

/// One source-unit-to-target-unit overlap with its aggregation weight.
///
/// The weight is an overlap area for geometric crosswalks, or a region
/// area/population for same-partition refinements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosswalkRow {
    /// Source spatial unit id (e.g. block group GEOID).
    pub source_id: String,
    /// Target spatial unit id (e.g. ZIP code or tract GEOID).
    pub target_id: String,
    /// Aggregation weight for this pair.
    pub weight: f64,
}

/// A relation mapping source spatial units to target spatial units.
///
/// A source unit may map to multiple targets and vice versa. Row order is
/// not semantically meaningful; builders sort rows by
/// `(source_id, target_id)` so identical inputs produce identical output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Crosswalk {
    /// Overlap rows.
    pub rows: Vec<CrosswalkRow>,
}

impl Crosswalk {
    /// Builds a crosswalk from rows, sorting them into canonical order.
    #[must_use]
    pub fn new(mut rows: Vec<CrosswalkRow>) -> Self {
        rows.sort_by(|a, b| {
            a.source_id
                .cmp(&b.source_id)
                .then_with(|| a.target_id.cmp(&b.target_id))
        });
        Self { rows }
    }

    /// Number of overlap rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the crosswalk has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of weights attributed to a single source unit.
    #[must_use]
    pub fn source_weight(&self, source_id: &str) -> f64 {
        self.rows
            .iter()
            .filter(|row| row.source_id == source_id)
            .map(|row| row.weight)
            .sum()
    }
}
