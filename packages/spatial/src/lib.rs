#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geometric core of the reaggregation pipeline.
//!
//! Three concerns live here:
//!
//! - [`projection`]: reprojecting geographic partitions into an equal-area
//!   planar CRS, since lat/lon coordinates do not yield correct areas.
//! - [`overlay`]: intersecting two partitions into an overlap crosswalk,
//!   R-tree accelerated, plus the coverage check for the silent-drop edge.
//! - [`distance`]: haversine great-circle distance and nearest-site
//!   assignment for sensor lookups.

pub mod distance;
pub mod overlay;
pub mod projection;

pub use distance::{NearestSite, SitePoint, closest_site, haversine_miles};
pub use overlay::{CoverageGap, coverage_gaps, overlay};
pub use projection::EqualAreaProjection;

use thiserror::Error;

/// Errors from spatial operations.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The CRS database has no definition for the requested EPSG code.
    #[error("EPSG:{epsg} is not in the CRS definitions database")]
    UnsupportedCrs {
        /// The unknown EPSG code.
        epsg: u16,
    },

    /// Building a projection or transforming coordinates failed.
    #[error("Projection error: {0}")]
    Projection(String),

    /// Nearest-site lookup was given an empty site list.
    #[error("No site locations to search")]
    NoSites,

    /// A site is missing usable coordinates.
    #[error("Site {id} has no usable location")]
    MissingSiteLocation {
        /// Identifier of the offending site.
        id: String,
    },
}
