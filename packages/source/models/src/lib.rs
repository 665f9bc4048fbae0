#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! EJScreen source definition types.
//!
//! Defines the TOML schema for one EJScreen vintage. The EPA publishes one
//! national file per year with a drifting URL scheme, drifting filenames,
//! and drifting column names; everything year-specific lives in a
//! [`YearConfig`] so the download and normalization code never branches on
//! the year.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How an EJScreen vintage is packaged for download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    /// A `.zip` archive containing the CSV.
    Zip,
    /// A bare CSV, no archive (2017 only, so far).
    Csv,
}

/// Spatial unit the vintage is published at.
///
/// EJScreen switched from block groups to tracts with the 2022 release;
/// reaggregation paths only apply to block group vintages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Census block group rows (2015-2021).
    BlockGroup,
    /// Census tract rows (2022 onward).
    Tract,
}

/// Configuration for a single EJScreen vintage, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearConfig {
    /// Data vintage, e.g. `2019`.
    pub year: u16,
    /// Full download URL for the national file.
    pub url: String,
    /// Whether the download is an archive or a bare CSV.
    pub archive: ArchiveKind,
    /// Spatial unit of the published rows.
    pub granularity: Granularity,
    /// Name of the CSV file once downloaded/extracted. Not always derivable
    /// from the URL (2016 and 2018 archives contain differently-named
    /// files).
    pub csv_name: String,
    /// Name of the spatial unit id column in the raw file.
    pub id_column: String,
    /// Canonical substance column names expected after renaming.
    pub substances: Vec<String>,
    /// Canonical demographic column names expected after renaming.
    pub demographics: Vec<String>,
    /// Raw column name -> canonical column name.
    pub rename: BTreeMap<String, String>,
}

impl YearConfig {
    /// Filename the download is saved under, taken from the URL's last
    /// path segment.
    #[must_use]
    pub fn download_filename(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(self.url.as_str())
    }

    /// Filename of the normalized per-county output for this vintage.
    #[must_use]
    pub fn data_filename(&self) -> String {
        format!("{}.csv", self.year)
    }
}
