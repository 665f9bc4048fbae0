//! Compile-time registry of EJScreen vintages.
//!
//! Each entry is a `(year, toml_content)` pair embedded via `include_str!`.
//! Adding a new vintage requires creating a TOML file in `years/` and
//! adding a corresponding entry here; the pipeline and normalizer never
//! change.

use airshed_source_models::YearConfig;

/// Number of registered vintages. Updated when new years are added.
/// Enforced by a test.
#[cfg(test)]
const EXPECTED_YEAR_COUNT: usize = 10;

/// Embedded TOML vintage definitions.
const YEAR_TOMLS: &[(&str, &str)] = &[
    ("2015", include_str!("../years/2015.toml")),
    ("2016", include_str!("../years/2016.toml")),
    ("2017", include_str!("../years/2017.toml")),
    ("2018", include_str!("../years/2018.toml")),
    ("2019", include_str!("../years/2019.toml")),
    ("2020", include_str!("../years/2020.toml")),
    ("2021", include_str!("../years/2021.toml")),
    ("2022", include_str!("../years/2022.toml")),
    ("2023", include_str!("../years/2023.toml")),
    ("2024", include_str!("../years/2024.toml")),
];

/// Returns all registered vintages, oldest first.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught during CI.
#[must_use]
pub fn all_years() -> Vec<YearConfig> {
    YEAR_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse year config '{name}': {e}"))
        })
        .collect()
}

/// Looks up a single vintage by year.
#[must_use]
pub fn year(year: u16) -> Option<YearConfig> {
    all_years().into_iter().find(|config| config.year == year)
}
