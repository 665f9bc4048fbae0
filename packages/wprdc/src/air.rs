//! Daily air quality readings and the by-site pivot.
//!
//! The WPRDC daily feed is long format: one row per (date, site,
//! parameter). Values are AQI on the normalized 0-500 scale, not raw
//! concentrations. Parameter selection is a strategy value (a family
//! name plus the raw codes it matches) because the feed records the same
//! pollutant under several measurement codes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::WprdcError;

/// One cleaned daily AQI reading.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyReading {
    /// Measurement date.
    pub date: NaiveDate,
    /// Measurement site name.
    pub site: String,
    /// Raw parameter code (e.g. `PM25B`).
    pub parameter: String,
    /// AQI value; missing measurements are `None`.
    pub index_value: Option<f64>,
    /// Qualitative AQI description (e.g. "Good").
    pub description: Option<String>,
    /// Health advisory text, when the AQI warrants one.
    pub health_advisory: Option<String>,
    /// Health effects text, when the AQI warrants one.
    pub health_effects: Option<String>,
}

/// A pollutant family: the set of raw parameter codes that measure it.
///
/// There are several distinct PM2.5 measurement codes in the feed. They
/// may not be directly comparable, but none of them overlap at the same
/// site at the same time, so the pivot treats them as one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterFamily {
    /// Family name, used for output filenames.
    pub name: &'static str,
    /// Raw parameter codes belonging to the family.
    pub codes: &'static [&'static str],
}

impl ParameterFamily {
    /// Whether a raw parameter code belongs to this family.
    #[must_use]
    pub fn matches(&self, parameter: &str) -> bool {
        self.codes.contains(&parameter)
    }
}

/// Particulate matter of 2.5 microns or smaller.
pub const PM25: ParameterFamily = ParameterFamily {
    name: "pm25",
    codes: &["PM25", "PM25(2)", "PM25B", "PM25T", "PM25_640"],
};

/// Ground-level ozone.
pub const OZONE: ParameterFamily = ParameterFamily {
    name: "ozone",
    codes: &["OZONE"],
};

/// Sulfur dioxide.
pub const SO2: ParameterFamily = ParameterFamily {
    name: "so2",
    codes: &["SO2"],
};

/// Raw CSV row shape; `_id` is dropped by not being declared.
#[derive(Debug, Deserialize)]
struct RawReading {
    date: String,
    site: String,
    parameter: String,
    index_value: Option<f64>,
    description: Option<String>,
    health_advisory: Option<String>,
    health_effects: Option<String>,
}

/// Reads and cleans the daily air quality dump.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a date is unparseable.
pub fn read_daily_air(path: &Path) -> Result<Vec<DailyReading>, WprdcError> {
    let mut reader = csv::Reader::from_path(path).map_err(WprdcError::Csv)?;

    let mut readings = Vec::new();
    for record in reader.deserialize::<RawReading>() {
        let raw = record?;
        readings.push(DailyReading {
            date: parse_date(&raw.date)?,
            site: raw.site,
            parameter: raw.parameter,
            index_value: raw.index_value,
            description: none_if_empty(raw.description),
            health_advisory: none_if_empty(raw.health_advisory),
            health_effects: none_if_empty(raw.health_effects),
        });
    }

    log::info!("Read {} daily readings from {}", readings.len(), path.display());
    Ok(readings)
}

/// A date x site wide table of AQI values for one parameter family.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSeries {
    /// Distinct dates, ascending.
    pub dates: Vec<NaiveDate>,
    /// Distinct site names, ascending.
    pub sites: Vec<String>,
    /// `values[date_index][site_index]`; missing measurements are NaN.
    pub values: Vec<Vec<f64>>,
}

impl SiteSeries {
    /// Writes the series as CSV: a `date` column plus one column per site.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn to_csv_path(&self, path: &Path) -> Result<(), WprdcError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| WprdcError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let mut writer = csv::Writer::from_path(path).map_err(WprdcError::Csv)?;
        let mut header = vec!["date".to_string()];
        header.extend(self.sites.iter().cloned());
        writer.write_record(&header)?;

        for (date, row) in self.dates.iter().zip(&self.values) {
            let mut record = vec![date.to_string()];
            for value in row {
                record.push(if value.is_nan() {
                    String::new()
                } else {
                    format!("{value}")
                });
            }
            writer.write_record(&record)?;
        }

        writer.flush().map_err(|e| WprdcError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }
}

/// Pivots readings for one parameter family into a date x site table.
///
/// # Errors
///
/// Returns [`WprdcError::DuplicateReading`] if a site reports the family
/// twice on one day; the pivot has nowhere to put a second value.
pub fn by_site(
    readings: &[DailyReading],
    family: ParameterFamily,
) -> Result<SiteSeries, WprdcError> {
    let selected: Vec<&DailyReading> = readings
        .iter()
        .filter(|reading| family.matches(&reading.parameter))
        .collect();

    let dates: Vec<NaiveDate> = selected
        .iter()
        .map(|reading| reading.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let sites: Vec<String> = selected
        .iter()
        .map(|reading| reading.site.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut cells: BTreeMap<(NaiveDate, &str), f64> = BTreeMap::new();
    for reading in &selected {
        let key = (reading.date, reading.site.as_str());
        let value = reading.index_value.unwrap_or(f64::NAN);
        if cells.insert(key, value).is_some() {
            return Err(WprdcError::DuplicateReading {
                site: reading.site.clone(),
                date: reading.date,
            });
        }
    }

    let values = dates
        .iter()
        .map(|date| {
            sites
                .iter()
                .map(|site| {
                    cells
                        .get(&(*date, site.as_str()))
                        .copied()
                        .unwrap_or(f64::NAN)
                })
                .collect()
        })
        .collect();

    Ok(SiteSeries {
        dates,
        sites,
        values,
    })
}

/// Parses a WPRDC date cell: bare dates and datetimes both occur.
fn parse_date(value: &str) -> Result<NaiveDate, WprdcError> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(datetime.date());
    }
    Err(WprdcError::BadDate {
        value: value.to_string(),
    })
}

/// Collapses empty strings to `None`.
fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(date: &str, site: &str, parameter: &str, value: f64) -> DailyReading {
        DailyReading {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            site: site.to_string(),
            parameter: parameter.to_string(),
            index_value: Some(value),
            description: None,
            health_advisory: None,
            health_effects: None,
        }
    }

    #[test]
    fn family_matches_all_pm25_codes() {
        for code in ["PM25", "PM25(2)", "PM25B", "PM25T", "PM25_640"] {
            assert!(PM25.matches(code), "PM25 should match {code}");
        }
        assert!(!PM25.matches("OZONE"));
        assert!(OZONE.matches("OZONE"));
        assert!(SO2.matches("SO2"));
    }

    #[test]
    fn pivot_is_date_by_site_with_nan_holes() {
        let readings = vec![
            reading("2017-01-01", "Lawrenceville", "PM25B", 40.0),
            reading("2017-01-01", "Avalon", "PM25", 35.0),
            reading("2017-01-02", "Avalon", "PM25", 30.0),
            reading("2017-01-01", "Avalon", "OZONE", 12.0),
        ];

        let series = by_site(&readings, PM25).unwrap();
        assert_eq!(series.sites, ["Avalon", "Lawrenceville"]);
        assert_eq!(series.dates.len(), 2);
        assert!((series.values[0][0] - 35.0).abs() < f64::EPSILON);
        assert!((series.values[0][1] - 40.0).abs() < f64::EPSILON);
        assert!((series.values[1][0] - 30.0).abs() < f64::EPSILON);
        assert!(series.values[1][1].is_nan(), "no Lawrenceville on day 2");
    }

    #[test]
    fn duplicate_site_day_reading_is_an_error() {
        let readings = vec![
            reading("2017-01-01", "Avalon", "PM25", 35.0),
            reading("2017-01-01", "Avalon", "PM25B", 36.0),
        ];
        let err = by_site(&readings, PM25).unwrap_err();
        assert!(matches!(
            err,
            WprdcError::DuplicateReading { site, .. } if site == "Avalon"
        ));
    }

    #[test]
    fn parses_bare_dates_and_datetimes() {
        assert_eq!(
            parse_date("2017-06-01").unwrap(),
            NaiveDate::parse_from_str("2017-06-01", "%Y-%m-%d").unwrap()
        );
        assert_eq!(
            parse_date("2017-06-01T00:00:00").unwrap(),
            NaiveDate::parse_from_str("2017-06-01", "%Y-%m-%d").unwrap()
        );
        assert!(matches!(
            parse_date("junk"),
            Err(WprdcError::BadDate { value }) if value == "junk"
        ));
    }
}
