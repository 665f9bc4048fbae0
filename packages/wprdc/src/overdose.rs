//! Accidental overdose table cleanup and nearest-sensor resolution.
//!
//! Cleans the WPRDC fatal accidental overdose dump: drops `_id` and the
//! all-null `decedent_zip`, parses the death timestamp, and reduces
//! `incident_zip` to a five-digit string (anything non-numeric becomes
//! missing). Cases are then joined many-to-one against ZIP centroids and
//! assigned their nearest enabled sensor.

use std::collections::BTreeMap;
use std::path::Path;

use airshed_spatial::{NearestSite, SitePoint, closest_site};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::WprdcError;

/// One cleaned overdose case.
#[derive(Debug, Clone, PartialEq)]
pub struct OverdoseCase {
    /// Death timestamp.
    pub death_datetime: NaiveDateTime,
    /// Death date (the timestamp truncated to a day).
    pub date: NaiveDate,
    /// Decedent age in years.
    pub age: Option<f64>,
    /// Decedent sex as recorded.
    pub sex: Option<String>,
    /// Decedent race as recorded.
    pub race: Option<String>,
    /// Cleaned five-digit incident ZIP; `None` when unusable.
    pub zipcode: Option<String>,
}

/// An overdose case with its resolved ZIP centroid, when the ZIP is
/// usable and known to the gazetteer.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedCase {
    /// The cleaned case.
    pub case: OverdoseCase,
    /// Centroid `(latitude, longitude)` of the incident ZIP.
    pub location: Option<(f64, f64)>,
}

/// Raw CSV row shape; `_id` and `decedent_zip` are dropped by not being
/// declared.
#[derive(Debug, Deserialize)]
struct RawCase {
    death_date_and_time: String,
    age: Option<f64>,
    sex: Option<String>,
    race: Option<String>,
    incident_zip: Option<String>,
}

/// Reads and cleans the overdose dump.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a death timestamp is
/// unparseable.
pub fn read_overdoses(path: &Path) -> Result<Vec<OverdoseCase>, WprdcError> {
    let mut reader = csv::Reader::from_path(path).map_err(WprdcError::Csv)?;

    let mut cases = Vec::new();
    for record in reader.deserialize::<RawCase>() {
        let raw = record?;
        let death_datetime = parse_datetime(&raw.death_date_and_time)?;
        cases.push(OverdoseCase {
            death_datetime,
            date: death_datetime.date(),
            age: raw.age,
            sex: raw.sex.filter(|s| !s.trim().is_empty()),
            race: raw.race.filter(|s| !s.trim().is_empty()),
            zipcode: raw.incident_zip.as_deref().and_then(clean_zipcode),
        });
    }

    log::info!("Read {} overdose cases from {}", cases.len(), path.display());
    Ok(cases)
}

/// Reduces a raw ZIP cell to a five-digit string.
///
/// Takes the first five characters (dropping ZIP+4 suffixes and float
/// artifacts like `15213.0`) and requires them to be all digits;
/// otherwise the ZIP is treated as missing.
#[must_use]
pub fn clean_zipcode(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let prefix: String = trimmed.chars().take(5).collect();
    if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) {
        Some(prefix)
    } else {
        None
    }
}

/// Joins cases many-to-one against ZIP centroids.
///
/// Cases without a usable ZIP, or whose ZIP is absent from the centroid
/// map, keep `location: None` (a left join).
#[must_use]
pub fn with_locations(
    cases: Vec<OverdoseCase>,
    zip_centroids: &BTreeMap<String, (f64, f64)>,
) -> Vec<LocatedCase> {
    cases
        .into_iter()
        .map(|case| {
            let location = case
                .zipcode
                .as_ref()
                .and_then(|zip| zip_centroids.get(zip))
                .copied();
            LocatedCase { case, location }
        })
        .collect()
}

/// Resolves the nearest sensor for every located case.
///
/// Cases without a location resolve to `None`; located cases are matched
/// against the sensor list in its given order.
///
/// # Errors
///
/// Returns an error if the sensor list is empty or a sensor has no usable
/// location.
pub fn nearest_sensors(
    located: &[LocatedCase],
    sensors: &[SitePoint],
) -> Result<Vec<Option<NearestSite>>, WprdcError> {
    let queries: Vec<(f64, f64)> = located
        .iter()
        .filter_map(|case| case.location)
        .collect();

    let mut resolved = closest_site(&queries, sensors)?.into_iter();

    Ok(located
        .iter()
        .map(|case| {
            if case.location.is_some() {
                resolved.next()
            } else {
                None
            }
        })
        .collect())
}

/// Parses the WPRDC death timestamp; bare dates also occur in older rows.
fn parse_datetime(value: &str) -> Result<NaiveDateTime, WprdcError> {
    let trimmed = value.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(datetime);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(datetime);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(datetime);
        }
    }
    Err(WprdcError::BadDate {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zipcode_cleaning_matches_the_documented_rules() {
        assert_eq!(clean_zipcode("15213"), Some("15213".to_string()));
        assert_eq!(clean_zipcode("15213-1503"), Some("15213".to_string()));
        assert_eq!(clean_zipcode("15213.0"), Some("15213".to_string()));
        assert_eq!(clean_zipcode("nan"), None);
        assert_eq!(clean_zipcode(""), None);
        assert_eq!(clean_zipcode("152A3"), None);
    }

    #[test]
    fn reads_and_cleans_cases() {
        let dir = std::env::temp_dir().join("airshed_wprdc_overdose_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("accidental_overdose.csv");
        std::fs::write(
            &path,
            "_id,death_date_and_time,age,sex,race,incident_zip,decedent_zip\n\
             1,2017-03-05T14:30:00,34,M,W,15213-1503,\n\
             2,2017-04-01,51,F,B,junk,\n",
        )
        .unwrap();

        let cases = read_overdoses(&path).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].zipcode, Some("15213".to_string()));
        assert_eq!(cases[0].date.to_string(), "2017-03-05");
        assert_eq!(cases[1].zipcode, None);
        assert_eq!(cases[1].death_datetime.to_string(), "2017-04-01 00:00:00");
    }

    #[test]
    fn join_and_nearest_sensor_resolution() {
        let case = |zip: Option<&str>| OverdoseCase {
            death_datetime: NaiveDate::from_ymd_opt(2017, 3, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            date: NaiveDate::from_ymd_opt(2017, 3, 5).unwrap(),
            age: None,
            sex: None,
            race: None,
            zipcode: zip.map(ToString::to_string),
        };

        let mut centroids = BTreeMap::new();
        centroids.insert("15213".to_string(), (40.4442, -79.9557));

        let located = with_locations(
            vec![case(Some("15213")), case(None), case(Some("99999"))],
            &centroids,
        );
        assert!(located[0].location.is_some());
        assert!(located[1].location.is_none());
        assert!(located[2].location.is_none(), "unknown ZIP stays unlocated");

        let sensors = vec![
            SitePoint {
                id: "Lawrenceville".to_string(),
                latitude: 40.4656,
                longitude: -79.9611,
            },
            SitePoint {
                id: "Liberty 2".to_string(),
                latitude: 40.3237,
                longitude: -79.8682,
            },
        ];
        let nearest = nearest_sensors(&located, &sensors).unwrap();
        assert_eq!(nearest.len(), 3);
        assert_eq!(
            nearest[0].as_ref().unwrap().site_id,
            "Lawrenceville",
            "Oakland ZIP is closer to Lawrenceville than Liberty"
        );
        assert!(nearest[1].is_none());
    }
}
