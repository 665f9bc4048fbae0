//! Air quality sensor locations.
//!
//! Cleans the WPRDC `air_sensors` dump: drops the meaningless `_id`,
//! renames `site_name` to match the site names used by the daily feed,
//! and parses the `t`/`f` enabled flag.

use std::path::Path;

use airshed_spatial::SitePoint;
use serde::Deserialize;

use crate::WprdcError;

/// One measurement station.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    /// Site name, aligned with `DailyReading::site`.
    pub site: String,
    /// Station description.
    pub description: Option<String>,
    /// `AirNow` station mnemonic.
    pub air_now_mnemonic: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Latitude in degrees, if surveyed.
    pub latitude: Option<f64>,
    /// Longitude in degrees, if surveyed.
    pub longitude: Option<f64>,
    /// Whether the station currently reports.
    pub enabled: bool,
}

/// Raw CSV row shape; `_id` is dropped by not being declared.
#[derive(Debug, Deserialize)]
struct RawSensor {
    site_name: String,
    description: Option<String>,
    air_now_mnemonic: Option<String>,
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    enabled: String,
}

/// Reads and cleans the sensor location dump.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_sensors(path: &Path) -> Result<Vec<Sensor>, WprdcError> {
    let mut reader = csv::Reader::from_path(path).map_err(WprdcError::Csv)?;

    let mut sensors = Vec::new();
    for record in reader.deserialize::<RawSensor>() {
        let raw = record?;
        sensors.push(Sensor {
            site: raw.site_name.trim().to_string(),
            description: raw.description.filter(|s| !s.trim().is_empty()),
            air_now_mnemonic: raw.air_now_mnemonic.filter(|s| !s.trim().is_empty()),
            address: raw.address.filter(|s| !s.trim().is_empty()),
            latitude: raw.latitude,
            longitude: raw.longitude,
            enabled: raw.enabled.trim() == "t",
        });
    }

    log::info!("Read {} sensors from {}", sensors.len(), path.display());
    Ok(sensors)
}

/// Converts enabled sensors into nearest-site query targets, in input
/// order (the canonical tie-break order).
///
/// # Errors
///
/// Returns [`WprdcError::MissingSensorLocation`] naming any enabled
/// sensor without coordinates; a sensor the resolver cannot use must be
/// surfaced, not silently skipped.
pub fn site_points(sensors: &[Sensor]) -> Result<Vec<SitePoint>, WprdcError> {
    let mut points = Vec::new();
    for sensor in sensors.iter().filter(|sensor| sensor.enabled) {
        let (Some(latitude), Some(longitude)) = (sensor.latitude, sensor.longitude) else {
            return Err(WprdcError::MissingSensorLocation {
                site: sensor.site.clone(),
            });
        };
        points.push(SitePoint {
            id: sensor.site.clone(),
            latitude,
            longitude,
        });
    }
    Ok(points)
}
