//! GeoNames postal-code gazetteer parsing.
//!
//! The `US.txt` dump (from <http://download.geonames.org/export/zip/>) is
//! tab-separated with no header: country, zipcode, place, state name,
//! state code, admin2 name/code, admin3 name/code, latitude, longitude,
//! accuracy. ZIP codes do not map to a clean polygon (they are mail
//! carrier routes), so a ZIP centroid is a fudge, but a serviceable one
//! for nearest-sensor lookups.

use std::path::Path;

use crate::SourceError;

/// Gazetteer column indexes in the tab-separated dump.
const ZIPCODE: usize = 1;
const STATE: usize = 4;
const LATITUDE: usize = 9;
const LONGITUDE: usize = 10;

/// One postal code with its centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct ZipLocation {
    /// Five-digit ZIP code.
    pub zipcode: String,
    /// Two-letter state abbreviation.
    pub state: String,
    /// Centroid latitude in degrees.
    pub latitude: f64,
    /// Centroid longitude in degrees.
    pub longitude: f64,
}

/// Reads the full gazetteer dump.
///
/// Rows with unparseable coordinates are skipped with a warning rather
/// than failing the whole file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not valid TSV.
pub fn read_gazetteer(path: &Path) -> Result<Vec<ZipLocation>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(SourceError::Csv)?;

    let mut locations = Vec::new();
    for record in reader.records() {
        let record = record?;
        let zipcode = record.get(ZIPCODE).unwrap_or("").trim();
        if zipcode.is_empty() {
            continue;
        }

        let latitude = record.get(LATITUDE).and_then(|c| c.trim().parse().ok());
        let longitude = record.get(LONGITUDE).and_then(|c| c.trim().parse().ok());
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            log::warn!("Skipping gazetteer row for {zipcode}: no coordinates");
            continue;
        };

        locations.push(ZipLocation {
            zipcode: zipcode.to_string(),
            state: record.get(STATE).unwrap_or("").trim().to_string(),
            latitude,
            longitude,
        });
    }

    log::info!(
        "Read {} ZIP locations from {}",
        locations.len(),
        path.display()
    );
    Ok(locations)
}

/// Subsets the gazetteer to one state.
#[must_use]
pub fn filter_state(locations: &[ZipLocation], state: &str) -> Vec<ZipLocation> {
    locations
        .iter()
        .filter(|location| location.state == state)
        .cloned()
        .collect()
}

/// Writes `zipcode,latitude,longitude` CSV for general use.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_zip_latlon(locations: &[ZipLocation], path: &Path) -> Result<(), SourceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SourceError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(SourceError::Csv)?;
    writer.write_record(["zipcode", "latitude", "longitude"])?;
    for location in locations {
        writer.write_record([
            location.zipcode.as_str(),
            &location.latitude.to_string(),
            &location.longitude.to_string(),
        ])?;
    }
    writer.flush().map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "US\t15213\tPittsburgh\tPennsylvania\tPA\tAllegheny\t003\t\t\t40.4442\t-79.9557\t4\n\
US\t10001\tNew York\tNew York\tNY\tNew York\t061\t\t\t40.7484\t-73.9967\t4\n\
US\t99999\tNowhere\tAlaska\tAK\t\t\t\t\t\t\t\n";

    fn write_sample() -> std::path::PathBuf {
        use std::sync::atomic::{AtomicU32, Ordering};
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("airshed_gazetteer_test_{n}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("US.txt");
        std::fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn parses_rows_and_skips_missing_coordinates() {
        let locations = read_gazetteer(&write_sample()).unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].zipcode, "15213");
        assert_eq!(locations[0].state, "PA");
        assert!((locations[0].latitude - 40.4442).abs() < 1e-9);
        assert!((locations[0].longitude - -79.9557).abs() < 1e-9);
    }

    #[test]
    fn state_filter_keeps_only_that_state() {
        let locations = read_gazetteer(&write_sample()).unwrap();
        let pa = filter_state(&locations, "PA");
        assert_eq!(pa.len(), 1);
        assert_eq!(pa[0].zipcode, "15213");
    }

    #[test]
    fn writes_zip_latlon_csv() {
        let locations = read_gazetteer(&write_sample()).unwrap();
        let path = std::env::temp_dir()
            .join("airshed_gazetteer_test")
            .join("zip2latlon.csv");
        write_zip_latlon(&filter_state(&locations, "PA"), &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("zipcode,latitude,longitude\n"));
        assert!(raw.contains("15213,40.4442,-79.9557"));
    }
}
