//! Normalizes raw per-year source tables onto the canonical schema.
//!
//! Uses the vintage's [`YearConfig`] to rename columns, derive `area` from
//! land + water areas where the source splits them, validate that every
//! column needed downstream exists, and subset rows to the region of
//! interest. Missing columns are fatal configuration errors for that
//! vintage; reaggregating a table with silently absent columns would
//! produce wrong answers, not degraded ones.

use std::path::Path;

use airshed_aggregate::AttributeTable;
use airshed_geography_models::geoid;
use airshed_source_models::YearConfig;

use crate::SourceError;

/// An untyped table straight out of a CSV file: a header row plus string
/// records.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column headers, trimmed.
    pub headers: Vec<String>,
    /// Data rows; cells align with `headers`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Reads a raw table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    pub fn from_csv_path(path: &Path) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(SourceError::Csv)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
        }

        log::debug!("Read {} raw rows from {}", rows.len(), path.display());
        Ok(Self { headers, rows })
    }
}

/// Normalizes a raw source table to the canonical column set, subset to
/// the region whose unit ids start with `region_prefix`.
///
/// Canonical output columns, in order: `area`, `total_population`, the
/// vintage's substances, then its demographics.
///
/// # Errors
///
/// Returns [`SourceError::MissingColumn`] naming the vintage and column if
/// the id column or any canonical column cannot be produced from the raw
/// table.
pub fn normalize(
    raw: &RawTable,
    config: &YearConfig,
    region_prefix: &str,
) -> Result<AttributeTable, SourceError> {
    let id_index = raw
        .headers
        .iter()
        .position(|h| *h == config.id_column)
        .ok_or_else(|| SourceError::MissingColumn {
            year: config.year,
            column: config.id_column.clone(),
        })?;

    // Header names after applying the vintage's rename map.
    let renamed: Vec<&str> = raw
        .headers
        .iter()
        .map(|h| config.rename.get(h).map_or(h.as_str(), String::as_str))
        .collect();

    let find = |column: &str| renamed.iter().position(|h| *h == column);

    // `area` is either present directly or derived from land + water.
    let area = match find("area") {
        Some(index) => AreaColumn::Direct(index),
        None => match (find("land_area"), find("water_area")) {
            (Some(land), Some(water)) => AreaColumn::LandPlusWater { land, water },
            _ => {
                return Err(SourceError::MissingColumn {
                    year: config.year,
                    column: "area".to_string(),
                });
            }
        },
    };

    let mut required = vec!["total_population".to_string()];
    required.extend(config.substances.iter().cloned());
    required.extend(config.demographics.iter().cloned());

    let mut indexes = Vec::with_capacity(required.len());
    for column in &required {
        indexes.push(find(column).ok_or_else(|| SourceError::MissingColumn {
            year: config.year,
            column: column.clone(),
        })?);
    }

    let mut columns = vec!["area".to_string()];
    columns.extend(required);

    let mut table = AttributeTable::new("id", columns);
    for row in &raw.rows {
        let id = row.get(id_index).map_or("", String::as_str);
        if !geoid::in_region(id, region_prefix) {
            continue;
        }

        let mut values = Vec::with_capacity(indexes.len() + 1);
        values.push(match area {
            AreaColumn::Direct(index) => parse_cell(row.get(index)),
            AreaColumn::LandPlusWater { land, water } => {
                parse_cell(row.get(land)) + parse_cell(row.get(water))
            }
        });
        for &index in &indexes {
            values.push(parse_cell(row.get(index)));
        }
        table.push_row(id, values)?;
    }

    log::info!(
        "Normalized year {}: {} of {} rows in region {}",
        config.year,
        table.len(),
        raw.rows.len(),
        region_prefix
    );
    Ok(table)
}

/// Where the canonical `area` column comes from.
#[derive(Clone, Copy)]
enum AreaColumn {
    Direct(usize),
    LandPlusWater { land: usize, water: usize },
}

/// Parses one raw cell; missing, empty, or unparseable cells become NaN.
fn parse_cell(cell: Option<&String>) -> f64 {
    cell.map_or(f64::NAN, |value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            f64::NAN
        } else {
            trimmed.parse().unwrap_or(f64::NAN)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config() -> YearConfig {
        let rename: BTreeMap<String, String> = [
            ("ACSTOTPOP", "total_population"),
            ("AREALAND", "land_area"),
            ("AREAWATER", "water_area"),
            ("PM25", "pm25"),
            ("MINORPCT", "minority_pct"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        YearConfig {
            year: 2019,
            url: "https://gaftp.epa.gov/EJScreen/2019/EJSCREEN_2019_USPR.csv.zip".to_string(),
            archive: airshed_source_models::ArchiveKind::Zip,
            granularity: airshed_source_models::Granularity::BlockGroup,
            csv_name: "EJSCREEN_2019_USPR.csv".to_string(),
            id_column: "ID".to_string(),
            substances: vec!["pm25".to_string()],
            demographics: vec!["minority_pct".to_string()],
            rename,
        }
    }

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(ToString::to_string).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
        }
    }

    #[test]
    fn renames_derives_area_and_subsets_to_region() {
        let raw = raw(
            &["ID", "ACSTOTPOP", "AREALAND", "AREAWATER", "PM25", "MINORPCT"],
            &[
                &["420030101001", "1200", "10.0", "2.0", "8.1", "0.25"],
                &["420070101001", "900", "5.0", "0.0", "7.0", "0.10"],
            ],
        );

        let table = normalize(&raw, &config(), "42003").unwrap();
        assert_eq!(table.ids(), ["420030101001"]);
        assert_eq!(
            table.columns(),
            ["area", "total_population", "pm25", "minority_pct"]
        );
        let row = table.row(0);
        assert!((row[0] - 12.0).abs() < 1e-12, "area = land + water");
        assert!((row[1] - 1200.0).abs() < 1e-12);
        assert!((row[2] - 8.1).abs() < 1e-12);
    }

    #[test]
    fn direct_area_column_wins_over_derivation() {
        let mut config = config();
        config
            .rename
            .insert("AREA_SQMI".to_string(), "area".to_string());
        let raw = raw(
            &["ID", "AREA_SQMI", "ACSTOTPOP", "PM25", "MINORPCT"],
            &[&["420030101001", "3.5", "1200", "8.1", "0.25"]],
        );

        let table = normalize(&raw, &config, "42003").unwrap();
        assert!((table.row(0)[0] - 3.5).abs() < 1e-12);
    }

    #[test]
    fn missing_population_column_names_column_and_year() {
        let raw = raw(
            &["ID", "AREALAND", "AREAWATER", "PM25", "MINORPCT"],
            &[&["420030101001", "10.0", "2.0", "8.1", "0.25"]],
        );

        let err = normalize(&raw, &config(), "42003").unwrap_err();
        assert!(matches!(
            err,
            SourceError::MissingColumn { year: 2019, column } if column == "total_population"
        ));
    }

    #[test]
    fn missing_id_column_is_a_configuration_error() {
        let raw = raw(&["GEOID"], &[]);
        let err = normalize(&raw, &config(), "42003").unwrap_err();
        assert!(matches!(
            err,
            SourceError::MissingColumn { year: 2019, column } if column == "ID"
        ));
    }

    #[test]
    fn unparseable_cells_become_nan() {
        let raw = raw(
            &["ID", "ACSTOTPOP", "AREALAND", "AREAWATER", "PM25", "MINORPCT"],
            &[&["420030101001", "1200", "10.0", "2.0", "None", ""]],
        );

        let table = normalize(&raw, &config(), "42003").unwrap();
        assert!(table.row(0)[2].is_nan());
        assert!(table.row(0)[3].is_nan());
    }
}
