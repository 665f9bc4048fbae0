//! Full pipeline orchestrator.
//!
//! Chains download -> normalize -> reaggregate -> cleanup steps over all
//! configured datasets. Every step is independent: a failure aborts that
//! unit of work with an error log and the run continues, so one broken
//! vintage or dataset never corrupts outputs produced elsewhere. All
//! outputs are skipped when they already exist on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use airshed_aggregate::{AttributeTable, reaggregate, tract_crosswalk};
use airshed_geography::{Partition, ingest};
use airshed_geography_models::Crosswalk;
use airshed_source::{RawTable, gazetteer, normalize, registry};
use airshed_source_models::{ArchiveKind, Granularity, YearConfig};
use airshed_spatial::{coverage_gaps, overlay};
use airshed_wprdc::{air, overdose, sensors};

type BoxError = Box<dyn std::error::Error>;

/// GeoNames postal code gazetteer for the US.
const GAZETTEER_URL: &str = "https://download.geonames.org/export/zip/US.zip";

/// TIGER 2010 boundary files for Allegheny County.
const TIGER_2010_BASE: &str =
    "https://www2.census.gov/geo/pvs/tiger2010st/42_Pennsylvania/42003";

/// Coverage tolerance for the overlay crosswalk check (fraction of a
/// source region's area).
const COVERAGE_TOLERANCE: f64 = 0.001;

/// Explicit pipeline configuration, passed at construction time so tests
/// can point at fixture directories.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory for downloaded and intermediate files.
    pub data_dir: PathBuf,
    /// Directory for final output tables.
    pub out_dir: PathBuf,
    /// GEOID prefix of the region of interest (state + county FIPS).
    pub county_prefix: String,
    /// Two-letter state abbreviation for the gazetteer subset.
    pub state: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            out_dir: PathBuf::from("out"),
            county_prefix: "42003".to_string(),
            state: "PA".to_string(),
        }
    }
}

impl PipelineConfig {
    fn data_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn out_path(&self, name: &str) -> PathBuf {
        self.out_dir.join(name)
    }
}

/// Runs the whole pipeline.
///
/// # Errors
///
/// Individual step failures are logged and isolated; an error is only
/// returned for failures outside any step.
pub async fn run(config: &PipelineConfig) -> Result<(), BoxError> {
    log::info!("airshed pipeline starting");

    if let Err(e) = fetch_wprdc(config).await {
        log::error!("WPRDC fetch failed: {e}");
    }
    if let Err(e) = prepare_gazetteer(config).await {
        log::error!("Gazetteer preparation failed: {e}");
    }
    if let Err(e) = fetch_boundaries(config).await {
        log::error!("Census boundary fetch failed: {e}");
    }

    for year_config in registry::all_years() {
        if let Err(e) = process_year(config, &year_config).await {
            log::error!("EJScreen {} failed: {e}", year_config.year);
        }
    }

    // The block group -> ZIP crosswalk is year-independent; build it once
    // and reuse it for every vintage.
    let zip_crosswalk = match build_zip_crosswalk(config) {
        Ok(crosswalk) => Some(crosswalk),
        Err(e) => {
            log::error!("ZIP overlay failed: {e}");
            None
        }
    };

    for year_config in registry::all_years() {
        if let Err(e) = aggregate_year(config, &year_config, zip_crosswalk.as_ref()) {
            log::error!("Aggregation for {} failed: {e}", year_config.year);
        }
    }

    if let Err(e) = resolve_overdose_sites(config) {
        log::error!("Overdose site resolution failed: {e}");
    }
    if let Err(e) = pivot_daily_air(config) {
        log::error!("Daily air pivot failed: {e}");
    }

    log::info!("airshed pipeline finished");
    Ok(())
}

/// Downloads every registered WPRDC dump that is not already on disk.
async fn fetch_wprdc(config: &PipelineConfig) -> Result<(), BoxError> {
    let registry = airshed_wprdc::datasets();
    for dataset in &registry.csv {
        let dest = config.data_path(&format!("{}.csv", dataset.name));
        if let Err(e) = airshed_download::fetch(&dataset.url, &dest).await {
            log::error!("Download of {} failed: {e}", dataset.name);
        }
    }
    for dataset in &registry.geojson {
        let dest = config.data_path(&format!("{}.geojson", dataset.name));
        if let Err(e) = airshed_download::fetch(&dataset.url, &dest).await {
            log::error!("Download of {} failed: {e}", dataset.name);
        }
    }
    Ok(())
}

/// Fetches the GeoNames gazetteer and materializes the state-subset
/// `zip2latlon.csv`.
async fn prepare_gazetteer(config: &PipelineConfig) -> Result<(), BoxError> {
    let zip_latlon = config.data_path("zip2latlon.csv");
    if zip_latlon.exists() {
        log::info!("Skipping gazetteer, {} exists", zip_latlon.display());
        return Ok(());
    }

    let archive = config.data_path("US.zip");
    let dump = config.data_path("US.txt");
    if !dump.exists() {
        airshed_download::fetch(GAZETTEER_URL, &archive).await?;
        airshed_download::extract_zip(&archive, &config.data_dir)?;
    }

    let locations = gazetteer::read_gazetteer(&dump)?;
    let in_state = gazetteer::filter_state(&locations, &config.state);
    gazetteer::write_zip_latlon(&in_state, &zip_latlon)?;
    Ok(())
}

/// Fetches the TIGER 2010 tract and block group shapefiles.
async fn fetch_boundaries(config: &PipelineConfig) -> Result<(), BoxError> {
    for (name, dir_name) in [("tract10", "tract_2010"), ("bg10", "bg_2010")] {
        let stem = format!("tl_2010_{}_{name}", config.county_prefix);
        let dir = config.data_path(dir_name);
        if dir.join(format!("{stem}.shp")).exists() {
            log::info!("Skipping {stem}, already extracted");
            continue;
        }
        let archive = config.data_path(&format!("{stem}.zip"));
        airshed_download::fetch(&format!("{TIGER_2010_BASE}/{stem}.zip"), &archive).await?;
        airshed_download::extract_zip(&archive, &dir)?;
    }
    Ok(())
}

/// Downloads, extracts, and normalizes one EJScreen vintage down to the
/// county subset.
async fn process_year(config: &PipelineConfig, year: &YearConfig) -> Result<(), BoxError> {
    let ej_dir = config.data_path("epa_ej");
    let data_file = ej_dir.join(year.data_filename());
    if data_file.exists() {
        log::info!("Skipping {}, already downloaded", year.year);
        return Ok(());
    }

    let download_path = ej_dir.join(year.download_filename());
    let orig_csv = ej_dir.join(&year.csv_name);
    if !orig_csv.exists() {
        airshed_download::fetch(&year.url, &download_path).await?;
        if year.archive == ArchiveKind::Zip {
            airshed_download::extract_zip(&download_path, &ej_dir)?;
        }
    }

    let raw = RawTable::from_csv_path(&orig_csv)?;
    let table = normalize(&raw, year, &config.county_prefix)?;
    table.to_csv_path(&data_file)?;

    // The national files are large; drop them once the county subset is
    // materialized.
    airshed_download::remove_intermediates(&[download_path.as_path(), orig_csv.as_path()])?;
    Ok(())
}

/// Builds the block group -> ZIP code overlap crosswalk and reports
/// coverage gaps.
fn build_zip_crosswalk(config: &PipelineConfig) -> Result<Crosswalk, BoxError> {
    let block_groups = load_block_groups(config)?;
    let zips = ingest::from_geojson_path(&config.data_path("zipcodes.geojson"), "ZIP")?;

    let crosswalk = overlay(&block_groups, &zips)?;

    // Block groups on the county edge can fall partly outside the ZIP
    // partition and lose area silently; make the loss visible.
    let gaps = coverage_gaps(&crosswalk, &block_groups, COVERAGE_TOLERANCE)?;
    for gap in &gaps {
        log::warn!(
            "Block group {} covers {:.0} of {:.0} m^2 in the ZIP crosswalk",
            gap.source_id,
            gap.covered_area,
            gap.region_area
        );
    }

    Ok(crosswalk)
}

/// Loads the block group partition from the TIGER shapefile.
fn load_block_groups(config: &PipelineConfig) -> Result<Partition, BoxError> {
    let stem = format!("tl_2010_{}_bg10", config.county_prefix);
    let path = config.data_path("bg_2010").join(format!("{stem}.shp"));
    Ok(ingest::from_shapefile_path(&path, "GEOID10")?)
}

/// Reaggregates one vintage onto tracts and ZIP codes.
fn aggregate_year(
    config: &PipelineConfig,
    year: &YearConfig,
    zip_crosswalk: Option<&Crosswalk>,
) -> Result<(), BoxError> {
    let data_file = config.data_path("epa_ej").join(year.data_filename());
    if !data_file.exists() {
        log::info!("No normalized file for {}, skipping aggregation", year.year);
        return Ok(());
    }
    if year.granularity == Granularity::Tract {
        log::info!(
            "{} is published at tract level; no reaggregation needed",
            year.year
        );
        return Ok(());
    }

    let table = AttributeTable::from_csv_path(&data_file, "id")?;

    let by_tract = config.out_path(&format!("ej_by_tract_{}.csv", year.year));
    if by_tract.exists() {
        log::info!("Skipping {}, already aggregated", by_tract.display());
    } else {
        // Substances average by area; demographics by population, so that
        // an empty block group cannot tilt a tract's demographic profile.
        let area_weights = tract_crosswalk(&table, "area")?;
        let substances = reaggregate(&table, &area_weights, "tract", &year.substances)?;

        let population_weights = tract_crosswalk(&table, "total_population")?;
        let demographics =
            reaggregate(&table, &population_weights, "tract", &year.demographics)?;

        substances.join(&demographics)?.to_csv_path(&by_tract)?;
        log::info!("Wrote {}", by_tract.display());
    }

    let by_zip = config.out_path(&format!("ej_by_zip_{}.csv", year.year));
    if by_zip.exists() {
        log::info!("Skipping {}, already aggregated", by_zip.display());
    } else if let Some(crosswalk) = zip_crosswalk {
        let mut columns = year.substances.clone();
        columns.extend(year.demographics.iter().cloned());
        reaggregate(&table, crosswalk, "zipcode", &columns)?.to_csv_path(&by_zip)?;
        log::info!("Wrote {}", by_zip.display());
    } else {
        log::warn!("No ZIP crosswalk; skipping {}", by_zip.display());
    }

    Ok(())
}

/// Cleans the overdose table, joins ZIP centroids, and resolves the
/// nearest enabled sensor per case.
fn resolve_overdose_sites(config: &PipelineConfig) -> Result<(), BoxError> {
    let out = config.out_path("overdose_sites.csv");
    if out.exists() {
        log::info!("Skipping {}, already resolved", out.display());
        return Ok(());
    }

    let all_sensors = sensors::read_sensors(&config.data_path("air_sensors.csv"))?;
    let points = sensors::site_points(&all_sensors)?;

    let cases = overdose::read_overdoses(&config.data_path("accidental_overdose.csv"))?;

    let locations = gazetteer::read_gazetteer(&config.data_path("US.txt"))?;
    let mut centroids: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for location in gazetteer::filter_state(&locations, &config.state) {
        centroids
            .entry(location.zipcode)
            .or_insert((location.latitude, location.longitude));
    }

    let located = overdose::with_locations(cases, &centroids);
    let nearest = overdose::nearest_sensors(&located, &points)?;

    write_overdose_sites(&out, &located, &nearest)?;
    log::info!("Wrote {}", out.display());
    Ok(())
}

/// Writes the per-case nearest-sensor table.
fn write_overdose_sites(
    path: &Path,
    located: &[overdose::LocatedCase],
    nearest: &[Option<airshed_spatial::NearestSite>],
) -> Result<(), BoxError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "date",
        "zipcode",
        "latitude",
        "longitude",
        "nearest_site",
        "distance_miles",
    ])?;

    for (case, site) in located.iter().zip(nearest) {
        let (latitude, longitude) = case
            .location
            .map_or((String::new(), String::new()), |(lat, lon)| {
                (lat.to_string(), lon.to_string())
            });
        let (site_id, distance) = site.as_ref().map_or_else(
            || (String::new(), String::new()),
            |nearest| (nearest.site_id.clone(), nearest.distance_miles.to_string()),
        );
        writer.write_record([
            case.case.date.to_string(),
            case.case.zipcode.clone().unwrap_or_default(),
            latitude,
            longitude,
            site_id,
            distance,
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Pivots the daily AQI feed into a date x site PM2.5 table.
fn pivot_daily_air(config: &PipelineConfig) -> Result<(), BoxError> {
    let out = config.out_path("pm25_by_site.csv");
    if out.exists() {
        log::info!("Skipping {}, already pivoted", out.display());
        return Ok(());
    }

    let readings = air::read_daily_air(&config.data_path("daily_air_quality.csv"))?;
    let series = air::by_site(&readings, air::PM25)?;
    series.to_csv_path(&out)?;
    log::info!("Wrote {}", out.display());
    Ok(())
}
