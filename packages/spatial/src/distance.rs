//! Great-circle distance and nearest-site assignment.
//!
//! Sensor networks here are tiny (tens of sites) while query sets are
//! thousands of points, so the resolver is a plain O(sites x points) scan.
//! No spatial index; adding one must not change output.

use crate::SpatialError;

/// Earth radius in miles used by the haversine formula.
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// A named point location, e.g. an air quality sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SitePoint {
    /// Site identifier.
    pub id: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// The resolved nearest site for one query point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestSite {
    /// Identifier of the nearest site.
    pub site_id: String,
    /// Great-circle distance to it in miles.
    pub distance_miles: f64,
}

/// Great-circle distance in miles between two points, via the haversine
/// formula.
#[must_use]
pub fn haversine_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_MILES * a.sqrt().asin()
}

/// Assigns each query point `(latitude, longitude)` to its nearest site.
///
/// Sites are scanned in slice order and a site only replaces the current
/// best on a strictly smaller distance, so equal distances keep the
/// earlier-encountered site. The site slice order is the canonical
/// tie-break order.
///
/// # Errors
///
/// Returns [`SpatialError::NoSites`] for an empty site list and
/// [`SpatialError::MissingSiteLocation`] if any site has a non-finite
/// coordinate.
pub fn closest_site(
    queries: &[(f64, f64)],
    sites: &[SitePoint],
) -> Result<Vec<NearestSite>, SpatialError> {
    if sites.is_empty() {
        return Err(SpatialError::NoSites);
    }
    for site in sites {
        if !site.latitude.is_finite() || !site.longitude.is_finite() {
            return Err(SpatialError::MissingSiteLocation {
                id: site.id.clone(),
            });
        }
    }

    let mut resolved = Vec::with_capacity(queries.len());
    for &(lat, lon) in queries {
        let mut best: Option<NearestSite> = None;
        for site in sites {
            let distance = haversine_miles(lat, lon, site.latitude, site.longitude);
            let closer = best
                .as_ref()
                .is_none_or(|current| distance < current.distance_miles);
            if closer {
                best = Some(NearestSite {
                    site_id: site.id.clone(),
                    distance_miles: distance,
                });
            }
        }
        // sites is non-empty, so best is always set.
        if let Some(nearest) = best {
            resolved.push(nearest);
        }
    }
    Ok(resolved)
}
