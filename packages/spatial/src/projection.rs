//! Geographic-to-planar reprojection using pure Rust (proj4rs +
//! crs-definitions).
//!
//! Overlay areas are computed in NAD83 / CONUS Albers (EPSG:5070), an
//! equal-area projection covering the continental US. Intersecting in
//! geographic coordinates would weight high-latitude regions incorrectly.

use geo::{Coord, MapCoords as _, MultiPolygon};
use proj4rs::proj::Proj;

use crate::SpatialError;

/// EPSG code for geographic WGS84 coordinates (lon/lat degrees).
const GEOGRAPHIC_EPSG: u16 = 4326;

/// EPSG code for NAD83 / CONUS Albers, the equal-area CRS used for all
/// overlap area computations.
const EQUAL_AREA_EPSG: u16 = 5070;

/// A reusable transform from geographic coordinates to an equal-area
/// planar CRS.
pub struct EqualAreaProjection {
    source: Proj,
    target: Proj,
}

impl EqualAreaProjection {
    /// Builds the EPSG:4326 -> EPSG:5070 transform.
    ///
    /// # Errors
    ///
    /// Returns an error if either CRS definition is missing from the
    /// database or fails to parse.
    pub fn conus_albers() -> Result<Self, SpatialError> {
        Ok(Self {
            source: proj_for_epsg(GEOGRAPHIC_EPSG)?,
            target: proj_for_epsg(EQUAL_AREA_EPSG)?,
        })
    }

    /// Projects a single geographic point (degrees) into planar meters.
    ///
    /// # Errors
    ///
    /// Returns an error if the coordinate cannot be transformed.
    pub fn project_point(&self, lon: f64, lat: f64) -> Result<(f64, f64), SpatialError> {
        // proj4rs uses radians for geographic coordinates.
        let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
        proj4rs::transform::transform(&self.source, &self.target, &mut point)
            .map_err(|e| SpatialError::Projection(format!("({lon}, {lat}): {e:?}")))?;
        Ok((point.0, point.1))
    }

    /// Projects every coordinate of a polygon into the planar CRS.
    ///
    /// # Errors
    ///
    /// Returns an error if any coordinate cannot be transformed.
    pub fn project_polygon(
        &self,
        polygon: &MultiPolygon<f64>,
    ) -> Result<MultiPolygon<f64>, SpatialError> {
        polygon.try_map_coords(|coord: Coord<f64>| {
            let (x, y) = self.project_point(coord.x, coord.y)?;
            Ok(Coord { x, y })
        })
    }
}

/// Looks up an EPSG code in the crs-definitions database and builds a
/// [`Proj`] from its proj4 string.
fn proj_for_epsg(epsg: u16) -> Result<Proj, SpatialError> {
    let def = crs_definitions::from_code(epsg).ok_or(SpatialError::UnsupportedCrs { epsg })?;
    Proj::from_proj_string(def.proj4)
        .map_err(|e| SpatialError::Projection(format!("EPSG:{epsg}: {e:?}")))
}
