//! Polygon overlay between two spatial partitions.
//!
//! Produces the overlap crosswalk that drives areal reaggregation: one row
//! per intersecting (source, target) pair, weighted by intersection area in
//! the equal-area CRS. Target regions are indexed in an R-tree so each
//! source region only tests candidates whose bounding boxes intersect.

use airshed_geography::Partition;
use airshed_geography_models::{Crosswalk, CrosswalkRow};
use geo::{Area as _, BooleanOps as _, BoundingRect as _, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

use crate::{EqualAreaProjection, SpatialError};

/// A projected target region stored in the R-tree.
struct TargetEntry {
    id: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for TargetEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Intersects two partitions and records the overlap area of every
/// non-empty intersecting pair.
///
/// Both partitions are reprojected to EPSG:5070 before intersection. A
/// source region with zero overlap with any target contributes no rows;
/// use [`coverage_gaps`] to surface that loss. Rows come back sorted by
/// `(source_id, target_id)`, so the result does not depend on R-tree
/// iteration order.
///
/// # Errors
///
/// Returns an error if the projection cannot be built or any region fails
/// to reproject.
pub fn overlay(source: &Partition, target: &Partition) -> Result<Crosswalk, SpatialError> {
    let projection = EqualAreaProjection::conus_albers()?;

    let mut entries = Vec::with_capacity(target.regions.len());
    for region in &target.regions {
        let polygon = projection.project_polygon(&region.polygon)?;
        entries.push(TargetEntry {
            id: region.id.clone(),
            envelope: polygon_envelope(&polygon),
            polygon,
        });
    }
    let tree = RTree::bulk_load(entries);

    let mut rows = Vec::new();
    for region in &source.regions {
        let projected = projection.project_polygon(&region.polygon)?;
        let envelope = polygon_envelope(&projected);

        for entry in tree.locate_in_envelope_intersecting(&envelope) {
            let area = projected.intersection(&entry.polygon).unsigned_area();
            if area > 0.0 {
                rows.push(CrosswalkRow {
                    source_id: region.id.clone(),
                    target_id: entry.id.clone(),
                    weight: area,
                });
            }
        }
    }

    let crosswalk = Crosswalk::new(rows);
    log::info!(
        "Overlay produced {} rows from {} source x {} target regions",
        crosswalk.len(),
        source.len(),
        target.len()
    );
    Ok(crosswalk)
}

/// A source region whose crosswalk coverage deviates from its own area.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageGap {
    /// Source region id.
    pub source_id: String,
    /// Region area in the equal-area CRS (square meters).
    pub region_area: f64,
    /// Summed overlap area attributed to the region in the crosswalk.
    pub covered_area: f64,
}

/// Checks crosswalk coverage against source region areas.
///
/// For a complete overlay, the summed overlap areas of each source region
/// equal its own area up to geometric precision. Regions deviating by more
/// than `tolerance` (a fraction, e.g. `0.001`) are returned, including
/// regions dropped entirely because they fell outside the target
/// partition.
///
/// # Errors
///
/// Returns an error if the projection cannot be built or a region fails to
/// reproject.
pub fn coverage_gaps(
    crosswalk: &Crosswalk,
    source: &Partition,
    tolerance: f64,
) -> Result<Vec<CoverageGap>, SpatialError> {
    let mut covered = std::collections::BTreeMap::new();
    for row in &crosswalk.rows {
        *covered.entry(row.source_id.as_str()).or_insert(0.0) += row.weight;
    }

    let projection = EqualAreaProjection::conus_albers()?;
    let mut gaps = Vec::new();
    for region in &source.regions {
        let region_area = projection
            .project_polygon(&region.polygon)?
            .unsigned_area();
        if region_area <= 0.0 {
            continue;
        }
        let covered_area = covered.get(region.id.as_str()).copied().unwrap_or(0.0);
        if ((region_area - covered_area) / region_area).abs() > tolerance {
            gaps.push(CoverageGap {
                source_id: region.id.clone(),
                region_area,
                covered_area,
            });
        }
    }
    Ok(gaps)
}

/// Bounding box envelope for a projected polygon.
fn polygon_envelope(polygon: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    polygon.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use airshed_geography::Region;
    use geo::polygon;

    /// A geographic rectangle near Pittsburgh spanning `(x0, y0)` to
    /// `(x1, y1)` in degree offsets from (-80.0, 40.4).
    fn rect(id: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> Region {
        let (x0, x1) = (-80.0 + x0, -80.0 + x1);
        let (y0, y1) = (40.4 + y0, 40.4 + y1);
        Region {
            id: id.to_string(),
            polygon: MultiPolygon(vec![polygon![
                (x: x0, y: y0),
                (x: x1, y: y0),
                (x: x1, y: y1),
                (x: x0, y: y1),
            ]]),
        }
    }

    #[test]
    fn covered_sources_have_no_gaps() {
        let source = Partition::new(vec![
            rect("bg1", 0.0, 0.0, 0.01, 0.01),
            rect("bg2", 0.01, 0.0, 0.02, 0.01),
        ])
        .unwrap();
        // One target spanning both source squares.
        let target = Partition::new(vec![rect("zip", 0.0, 0.0, 0.02, 0.01)]).unwrap();

        let crosswalk = overlay(&source, &target).unwrap();
        assert_eq!(crosswalk.len(), 2);

        let gaps = coverage_gaps(&crosswalk, &source, 0.001).unwrap();
        assert!(gaps.is_empty(), "unexpected gaps: {gaps:?}");
    }

    #[test]
    fn split_source_weights_both_targets() {
        let source = Partition::new(vec![rect("bg", 0.0, 0.0, 0.02, 0.01)]).unwrap();
        // Two targets, each covering one half of the source rectangle.
        let target = Partition::new(vec![
            rect("west", 0.0, 0.0, 0.01, 0.01),
            rect("east", 0.01, 0.0, 0.02, 0.01),
        ])
        .unwrap();

        let crosswalk = overlay(&source, &target).unwrap();
        assert_eq!(crosswalk.len(), 2);

        let total = crosswalk.source_weight("bg");
        let west = crosswalk
            .rows
            .iter()
            .find(|row| row.target_id == "west")
            .unwrap()
            .weight;
        // Each half carries about half the weight.
        assert!(
            (west / total - 0.5).abs() < 0.01,
            "west share = {}",
            west / total
        );

        let gaps = coverage_gaps(&crosswalk, &source, 0.001).unwrap();
        assert!(gaps.is_empty(), "unexpected gaps: {gaps:?}");
    }

    #[test]
    fn disjoint_source_is_silently_dropped_but_flagged() {
        let source = Partition::new(vec![
            rect("inside", 0.0, 0.0, 0.01, 0.01),
            rect("outside", 0.5, 0.5, 0.51, 0.51),
        ])
        .unwrap();
        let target = Partition::new(vec![rect("zip", 0.0, 0.0, 0.01, 0.01)]).unwrap();

        let crosswalk = overlay(&source, &target).unwrap();
        assert_eq!(crosswalk.len(), 1);
        assert_eq!(crosswalk.rows[0].source_id, "inside");

        let gaps = coverage_gaps(&crosswalk, &source, 0.001).unwrap();
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].source_id, "outside");
        assert!((gaps[0].covered_area - 0.0).abs() < f64::EPSILON);
    }
}
