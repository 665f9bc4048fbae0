//! The generic weighted group-by-aggregate primitive.

use std::collections::{BTreeMap, HashMap};

use airshed_geography_models::Crosswalk;

use crate::{AggregateError, AttributeTable};

/// Re-averages measurements from source units onto target units using
/// crosswalk weights.
///
/// For each crosswalk row joined to a measurement, every selected column
/// contributes `value x weight` to its target unit; per target, the summed
/// weighted values are divided by the summed weights. Targets never
/// reached by a source unit produce no output row; output rows are sorted
/// by target id.
///
/// A target whose summed weight is zero (e.g. zero population across all
/// contributing units) aggregates to exactly `0.0` for every column. That
/// is a documented special case of population weighting, not an error.
///
/// # Errors
///
/// Returns [`AggregateError::MissingColumn`] for an unknown value column
/// and [`AggregateError::MissingCrosswalk`] for a measured unit with no
/// crosswalk row; every measured unit must have spatial context.
pub fn reaggregate(
    table: &AttributeTable,
    crosswalk: &Crosswalk,
    target_id_column: &str,
    value_columns: &[String],
) -> Result<AttributeTable, AggregateError> {
    let mut indexes = Vec::with_capacity(value_columns.len());
    for column in value_columns {
        indexes.push(table.column_index(column).ok_or_else(|| {
            AggregateError::MissingColumn {
                column: column.clone(),
            }
        })?);
    }

    let mut by_source: HashMap<&str, Vec<(&str, f64)>> = HashMap::new();
    for row in &crosswalk.rows {
        by_source
            .entry(row.source_id.as_str())
            .or_default()
            .push((row.target_id.as_str(), row.weight));
    }

    // target id -> (weighted sums per column, weight sum)
    let mut accumulated: BTreeMap<&str, (Vec<f64>, f64)> = BTreeMap::new();
    for (row_index, id) in table.ids().iter().enumerate() {
        let targets =
            by_source
                .get(id.as_str())
                .ok_or_else(|| AggregateError::MissingCrosswalk {
                    id: id.clone(),
                })?;
        let row = table.row(row_index);
        for &(target, weight) in targets {
            let (sums, weight_sum) = accumulated
                .entry(target)
                .or_insert_with(|| (vec![0.0; indexes.len()], 0.0));
            for (slot, &column) in sums.iter_mut().zip(&indexes) {
                *slot += row[column] * weight;
            }
            *weight_sum += weight;
        }
    }

    let mut output = AttributeTable::new(target_id_column, value_columns.to_vec());
    for (target, (sums, weight_sum)) in accumulated {
        let row = if weight_sum == 0.0 {
            vec![0.0; sums.len()]
        } else {
            sums.iter().map(|sum| sum / weight_sum).collect()
        };
        output.push_row(target, row)?;
    }

    log::debug!(
        "Reaggregated {} source units onto {} target units",
        table.len(),
        output.len()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use airshed_geography_models::CrosswalkRow;

    fn row(source: &str, target: &str, weight: f64) -> CrosswalkRow {
        CrosswalkRow {
            source_id: source.to_string(),
            target_id: target.to_string(),
            weight,
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn single_source_targets_keep_the_source_value() {
        let mut table = AttributeTable::new("id", columns(&["pm25"]));
        table.push_row("a", vec![12.5]).unwrap();
        table.push_row("b", vec![30.0]).unwrap();

        let crosswalk = Crosswalk::new(vec![row("a", "t1", 4.0), row("b", "t2", 9.0)]);
        let aggregated =
            reaggregate(&table, &crosswalk, "tract", &columns(&["pm25"])).unwrap();

        assert_eq!(aggregated.ids(), ["t1", "t2"]);
        assert!((aggregated.row(0)[0] - 12.5).abs() < 1e-12);
        assert!((aggregated.row(1)[0] - 30.0).abs() < 1e-12);
    }

    #[test]
    fn equal_weights_average_to_the_midpoint() {
        let mut table = AttributeTable::new("id", columns(&["value"]));
        table.push_row("a", vec![10.0]).unwrap();
        table.push_row("b", vec![20.0]).unwrap();

        let crosswalk = Crosswalk::new(vec![row("a", "t", 3.0), row("b", "t", 3.0)]);
        let aggregated =
            reaggregate(&table, &crosswalk, "tract", &columns(&["value"])).unwrap();

        assert_eq!(aggregated.ids(), ["t"]);
        assert!((aggregated.row(0)[0] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn unequal_weights_tilt_the_mean() {
        let mut table = AttributeTable::new("id", columns(&["value"]));
        table.push_row("a", vec![10.0]).unwrap();
        table.push_row("b", vec![20.0]).unwrap();

        let crosswalk = Crosswalk::new(vec![row("a", "t", 1.0), row("b", "t", 3.0)]);
        let aggregated =
            reaggregate(&table, &crosswalk, "tract", &columns(&["value"])).unwrap();

        assert!((aggregated.row(0)[0] - 17.5).abs() < 1e-12);
    }

    #[test]
    fn zero_total_weight_aggregates_to_exactly_zero() {
        let mut table = AttributeTable::new("id", columns(&["minority_pct"]));
        table.push_row("a", vec![0.4]).unwrap();
        table.push_row("b", vec![0.9]).unwrap();

        // Population weights, both zero.
        let crosswalk = Crosswalk::new(vec![row("a", "t", 0.0), row("b", "t", 0.0)]);
        let aggregated =
            reaggregate(&table, &crosswalk, "tract", &columns(&["minority_pct"])).unwrap();

        assert_eq!(aggregated.ids(), ["t"]);
        assert!((aggregated.row(0)[0] - 0.0).abs() < f64::EPSILON);
        assert!(!aggregated.row(0)[0].is_nan());
    }

    #[test]
    fn measured_unit_without_crosswalk_row_is_named() {
        let mut table = AttributeTable::new("id", columns(&["value"]));
        table.push_row("orphan", vec![1.0]).unwrap();

        let crosswalk = Crosswalk::new(vec![row("someone_else", "t", 1.0)]);
        let err = reaggregate(&table, &crosswalk, "tract", &columns(&["value"])).unwrap_err();
        assert!(matches!(
            err,
            AggregateError::MissingCrosswalk { id } if id == "orphan"
        ));
    }

    #[test]
    fn unknown_value_column_is_an_error() {
        let table = AttributeTable::new("id", columns(&["value"]));
        let crosswalk = Crosswalk::default();
        assert!(matches!(
            reaggregate(&table, &crosswalk, "tract", &columns(&["nope"])),
            Err(AggregateError::MissingColumn { column }) if column == "nope"
        ));
    }

    #[test]
    fn source_split_across_targets_feeds_both() {
        let mut table = AttributeTable::new("id", columns(&["value"]));
        table.push_row("a", vec![10.0]).unwrap();

        let crosswalk = Crosswalk::new(vec![row("a", "t1", 2.0), row("a", "t2", 6.0)]);
        let aggregated =
            reaggregate(&table, &crosswalk, "zipcode", &columns(&["value"])).unwrap();

        // Both targets see only one source, so both equal the source value.
        assert_eq!(aggregated.ids(), ["t1", "t2"]);
        assert!((aggregated.row(0)[0] - 10.0).abs() < 1e-12);
        assert!((aggregated.row(1)[0] - 10.0).abs() < 1e-12);
    }
}
