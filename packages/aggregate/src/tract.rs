//! Same-partition refinement crosswalk: block group to census tract.
//!
//! Block groups nest inside tracts, so no geometric overlay is needed:
//! the tract GEOID is the block group GEOID minus its final digit, and the
//! weight comes straight from a table column (area or population).

use airshed_geography_models::{Crosswalk, CrosswalkRow, geoid};

use crate::{AggregateError, AttributeTable};

/// Builds a block group -> tract crosswalk from the measurement table
/// itself, weighting by the named column.
///
/// # Errors
///
/// Returns [`AggregateError::MissingColumn`] if the weight column is
/// absent and [`AggregateError::UntruncatableId`] for a unit id too short
/// to carry a tract prefix.
pub fn tract_crosswalk(
    table: &AttributeTable,
    weight_column: &str,
) -> Result<Crosswalk, AggregateError> {
    let weights = table.column_values(weight_column)?;

    let mut rows = Vec::with_capacity(table.len());
    for (id, weight) in table.ids().iter().zip(weights) {
        let tract = geoid::tract_geoid(id).ok_or_else(|| AggregateError::UntruncatableId {
            id: id.clone(),
        })?;
        rows.push(CrosswalkRow {
            source_id: id.clone(),
            target_id: tract.to_string(),
            weight,
        });
    }
    Ok(Crosswalk::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaggregate;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn truncation_round_trip() {
        let mut table = AttributeTable::new("id", columns(&["area", "pm25"]));
        table.push_row("420030101001", vec![1.0, 10.0]).unwrap();
        table.push_row("420030101002", vec![3.0, 20.0]).unwrap();
        table.push_row("420030102001", vec![2.0, 40.0]).unwrap();

        let crosswalk = tract_crosswalk(&table, "area").unwrap();
        let aggregated =
            reaggregate(&table, &crosswalk, "tract", &columns(&["pm25"])).unwrap();

        // Re-deriving tract ids from the constituent block groups matches
        // the output ids exactly.
        let expected: std::collections::BTreeSet<&str> = table
            .ids()
            .iter()
            .map(|id| geoid::tract_geoid(id).unwrap())
            .collect();
        let got: std::collections::BTreeSet<&str> =
            aggregated.ids().iter().map(String::as_str).collect();
        assert_eq!(got, expected);

        // 0101: (10*1 + 20*3) / 4 = 17.5; 0102: single block group.
        let tract_0101 = aggregated.ids().iter().position(|id| id == "42003010100");
        let tract_0102 = aggregated.ids().iter().position(|id| id == "42003010200");
        assert!((aggregated.row(tract_0101.unwrap())[0] - 17.5).abs() < 1e-12);
        assert!((aggregated.row(tract_0102.unwrap())[0] - 40.0).abs() < 1e-12);
    }

    #[test]
    fn short_id_is_an_error() {
        let mut table = AttributeTable::new("id", columns(&["area"]));
        table.push_row("4", vec![1.0]).unwrap();
        assert!(matches!(
            tract_crosswalk(&table, "area"),
            Err(AggregateError::UntruncatableId { id }) if id == "4"
        ));
    }

    #[test]
    fn missing_weight_column_is_an_error() {
        let table = AttributeTable::new("id", columns(&["area"]));
        assert!(matches!(
            tract_crosswalk(&table, "total_population"),
            Err(AggregateError::MissingColumn { column }) if column == "total_population"
        ));
    }
}
