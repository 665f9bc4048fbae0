//! Census GEOID string utilities.
//!
//! GEOIDs nest by prefix: state FIPS (2 digits) + county FIPS (3 digits) +
//! tract code (6 digits) + block group digit (1 digit). Deriving a coarser
//! unit from a finer one is always a prefix truncation.

/// Length of a full block group GEOID (state + county + tract + block group).
pub const BLOCK_GROUP_GEOID_LEN: usize = 12;

/// Length of a census tract GEOID (state + county + tract).
pub const TRACT_GEOID_LEN: usize = 11;

/// Derives the tract GEOID from a block group GEOID by dropping the final
/// block group digit.
///
/// Returns `None` for ids too short to contain a tract prefix.
#[must_use]
pub fn tract_geoid(block_group_geoid: &str) -> Option<&str> {
    if block_group_geoid.len() >= 2 {
        Some(&block_group_geoid[..block_group_geoid.len() - 1])
    } else {
        None
    }
}

/// Derives the county GEOID (state + county FIPS, 5 digits) from any
/// nested GEOID.
#[must_use]
pub fn county_geoid(geoid: &str) -> Option<&str> {
    if geoid.len() >= 5 {
        Some(&geoid[..5])
    } else {
        None
    }
}

/// Derives the two-digit state FIPS code from any nested GEOID.
#[must_use]
pub fn state_fips(geoid: &str) -> Option<&str> {
    if geoid.len() >= 2 {
        Some(&geoid[..2])
    } else {
        None
    }
}

/// Whether a GEOID falls inside the region identified by `prefix`
/// (e.g. `"42003"` for Allegheny County).
#[must_use]
pub fn in_region(geoid: &str, prefix: &str) -> bool {
    geoid.starts_with(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tract_is_block_group_minus_last_digit() {
        assert_eq!(tract_geoid("420031234567"), Some("42003123456"));
        assert_eq!(tract_geoid("420031234567").unwrap().len(), TRACT_GEOID_LEN);
    }

    #[test]
    fn tract_of_short_id_is_none() {
        assert_eq!(tract_geoid("4"), None);
        assert_eq!(tract_geoid(""), None);
    }

    #[test]
    fn county_and_state_prefixes() {
        assert_eq!(county_geoid("420031234567"), Some("42003"));
        assert_eq!(state_fips("420031234567"), Some("42"));
        assert_eq!(county_geoid("4200"), None);
    }

    #[test]
    fn region_membership() {
        assert!(in_region("420031234567", "42003"));
        assert!(!in_region("420071234567", "42003"));
    }

    #[test]
    fn block_group_len_is_tract_plus_one() {
        assert_eq!(BLOCK_GROUP_GEOID_LEN, TRACT_GEOID_LEN + 1);
    }
}
