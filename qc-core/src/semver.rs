//! Numeric semver comparison for `schema_version` strings (spec §4.2).
//!
//! Ordering is per-component and numeric, never lexical: `1.2.19 > 1.2.9`.

/// Parse `vX.Y.Z` (a leading `v` is tolerated) into a zero-padded numeric
/// triplet. Missing trailing components default to 0.
pub fn parse(version: &str) -> Option<(u64, u64, u64)> {
    let v = version.trim().trim_start_matches(['v', 'V']);
    let mut parts = v.splitn(3, '.');
    let major: u64 = parts.next()?.parse().ok()?;
    let minor: u64 = parts.next().unwrap_or("0").parse().ok()?;
    let patch: u64 = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor, patch))
}

/// `true` if `a` is strictly greater than `b`. Falls back to `false` (not
/// greater) if either string fails to parse — callers treat unparsable
/// versions as a validation error before reaching here.
pub fn is_greater(a: &str, b: &str) -> bool {
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    }
}

pub fn compare(a: &str, b: &str) -> std::cmp::Ordering {
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => std::cmp::Ordering::Equal,
    }
}

/// The next patch version, used by the Drift Detector (C7) when proposing a
/// new version for a changed **Existing** table. Falls back to appending
/// `.<timestamp>` if the input isn't standard semver.
pub fn next_patch(version: &str, fallback_timestamp: i64) -> String {
    match parse(version) {
        Some((major, minor, patch)) => format!("{}.{}.{}", major, minor, patch + 1),
        None => format!("{}.{}", version, fallback_timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_not_lexical() {
        assert!(is_greater("1.2.19", "1.2.9"));
    }

    #[test]
    fn pads_missing_tail_components() {
        assert_eq!(parse("1.2"), Some((1, 2, 0)));
        assert_eq!(parse("1"), Some((1, 0, 0)));
    }

    #[test]
    fn equal_versions_are_not_greater() {
        assert!(!is_greater("1.0.0", "1.0.0"));
    }

    #[test]
    fn next_patch_increments_patch_component() {
        assert_eq!(next_patch("1.2.0", 0), "1.2.1");
    }

    #[test]
    fn next_patch_falls_back_for_non_semver() {
        assert_eq!(next_patch("not-a-version", 1700000000), "not-a-version.1700000000");
    }

    #[test]
    fn tolerates_leading_v() {
        assert_eq!(parse("v2.3.4"), Some((2, 3, 4)));
    }
}
