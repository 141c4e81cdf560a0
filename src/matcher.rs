//! RegistrantMatcher - Identifier Resolution
//!
//! Resolves a parsed identifier to a registrant from the current directory
//! snapshot using priority-ordered key comparisons: a primary-id match always
//! wins over a secondary-id match, regardless of snapshot position. Ties
//! within a pass resolve to the first registrant in snapshot order.

use crate::directory::Registrant;
use crate::identifier::normalize;

/// Find the registrant a parsed identifier refers to.
///
/// Returns `None` when nothing matches; the caller surfaces that as a
/// non-fatal not-found condition.
pub fn find_registrant<'a>(parsed: &str, snapshot: &'a [Registrant]) -> Option<&'a Registrant> {
    let target = normalize(parsed);
    if target.is_empty() {
        return None;
    }

    // First pass: primary ids only.
    if let Some(found) = snapshot
        .iter()
        .find(|r| !r.primary_id.is_empty() && normalize(&r.primary_id) == target)
    {
        return Some(found);
    }

    // Second pass: any secondary id.
    snapshot
        .iter()
        .find(|r| r.secondary_ids.iter().any(|id| normalize(id) == target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registrant(key: &str, primary: &str, secondary: &[&str]) -> Registrant {
        Registrant {
            key: key.to_string(),
            primary_id: primary.to_string(),
            secondary_ids: secondary.iter().map(|s| s.to_string()).collect(),
            display_name: format!("Registrant {}", key),
            group_tag: None,
        }
    }

    #[test]
    fn test_matches_primary_id_ignoring_formatting() {
        let snapshot = vec![registrant("m1", "2025-001", &[])];
        assert_eq!(
            find_registrant("2025001", &snapshot).map(|r| r.key.as_str()),
            Some("m1")
        );
        assert_eq!(
            find_registrant("2025 001", &snapshot).map(|r| r.key.as_str()),
            Some("m1")
        );
    }

    #[test]
    fn test_primary_match_beats_earlier_secondary_match() {
        // The secondary-only holder appears first in the snapshot; the
        // primary holder must still win.
        let snapshot = vec![
            registrant("alias-holder", "2024-900", &["2025-001"]),
            registrant("owner", "2025-001", &[]),
        ];
        assert_eq!(
            find_registrant("2025-001", &snapshot).map(|r| r.key.as_str()),
            Some("owner")
        );
    }

    #[test]
    fn test_secondary_ids_match_when_no_primary_does() {
        let snapshot = vec![registrant("m1", "2024-900", &["0012345", "C-88"])];
        assert_eq!(
            find_registrant("c88", &snapshot).map(|r| r.key.as_str()),
            Some("m1")
        );
    }

    #[test]
    fn test_ties_resolve_to_snapshot_order() {
        let snapshot = vec![
            registrant("first", "2025-001", &[]),
            registrant("second", "2025-001", &[]),
        ];
        assert_eq!(
            find_registrant("2025-001", &snapshot).map(|r| r.key.as_str()),
            Some("first")
        );
    }

    #[test]
    fn test_no_match_and_empty_input() {
        let snapshot = vec![registrant("m1", "2025-001", &[])];
        assert!(find_registrant("9999-999", &snapshot).is_none());
        assert!(find_registrant("", &snapshot).is_none());
        assert!(find_registrant("---", &snapshot).is_none());
    }
}
