//! Ordering rules for the registry list.
//!
//! Auto-sync records come first, then the rest; order within each group is
//! whatever the user last arranged.

use super::{RegistryError, TrackedRepository};

/// Stable partition: auto-sync records first
pub fn group_by_auto_sync(records: &mut [TrackedRepository]) {
    records.sort_by_key(|record| !record.auto_sync());
}

/// Set `changed_id`'s flag and return the regrouped list.
///
/// A record whose flag actually flips goes to the end of its new group;
/// everything else keeps its relative order.
pub fn reorder(
    mut records: Vec<TrackedRepository>,
    changed_id: &str,
    new_value: bool,
) -> Vec<TrackedRepository> {
    let Some(index) = records.iter().position(|r| r.identity == changed_id) else {
        group_by_auto_sync(&mut records);
        return records;
    };

    let flipped = records[index].auto_sync() != new_value;
    records[index].auto_sync = Some(new_value);
    group_by_auto_sync(&mut records);

    if flipped {
        let index = records
            .iter()
            .position(|r| r.identity == changed_id)
            .unwrap_or_default();
        let record = records.remove(index);
        let insert_at = if new_value {
            records.iter().take_while(|r| r.auto_sync()).count()
        } else {
            records.len()
        };
        records.insert(insert_at, record);
    }

    records
}

/// Put `source` where `target` currently sits. Both must be in the same
/// auto-sync group. Returns `false` when nothing moved.
pub fn move_within_group(
    records: &mut Vec<TrackedRepository>,
    source: &str,
    target: &str,
) -> Result<bool, RegistryError> {
    let position = |identity: &str| {
        records
            .iter()
            .position(|r| r.identity == identity)
            .ok_or_else(|| RegistryError::UnknownRepository(identity.to_string()))
    };
    let source_index = position(source)?;
    let target_index = position(target)?;

    if records[source_index].auto_sync() != records[target_index].auto_sync() {
        return Err(RegistryError::CrossGroupMove {
            source_id: source.to_string(),
            target_id: target.to_string(),
        });
    }
    if source_index == target_index {
        return Ok(false);
    }

    let record = records.remove(source_index);
    records.insert(target_index, record);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(identity: &str, auto_sync: bool) -> TrackedRepository {
        TrackedRepository::new(identity, format!("/repos/{identity}")).with_auto_sync(auto_sync)
    }

    fn identities(records: &[TrackedRepository]) -> Vec<&str> {
        records.iter().map(|r| r.identity.as_str()).collect()
    }

    fn sample() -> Vec<TrackedRepository> {
        vec![
            record("a/one", true),
            record("a/two", true),
            record("a/three", false),
            record("a/four", false),
        ]
    }

    #[test]
    fn test_enable_goes_to_end_of_enabled_group() {
        let records = reorder(sample(), "a/four", true);
        assert_eq!(identities(&records), vec!["a/one", "a/two", "a/four", "a/three"]);
        assert!(records[2].auto_sync());
    }

    #[test]
    fn test_disable_goes_to_end_of_list() {
        let records = reorder(sample(), "a/one", false);
        assert_eq!(identities(&records), vec!["a/two", "a/three", "a/four", "a/one"]);
    }

    #[test]
    fn test_unchanged_value_only_regroups() {
        let mut shuffled = sample();
        shuffled.swap(1, 2);
        let records = reorder(shuffled, "a/one", true);
        assert_eq!(identities(&records), vec!["a/one", "a/two", "a/three", "a/four"]);
    }

    #[test]
    fn test_grouping_is_stable() {
        let mut records = vec![
            record("x/1", false),
            record("x/2", true),
            record("x/3", false),
            record("x/4", true),
        ];
        group_by_auto_sync(&mut records);
        assert_eq!(identities(&records), vec!["x/2", "x/4", "x/1", "x/3"]);
    }

    #[test]
    fn test_move_within_group() {
        let mut records = sample();
        assert!(move_within_group(&mut records, "a/two", "a/one").unwrap());
        assert_eq!(identities(&records), vec!["a/two", "a/one", "a/three", "a/four"]);

        assert!(move_within_group(&mut records, "a/three", "a/four").unwrap());
        assert_eq!(identities(&records), vec!["a/two", "a/one", "a/four", "a/three"]);

        assert!(!move_within_group(&mut records, "a/one", "a/one").unwrap());
    }

    #[test]
    fn test_move_across_groups_is_rejected() {
        let mut records = sample();
        let err = move_within_group(&mut records, "a/one", "a/four").unwrap_err();
        assert!(matches!(err, RegistryError::CrossGroupMove { .. }));
        assert_eq!(identities(&records), identities(&sample()));
    }

    #[test]
    fn test_move_unknown_repository() {
        let mut records = sample();
        let err = move_within_group(&mut records, "a/none", "a/one").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownRepository(id) if id == "a/none"));
    }
}
