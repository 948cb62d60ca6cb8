//! Fragment reconciliation: decide which fragments to insert, update, and
//! delete when a collection is saved.
//!
//! The classifier is a pure function over two id lists. It matches on
//! [`FragmentId`] exhaustively, so an unsaved fragment can never be mistaken
//! for a persisted one, whatever placeholder value the editor used.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Collection, Fragment, FragmentId};

/// The three disjoint operation sets for one save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FragmentPlan {
    /// Indices into the current fragment list of fragments to insert.
    pub to_insert: Vec<usize>,
    /// Persisted ids present in both the initial and current state.
    pub to_update: Vec<i64>,
    /// Persisted ids present only in the initial state.
    pub to_delete: Vec<i64>,
}

impl FragmentPlan {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Classify fragments by comparing the last persisted ids with the current ones.
///
/// Current fragments that are `Unsaved`, or whose id was never persisted in
/// `initial`, are inserted. Output order follows the input order and
/// duplicate ids are reported once, so a second fragment carrying the same
/// persisted id gets no write of its own. Saves reject such lists up front
/// with [`ensure_unique_ids`].
pub fn classify(initial: &[FragmentId], current: &[FragmentId]) -> FragmentPlan {
    let initial_ids: HashSet<i64> = initial.iter().filter_map(|id| id.saved()).collect();
    let current_ids: HashSet<i64> = current.iter().filter_map(|id| id.saved()).collect();

    let mut plan = FragmentPlan::default();
    let mut seen = HashSet::new();

    for (index, id) in current.iter().enumerate() {
        match *id {
            FragmentId::Unsaved => plan.to_insert.push(index),
            FragmentId::Saved(id) if initial_ids.contains(&id) => {
                if seen.insert(id) {
                    plan.to_update.push(id);
                }
            }
            FragmentId::Saved(_) => plan.to_insert.push(index),
        }
    }

    let mut deleted = HashSet::new();
    for id in initial.iter().filter_map(|id| id.saved()) {
        if !current_ids.contains(&id) && deleted.insert(id) {
            plan.to_delete.push(id);
        }
    }

    plan
}

/// Classify the fragments of two snapshots of the same collection.
pub fn plan_for(initial: &Collection, current: &Collection) -> FragmentPlan {
    classify(&initial.fragment_ids(), &current.fragment_ids())
}

/// Fail with `InvalidInput` when a persisted id appears more than once.
pub fn ensure_unique_ids(fragments: &[Fragment]) -> Result<()> {
    let mut seen = HashSet::new();
    let duplicates: Vec<String> = fragments
        .iter()
        .filter_map(|f| f.id.saved())
        .filter(|id| !seen.insert(*id))
        .map(|id| id.to_string())
        .collect();

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "fragment ids appear more than once: {}",
            duplicates.join(", ")
        )))
    }
}

/// Set `position = index + 1` on every fragment, in list order.
pub fn reindex_positions(fragments: &mut [Fragment]) {
    for (index, fragment) in fragments.iter_mut().enumerate() {
        fragment.position = index as i32 + 1;
    }
}

/// Labels added and removed between two label lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl LabelDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// `added = updated − initial`, `removed = initial − updated`, order preserved.
pub fn diff_labels(initial: &[String], updated: &[String]) -> LabelDiff {
    let before: HashSet<&str> = initial.iter().map(String::as_str).collect();
    let after: HashSet<&str> = updated.iter().map(String::as_str).collect();

    let mut added: Vec<String> = Vec::new();
    for label in updated {
        if !before.contains(label.as_str()) && !added.contains(label) {
            added.push(label.clone());
        }
    }

    let mut removed: Vec<String> = Vec::new();
    for label in initial {
        if !after.contains(label.as_str()) && !removed.contains(label) {
            removed.push(label.clone());
        }
    }

    LabelDiff { added, removed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[Option<i64>]) -> Vec<FragmentId> {
        raw.iter().map(|r| FragmentId::from_raw(*r)).collect()
    }

    #[test]
    fn test_reorder_and_add_classifies_existing_as_update() {
        let initial = ids(&[Some(5), Some(7)]);
        let current = ids(&[Some(7), Some(5), None]);

        let plan = classify(&initial, &current);

        assert_eq!(plan.to_insert, vec![2]);
        assert_eq!(plan.to_update, vec![7, 5]);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_removed_ids_are_deleted() {
        let plan = classify(&ids(&[Some(1), Some(2), Some(3)]), &ids(&[Some(2)]));
        assert_eq!(plan.to_delete, vec![1, 3]);
        assert_eq!(plan.to_update, vec![2]);
        assert!(plan.to_insert.is_empty());
    }

    #[test]
    fn test_placeholder_ids_never_match_persisted_zero() {
        // Placeholders decoded from -0, 0 and negatives.
        let current = vec![
            FragmentId::from_f64(-0.0),
            FragmentId::from_f64(0.0),
            FragmentId::from_raw(Some(-3)),
        ];
        let plan = classify(&ids(&[Some(3)]), &current);
        assert_eq!(plan.to_insert, vec![0, 1, 2]);
        assert!(plan.to_update.is_empty());
        assert_eq!(plan.to_delete, vec![3]);
    }

    #[test]
    fn test_saved_id_unknown_to_initial_is_inserted() {
        let plan = classify(&ids(&[Some(1)]), &ids(&[Some(1), Some(99)]));
        assert_eq!(plan.to_insert, vec![1]);
        assert_eq!(plan.to_update, vec![1]);
    }

    #[test]
    fn test_duplicate_saved_id_is_reported_once() {
        let plan = classify(&ids(&[Some(5)]), &ids(&[Some(5), Some(5)]));
        assert_eq!(plan.to_update, vec![5]);
        assert!(plan.to_insert.is_empty());
    }

    #[test]
    fn test_ensure_unique_ids_rejects_repeated_saved_id() {
        let fragments = vec![
            Fragment::item("a").with_id(5),
            Fragment::item("b").with_id(7),
            Fragment::item("c").with_id(5),
        ];
        let err = ensure_unique_ids(&fragments).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m.ends_with(": 5")));
    }

    #[test]
    fn test_ensure_unique_ids_allows_many_unsaved() {
        let fragments = vec![
            Fragment::text(Some("t"), None),
            Fragment::text(Some("u"), None),
            Fragment::item("a").with_id(5),
        ];
        assert!(ensure_unique_ids(&fragments).is_ok());
    }

    #[test]
    fn test_empty_inputs() {
        assert!(classify(&[], &[]).is_empty());
        assert_eq!(classify(&[], &ids(&[None, None])).to_insert, vec![0, 1]);
        assert_eq!(classify(&ids(&[Some(4)]), &[]).to_delete, vec![4]);
    }

    #[test]
    fn test_sets_are_disjoint_and_exact_over_many_pairs() {
        let universe: Vec<Option<i64>> = vec![None, Some(-1), Some(0), Some(1), Some(2), Some(3)];
        // Every subset of the universe as initial, every subset as current.
        for initial_mask in 0u32..(1 << universe.len()) {
            for current_mask in 0u32..(1 << universe.len()) {
                let pick = |mask: u32| -> Vec<FragmentId> {
                    universe
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, r)| FragmentId::from_raw(*r))
                        .collect()
                };
                let initial = pick(initial_mask);
                let current = pick(current_mask);
                let plan = classify(&initial, &current);

                let saved = |v: &[FragmentId]| -> HashSet<i64> {
                    v.iter().filter_map(|id| id.saved()).collect()
                };
                let init_set = saved(&initial);
                let curr_set = saved(&current);

                let update: HashSet<i64> = plan.to_update.iter().copied().collect();
                let delete: HashSet<i64> = plan.to_delete.iter().copied().collect();
                let insert_ids: Vec<FragmentId> =
                    plan.to_insert.iter().map(|&i| current[i]).collect();

                assert_eq!(update, &init_set & &curr_set);
                assert_eq!(delete, &init_set - &curr_set);
                assert!(update.is_disjoint(&delete));
                for id in &insert_ids {
                    if let Some(id) = id.saved() {
                        assert!(!init_set.contains(&id));
                    }
                }
                assert_eq!(
                    plan.to_insert.len() + plan.to_update.len(),
                    current.len(),
                    "every current fragment is either inserted or updated"
                );

                // Same input, same plan.
                assert_eq!(plan, classify(&initial, &current));
            }
        }
    }

    #[test]
    fn test_reindex_positions_is_idempotent() {
        let mut fragments = vec![
            Fragment::item("a").with_id(7),
            Fragment::item("b").with_id(5),
            Fragment::text(Some("t"), None),
        ];
        fragments[0].position = 2;
        fragments[1].position = 1;

        reindex_positions(&mut fragments);
        let first: Vec<i32> = fragments.iter().map(|f| f.position).collect();
        reindex_positions(&mut fragments);
        let second: Vec<i32> = fragments.iter().map(|f| f.position).collect();

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_diff_labels() {
        let initial = vec!["A".to_string(), "C".to_string()];
        let updated = vec!["A".to_string(), "B".to_string(), "B".to_string()];
        let diff = diff_labels(&initial, &updated);
        assert_eq!(diff.added, vec!["B"]);
        assert_eq!(diff.removed, vec!["C"]);
        assert!(diff_labels(&initial, &initial).is_empty());
    }
}
