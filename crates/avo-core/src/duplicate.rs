//! Copy naming and cloning rules for duplicated collections.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::defaults::COPY_TITLE_TEMPLATE;
use crate::models::{stored_now, Collection, FragmentId};

static COPY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Kopie \d+: ").expect("valid copy prefix regex"));

/// Title for a copy of `title`: `"Kopie N: <title>"` with the smallest
/// `N >= 1` not present in `existing_titles`. An existing copy prefix on
/// `title` is replaced, not stacked.
pub fn copy_title(title: &str, existing_titles: &[String]) -> String {
    let base = COPY_PREFIX.replace(title, "");
    let mut n = 1usize;
    loop {
        let candidate = format!(
            "{}{}",
            COPY_TITLE_TEMPLATE.replace("{n}", &n.to_string()),
            base
        );
        if !existing_titles.iter().any(|t| t == &candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// A private copy of `source` owned by `owner`.
///
/// Fragments keep their order and content but become unsaved. Quality
/// labels, management metadata and the public flag are not copied.
pub fn duplicate_for(source: &Collection, owner: Uuid, existing_titles: &[String]) -> Collection {
    let now = stored_now();
    let mut copy = source.clone();
    copy.id = Uuid::new_v4();
    copy.title = copy_title(&source.title, existing_titles);
    copy.is_public = false;
    copy.owner_profile_id = Some(owner);
    copy.updated_by_profile_id = Some(owner);
    copy.created_at = now;
    copy.updated_at = now;
    copy.labels.clear();
    copy.management = None;
    for fragment in &mut copy.fragments {
        fragment.id = FragmentId::Unsaved;
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentType, Fragment};

    #[test]
    fn test_first_copy() {
        assert_eq!(copy_title("Klimaat", &[]), "Kopie 1: Klimaat");
    }

    #[test]
    fn test_copy_skips_used_numbers() {
        let existing = vec!["Kopie 1: Klimaat".to_string(), "Kopie 2: Klimaat".to_string()];
        assert_eq!(copy_title("Klimaat", &existing), "Kopie 3: Klimaat");
    }

    #[test]
    fn test_copy_of_copy_does_not_stack_prefix() {
        let existing = vec!["Kopie 1: Klimaat".to_string()];
        assert_eq!(copy_title("Kopie 1: Klimaat", &existing), "Kopie 2: Klimaat");
    }

    #[test]
    fn test_duplicate_resets_identity_and_editorial_state() {
        let owner = Uuid::new_v4();
        let me = Uuid::new_v4();
        let mut source = Collection::new("Klimaat", ContentType::Collection, owner);
        source.is_public = true;
        source.labels = vec!["EXEMPLARY".to_string()];
        source.fragments = vec![Fragment::item("a").with_id(3), Fragment::item("b").with_id(4)];

        let copy = duplicate_for(&source, me, &[]);

        assert_ne!(copy.id, source.id);
        assert_eq!(copy.title, "Kopie 1: Klimaat");
        assert!(!copy.is_public);
        assert_eq!(copy.owner_profile_id, Some(me));
        assert!(copy.labels.is_empty());
        assert!(copy.fragments.iter().all(|f| f.id == FragmentId::Unsaved));
        assert_eq!(copy.fragments[1].external_id.as_deref(), Some("b"));
    }
}
