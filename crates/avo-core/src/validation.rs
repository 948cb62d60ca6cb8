//! Save and publish validation rules for collections and bundles.
//!
//! Rules never short-circuit: every violated rule contributes a message, so
//! the editor can show the complete list at once.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::defaults::MAX_DESCRIPTION_LENGTH;
use crate::error::{Error, Result};
use crate::models::{Collection, Fragment, FragmentKind};

/// Which rule set to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Applied on every save.
    Save,
    /// Applied before a collection becomes public.
    Publish,
}

impl std::str::FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "save" => Ok(ValidationMode::Save),
            "publish" => Ok(ValidationMode::Publish),
            other => Err(format!("unknown validation mode: {}", other)),
        }
    }
}

struct Rule {
    /// Message template; `{noun}` is replaced by "collection" or "bundle".
    message: &'static str,
    is_valid: fn(&Collection) -> bool,
}

const SAVE_RULES: &[Rule] = &[Rule {
    message: "The short description of your {noun} is too long.",
    is_valid: description_within_limit,
}];

const PUBLISH_RULES: &[Rule] = &[
    Rule {
        message: "Your {noun} has no title.",
        is_valid: has_title,
    },
    Rule {
        message: "Your {noun} has no description.",
        is_valid: has_description,
    },
    Rule {
        message: "Your {noun} has no education levels.",
        is_valid: has_lom_context,
    },
    Rule {
        message: "Your {noun} has no subjects.",
        is_valid: has_lom_classification,
    },
    Rule {
        message: "Your {noun} has no items.",
        is_valid: has_fragments,
    },
    Rule {
        message: "Your video items with custom fields need both a title and a description.",
        is_valid: items_have_custom_fields,
    },
    Rule {
        message: "Your text items need a title or a body.",
        is_valid: texts_have_content,
    },
];

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Remove HTML tags and `&nbsp;` entities, then trim.
pub fn strip_html(input: &str) -> String {
    HTML_TAG
        .replace_all(input, "")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

fn non_empty(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn description_within_limit(c: &Collection) -> bool {
    c.description
        .as_deref()
        .map(|d| d.chars().count() <= MAX_DESCRIPTION_LENGTH)
        .unwrap_or(true)
}

fn has_title(c: &Collection) -> bool {
    !c.title.trim().is_empty()
}

fn has_description(c: &Collection) -> bool {
    non_empty(c.description.as_deref())
}

fn has_lom_context(c: &Collection) -> bool {
    !c.lom_context.is_empty()
}

fn has_lom_classification(c: &Collection) -> bool {
    !c.lom_classification.is_empty()
}

fn has_fragments(c: &Collection) -> bool {
    !c.fragments.is_empty()
}

fn item_has_custom_fields(f: &Fragment) -> bool {
    f.kind != FragmentKind::Item
        || !f.use_custom_fields
        || (non_empty(f.custom_title.as_deref()) && non_empty(f.custom_description.as_deref()))
}

fn items_have_custom_fields(c: &Collection) -> bool {
    c.fragments.iter().all(item_has_custom_fields)
}

fn text_has_content(f: &Fragment) -> bool {
    if f.kind != FragmentKind::Text {
        return true;
    }
    let stripped = |v: &Option<String>| v.as_deref().map(strip_html).unwrap_or_default();
    !stripped(&f.custom_title).is_empty() || !stripped(&f.custom_description).is_empty()
}

fn texts_have_content(c: &Collection) -> bool {
    c.fragments.iter().all(text_has_content)
}

fn rules_for(mode: ValidationMode) -> impl Iterator<Item = &'static Rule> {
    let publish: &'static [Rule] = match mode {
        ValidationMode::Save => &[],
        ValidationMode::Publish => PUBLISH_RULES,
    };
    SAVE_RULES.iter().chain(publish.iter())
}

/// All violated rule messages for `collection` under `mode`, in rule order.
pub fn validate(collection: &Collection, mode: ValidationMode) -> Vec<String> {
    let noun = collection.content_type.noun();
    rules_for(mode)
        .filter(|rule| !(rule.is_valid)(collection))
        .map(|rule| rule.message.replace("{noun}", noun))
        .collect()
}

/// `Err(Error::Validation)` carrying every violated rule, or `Ok(())`.
pub fn ensure_valid(collection: &Collection, mode: ValidationMode) -> Result<()> {
    let errors = validate(collection, mode);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;
    use uuid::Uuid;

    fn publishable() -> Collection {
        let mut c = Collection::new("Klimaat", ContentType::Collection, Uuid::new_v4());
        c.description = Some("Over het klimaat".to_string());
        c.lom_context = vec!["Secundair onderwijs".to_string()];
        c.lom_classification = vec!["Aardrijkskunde".to_string()];
        c.fragments = vec![Fragment::item("abc")];
        c
    }

    #[test]
    fn test_publishable_collection_passes() {
        assert!(validate(&publishable(), ValidationMode::Publish).is_empty());
        assert!(ensure_valid(&publishable(), ValidationMode::Publish).is_ok());
    }

    #[test]
    fn test_empty_collection_reports_every_publish_rule() {
        let c = Collection::new("  ", ContentType::Collection, Uuid::new_v4());
        let errors = validate(&c, ValidationMode::Publish);
        assert_eq!(
            errors,
            vec![
                "Your collection has no title.",
                "Your collection has no description.",
                "Your collection has no education levels.",
                "Your collection has no subjects.",
                "Your collection has no items.",
            ]
        );
    }

    #[test]
    fn test_save_mode_only_checks_description_length() {
        let mut c = Collection::new("", ContentType::Collection, Uuid::new_v4());
        assert!(validate(&c, ValidationMode::Save).is_empty());

        c.description = Some("x".repeat(MAX_DESCRIPTION_LENGTH + 1));
        assert_eq!(
            validate(&c, ValidationMode::Save),
            vec!["The short description of your collection is too long."]
        );
    }

    #[test]
    fn test_description_at_limit_is_valid() {
        let mut c = publishable();
        c.description = Some("é".repeat(MAX_DESCRIPTION_LENGTH));
        assert!(validate(&c, ValidationMode::Save).is_empty());
    }

    #[test]
    fn test_publish_includes_length_rule() {
        let mut c = publishable();
        c.description = Some("x".repeat(MAX_DESCRIPTION_LENGTH + 1));
        assert_eq!(validate(&c, ValidationMode::Publish).len(), 1);
    }

    #[test]
    fn test_item_with_custom_fields_needs_title_and_description() {
        let mut c = publishable();
        let mut item = Fragment::item("abc");
        item.use_custom_fields = true;
        item.custom_title = Some("Eigen titel".to_string());
        c.fragments = vec![item.clone()];
        assert_eq!(validate(&c, ValidationMode::Publish).len(), 1);

        item.custom_description = Some("Eigen beschrijving".to_string());
        c.fragments = vec![item];
        assert!(validate(&c, ValidationMode::Publish).is_empty());
    }

    #[test]
    fn test_item_without_custom_fields_needs_nothing() {
        let mut c = publishable();
        c.fragments = vec![Fragment::item("abc")];
        assert!(validate(&c, ValidationMode::Publish).is_empty());
    }

    #[test]
    fn test_text_fragment_with_only_markup_is_empty() {
        let mut c = publishable();
        c.fragments = vec![Fragment::text(Some("<p>&nbsp;</p>"), Some("<br/>"))];
        assert_eq!(
            validate(&c, ValidationMode::Publish),
            vec!["Your text items need a title or a body."]
        );

        c.fragments = vec![Fragment::text(None, Some("<p>Inleiding</p>"))];
        assert!(validate(&c, ValidationMode::Publish).is_empty());
    }

    #[test]
    fn test_bundle_messages_use_bundle_noun() {
        let c = Collection::new("", ContentType::Bundle, Uuid::new_v4());
        let errors = validate(&c, ValidationMode::Publish);
        assert!(errors.iter().any(|e| e == "Your bundle has no title."));
    }

    #[test]
    fn test_ensure_valid_returns_all_messages() {
        let c = Collection::new("", ContentType::Collection, Uuid::new_v4());
        match ensure_valid(&c, ValidationMode::Publish) {
            Err(Error::Validation(msgs)) => assert_eq!(msgs.len(), 5),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hallo <b>wereld</b></p>"), "Hallo wereld");
        assert_eq!(strip_html("&nbsp;<br>"), "");
    }

    #[test]
    fn test_validation_mode_from_str() {
        assert_eq!(
            "Publish".parse::<ValidationMode>(),
            Ok(ValidationMode::Publish)
        );
        assert!("draft".parse::<ValidationMode>().is_err());
    }
}
