//! Internal helpers for input normalization.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation of user-provided names and texts so every operation enforces
//! the same rules.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{EngineError, ResultEngine};

/// Trim a required name and collapse inner whitespace.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(collapsed)
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Uniqueness key for category names.
///
/// Accents are folded (NFKD, combining marks dropped), letters lower-cased and
/// runs of non-alphanumeric characters collapsed into one space, so "Café",
/// "cafe" and " CAFE! " collide.
pub(crate) fn normalize_category_key(value: &str) -> ResultEngine<String> {
    let mut out = String::new();
    let mut pending_space = false;
    for ch in value.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_space = true;
        }
    }
    if out.is_empty() {
        return Err(EngineError::Validation(
            "category name must contain letters or digits".to_string(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_name_collapses_whitespace() {
        assert_eq!(
            normalize_required_name("  Main   bank ", "wallet").unwrap(),
            "Main bank"
        );
        assert!(normalize_required_name("   ", "wallet").is_err());
    }

    #[test]
    fn category_key_folds_accents_and_case() {
        assert_eq!(normalize_category_key("Café").unwrap(), "cafe");
        assert_eq!(normalize_category_key(" CAFE! ").unwrap(), "cafe");
        assert_eq!(
            normalize_category_key("Eating-out / Bars").unwrap(),
            "eating out bars"
        );
        assert!(normalize_category_key("!!").is_err());
    }

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(Some(" lunch ")), Some("lunch".to_string()));
        assert_eq!(normalize_optional_text(None), None);
    }
}
