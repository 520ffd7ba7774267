//! Culture names and the fallback order used by lookups.

use std::env;
use thiserror::Error;
use unic_langid::LanguageIdentifier;

/// Culture used when nothing else is configured.
pub const DEFAULT_CULTURE: &str = "en";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CultureError {
    #[error("invalid culture name '{0}'")]
    Invalid(String),
}

/// Normalizes a culture name to the lowercase, dash separated form used as a
/// dictionary key (`en_US` becomes `en-us`).
pub fn normalize(name: &str) -> Result<String, CultureError> {
    let trimmed = name.trim();
    let candidate = trimmed.replace('_', "-").to_ascii_lowercase();

    if candidate.is_empty() || candidate.parse::<LanguageIdentifier>().is_err() {
        return Err(CultureError::Invalid(trimmed.to_string()));
    }

    Ok(candidate)
}

/// Returns the two-letter language of a `xx-yy` culture name.
pub fn language_subtag(name: &str) -> Option<&str> {
    let bytes = name.as_bytes();
    (bytes.len() == 5 && bytes[2] == b'-').then(|| &name[..2])
}

/// Produces the ordered list of cultures to probe for a lookup.
///
/// The order is: the requested culture, its language, the primary culture, the
/// primary culture's language, then every other loaded culture in the order the
/// iterator yields them. Duplicates are dropped.
pub fn resolve_order<'a>(
    requested: &str,
    primary: Option<&str>,
    loaded: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !name.is_empty() && !order.iter().any(|existing| existing == name) {
            order.push(name.to_string());
        }
    };

    push(requested);
    if let Some(language) = language_subtag(requested) {
        push(language);
    }
    if let Some(primary) = primary {
        push(primary);
        if let Some(language) = language_subtag(primary) {
            push(language);
        }
    }
    for name in loaded {
        push(name);
    }

    order
}

/// Derives the current culture from the POSIX locale variables
/// (`LC_ALL`, `LC_MESSAGES`, `LANG`), defaulting to [`DEFAULT_CULTURE`].
pub fn system_culture() -> String {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find_map(|value| from_posix_locale(&value))
        .unwrap_or_else(|| DEFAULT_CULTURE.to_string())
}

fn from_posix_locale(value: &str) -> Option<String> {
    let name = value.split(['.', '@']).next()?;
    if name.is_empty() || name == "C" || name == "POSIX" {
        return None;
    }
    normalize(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_uses_dashes() {
        assert_eq!(normalize("en_US").unwrap(), "en-us");
        assert_eq!(normalize(" de ").unwrap(), "de");
        assert_eq!(normalize("zh-Hans").unwrap(), "zh-hans");
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert!(normalize("").is_err());
        assert!(normalize("not a culture").is_err());
        assert!(normalize("e").is_err());
    }

    #[test]
    fn language_subtag_only_for_region_form() {
        assert_eq!(language_subtag("en-us"), Some("en"));
        assert_eq!(language_subtag("en"), None);
        assert_eq!(language_subtag("zh-hans"), None);
    }

    #[test]
    fn order_follows_fallback_steps() {
        let loaded = ["de", "en", "fr"];
        let order = resolve_order("fr-fr", Some("en-gb"), loaded);
        assert_eq!(order, vec!["fr-fr", "fr", "en-gb", "en", "de"]);
    }

    #[test]
    fn order_without_primary() {
        let order = resolve_order("de", None, ["en", "de"]);
        assert_eq!(order, vec!["de", "en"]);
    }

    #[test]
    fn posix_locale_parsing() {
        assert_eq!(from_posix_locale("de_DE.UTF-8").as_deref(), Some("de-de"));
        assert_eq!(from_posix_locale("sr_RS@latin").as_deref(), Some("sr-rs"));
        assert_eq!(from_posix_locale("C"), None);
        assert_eq!(from_posix_locale("POSIX.UTF-8"), None);
    }
}
