//! Field validators for plugin records
//!
//! Each predicate answers whether a raw value is acceptable for its column.
//! [`ensure_valid`] turns a failed predicate into an [`Error::InvalidField`]
//! naming the column, which is how every write path rejects bad input.

use crate::{Error, PluginType, Result};

/// Name length bounds (in characters)
pub const NAME_MIN_LEN: usize = 1;
pub const NAME_MAX_LEN: usize = 50;

/// Description length bounds (in characters)
pub const DESCRIPTION_MIN_LEN: usize = 1;
pub const DESCRIPTION_MAX_LEN: usize = 20_000;

/// Maximum length of the compatible engine range
pub const ENGINE_MAX_LEN: usize = 50;

/// Plugin names are lowercase ascii, digits and inner dashes
pub fn is_plugin_name_valid(value: &str) -> bool {
    let len = value.chars().count();
    (NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len)
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-')
}

pub fn is_plugin_type_valid(value: i32) -> bool {
    PluginType::try_from(value).is_ok()
}

/// `MAJOR.MINOR.PATCH`, each part a non-negative integer
pub fn is_plugin_version_valid(value: &str) -> bool {
    let parts: Vec<&str> = value.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}

pub fn is_plugin_description_valid(value: &str) -> bool {
    let len = value.chars().count();
    (DESCRIPTION_MIN_LEN..=DESCRIPTION_MAX_LEN).contains(&len)
}

pub fn is_plugin_engine_valid(value: &str) -> bool {
    !value.trim().is_empty() && value.chars().count() <= ENGINE_MAX_LEN
}

/// Reject `value` with an error naming `field` when `predicate` fails
pub fn ensure_valid<T: ?Sized + std::fmt::Debug>(
    field: &'static str,
    value: &T,
    predicate: impl Fn(&T) -> bool,
) -> Result<()> {
    if predicate(value) {
        Ok(())
    } else {
        Err(Error::invalid(field, format!("{:?} is not valid", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert!(is_plugin_name_valid("hello-world"));
        assert!(is_plugin_name_valid("auth-ldap2"));
        assert!(is_plugin_name_valid("a"));
        assert!(!is_plugin_name_valid("")); // Empty
        assert!(!is_plugin_name_valid("Hello")); // Uppercase
        assert!(!is_plugin_name_valid("hello world")); // Space
        assert!(!is_plugin_name_valid("hello_world")); // Underscore
        assert!(!is_plugin_name_valid("-hello"));
        assert!(!is_plugin_name_valid("hello-"));
        assert!(!is_plugin_name_valid(&"a".repeat(NAME_MAX_LEN + 1)));
        assert!(is_plugin_name_valid(&"a".repeat(NAME_MAX_LEN)));
    }

    #[test]
    fn test_type_validation() {
        assert!(is_plugin_type_valid(1));
        assert!(is_plugin_type_valid(2));
        assert!(!is_plugin_type_valid(0));
        assert!(!is_plugin_type_valid(3));
        assert!(!is_plugin_type_valid(-1));
    }

    #[test]
    fn test_version_validation() {
        assert!(is_plugin_version_valid("0.0.1"));
        assert!(is_plugin_version_valid("12.40.3"));
        assert!(!is_plugin_version_valid("1.0"));
        assert!(!is_plugin_version_valid("1.0.0.0"));
        assert!(!is_plugin_version_valid("1.0.x"));
        assert!(!is_plugin_version_valid("1..0"));
        assert!(!is_plugin_version_valid("v1.0.0"));
        assert!(!is_plugin_version_valid(""));
    }

    #[test]
    fn test_description_validation() {
        assert!(is_plugin_description_valid("Adds LDAP login"));
        assert!(!is_plugin_description_valid(""));
        assert!(is_plugin_description_valid(&"x".repeat(DESCRIPTION_MAX_LEN)));
        assert!(!is_plugin_description_valid(&"x".repeat(DESCRIPTION_MAX_LEN + 1)));
    }

    #[test]
    fn test_engine_validation() {
        assert!(is_plugin_engine_valid(">=1.3.0"));
        assert!(!is_plugin_engine_valid("   "));
        assert!(!is_plugin_engine_valid(&"1".repeat(ENGINE_MAX_LEN + 1)));
    }

    #[test]
    fn test_ensure_valid_names_field() {
        assert!(ensure_valid("name", "ok-name", is_plugin_name_valid).is_ok());

        let err = ensure_valid("name", "Bad Name", is_plugin_name_valid).unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }
}
