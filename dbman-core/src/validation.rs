//! Identifier allow-listing.
//!
//! Table, column and label names cannot be bound as parameters, so any name
//! that ends up inside SQL or Cypher text must pass [`validate_identifier`]
//! first. Values are always bound, never checked here.

use crate::error::{DbManError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Longest identifier accepted (PostgreSQL's NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LEN: usize = 63;

const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

fn identifier_regex() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(IDENTIFIER_PATTERN))
        .as_ref()
        .map_err(|e| DbManError::configuration(format!("Invalid identifier pattern: {}", e)))
}

/// Checks a table, column or label name against the allow-list.
///
/// # Errors
/// `InvalidIdentifier` when the name is empty, longer than
/// [`MAX_IDENTIFIER_LEN`], or contains anything beyond ASCII letters, digits
/// and underscores (leading digit rejected).
pub fn validate_identifier(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(DbManError::invalid_identifier(name, "name is empty"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(DbManError::invalid_identifier(
            name,
            format!("longer than {} characters", MAX_IDENTIFIER_LEN),
        ));
    }
    if !identifier_regex()?.is_match(name) {
        return Err(DbManError::invalid_identifier(
            name,
            "only letters, digits and underscores are allowed, starting with a letter or underscore",
        ));
    }
    Ok(name)
}

/// Checks a document collection name.
pub fn validate_collection_name(name: &str) -> Result<&str> {
    if name.is_empty() {
        return Err(DbManError::invalid_identifier(name, "name is empty"));
    }
    if name.contains('$') || name.contains('\0') {
        return Err(DbManError::invalid_identifier(
            name,
            "collection names cannot contain '$' or NUL",
        ));
    }
    if name.starts_with("system.") {
        return Err(DbManError::invalid_identifier(
            name,
            "the 'system.' prefix is reserved",
        ));
    }
    Ok(name)
}

/// Checks a key-value key.
pub fn validate_key(key: &str) -> Result<&str> {
    if key.is_empty() {
        return Err(DbManError::invalid_identifier(key, "key is empty"));
    }
    Ok(key)
}

/// Derives a container name from a CSV file's base name (`users.csv` to `users`).
///
/// The result is not validated; callers apply their backend's policy.
pub fn container_name_from_path(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            DbManError::malformed(format!(
                "cannot derive a container name from {}",
                path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for name in ["users", "_tmp", "Order_Items2", "a"] {
            assert!(validate_identifier(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_rejected_identifiers() {
        for name in [
            "",
            "1users",
            "users; DROP TABLE x",
            "my-table",
            "na\"me",
            "tábla",
            "with space",
        ] {
            assert!(
                matches!(
                    validate_identifier(name),
                    Err(DbManError::InvalidIdentifier { .. })
                ),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_identifier_length_limit() {
        let ok = "a".repeat(MAX_IDENTIFIER_LEN);
        let too_long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(validate_identifier(&ok).is_ok());
        assert!(validate_identifier(&too_long).is_err());
    }

    #[test]
    fn test_collection_names() {
        assert!(validate_collection_name("users").is_ok());
        assert!(validate_collection_name("my-users.v2").is_ok());
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("a$b").is_err());
        assert!(validate_collection_name("system.users").is_err());
    }

    #[test]
    fn test_container_name_from_path() {
        assert_eq!(
            container_name_from_path(Path::new("/tmp/data/users.csv")).unwrap(),
            "users"
        );
        assert_eq!(
            container_name_from_path(Path::new("orders")).unwrap(),
            "orders"
        );
        assert!(container_name_from_path(Path::new("/")).is_err());
    }
}
