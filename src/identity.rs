//! Display-name derivation from the customer identifier.
//!
//! The identifier is host-page input and is not validated as an email: the
//! part before the first `@` (or the whole value) is used verbatim apart from
//! its first character being upper-cased.

use crate::types::SENTINEL;

/// Shown when no customer identifier was resolved.
pub const FALLBACK_DISPLAY_NAME: &str = "Valued Customer";

/// Derive a greeting name from an email-like identifier.
pub fn derive_display_name(email: &str) -> String {
    if email.is_empty() || email == SENTINEL {
        return FALLBACK_DISPLAY_NAME.to_string();
    }

    let local_part = email.split('@').next().unwrap_or(email);
    let mut chars = local_part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_display_name_basic() {
        assert_eq!(derive_display_name("alice@example.com"), "Alice");
    }

    #[test]
    fn test_derive_display_name_fallbacks() {
        assert_eq!(derive_display_name("UNKNOWN"), "Valued Customer");
        assert_eq!(derive_display_name(""), "Valued Customer");
    }

    #[test]
    fn test_derive_display_name_without_at() {
        assert_eq!(derive_display_name("bob"), "Bob");
    }

    #[test]
    fn test_derive_display_name_keeps_rest_unchanged() {
        assert_eq!(derive_display_name("mcDonald42@x.io"), "McDonald42");
        assert_eq!(derive_display_name("ALICE@x.io"), "ALICE");
        assert_eq!(derive_display_name("9lives@x.io"), "9lives");
    }

    #[test]
    fn test_derive_display_name_first_at_only() {
        assert_eq!(derive_display_name("a@b@c"), "A");
    }

    #[test]
    fn test_derive_display_name_empty_local_part() {
        // Permissive: no validation, an empty local part yields an empty name.
        assert_eq!(derive_display_name("@example.com"), "");
    }
}
