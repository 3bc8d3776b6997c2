//! Identifier validation and quoting. Values never reach SQL text; identifiers do,
//! so every resource and field name passes through here first.

use crate::error::AppError;
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_IDENTIFIER_LEN: usize = 63;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static identifier pattern"))
}

pub fn is_valid_identifier(name: &str) -> bool {
    name.len() <= MAX_IDENTIFIER_LEN && identifier_re().is_match(name)
}

pub fn validate_identifier(name: &str) -> Result<(), AppError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("invalid identifier: {:?}", name)))
    }
}

/// Double-quote an identifier; both engines accept this form.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        for name in ["Product", "_private", "authorId", "order_items2"] {
            assert!(is_valid_identifier(name), "{}", name);
        }
    }

    #[test]
    fn rejects_injection_and_paths() {
        for name in ["", "1abc", "a b", "x;DROP TABLE y", "../etc", "name\"", "a-b"] {
            assert!(validate_identifier(name).is_err(), "{}", name);
        }
        assert!(!is_valid_identifier(&"a".repeat(MAX_IDENTIFIER_LEN + 1)));
    }

    #[test]
    fn quoting_escapes_quotes() {
        assert_eq!(quoted("Product"), "\"Product\"");
        assert_eq!(quoted("a\"b"), "\"a\"\"b\"");
    }
}
