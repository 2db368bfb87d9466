//! Business operations. Each service borrows the shared state and returns
//! typed results; handlers wrap them in the response envelope.

pub mod addresses;
pub mod auth;
pub mod catalog;
pub mod cart;
pub mod chat;
pub mod favorites;
pub mod orders;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod statistics;
pub mod users;

use crate::error::AppError;

/// Trimmed value of a mandatory text field; blank counts as missing.
pub(crate) fn required<'s>(value: &'s Option<String>, message: &str) -> Result<&'s str, AppError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::not_null(message)),
    }
}

/// Mandatory secret such as a password, kept exactly as typed; whitespace alone counts as missing.
pub(crate) fn required_secret<'s>(value: &'s Option<String>, message: &str) -> Result<&'s str, AppError> {
    secret(value).ok_or_else(|| AppError::not_null(message))
}

/// Untrimmed optional secret, `None` when blank.
pub(crate) fn secret(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Trimmed value of an optional text field, `None` when blank.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::codes;

    #[test]
    fn required_rejects_missing_and_blank() {
        assert_eq!(required(&Some(" latte ".into()), "x").unwrap(), "latte");
        assert_eq!(required(&None, "Email must be not null").unwrap_err().code(), codes::FIELD_NOT_NULL);
        assert_eq!(required(&Some("   ".into()), "Email must be not null").unwrap_err().to_string(), "Email must be not null");
    }

    #[test]
    fn secrets_keep_surrounding_spaces() {
        assert_eq!(required_secret(&Some(" pass word ".into()), "x").unwrap(), " pass word ");
        assert_eq!(required_secret(&Some("  ".into()), "Password must be not null").unwrap_err().code(), codes::FIELD_NOT_NULL);
        assert_eq!(secret(&None), None);
    }

    #[test]
    fn non_blank_filters() {
        assert_eq!(non_blank(&Some("".into())), None);
        assert_eq!(non_blank(&Some(" a ".into())), Some("a"));
        assert_eq!(non_blank(&None), None);
    }
}
