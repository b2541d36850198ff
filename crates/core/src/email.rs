//! Email normalization.

use crate::error::{Error, Result};

/// Normalize an email address for storage and lookup.
///
/// Addresses are trimmed and lower-cased so the uniqueness constraint in the
/// datastore is case-insensitive. Validation is deliberately shallow: a
/// non-empty local part and domain around a single '@'.
pub fn normalize(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(Error::InvalidEmail(raw.trim().to_string()));
    }
    Ok(email)
}
