//! Route handlers for the HTTP API.

pub mod admin;
pub mod attachments;
pub mod health;
pub mod jellyfin;

use std::str::FromStr;

/// Parse a path or query identifier, mapping failure to a validation error.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> fv_core::Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| fv_core::Error::Validation(format!("Invalid {what}: {raw}")))
}
