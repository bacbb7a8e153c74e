//! Input validation utilities

use crate::models::{PERMISSION_READ, PERMISSION_WRITE};

/// Validate a tenant (client) name
///
/// Names appear in URLs (`/tenants/{client_name}`), so they are restricted to
/// a URL-safe alphabet and must start with a letter.
pub fn validate_client_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    name.len() <= 100 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validate API key permission tags
pub fn validate_permissions(permissions: &[String]) -> bool {
    permissions
        .iter()
        .all(|p| p == PERMISSION_READ || p == PERMISSION_WRITE)
}

/// Validate password strength against the configured minimum length
pub fn validate_password(password: &str, min_length: usize) -> bool {
    password.chars().count() >= min_length && !password.trim().is_empty()
}
