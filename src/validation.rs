//! Validation of names that end up in Azure identifiers.

use crate::{BootstrapError, Result};

/// Characters rejected in application names.
///
/// The name is embedded in an identifier URI (`http://<name>`), so anything
/// that is not safe in a URI host/path segment is refused up front rather
/// than surfacing as an opaque Graph API error.
const DANGEROUS_CHARS: &str = ";|&$`<>(){}[]!*?~#%^\\\"' /";

/// Maximum allowed length for application names.
const MAX_NAME_LENGTH: usize = 120;

/// Value shipped in sample `.env` files; treated as "not configured".
pub const UNCONFIGURED: &str = "CHANGEME";

/// Whether a configured value is blank or still the sample placeholder.
///
/// ```
/// use azsp_bootstrap::validation::is_unconfigured;
///
/// assert!(is_unconfigured("  "));
/// assert!(is_unconfigured("changeme"));
/// assert!(!is_unconfigured("prod-subscription"));
/// ```
pub fn is_unconfigured(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNCONFIGURED)
}

/// Validates an AD application display name.
///
/// # Errors
///
/// Returns [`BootstrapError::InvalidConfig`] if the name is blank, the
/// sample placeholder, too long, or contains control or URI-unsafe
/// characters.
///
/// ```
/// use azsp_bootstrap::validation::validate_app_name;
///
/// assert!(validate_app_name("terraform-ci").is_ok());
/// assert!(validate_app_name("CHANGEME").is_err());
/// assert!(validate_app_name("name; rm -rf /").is_err());
/// ```
pub fn validate_app_name(name: &str) -> Result<()> {
    if is_unconfigured(name) {
        return Err(BootstrapError::InvalidConfig(format!(
            "AZURE_AD_APP_NAME must be set to a real application name (got {:?})",
            name
        )));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(BootstrapError::InvalidConfig(format!(
            "application name exceeds maximum length of {} characters",
            MAX_NAME_LENGTH
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(BootstrapError::InvalidConfig(
            "application name contains control characters".to_string(),
        ));
    }

    if name.chars().any(|c| DANGEROUS_CHARS.contains(c)) {
        return Err(BootstrapError::InvalidConfig(format!(
            "application name contains characters not allowed in an identifier URI: {:?}",
            name
        )));
    }

    Ok(())
}

/// Validates a role definition name.
///
/// Built-in role names contain spaces ("Storage Blob Data Reader"), so only
/// blank names and control characters are rejected.
pub fn validate_role_name(role: &str) -> Result<()> {
    if role.trim().is_empty() {
        return Err(BootstrapError::InvalidConfig(
            "role name cannot be empty".to_string(),
        ));
    }

    if role.chars().any(char::is_control) {
        return Err(BootstrapError::InvalidConfig(
            "role name contains control characters".to_string(),
        ));
    }

    Ok(())
}
