//! Name validation for resource groups and resources.
//!
//! Names are checked locally before any remote call so that obviously bad
//! input fails fast with [`RgmuxError::InvalidName`] instead of a provider
//! error halfway through a sequence.

use crate::{Result, RgmuxError};

/// Maximum length of a resource group name.
const MAX_GROUP_NAME_LENGTH: usize = 90;

/// Maximum length accepted for a resource name.
const MAX_RESOURCE_NAME_LENGTH: usize = 255;

/// Punctuation allowed in resource group names besides letters and digits.
const GROUP_NAME_PUNCTUATION: &str = "_-.()";

/// Characters that would break the resource path.
const RESOURCE_NAME_FORBIDDEN: &str = "/\\?#%";

/// Validates a resource group name.
///
/// Resource group names are 1-90 characters of letters, digits, underscores,
/// hyphens, periods and parentheses, and may not end with a period.
///
/// # Example
///
/// ```
/// use rgmux::validation::validate_group_name;
///
/// assert!(validate_group_name("azure-sample-group").is_ok());
/// assert!(validate_group_name("rg_(prod).eu").is_ok());
///
/// assert!(validate_group_name("").is_err());
/// assert!(validate_group_name("trailing.").is_err());
/// assert!(validate_group_name("has space").is_err());
/// ```
pub fn validate_group_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RgmuxError::InvalidName(
            "group name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > MAX_GROUP_NAME_LENGTH {
        return Err(RgmuxError::InvalidName(format!(
            "group name exceeds maximum length of {} characters",
            MAX_GROUP_NAME_LENGTH
        )));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !c.is_alphanumeric() && !GROUP_NAME_PUNCTUATION.contains(*c))
    {
        return Err(RgmuxError::InvalidName(format!(
            "group name contains '{}' (allowed: letters, digits and {})",
            c.escape_default(),
            GROUP_NAME_PUNCTUATION
        )));
    }

    if name.ends_with('.') {
        return Err(RgmuxError::InvalidName(
            "group name cannot end with a period".to_string(),
        ));
    }

    Ok(())
}

/// Validates a resource name.
///
/// Provider namespaces impose their own rules; this only rejects names that
/// cannot be placed into a resource path.
pub fn validate_resource_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RgmuxError::InvalidName(
            "resource name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_RESOURCE_NAME_LENGTH {
        return Err(RgmuxError::InvalidName(format!(
            "resource name exceeds maximum length of {} characters",
            MAX_RESOURCE_NAME_LENGTH
        )));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(RgmuxError::InvalidName(
            "resource name contains control characters".to_string(),
        ));
    }

    if name.chars().any(|c| RESOURCE_NAME_FORBIDDEN.contains(c)) {
        return Err(RgmuxError::InvalidName(format!(
            "resource name contains path characters (not allowed: {})",
            RESOURCE_NAME_FORBIDDEN
        )));
    }

    Ok(())
}
