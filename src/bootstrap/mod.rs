//! Directory bootstrap: ensure the principal exists and describe it.
//!
//! Each remote object follows the same idempotency pattern:
//!
//! 1. look it up by its natural key;
//! 2. if the lookup fails as [`Failure::NotFound`](crate::classify::Failure),
//!    create it;
//! 3. if creation fails as [`Failure::AlreadyExists`](crate::classify::Failure),
//!    list candidates and pick the one whose display name and identifiers
//!    match.
//!
//! Anything else is fatal. Two policies implement the pattern:
//! [`reuse`] (find the principal through its role assignment, else
//! `create-for-rbac`) and [`explicit`] (application, principal and an
//! `Owner` assignment, one after another).

pub mod explicit;
pub mod reuse;

use crate::azure::AzureCli;
use crate::compose::Compose;
use crate::config::{Config, Policy};
use crate::process::{CommandRunner, MASK};
use crate::validation::{is_unconfigured, validate_app_name, validate_role_name};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Stand-in for a credential that cannot be read back from Azure.
pub const PLACEHOLDER_PASSWORD: &str = "HIDDEN";

/// Subscription used when `AZURE_SUBSCRIPTION_NAME` is blank or `CHANGEME`.
pub const DEFAULT_SUBSCRIPTION_ID: &str = "1fd71af7-cbb0-47c1-913d-e1f145b4c2b7";

/// Role granted by [`reuse`] when none is given.
pub const DEFAULT_ROLE: &str = "Reader";

/// Role granted by [`explicit`].
pub const OWNER_ROLE: &str = "Owner";

/// Everything downstream tooling needs to authenticate as the principal.
///
/// This is what lands under the `"bootstrap"` key of the cache file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapRecord {
    pub subscription_name: String,
    pub subscription_id: String,
    pub tenant_id: String,
    pub ad_sp_id: String,
    pub ad_sp_name: String,
    pub ad_sp_display_name: String,
    pub ad_sp_password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_assignment_id: Option<String>,
}

impl BootstrapRecord {
    /// Whether the credential is the unrecoverable placeholder.
    pub fn has_placeholder_password(&self) -> bool {
        self.ad_sp_password.eq_ignore_ascii_case(PLACEHOLDER_PASSWORD)
    }

    /// Copy safe to print: the password is masked unless it is the placeholder.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.has_placeholder_password() {
            copy.ad_sp_password = MASK.to_string();
        }
        copy
    }

    /// Pretty, key-sorted JSON.
    pub fn to_pretty_json(&self) -> Result<String> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

impl std::fmt::Debug for BootstrapRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shown = self.redacted();
        f.debug_struct("BootstrapRecord")
            .field("subscription_name", &shown.subscription_name)
            .field("subscription_id", &shown.subscription_id)
            .field("tenant_id", &shown.tenant_id)
            .field("ad_sp_id", &shown.ad_sp_id)
            .field("ad_sp_name", &shown.ad_sp_name)
            .field("ad_sp_display_name", &shown.ad_sp_display_name)
            .field("ad_sp_password", &shown.ad_sp_password)
            .field("ad_app_id", &shown.ad_app_id)
            .field("role", &shown.role)
            .field("role_assignment_id", &shown.role_assignment_id)
            .finish()
    }
}

/// Subscription name to query, falling back to [`DEFAULT_SUBSCRIPTION_ID`].
///
/// ```
/// use azsp_bootstrap::bootstrap::{resolve_subscription, DEFAULT_SUBSCRIPTION_ID};
///
/// assert_eq!(resolve_subscription(" changeme "), DEFAULT_SUBSCRIPTION_ID);
/// assert_eq!(resolve_subscription("Production"), "Production");
/// ```
pub fn resolve_subscription(name: &str) -> String {
    if is_unconfigured(name) {
        DEFAULT_SUBSCRIPTION_ID.to_string()
    } else {
        name.trim().to_string()
    }
}

/// Subscription fields shared by both policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubscriptionInfo {
    pub name: String,
    pub id: String,
    pub tenant_id: String,
}

pub(crate) async fn subscription(az: &AzureCli<'_>, config: &Config) -> Result<SubscriptionInfo> {
    let name = resolve_subscription(&config.subscription_name);
    let subscription = az.account_show(&name).await?;
    debug!("Subscription ID -> {}", subscription.id);
    debug!("Tenant ID -> {}", subscription.tenant_id);

    Ok(SubscriptionInfo {
        name,
        id: subscription.id,
        tenant_id: subscription.tenant_id,
    })
}

/// Runs the directory bootstrap for `config.policy`.
///
/// `role` only applies to [`Policy::ReuseExisting`]; the explicit policy
/// always grants [`OWNER_ROLE`].
///
/// # Errors
///
/// Returns [`BootstrapError::InvalidConfig`](crate::BootstrapError::InvalidConfig)
/// for an unusable app or role name, and propagates every unrecognized
/// Azure CLI failure.
pub async fn run(
    runner: &dyn CommandRunner,
    compose: &Compose,
    config: &Config,
    role: Option<&str>,
) -> Result<BootstrapRecord> {
    validate_app_name(&config.ad_app_name)?;
    let az = AzureCli::new(runner, compose);

    match config.policy {
        Policy::ReuseExisting => {
            let role = role.unwrap_or(DEFAULT_ROLE);
            validate_role_name(role)?;
            reuse::run(&az, config, role).await
        }
        Policy::CreateExplicit => {
            if let Some(role) = role.filter(|r| *r != OWNER_ROLE) {
                warn!(
                    "Ignoring role {} for the explicit policy, which always grants {}",
                    role, OWNER_ROLE
                );
            }
            explicit::run(&az, config).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(password: &str) -> BootstrapRecord {
        BootstrapRecord {
            subscription_name: "sub".to_string(),
            subscription_id: "sub-id".to_string(),
            tenant_id: "tenant".to_string(),
            ad_sp_id: "sp".to_string(),
            ad_sp_name: "http://tf".to_string(),
            ad_sp_display_name: "tf".to_string(),
            ad_sp_password: password.to_string(),
            ad_app_id: None,
            role: Some("Reader".to_string()),
            role_assignment_id: None,
        }
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(record("HIDDEN").has_placeholder_password());
        assert!(record("hidden").has_placeholder_password());
        assert!(!record("p@ss").has_placeholder_password());
        assert!(!record(" hidden ").has_placeholder_password());
        assert!(!record("HIDDEN\n").has_placeholder_password());
    }

    #[test]
    fn test_redacted_and_debug() {
        let rec = record("real-secret");
        assert_eq!(rec.redacted().ad_sp_password, MASK);
        assert_eq!(record("HIDDEN").redacted().ad_sp_password, "HIDDEN");
        assert!(!format!("{:?}", rec).contains("real-secret"));
    }

    #[test]
    fn test_pretty_json_is_sorted_and_skips_absent_keys() {
        let json = record("x").to_pretty_json().unwrap();
        let keys: Vec<&str> = json
            .lines()
            .filter_map(|l| l.trim().strip_prefix('"'))
            .filter_map(|l| l.split('"').next())
            .collect();

        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(!json.contains("ad_app_id"));
        assert!(json.contains("\"role\": \"Reader\""));
    }

    #[test]
    fn test_resolve_subscription() {
        assert_eq!(resolve_subscription(""), DEFAULT_SUBSCRIPTION_ID);
        assert_eq!(resolve_subscription("CHANGEME"), DEFAULT_SUBSCRIPTION_ID);
        assert_eq!(resolve_subscription(" dev "), "dev");
    }
}
