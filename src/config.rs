//! Configuration loaded from the process environment.

use crate::{BootstrapError, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Operator login name for the containerized Azure CLI.
pub const AZURE_LOGIN_USER: &str = "AZURE_LOGIN_USER";
/// Operator password for the containerized Azure CLI.
pub const AZURE_LOGIN_PASSWORD: &str = "AZURE_LOGIN_PASSWORD";
/// Default Azure region.
pub const AZURE_LOCATION: &str = "AZURE_LOCATION";
/// Display name of the AD application / service principal.
pub const AZURE_AD_APP_NAME: &str = "AZURE_AD_APP_NAME";
/// Subscription name or id to bootstrap.
pub const AZURE_SUBSCRIPTION_NAME: &str = "AZURE_SUBSCRIPTION_NAME";
/// Azure CLI image tag, forwarded to docker-compose.
pub const AZURE_CLI_VERSION: &str = "AZURE_CLI_VERSION";
/// Credential set on a newly created AD application.
pub const AZURE_AD_APP_PASSWORD: &str = "AZURE_AD_APP_PASSWORD";

const REUSE_VARS: &[&str] = &[
    AZURE_LOGIN_USER,
    AZURE_LOGIN_PASSWORD,
    AZURE_LOCATION,
    AZURE_AD_APP_NAME,
    AZURE_SUBSCRIPTION_NAME,
];

const EXPLICIT_VARS: &[&str] = &[
    AZURE_LOGIN_USER,
    AZURE_LOGIN_PASSWORD,
    AZURE_LOCATION,
    AZURE_AD_APP_NAME,
    AZURE_SUBSCRIPTION_NAME,
    AZURE_CLI_VERSION,
    AZURE_AD_APP_PASSWORD,
];

/// How the directory objects are ensured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Policy {
    /// Reuse the principal already assigned to the app, or create one with
    /// `az ad sp create-for-rbac`.
    #[default]
    ReuseExisting,
    /// Ensure application, principal and an `Owner` assignment one by one.
    CreateExplicit,
}

impl Policy {
    /// Environment variables that must be set for this policy.
    pub fn required_vars(self) -> &'static [&'static str] {
        match self {
            Self::ReuseExisting => REUSE_VARS,
            Self::CreateExplicit => EXPLICIT_VARS,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReuseExisting => write!(f, "reuse"),
            Self::CreateExplicit => write!(f, "explicit"),
        }
    }
}

impl FromStr for Policy {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reuse" | "a" => Ok(Self::ReuseExisting),
            "explicit" | "b" => Ok(Self::CreateExplicit),
            other => Err(BootstrapError::InvalidConfig(format!(
                "unknown policy: {} (expected 'reuse' or 'explicit')",
                other
            ))),
        }
    }
}

/// Values read from the environment for one run.
///
/// `Debug` never prints the passwords.
#[derive(Clone)]
pub struct Config {
    /// Selected policy
    pub policy: Policy,
    /// `AZURE_LOGIN_USER`
    pub login_user: String,
    /// `AZURE_LOGIN_PASSWORD`
    pub login_password: String,
    /// `AZURE_LOCATION`
    pub location: String,
    /// `AZURE_AD_APP_NAME`
    pub ad_app_name: String,
    /// `AZURE_SUBSCRIPTION_NAME`
    pub subscription_name: String,
    /// `AZURE_CLI_VERSION`, required for [`Policy::CreateExplicit`]
    pub cli_version: Option<String>,
    /// `AZURE_AD_APP_PASSWORD`, required for [`Policy::CreateExplicit`]
    pub ad_app_password: Option<String>,
}

impl Config {
    /// Builds a configuration from an environment snapshot.
    ///
    /// Presence is all that is checked here: an empty value counts as set.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::MissingConfig`] listing *every* variable
    /// the policy requires that is absent from `env`.
    ///
    /// # Example
    ///
    /// ```
    /// use azsp_bootstrap::{BootstrapError, Config, Policy};
    /// use std::collections::HashMap;
    ///
    /// let env = HashMap::from([("AZURE_LOGIN_USER".to_string(), "ops".to_string())]);
    /// match Config::from_env(Policy::ReuseExisting, &env) {
    ///     Err(BootstrapError::MissingConfig(missing)) => assert_eq!(missing.len(), 4),
    ///     other => panic!("unexpected: {other:?}"),
    /// }
    /// ```
    pub fn from_env(policy: Policy, env: &HashMap<String, String>) -> Result<Self> {
        let missing = missing_vars(policy.required_vars(), env);
        if !missing.is_empty() {
            return Err(BootstrapError::MissingConfig(missing));
        }

        let get = |name: &str| env.get(name).cloned().unwrap_or_default();

        Ok(Self {
            policy,
            login_user: get(AZURE_LOGIN_USER),
            login_password: get(AZURE_LOGIN_PASSWORD),
            location: get(AZURE_LOCATION),
            ad_app_name: get(AZURE_AD_APP_NAME).trim().to_string(),
            subscription_name: get(AZURE_SUBSCRIPTION_NAME),
            cli_version: env.get(AZURE_CLI_VERSION).cloned(),
            ad_app_password: env.get(AZURE_AD_APP_PASSWORD).cloned(),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("policy", &self.policy)
            .field("login_user", &self.login_user)
            .field("login_password", &crate::process::MASK)
            .field("location", &self.location)
            .field("ad_app_name", &self.ad_app_name)
            .field("subscription_name", &self.subscription_name)
            .field("cli_version", &self.cli_version)
            .field(
                "ad_app_password",
                &self.ad_app_password.as_ref().map(|_| crate::process::MASK),
            )
            .finish()
    }
}

/// Names from `required` that are absent from `env`, in `required` order.
pub fn missing_vars(required: &[&str], env: &HashMap<String, String>) -> Vec<String> {
    required
        .iter()
        .filter(|name| !env.contains_key(**name))
        .map(|name| name.to_string())
        .collect()
}

/// Snapshot of the current process environment.
///
/// Variables whose name or value is not valid Unicode are skipped.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}
