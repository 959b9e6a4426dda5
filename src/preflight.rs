//! Preflight checks: required tools and environment variables.

use crate::config::{missing_vars, Config, Policy};
use crate::process::CommandRunner;
use crate::{BootstrapError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Fails with [`BootstrapError::MissingTool`] on the first tool not on PATH.
pub async fn check_tools(runner: &dyn CommandRunner, tools: &[&str]) -> Result<()> {
    for tool in tools {
        if !runner.exists(tool).await? {
            return Err(BootstrapError::MissingTool(tool.to_string()));
        }
        debug!("Found {}", tool);
    }
    Ok(())
}

/// Fails with [`BootstrapError::MissingConfig`] naming *every* missing variable.
pub fn check_env(required: &[&str], env: &HashMap<String, String>) -> Result<()> {
    let missing = missing_vars(required, env);
    if missing.is_empty() {
        return Ok(());
    }

    Err(BootstrapError::MissingConfig(missing))
}

/// Runs both checks for `policy` and loads the configuration.
///
/// The tool check runs first, as a missing compose binary makes the
/// variables moot.
pub async fn run(
    runner: &dyn CommandRunner,
    compose_program: &str,
    policy: Policy,
    env: &HashMap<String, String>,
) -> Result<Config> {
    check_tools(runner, &[compose_program]).await?;
    check_env(policy.required_vars(), env)?;
    Config::from_env(policy, env)
}
