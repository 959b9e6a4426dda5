//! Operator tasks and their dependencies.
//!
//! | Task | Runs |
//! |------|------|
//! | `prerequisites` | tool + environment checks |
//! | `containerpull` | `docker-compose pull` |
//! | `containerup` | prerequisites, containerpull, `up -d`, `az login` |
//! | `bootstrap` | containerup, directory bootstrap, cache update |

use crate::bootstrap::{self, BootstrapRecord};
use crate::cache::{CacheFile, CacheWrite};
use crate::compose::Compose;
use crate::config::{Config, Policy, AZURE_CLI_VERSION};
use crate::process::CommandRunner;
use crate::{azure::AzureCli, preflight, Result};
use std::collections::HashMap;
use tracing::info;

/// Everything a task needs; nothing is read from globals.
pub struct Context<'a> {
    /// Executes `docker-compose` and, through it, `az`
    pub runner: &'a dyn CommandRunner,
    /// How to reach the Azure CLI container
    pub compose: Compose,
    /// Which bootstrap policy to apply
    pub policy: Policy,
    /// Where results are cached
    pub cache: CacheFile,
    /// Environment snapshot to read configuration from
    pub env: HashMap<String, String>,
}

/// Result of the `bootstrap` task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    /// Resolved identifiers
    pub record: BootstrapRecord,
    /// What happened to the cache file
    pub cache: CacheWrite,
}

impl<'a> Context<'a> {
    /// Compose settings with `AZURE_CLI_VERSION` forwarded when set.
    fn compose(&self) -> Compose {
        self.compose
            .clone()
            .with_cli_version(self.env.get(AZURE_CLI_VERSION).cloned())
    }

    /// Verifies tools and variables and returns the loaded configuration.
    pub async fn prerequisites(&self) -> Result<Config> {
        preflight::run(self.runner, &self.compose.program, self.policy, &self.env).await
    }

    /// Pulls the Azure CLI image.
    pub async fn container_pull(&self) -> Result<()> {
        self.compose().pull_image(self.runner).await
    }

    /// Runs prerequisites and pull, then starts the container and logs in.
    pub async fn container_up(&self) -> Result<Config> {
        let config = self.prerequisites().await?;
        self.container_pull().await?;

        let compose = self.compose();
        compose.start(self.runner).await?;
        AzureCli::new(self.runner, &compose)
            .login(&config.login_user, &config.login_password)
            .await?;

        Ok(config)
    }

    /// Runs containerup, the directory bootstrap, and the cache update.
    pub async fn bootstrap(&self, role: Option<&str>) -> Result<BootstrapOutcome> {
        let config = self.container_up().await?;
        let compose = self.compose();

        // Fail on an unusable cache before any credential is generated.
        self.cache.load().await?;

        info!("Bootstrapping '{}' with policy {}", config.ad_app_name, config.policy);
        let record = bootstrap::run(self.runner, &compose, &config, role).await?;
        let cache = self.cache.persist(&record).await?;

        Ok(BootstrapOutcome { record, cache })
    }
}
