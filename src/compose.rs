//! docker-compose plumbing for the Azure CLI container.

use crate::config::AZURE_CLI_VERSION;
use crate::process::{CommandRunner, CommandSpec};
use crate::Result;
use tracing::{debug, info};

/// Default compose executable.
pub const DEFAULT_PROGRAM: &str = "docker-compose";
/// Default compose project name.
pub const DEFAULT_PROJECT: &str = "azurespbootstrap";
/// Default compose service hosting the Azure CLI.
pub const DEFAULT_SERVICE: &str = "azurecli";
/// Azure CLI path inside the container.
pub const DEFAULT_AZ_PATH: &str = "/usr/local/bin/az";

/// How to reach the containerized Azure CLI.
///
/// ```
/// use azsp_bootstrap::compose::Compose;
///
/// let compose = Compose::default().with_project("ci");
/// assert_eq!(compose.pull().to_string(), "docker-compose --project-name ci pull azurecli");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compose {
    /// Compose executable
    pub program: String,
    /// `--project-name` value
    pub project: String,
    /// Service running the Azure CLI
    pub service: String,
    /// `az` path inside the service container
    pub az_path: String,
    /// Image tag forwarded as `AZURE_CLI_VERSION`
    pub cli_version: Option<String>,
}

impl Default for Compose {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            project: DEFAULT_PROJECT.to_string(),
            service: DEFAULT_SERVICE.to_string(),
            az_path: DEFAULT_AZ_PATH.to_string(),
            cli_version: None,
        }
    }
}

impl Compose {
    /// Sets the compose executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Sets the compose project name.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// Sets the service hosting the Azure CLI.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Forwards an Azure CLI image tag to the compose file.
    pub fn with_cli_version(mut self, version: Option<String>) -> Self {
        self.cli_version = version.filter(|v| !v.trim().is_empty());
        self
    }

    fn base(&self) -> CommandSpec {
        let spec = CommandSpec::new(&self.program).args(["--project-name", self.project.as_str()]);
        match &self.cli_version {
            Some(version) => spec.env(AZURE_CLI_VERSION, version),
            None => spec,
        }
    }

    /// `<compose> pull <service>`
    pub fn pull(&self) -> CommandSpec {
        self.base().args(["pull", self.service.as_str()])
    }

    /// `<compose> up -d <service>`
    pub fn up(&self) -> CommandSpec {
        self.base().args(["up", "-d", self.service.as_str()])
    }

    /// `<compose> exec -T <service> <az> <args...>`
    pub fn az<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base()
            .args(["exec", "-T", self.service.as_str(), self.az_path.as_str()])
            .args(args)
    }

    /// Pulls the Azure CLI image.
    pub async fn pull_image(&self, runner: &dyn CommandRunner) -> Result<()> {
        info!("Pulling container for service {}", self.service);
        runner.run(&self.pull()).await?;
        Ok(())
    }

    /// Starts the Azure CLI service detached.
    pub async fn start(&self, runner: &dyn CommandRunner) -> Result<()> {
        info!("Starting service {} (project {})", self.service, self.project);
        let output = runner.run(&self.up()).await?;
        debug!("compose up -> {}", output.trim());
        Ok(())
    }
}
