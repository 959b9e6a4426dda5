//! Typed wrappers around the `az` commands the workflow issues.
//!
//! Every call goes through [`Compose::az`], i.e. runs inside the Azure CLI
//! container. Methods return the parsed JSON on success and the masked
//! [`BootstrapError::CommandFailed`] on non-zero exit, leaving the
//! not-found / already-exists decision to [`classify`](crate::classify).

mod models;

pub use models::{
    AdditionalProperties, Application, CreatedServicePrincipal, RoleAssignment, ServicePrincipal,
    Subscription,
};

use crate::compose::Compose;
use crate::process::{CommandRunner, CommandSpec};
use crate::{BootstrapError, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Identifier URI / service principal name derived from an app name.
///
/// ```
/// assert_eq!(azsp_bootstrap::azure::identifier_uri("tf"), "http://tf");
/// ```
pub fn identifier_uri(app_name: &str) -> String {
    format!("http://{}", app_name)
}

/// Scope string for a whole subscription.
pub fn subscription_scope(subscription_id: &str) -> String {
    format!("/subscriptions/{}", subscription_id)
}

/// Azure CLI client bound to a runner and a compose service.
pub struct AzureCli<'a> {
    runner: &'a dyn CommandRunner,
    compose: &'a Compose,
}

impl<'a> AzureCli<'a> {
    /// Creates a client.
    pub fn new(runner: &'a dyn CommandRunner, compose: &'a Compose) -> Self {
        Self { runner, compose }
    }

    async fn json<T: DeserializeOwned>(&self, spec: CommandSpec) -> Result<T> {
        let stdout = self.runner.run(&spec).await?;
        serde_json::from_str(stdout.trim()).map_err(|source| BootstrapError::UnexpectedOutput {
            command: spec.to_string(),
            source,
        })
    }

    /// `az login -u <user> -p <password>`; the password is masked everywhere.
    pub async fn login(&self, user: &str, password: &str) -> Result<()> {
        info!("Logging in to Azure as {}", user);
        let spec = self.compose.az(["login", "-u", user, "-p"]).secret_arg(password);
        self.runner.run(&spec).await?;
        Ok(())
    }

    /// `az account show --subscription <name>`
    pub async fn account_show(&self, subscription: &str) -> Result<Subscription> {
        let subscription: Subscription = self
            .json(self.compose.az(["account", "show", "--subscription", subscription]))
            .await?;
        debug!("Subscription info -> {:?}", subscription);
        Ok(subscription)
    }

    /// `az role assignment list --assignee <assignee>`
    pub async fn role_assignments_for(&self, assignee: &str) -> Result<Vec<RoleAssignment>> {
        self.json(
            self.compose
                .az(["role", "assignment", "list", "--assignee", assignee]),
        )
        .await
    }

    /// `az role assignment list --assignee <assignee> --role <role> --scope <scope>`
    pub async fn role_assignments(
        &self,
        assignee: &str,
        role: &str,
        scope: &str,
    ) -> Result<Vec<RoleAssignment>> {
        self.json(self.compose.az([
            "role",
            "assignment",
            "list",
            "--assignee",
            assignee,
            "--role",
            role,
            "--scope",
            scope,
        ]))
        .await
    }

    /// `az role assignment create --assignee <assignee> --role <role> --scope <scope>`
    pub async fn create_role_assignment(
        &self,
        assignee: &str,
        role: &str,
        scope: &str,
    ) -> Result<RoleAssignment> {
        self.json(self.compose.az([
            "role",
            "assignment",
            "create",
            "--assignee",
            assignee,
            "--role",
            role,
            "--scope",
            scope,
        ]))
        .await
    }

    /// `az ad sp create-for-rbac --role <role> --name <name>`
    ///
    /// The raw output carries the generated password and is never logged.
    pub async fn create_for_rbac(&self, name: &str, role: &str) -> Result<CreatedServicePrincipal> {
        let spec = self
            .compose
            .az(["ad", "sp", "create-for-rbac", "--role", role, "--name", name]);
        let created: CreatedServicePrincipal = self.json(spec).await?;
        debug!("Azure sp ID info -> {:?}", created);
        Ok(created)
    }

    /// `az ad sp list --display-name <name>`
    pub async fn service_principals(&self, display_name: &str) -> Result<Vec<ServicePrincipal>> {
        self.json(
            self.compose
                .az(["ad", "sp", "list", "--display-name", display_name]),
        )
        .await
    }

    /// `az ad sp show --id <id>`
    pub async fn service_principal(&self, id: &str) -> Result<ServicePrincipal> {
        self.json(self.compose.az(["ad", "sp", "show", "--id", id])).await
    }

    /// `az ad sp create --id <app_id>`
    pub async fn create_service_principal(&self, app_id: &str) -> Result<ServicePrincipal> {
        self.json(self.compose.az(["ad", "sp", "create", "--id", app_id]))
            .await
    }

    /// `az ad app show --id <id>`
    pub async fn application(&self, id: &str) -> Result<Application> {
        self.json(self.compose.az(["ad", "app", "show", "--id", id])).await
    }

    /// `az ad app list --display-name <name>`
    pub async fn applications(&self, display_name: &str) -> Result<Vec<Application>> {
        self.json(
            self.compose
                .az(["ad", "app", "list", "--display-name", display_name]),
        )
        .await
    }

    /// `az ad app create --display-name <name> --identifier-uris <uri> --password <pw>`
    pub async fn create_application(
        &self,
        display_name: &str,
        identifier_uri: &str,
        password: &str,
    ) -> Result<Application> {
        let spec = self
            .compose
            .az([
                "ad",
                "app",
                "create",
                "--display-name",
                display_name,
                "--identifier-uris",
                identifier_uri,
                "--password",
            ])
            .secret_arg(password);
        self.json(spec).await
    }
}
