//! Shared fixtures for workflow tests.

#![allow(dead_code)]

use azsp_bootstrap::mock::MockRunner;
use azsp_bootstrap::tasks::Context;
use azsp_bootstrap::{CacheFile, CommandOutput, Compose, Policy};
use std::collections::HashMap;
use std::path::Path;

pub const LOGIN_PASSWORD: &str = "L0gin-P@ss";
pub const APP_PASSWORD: &str = "App-Secr3t";
pub const GENERATED_PASSWORD: &str = "generated-by-azure";
pub const APP_NAME: &str = "terraform-ci";

pub const SUBSCRIPTION_JSON: &str =
    r#"{"id": "sub-1", "tenantId": "tenant-1", "name": "Development", "isDefault": true}"#;

pub const ROLE_ASSIGNMENT_BAD_REQUEST: &str = "ERROR: Operation failed with status: 'Bad Request'. Details: 400 Client Error: Bad Request for url: https://graph.windows.net/tenant-1/servicePrincipals";

pub const SP_ALREADY_EXISTS: &str = "azure.graphrbac.models.graph_error.GraphErrorException: Another object with the same value for property servicePrincipalNames already exists.";

pub fn env(policy: Policy) -> HashMap<String, String> {
    let mut env = HashMap::from([
        ("AZURE_LOGIN_USER".to_string(), "ops@example.com".to_string()),
        ("AZURE_LOGIN_PASSWORD".to_string(), LOGIN_PASSWORD.to_string()),
        ("AZURE_LOCATION".to_string(), "westeurope".to_string()),
        ("AZURE_AD_APP_NAME".to_string(), APP_NAME.to_string()),
        ("AZURE_SUBSCRIPTION_NAME".to_string(), "Development".to_string()),
    ]);
    if policy == Policy::CreateExplicit {
        env.insert("AZURE_CLI_VERSION".to_string(), "2.0.80".to_string());
        env.insert("AZURE_AD_APP_PASSWORD".to_string(), APP_PASSWORD.to_string());
    }
    env
}

pub fn context<'a>(runner: &'a MockRunner, policy: Policy, cache: &Path) -> Context<'a> {
    Context {
        runner,
        compose: Compose::default(),
        policy,
        cache: CacheFile::new(cache),
        env: env(policy),
    }
}

/// Installs docker-compose and scripts pull, up, login and account show.
pub async fn provisioned_runner() -> MockRunner {
    let runner = MockRunner::new();
    runner.install("docker-compose").await;
    runner.on(&["pull", "azurecli"], CommandOutput::ok("")).await;
    runner.on(&["up", "-d", "azurecli"], CommandOutput::ok("")).await;
    runner.on(&["login"], CommandOutput::ok("[]")).await;
    runner
        .on(&["account", "show"], CommandOutput::ok(SUBSCRIPTION_JSON))
        .await;
    runner
}

pub fn existing_assignment_json() -> String {
    format!(
        r#"[{{"id": "/subscriptions/sub-1/providers/Microsoft.Authorization/roleAssignments/ra-1",
            "principalId": "sp-object-1",
            "principalName": "http://{app}",
            "roleDefinitionName": "Reader",
            "scope": "/subscriptions/sub-1"}}]"#,
        app = APP_NAME
    )
}

pub fn created_for_rbac_json() -> String {
    format!(
        r#"{{"appId": "app-1", "displayName": "{app}", "name": "http://{app}", "password": "{pw}", "tenant": "tenant-1"}}"#,
        app = APP_NAME,
        pw = GENERATED_PASSWORD
    )
}

pub fn sp_list_json() -> String {
    format!(
        r#"[
            {{"objectId": "unrelated", "servicePrincipalNames": ["http://{app}-old"],
              "additionalProperties": {{"appDisplayName": "{app}"}}}},
            {{"objectId": "sp-object-1", "appId": "app-1",
              "servicePrincipalNames": ["app-1", "http://{app}"],
              "additionalProperties": {{"appDisplayName": "{app}"}}}}
        ]"#,
        app = APP_NAME
    )
}
