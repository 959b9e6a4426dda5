//! Task ordering, preflight reporting, cache safety and log masking.

#![cfg(feature = "mock")]

mod common;

use azsp_bootstrap::error::CACHE_CORRUPT_EXIT_CODE;
use azsp_bootstrap::mock::MockRunner;
use azsp_bootstrap::process::MASK;
use azsp_bootstrap::tasks::Context;
use azsp_bootstrap::{BootstrapError, CacheFile, CommandOutput, Compose, Policy};
use common::*;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[tokio::test]
async fn test_prerequisites_report_every_missing_variable() {
    let dir = tempdir().unwrap();
    let runner = MockRunner::new();
    runner.install("docker-compose").await;

    let mut ctx = context(&runner, Policy::ReuseExisting, &dir.path().join("cache.json"));
    ctx.env = HashMap::new();

    let err = ctx.prerequisites().await.unwrap_err();
    assert!(matches!(err, BootstrapError::MissingConfig(_)));
    assert_ne!(err.exit_code(), 0);

    let message = err.to_string();
    for name in [
        "AZURE_LOGIN_USER",
        "AZURE_LOGIN_PASSWORD",
        "AZURE_LOCATION",
        "AZURE_AD_APP_NAME",
        "AZURE_SUBSCRIPTION_NAME",
    ] {
        assert!(
            message.contains(&format!("Environment variable not set: {}", name)),
            "{name} missing from:\n{message}"
        );
    }
    assert!(runner.calls().await.is_empty());
}

#[tokio::test]
async fn test_missing_compose_stops_before_anything_runs() {
    let dir = tempdir().unwrap();
    let runner = MockRunner::new();

    let err = context(&runner, Policy::ReuseExisting, &dir.path().join("cache.json"))
        .container_up()
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Command not found -> docker-compose");
    assert!(runner.calls().await.is_empty());
}

#[tokio::test]
async fn test_container_up_runs_in_order() {
    let dir = tempdir().unwrap();
    let runner = provisioned_runner().await;

    context(&runner, Policy::ReuseExisting, &dir.path().join("cache.json"))
        .container_up()
        .await
        .unwrap();

    let steps: Vec<String> = runner
        .calls()
        .await
        .iter()
        .map(|c| {
            let args = c.arguments();
            ["pull", "up", "login"]
                .into_iter()
                .find(|step| args.iter().any(|a| a == step))
                .unwrap_or("other")
                .to_string()
        })
        .collect();
    assert_eq!(steps, ["pull", "up", "login"]);
}

#[tokio::test]
async fn test_corrupt_cache_stops_before_creating_principal() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("cache.json");
    std::fs::write(&cache_path, "{\"bootstrap\": ").unwrap();

    let runner = provisioned_runner().await;
    runner
        .on(&["role", "assignment", "list"], CommandOutput::ok("[]"))
        .await;
    runner
        .on(&["create-for-rbac"], CommandOutput::ok(created_for_rbac_json()))
        .await;

    let err = context(&runner, Policy::ReuseExisting, &cache_path)
        .bootstrap(None)
        .await
        .unwrap_err();

    assert!(matches!(err, BootstrapError::CacheCorrupt { .. }));
    assert_eq!(err.exit_code(), CACHE_CORRUPT_EXIT_CODE);
    assert_eq!(err.exit_code(), 211);
    assert_eq!(std::fs::read_to_string(&cache_path).unwrap(), "{\"bootstrap\": ");

    // No principal, and so no unrecoverable password, was generated.
    assert_eq!(runner.count(&["create-for-rbac"]).await, 0);
    assert_eq!(runner.count(&["role", "assignment"]).await, 0);
}

#[tokio::test]
async fn test_corrupt_cache_stops_explicit_policy_before_creating() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("cache.json");
    std::fs::write(&cache_path, "{ oops").unwrap();

    let runner = provisioned_runner().await;
    script_explicit(&runner).await;

    let err = context(&runner, Policy::CreateExplicit, &cache_path)
        .bootstrap(None)
        .await
        .unwrap_err();

    assert_eq!(err.exit_code(), CACHE_CORRUPT_EXIT_CODE);
    assert_eq!(runner.count(&["ad"]).await, 0);
    assert_eq!(std::fs::read_to_string(&cache_path).unwrap(), "{ oops");
}

#[tokio::test]
async fn test_unrelated_cache_keys_survive() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("cache.json");
    std::fs::write(&cache_path, r#"{"terraform": {"state": "remote"}}"#).unwrap();

    let runner = provisioned_runner().await;
    runner
        .on(&["role", "assignment", "list"], CommandOutput::ok("[]"))
        .await;
    runner
        .on(&["create-for-rbac"], CommandOutput::ok(created_for_rbac_json()))
        .await;

    context(&runner, Policy::ReuseExisting, &cache_path)
        .bootstrap(None)
        .await
        .unwrap();

    let document = CacheFile::new(&cache_path).load().await.unwrap().unwrap();
    assert_eq!(document["terraform"]["state"], "remote");
    assert_eq!(document["bootstrap"]["ad_sp_id"], "app-1");
}

#[tokio::test]
async fn test_configured_project_and_service_are_used() {
    let dir = tempdir().unwrap();
    let runner = MockRunner::new();
    runner.install("podman-compose").await;
    runner.on(&["pull", "cli"], CommandOutput::ok("")).await;
    runner.on(&["up", "-d", "cli"], CommandOutput::ok("")).await;
    runner.on(&["login"], CommandOutput::ok("[]")).await;

    let ctx = Context {
        runner: &runner,
        compose: Compose::default()
            .with_program("podman-compose")
            .with_project("infra")
            .with_service("cli"),
        policy: Policy::ReuseExisting,
        cache: CacheFile::new(dir.path().join("cache.json")),
        env: env(Policy::ReuseExisting),
    };
    ctx.container_up().await.unwrap();

    let calls = runner.calls().await;
    assert_eq!(calls.len(), 3);
    for call in &calls {
        assert_eq!(call.program(), "podman-compose");
        assert!(call
            .arguments()
            .windows(2)
            .any(|w| w == ["--project-name", "infra"]));
    }
    assert!(calls[2]
        .arguments()
        .windows(3)
        .any(|w| w == ["exec", "-T", "cli"]));
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn test_debug_logs_mask_passwords() {
    let dir = tempdir().unwrap();
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let runner = provisioned_runner().await;
    script_explicit(&runner).await;

    context(&runner, Policy::CreateExplicit, &dir.path().join("cache.json"))
        .bootstrap(None)
        .await
        .unwrap();

    let logs = captured.text();
    assert!(logs.contains("login"), "expected command logging:\n{logs}");
    assert!(logs.contains(MASK));
    assert!(!logs.contains(LOGIN_PASSWORD));
    assert!(!logs.contains(APP_PASSWORD));
}

#[tokio::test]
async fn test_failure_messages_mask_passwords() {
    let dir = tempdir().unwrap();
    let runner = MockRunner::new();
    runner.install("docker-compose").await;
    runner.on(&["pull"], CommandOutput::ok("")).await;
    runner.on(&["up"], CommandOutput::ok("")).await;
    runner
        .on(
            &["login"],
            CommandOutput::failed(1, "", "AADSTS50126: Invalid username or password."),
        )
        .await;

    let err = context(&runner, Policy::ReuseExisting, &dir.path().join("cache.json"))
        .container_up()
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("AADSTS50126"));
    assert!(message.contains(MASK));
    assert!(!message.contains(LOGIN_PASSWORD));
}

async fn script_explicit(runner: &MockRunner) {
    let app = format!(
        r#"{{"appId": "app-1", "displayName": "{app}", "identifierUris": ["http://{app}"]}}"#,
        app = APP_NAME
    );
    runner
        .on(
            &["ad", "app", "show"],
            CommandOutput::failed(3, "", "Resource not found"),
        )
        .await;
    runner.on(&["ad", "app", "create"], CommandOutput::ok(app)).await;
    runner
        .on(
            &["ad", "sp", "show"],
            CommandOutput::failed(3, "", "Resource not found"),
        )
        .await;
    runner
        .on(
            &["ad", "sp", "create"],
            CommandOutput::ok(r#"{"objectId": "sp-object-1", "appId": "app-1"}"#),
        )
        .await;
    runner
        .on(&["role", "assignment", "list"], CommandOutput::ok("[]"))
        .await;
    runner
        .on(
            &["role", "assignment", "create"],
            CommandOutput::ok(r#"{"id": "ra-owner", "principalId": "sp-object-1"}"#),
        )
        .await;
}
