//! azsp-bootstrap - idempotent Azure service principal bootstrap.
//!
//! Drives the Azure CLI inside a docker-compose service to make sure an AD
//! application, its service principal and a role assignment on a
//! subscription exist, then caches the identifiers Terraform (or anything
//! else) needs to authenticate non-interactively.
//!
//! # Workflow
//!
//! 1. **Preflight**: the compose binary is on PATH and every required
//!    `AZURE_*` variable is set ([`preflight`]).
//! 2. **Provisioning**: pull and start the container, `az login`
//!    ([`compose`], [`azure`]).
//! 3. **Directory bootstrap**: look up, create, or recover each object
//!    ([`bootstrap`], [`classify`]).
//! 4. **Cache**: merge the record into `cache.json` without ever replacing
//!    a real password with the placeholder ([`cache`]).
//!
//! # Quick Start
//!
//! ```no_run
//! use azsp_bootstrap::{config, CacheFile, Compose, Policy, SystemRunner};
//! use azsp_bootstrap::tasks::Context;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> azsp_bootstrap::Result<()> {
//!     let ctx = Context {
//!         runner: &SystemRunner,
//!         compose: Compose::default(),
//!         policy: Policy::ReuseExisting,
//!         cache: CacheFile::default(),
//!         env: config::process_env(),
//!     };
//!
//!     let outcome = ctx.bootstrap(Some("Reader")).await?;
//!     println!("{}", outcome.record.redacted().to_pretty_json()?);
//!     Ok(())
//! }
//! ```
//!
//! # Policies
//!
//! | Policy | Objects | Role | Extra variables |
//! |--------|---------|------|-----------------|
//! | `reuse` (default) | principal via `create-for-rbac` | `--role`, default `Reader` | none |
//! | `explicit` | application, principal, assignment | `Owner` | `AZURE_CLI_VERSION`, `AZURE_AD_APP_PASSWORD` |
//!
//! # Feature Flags
//!
//! - `mock` (default): [`mock::MockRunner`], a scripted [`CommandRunner`]
//!   for tests.

pub mod azure;
pub mod bootstrap;
pub mod cache;
pub mod classify;
pub mod compose;
pub mod config;
pub mod error;
pub mod logging;
pub mod preflight;
pub mod process;
pub mod tasks;
pub mod validation;

#[cfg(feature = "mock")]
pub mod mock;

pub use bootstrap::BootstrapRecord;
pub use cache::{CacheFile, CacheWrite};
pub use compose::Compose;
pub use config::{Config, Policy};
pub use error::{BootstrapError, Result};
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
