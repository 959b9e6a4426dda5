//! Mock command runner for testing.
//!
//! Replays scripted [`CommandOutput`]s instead of spawning processes, and
//! records every command it was asked to run so tests can assert on the
//! exact invocation sequence.

use crate::process::{CommandOutput, CommandRunner, CommandSpec};
use crate::{BootstrapError, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A scripted response, selected when the command's arguments contain
/// `pattern` as a contiguous run.
#[derive(Debug, Clone)]
struct Expectation {
    pattern: Vec<String>,
    output: CommandOutput,
    once: bool,
}

impl Expectation {
    fn matches(&self, spec: &CommandSpec) -> bool {
        let args = spec.arguments();
        if self.pattern.is_empty() {
            return true;
        }
        args.windows(self.pattern.len())
            .any(|window| window == self.pattern.as_slice())
    }
}

/// Mock runner for testing.
///
/// Expectations are checked in registration order; the first match wins.
/// Expectations registered with [`once`](MockRunner::once) are consumed on
/// use, which lets a test script "fail the first time, succeed afterwards".
/// A command with no matching expectation fails the test run with
/// [`BootstrapError::Other`].
///
/// # Example
///
/// ```
/// use azsp_bootstrap::mock::MockRunner;
/// use azsp_bootstrap::process::{CommandOutput, CommandRunner, CommandSpec};
///
/// #[tokio::main]
/// async fn main() -> azsp_bootstrap::Result<()> {
///     let runner = MockRunner::new();
///     runner.on(&["account", "show"], CommandOutput::ok("{}")).await;
///
///     let spec = CommandSpec::new("az").args(["account", "show"]);
///     assert_eq!(runner.run(&spec).await?, "{}");
///     assert_eq!(runner.calls().await.len(), 1);
///     Ok(())
/// }
/// ```
pub struct MockRunner {
    expectations: Arc<RwLock<Vec<Expectation>>>,
    calls: Arc<RwLock<Vec<CommandSpec>>>,
    installed: Arc<RwLock<HashSet<String>>>,
}

impl MockRunner {
    /// Creates a runner with no expectations and no installed programs.
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(RwLock::new(Vec::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            installed: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Responds with `output` whenever the arguments contain `pattern`.
    pub async fn on(&self, pattern: &[&str], output: CommandOutput) {
        self.push(pattern, output, false).await;
    }

    /// Responds with `output` the first time the arguments contain `pattern`.
    pub async fn once(&self, pattern: &[&str], output: CommandOutput) {
        self.push(pattern, output, true).await;
    }

    /// Marks `program` as resolvable by [`CommandRunner::exists`].
    pub async fn install(&self, program: impl Into<String>) {
        self.installed.write().await.insert(program.into());
    }

    /// Every command run so far, in order.
    pub async fn calls(&self) -> Vec<CommandSpec> {
        self.calls.read().await.clone()
    }

    /// Number of recorded calls whose arguments contain `pattern`.
    pub async fn count(&self, pattern: &[&str]) -> usize {
        let query = Expectation {
            pattern: pattern.iter().map(|s| s.to_string()).collect(),
            output: CommandOutput::default(),
            once: false,
        };
        self.calls
            .read()
            .await
            .iter()
            .filter(|spec| query.matches(spec))
            .count()
    }

    async fn push(&self, pattern: &[&str], output: CommandOutput, once: bool) {
        self.expectations.write().await.push(Expectation {
            pattern: pattern.iter().map(|s| s.to_string()).collect(),
            output,
            once,
        });
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.write().await.push(spec.clone());

        let mut expectations = self.expectations.write().await;
        let position = expectations
            .iter()
            .position(|e| e.matches(spec))
            .ok_or_else(|| {
                BootstrapError::Other(anyhow::anyhow!("unexpected command: {}", spec))
            })?;

        let output = expectations[position].output.clone();
        if expectations[position].once {
            expectations.remove(position);
        }
        Ok(output)
    }

    async fn exists(&self, program: &str) -> Result<bool> {
        Ok(self.installed.read().await.contains(program))
    }
}
