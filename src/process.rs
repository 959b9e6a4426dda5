//! Subprocess execution for the external tools we drive.
//!
//! Everything this crate does happens through `docker-compose` and the Azure
//! CLI running inside a container. [`CommandRunner`] is the seam between the
//! workflow and the operating system: [`SystemRunner`] spawns real processes,
//! while [`MockRunner`](crate::mock::MockRunner) replays scripted output in
//! tests.

use crate::{BootstrapError, Result};
use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Replacement text for secrets in logs and error messages.
pub const MASK: &str = "*****";

/// A command line to execute, plus the secrets it carries.
///
/// Arguments are passed to the program directly, never through a shell.
/// `Display` renders the command with every registered secret replaced by
/// [`MASK`], so a `CommandSpec` can be logged safely.
///
/// # Example
///
/// ```
/// use azsp_bootstrap::process::CommandSpec;
///
/// let spec = CommandSpec::new("az")
///     .args(["login", "-u", "ops@example.com", "-p"])
///     .secret_arg("s3cret");
///
/// assert_eq!(spec.to_string(), "az login -u ops@example.com -p *****");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    secrets: Vec<String>,
}

impl CommandSpec {
    /// Creates a command for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            secrets: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Appends an argument whose value must never be displayed.
    pub fn secret_arg(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.secret(value.clone()).arg(value)
    }

    /// Registers a secret to mask without adding an argument.
    ///
    /// Empty strings are ignored, masking them would garble the output.
    pub fn secret(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() && !self.secrets.contains(&value) {
            self.secrets.push(value);
        }
        self
    }

    /// Sets an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, unmasked.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Extra environment variables.
    pub fn environment(&self) -> &[(String, String)] {
        &self.env
    }

    /// Returns `text` with every registered secret masked.
    pub fn mask(&self, text: &str) -> String {
        mask(text, &self.secrets)
    }

    /// Builds the error for a failed run, masking captured output.
    pub fn failure(&self, output: &CommandOutput) -> BootstrapError {
        BootstrapError::CommandFailed {
            command: self.to_string(),
            code: output.code,
            stdout: self.mask(&output.stdout),
            stderr: self.mask(&output.stderr),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push('\'');
                line.push_str(arg);
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        f.write_str(&self.mask(&line))
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal
    pub code: Option<i32>,
    /// Standard output (lossy UTF-8)
    pub stdout: String,
    /// Standard error (lossy UTF-8)
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run printing `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run with the given exit code and streams.
    pub fn failed(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes external commands.
///
/// Implementations must be `Send + Sync`; the workflow only ever holds a
/// shared reference and runs one command at a time.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command to completion and captures its output.
    ///
    /// A non-zero exit is *not* an error at this level.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::MissingTool`] if the program cannot be
    /// found, or [`BootstrapError::Io`] if it cannot be spawned.
    async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Checks whether `program` resolves on the search path.
    async fn exists(&self, program: &str) -> Result<bool>;

    /// Runs the command and returns stdout, failing on non-zero exit.
    ///
    /// The masked command line is logged at debug level before execution.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::CommandFailed`] with masked output when the
    /// process exits unsuccessfully.
    async fn run(&self, spec: &CommandSpec) -> Result<String> {
        debug!("cmd -> {}", spec);
        let output = self.output(spec).await?;
        if !output.success() {
            return Err(spec.failure(&output));
        }
        Ok(output.stdout)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut cmd = Command::new(spec.program());
        cmd.args(spec.arguments());
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        for (key, value) in spec.environment() {
            cmd.env(key, value);
        }

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BootstrapError::MissingTool(spec.program().to_string())
            } else {
                BootstrapError::Io(e)
            }
        })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn exists(&self, program: &str) -> Result<bool> {
        let status = Command::new("which")
            .arg(program)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(BootstrapError::Io)?;

        Ok(status.success())
    }
}

/// Replaces every occurrence of each secret in `text` with [`MASK`].
///
/// Longer secrets are replaced first so that a secret containing another
/// one is masked as a whole.
///
/// ```
/// use azsp_bootstrap::process::mask;
///
/// let secrets = vec!["hunter2".to_string()];
/// assert_eq!(mask("login -p hunter2", &secrets), "login -p *****");
/// ```
pub fn mask(text: &str, secrets: &[String]) -> String {
    let mut ordered: Vec<&String> = secrets.iter().filter(|s| !s.is_empty()).collect();
    ordered.sort_by_key(|s| std::cmp::Reverse(s.len()));

    let mut masked = text.to_string();
    for secret in ordered {
        masked = masked.replace(secret.as_str(), MASK);
    }
    masked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_masks_secret_args() {
        let spec = CommandSpec::new("docker-compose")
            .args(["exec", "-T", "azurecli", "az", "login", "-u", "me", "-p"])
            .secret_arg("pa55word");

        let rendered = spec.to_string();
        assert!(!rendered.contains("pa55word"));
        assert!(rendered.ends_with("-p *****"));
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let spec = CommandSpec::new("az").args(["role", "assignment", "create", "--role", "Storage Blob Data Reader"]);
        assert_eq!(
            spec.to_string(),
            "az role assignment create --role 'Storage Blob Data Reader'"
        );
    }

    #[test]
    fn test_empty_secret_is_ignored() {
        let spec = CommandSpec::new("echo").arg("abc").secret("");
        assert_eq!(spec.to_string(), "echo abc");
    }

    #[test]
    fn test_mask_prefers_longest_secret() {
        let secrets = vec!["abc".to_string(), "abcdef".to_string()];
        assert_eq!(mask("x abcdef y abc", &secrets), "x ***** y *****");
    }

    #[test]
    fn test_failure_masks_output() {
        let spec = CommandSpec::new("az").arg("login").secret("topsecret");
        let output = CommandOutput::failed(1, "", "bad password topsecret");

        match spec.failure(&output) {
            BootstrapError::CommandFailed { stderr, code, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "bad password *****");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_command_success() {
        let spec = CommandSpec::new("echo").arg("hello");
        let output = SystemRunner.run(&spec).await.unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_command_with_env() {
        let spec = CommandSpec::new("printenv")
            .arg("AZURE_CLI_VERSION")
            .env("AZURE_CLI_VERSION", "2.0.80");
        let output = SystemRunner.run(&spec).await.unwrap();
        assert_eq!(output.trim(), "2.0.80");
    }

    #[tokio::test]
    async fn test_run_command_not_found() {
        let spec = CommandSpec::new("nonexistent-command-12345");
        let result = SystemRunner.run(&spec).await;
        assert!(matches!(result, Err(BootstrapError::MissingTool(_))));
    }

    #[tokio::test]
    async fn test_run_command_failure_is_reported() {
        let spec = CommandSpec::new("sh").args(["-c", "echo boom >&2; exit 3"]);
        let err = SystemRunner.run(&spec).await.unwrap_err();

        match err {
            BootstrapError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_command_exists() {
        assert!(SystemRunner.exists("echo").await.unwrap());
        assert!(!SystemRunner.exists("nonexistent-command-12345").await.unwrap());
    }
}
