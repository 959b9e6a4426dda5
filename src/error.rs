//! Error types for bootstrap operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`BootstrapError`].
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Exit status used when the cache file exists but cannot be parsed.
pub const CACHE_CORRUPT_EXIT_CODE: u8 = 211;

/// Errors that can occur while bootstrapping.
///
/// A "recognized conflict" (an `already exists` failure from the Azure CLI)
/// is never surfaced as an error value: the workflow consumes it through
/// [`classify`](crate::classify) and recovers the existing object instead.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// A required executable is not on the search path.
    #[error("Command not found -> {0}")]
    MissingTool(String),

    /// One or more required environment variables are unset.
    ///
    /// Every missing name is listed, one per line.
    #[error("{}", missing_report(.0))]
    MissingConfig(Vec<String>),

    /// A configuration value was present but rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An external command exited unsuccessfully.
    ///
    /// `command`, `stdout` and `stderr` have already been masked.
    #[error("{command} failed with exit code {}: {}", exit_label(.code), output_summary(.stdout, .stderr))]
    CommandFailed {
        /// Rendered command line
        command: String,
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// An external command succeeded but printed something we could not parse.
    #[error("unexpected output from {command}: {source}")]
    UnexpectedOutput {
        /// Rendered command line
        command: String,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// Creation reported an existing object, but the listing did not contain it.
    #[error("object reported as existing but could not be resolved: {0}")]
    NotResolved(String),

    /// The cache file exists but is not a JSON object.
    #[error("Cache file {} exists but is not a valid JSON file ({reason}). Fix it or remove it and retry.", .path.display())]
    CacheCorrupt {
        /// Cache file location
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error (catch-all).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BootstrapError {
    /// Process exit status for this error.
    ///
    /// # Example
    ///
    /// ```
    /// use azsp_bootstrap::BootstrapError;
    ///
    /// let err = BootstrapError::CacheCorrupt {
    ///     path: "cache.json".into(),
    ///     reason: "expected value".to_string(),
    /// };
    /// assert_eq!(err.exit_code(), 211);
    /// assert_eq!(BootstrapError::MissingTool("docker-compose".into()).exit_code(), 1);
    /// ```
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::CacheCorrupt { .. } => CACHE_CORRUPT_EXIT_CODE,
            _ => 1,
        }
    }

    /// Combined stdout and stderr of a failed command, if this is one.
    ///
    /// The Azure CLI is inconsistent about which stream carries its error
    /// message, so classification looks at both.
    pub fn failure_text(&self) -> Option<String> {
        match self {
            Self::CommandFailed { stdout, stderr, .. } => Some(format!("{}\n{}", stdout, stderr)),
            _ => None,
        }
    }
}

fn missing_report(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("Environment variable not set: {}", name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string())
}

fn output_summary(stdout: &str, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.to_string()
    }
}
