//! Local JSON cache of bootstrap results.
//!
//! The cache is what downstream tooling reads to authenticate as the
//! principal, and it is the only place a generated password survives. Two
//! rules protect it:
//!
//! - a file that exists but does not parse is never touched
//!   ([`BootstrapError::CacheCorrupt`], exit status 211);
//! - a record carrying the placeholder password never replaces an existing
//!   file, since that file may hold the real credential.

use crate::bootstrap::BootstrapRecord;
use crate::{BootstrapError, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Top-level key holding the [`BootstrapRecord`].
pub const CACHE_KEY: &str = "bootstrap";

/// Default cache location, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = "./cache.json";

/// What [`CacheFile::persist`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    /// No file existed; a new one was written.
    Created,
    /// An existing file was replaced with the merged document.
    Updated,
    /// The record only had the placeholder password; the file was left alone.
    Skipped,
}

/// Cache file handle.
///
/// # Security
///
/// - The file is written with mode 0600 on Unix; it contains a credential
/// - Writes go to a sibling `.tmp` file that is renamed over the cache
/// - The password never appears in log output
///
/// # Example
///
/// ```no_run
/// use azsp_bootstrap::cache::CacheFile;
///
/// #[tokio::main]
/// async fn main() -> azsp_bootstrap::Result<()> {
///     let cache = CacheFile::new("./cache.json");
///     if let Some(document) = cache.load().await? {
///         println!("cached keys: {:?}", document.keys().collect::<Vec<_>>());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    /// Creates a handle; nothing is read until [`load`](Self::load).
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Cache file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the cache.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::CacheCorrupt`] if the file is not a JSON
    /// object, and [`BootstrapError::Io`] for other read failures.
    pub async fn load(&self) -> Result<Option<Map<String, Value>>> {
        let data = match fs::read(&self.path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Object(document)) => Ok(Some(document)),
            Ok(other) => Err(self.corrupt(format!("top level is {}, expected an object", kind(&other)))),
            Err(e) => Err(self.corrupt(e.to_string())),
        }
    }

    /// Reads the cached record, if any.
    pub async fn record(&self) -> Result<Option<BootstrapRecord>> {
        let Some(mut document) = self.load().await? else {
            return Ok(None);
        };
        match document.remove(CACHE_KEY) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Merges `record` into the cache under [`CACHE_KEY`].
    ///
    /// Other top-level keys are preserved. The output is pretty-printed with
    /// sorted keys.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::CacheCorrupt`] without writing if the
    /// existing file cannot be parsed.
    pub async fn persist(&self, record: &BootstrapRecord) -> Result<CacheWrite> {
        let existing = self.load().await?;

        if existing.is_some() && record.has_placeholder_password() {
            info!(
                "Not refreshing cache file {} because the password may be overwritten",
                self.path.display()
            );
            return Ok(CacheWrite::Skipped);
        }

        let outcome = if existing.is_some() {
            CacheWrite::Updated
        } else {
            CacheWrite::Created
        };

        let mut document = existing.unwrap_or_default();
        document.insert(CACHE_KEY.to_string(), serde_json::to_value(record)?);

        let mut json = serde_json::to_vec_pretty(&Value::Object(document))?;
        json.push(b'\n');
        self.write(&json).await?;

        info!("Cache file {} written", self.path.display());
        Ok(outcome)
    }

    /// Writes `json` to a sibling temporary file, then renames it over the
    /// cache so the previous contents survive a failed write.
    async fn write(&self, json: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let staging = self.staging_path();
        if let Err(e) = write_staging(&staging, json).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }

        if let Err(e) = fs::rename(&staging, &self.path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }

        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_CACHE_FILE.trim_start_matches("./").into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupt(&self, reason: String) -> BootstrapError {
        BootstrapError::CacheCorrupt {
            path: self.path.clone(),
            reason,
        }
    }
}

impl Default for CacheFile {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_FILE)
    }
}

async fn write_staging(staging: &Path, json: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(staging).await?;

    // mode() only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(staging, std::fs::Permissions::from_mode(0o600)).await?;
    }

    file.write_all(json).await?;
    file.sync_all().await?;

    Ok(())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
