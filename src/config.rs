//! Configuration types for zarr-export
//!
//! [`Config`] is what the operator writes (a JSON file, every field optional).
//! [`ExportPaths`] is the resolved, immutable pair of filesystem roots the
//! pipeline reads on every image; it is built once after the repository
//! connection exists and passed into the components that need it.

use crate::error::{Error, Result};
use crate::repository::Repository;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Repository configuration key holding the managed-storage root
pub const MANAGED_DIR_KEY: &str = "omero.managed.dir";

/// Repository configuration key holding the converter installation directory
pub const CONVERTER_DIR_KEY: &str = "omero.bf2raw.dir";

/// Converter executable name looked up on PATH as a last resort
pub const CONVERTER_BINARY_NAME: &str = "bioformats2raw";

/// Repository gateway connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Gateway base URL (default: "http://localhost:4080")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Session key sent as a bearer token
    #[serde(default)]
    pub session_key: Option<String>,

    /// Per-request timeout in seconds (default: 300)
    ///
    /// Uploads of large archives go through the same client, so keep this generous.
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_key: None,
            timeout: default_request_timeout(),
        }
    }
}

/// Filesystem locations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Managed-storage root (overrides `omero.managed.dir` from the repository)
    #[serde(default)]
    pub managed_dir: Option<PathBuf>,

    /// Converter installation directory (overrides `omero.bf2raw.dir` from the repository)
    #[serde(default)]
    pub converter_dir: Option<PathBuf>,

    /// Temporary root for conversion output and archives (default: system temp dir)
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            managed_dir: None,
            converter_dir: None,
            temp_dir: default_temp_dir(),
        }
    }
}

/// How a finished converter process is judged
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessPolicy {
    /// Success only if nothing at all was written to stderr; the exit code is ignored
    #[default]
    EmptyStderr,
    /// Success iff the process exits with status 0; stderr is only logged
    ExitCode,
}

/// External converter settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Converter executable, relative paths are resolved against the
    /// installation directory (default: "bin/bioformats2raw")
    #[serde(default = "default_converter_binary")]
    pub binary: PathBuf,

    /// Success classification (default: empty_stderr)
    #[serde(default)]
    pub success_policy: SuccessPolicy,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            binary: default_converter_binary(),
            success_policy: SuccessPolicy::default(),
        }
    }
}

/// Main configuration for zarr-export
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Repository gateway connection
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// External converter
    #[serde(default)]
    pub converter: ConverterConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        Self::from_json(&raw)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Config {
            message: format!("invalid configuration: {}", e),
            key: None,
        })
    }

    /// Temporary root
    pub fn temp_dir(&self) -> &PathBuf {
        &self.paths.temp_dir
    }
}

/// Process-wide filesystem roots, resolved once and never changed afterwards
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportPaths {
    /// Managed-storage root that file records are relative to
    pub managed_dir: PathBuf,
    /// Converter installation directory, used as the converter's working directory
    pub converter_dir: PathBuf,
}

impl ExportPaths {
    /// Build paths from explicit values
    pub fn new(managed_dir: impl Into<PathBuf>, converter_dir: impl Into<PathBuf>) -> Self {
        Self {
            managed_dir: managed_dir.into(),
            converter_dir: converter_dir.into(),
        }
    }

    /// Resolve both roots
    ///
    /// Explicit values in `paths` win. Otherwise the repository's configuration
    /// keys are asked. The converter directory finally falls back to the
    /// installation root of a `bioformats2raw` found on PATH.
    pub async fn resolve(paths: &PathsConfig, repository: &dyn Repository) -> Result<Self> {
        let managed_dir = match &paths.managed_dir {
            Some(dir) => dir.clone(),
            None => repository
                .config_value(MANAGED_DIR_KEY)
                .await?
                .map(PathBuf::from)
                .ok_or_else(|| Error::Config {
                    message: "managed-storage root is not configured".to_string(),
                    key: Some(MANAGED_DIR_KEY.to_string()),
                })?,
        };

        let converter_dir = match &paths.converter_dir {
            Some(dir) => dir.clone(),
            None => match repository.config_value(CONVERTER_DIR_KEY).await? {
                Some(dir) => PathBuf::from(dir),
                None => discover_converter_dir().ok_or_else(|| Error::Config {
                    message: format!(
                        "converter directory is not configured and {} is not on PATH",
                        CONVERTER_BINARY_NAME
                    ),
                    key: Some(CONVERTER_DIR_KEY.to_string()),
                })?,
            },
        };

        info!(?managed_dir, ?converter_dir, "resolved export paths");
        Ok(Self::new(managed_dir, converter_dir))
    }
}

/// Installation root of a converter found on PATH (`<root>/bin/bioformats2raw`)
fn discover_converter_dir() -> Option<PathBuf> {
    let binary = which::which(CONVERTER_BINARY_NAME).ok()?;
    debug!(?binary, "found converter on PATH");
    install_root(&binary)
}

fn install_root(binary: &Path) -> Option<PathBuf> {
    let bin_dir = binary.parent()?;
    match bin_dir.parent() {
        Some(root) if bin_dir.file_name().is_some_and(|n| n == "bin") => Some(root.to_path_buf()),
        _ => Some(bin_dir.to_path_buf()),
    }
}

fn default_base_url() -> String {
    "http://localhost:4080".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_converter_binary() -> PathBuf {
    PathBuf::from("bin").join(CONVERTER_BINARY_NAME)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
