//! Converter backed by the external bioformats2raw binary

use super::{Converter, check_output};
use crate::config::SuccessPolicy;
use crate::error::ConversionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs `bioformats2raw --file_type=zarr <source> <target>`
///
/// The process runs with its working directory set to the converter's
/// installation directory. Both output streams are captured in full and the
/// call waits for the process without a timeout; a converter that never exits
/// stalls the batch.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use zarr_export::config::SuccessPolicy;
/// use zarr_export::converter::{Bioformats2Raw, Converter};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = Bioformats2Raw::new(
///     Path::new("/opt/bioformats2raw"),
///     Path::new("bin/bioformats2raw"),
///     SuccessPolicy::EmptyStderr,
/// );
/// converter
///     .convert(Path::new("/data/cells.czi"), Path::new("/tmp/out/cells.czi"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Bioformats2Raw {
    binary_path: PathBuf,
    working_dir: PathBuf,
    policy: SuccessPolicy,
}

impl Bioformats2Raw {
    /// Create a converter installed at `install_dir`
    ///
    /// A relative `binary` is resolved against `install_dir`.
    pub fn new(install_dir: &Path, binary: &Path, policy: SuccessPolicy) -> Self {
        Self {
            binary_path: install_dir.join(binary),
            working_dir: install_dir.to_path_buf(),
            policy,
        }
    }

    /// Full path of the executable that will be spawned
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

#[async_trait]
impl Converter for Bioformats2Raw {
    async fn convert(&self, source: &Path, target: &Path) -> Result<(), ConversionError> {
        debug!(
            binary = ?self.binary_path,
            cwd = ?self.working_dir,
            ?source,
            ?target,
            "spawning converter"
        );

        let output = Command::new(&self.binary_path)
            .arg("--file_type=zarr")
            .arg(source)
            .arg(target)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ConversionError::Launch {
                binary: self.binary_path.clone(),
                source: e,
            })?;

        debug!(
            status = ?output.status,
            stdout_len = output.stdout.len(),
            stderr_len = output.stderr.len(),
            "converter exited"
        );

        let result = check_output(&output, self.policy);
        if let Err(ConversionError::Diagnostics { stderr }) = &result {
            warn!(?source, stderr = %stderr, "converter wrote to stderr");
        }
        result
    }

    fn name(&self) -> &'static str {
        "bioformats2raw"
    }
}
