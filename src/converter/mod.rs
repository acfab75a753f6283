//! Image to Zarr conversion
//!
//! The external converter is hidden behind the [`Converter`] trait so the
//! orchestrator never sees process handling or the success policy:
//!
//! - [`Bioformats2Raw`]: runs the external `bioformats2raw` binary
//!
//! [`ConversionRunner`] sits in front of a converter and turns a managed file
//! record into concrete source and target paths.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use zarr_export::config::{ExportPaths, SuccessPolicy};
//! use zarr_export::converter::{Bioformats2Raw, ConversionRunner};
//! use zarr_export::types::ManagedFileRecord;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = ExportPaths::new("/OMERO/ManagedRepository", "/opt/bioformats2raw");
//! let converter = Bioformats2Raw::new(
//!     &paths.converter_dir,
//!     Path::new("bin/bioformats2raw"),
//!     SuccessPolicy::EmptyStderr,
//! );
//! let runner = ConversionRunner::new(paths, Arc::new(converter));
//!
//! let record = ManagedFileRecord::new("user_3/2024-05/12", "cells.czi");
//! let output = runner.convert(&record, Path::new("/tmp/image-42")).await?;
//! println!("zarr written to {}", output.display());
//! # Ok(())
//! # }
//! ```

mod cli;

pub use cli::Bioformats2Raw;

use crate::config::{ExportPaths, SuccessPolicy};
use crate::error::ConversionError;
use crate::types::ManagedFileRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use tracing::{debug, warn};

/// Capability to convert one source file into a Zarr store
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert `source` into a Zarr store under the existing directory `target`
    ///
    /// Blocks the calling task until the conversion is finished.
    async fn convert(&self, source: &Path, target: &Path) -> Result<(), ConversionError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Judge a finished converter process under `policy`
///
/// With [`SuccessPolicy::EmptyStderr`] any stderr output at all, even a single
/// whitespace character, is a failure and the exit status is not looked at.
pub fn check_output(output: &Output, policy: SuccessPolicy) -> Result<(), ConversionError> {
    match policy {
        SuccessPolicy::EmptyStderr => check_stderr(&output.stderr),
        SuccessPolicy::ExitCode => {
            if !output.stderr.is_empty() {
                debug!(stderr = %String::from_utf8_lossy(&output.stderr), "converter stderr");
            }
            if output.status.success() {
                Ok(())
            } else {
                Err(ConversionError::ExitStatus {
                    code: output.status.code(),
                })
            }
        }
    }
}

/// Strict stderr check: empty means success
pub fn check_stderr(stderr: &[u8]) -> Result<(), ConversionError> {
    if stderr.is_empty() {
        Ok(())
    } else {
        Err(ConversionError::Diagnostics {
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        })
    }
}

/// Maps managed file records onto converter invocations
pub struct ConversionRunner {
    paths: ExportPaths,
    converter: Arc<dyn Converter>,
}

impl ConversionRunner {
    /// Create a runner reading files below `paths.managed_dir`
    pub fn new(paths: ExportPaths, converter: Arc<dyn Converter>) -> Self {
        Self { paths, converter }
    }

    /// Absolute location of `record` in managed storage
    pub fn source_path(&self, record: &ManagedFileRecord) -> PathBuf {
        self.paths.managed_dir.join(&record.path).join(&record.name)
    }

    /// Convert `record` into `output_root/<record.name>` and return that directory
    ///
    /// The target directory is created if needed. On failure it is left in
    /// place with whatever the converter managed to write.
    pub async fn convert(
        &self,
        record: &ManagedFileRecord,
        output_root: &Path,
    ) -> Result<PathBuf, ConversionError> {
        let source = self.source_path(record);
        let target = output_root.join(&record.name);
        tokio::fs::create_dir_all(&target).await?;

        debug!(
            converter = self.converter.name(),
            ?source,
            ?target,
            "starting conversion"
        );

        match self.converter.convert(&source, &target).await {
            Ok(()) => Ok(target),
            Err(e) => {
                warn!(
                    converter = self.converter.name(),
                    ?source,
                    leftover = ?target,
                    error = %e,
                    "conversion failed"
                );
                Err(e)
            }
        }
    }
}
