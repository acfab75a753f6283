//! Error types for zarr-export
//!
//! Two layers of errors live here:
//! - [`Error`] is the crate-wide error returned by repository calls, configuration
//!   loading and the archive writer.
//! - [`ExportError`] is the per-image taxonomy. The orchestrator records one of these
//!   for every image it skips and moves on; none of them stop a batch.
//!
//! [`ConversionError`] is what a [`Converter`](crate::converter::Converter) reports.

use crate::types::ImageId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for zarr-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for zarr-export
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "omero.managed.dir")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error talking to the repository
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The repository answered with an unexpected status
    #[error("repository error (HTTP {status}): {message}")]
    Repository {
        /// HTTP status code returned by the repository gateway
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Zip writer error
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The selection expanded to zero images; the whole run stops here
    #[error("nothing to export: {message}")]
    EmptySelection {
        /// Accumulated user-facing message explaining what was (not) found
        message: String,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Why a single image was skipped
///
/// Every variant is non-fatal for the batch.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No eligible (non-sidecar) managed file exists for the image
    #[error("no exportable file found for image {image_id}")]
    ResolutionMiss {
        /// The image that had nothing to export
        image_id: ImageId,
    },

    /// Looking up the image's managed files failed
    #[error("failed to look up files for image {image_id}: {reason}")]
    Repository {
        /// The image whose lookup failed
        image_id: ImageId,
        /// The underlying repository error
        reason: String,
    },

    /// The converter failed or reported diagnostics
    #[error("conversion failed for image {image_id}: {source}")]
    ConversionFailed {
        /// The image whose conversion failed
        image_id: ImageId,
        /// What the converter reported
        #[source]
        source: ConversionError,
    },

    /// Packaging the conversion output failed
    #[error("archiving failed for image {image_id} ({archive}): {reason}")]
    ArchiveFailed {
        /// The image whose archive could not be written
        image_id: ImageId,
        /// The archive that was being written
        archive: PathBuf,
        /// The reason archiving failed
        reason: String,
    },

    /// Uploading or linking the archive failed
    #[error("attaching archive to image {image_id} failed: {reason}")]
    AttachFailed {
        /// The image the archive was meant for
        image_id: ImageId,
        /// The reason the attach call failed
        reason: String,
    },
}

impl ExportError {
    /// The image this error belongs to
    pub fn image_id(&self) -> ImageId {
        match self {
            ExportError::ResolutionMiss { image_id }
            | ExportError::Repository { image_id, .. }
            | ExportError::ConversionFailed { image_id, .. }
            | ExportError::ArchiveFailed { image_id, .. }
            | ExportError::AttachFailed { image_id, .. } => *image_id,
        }
    }

    /// Machine-readable stage code, used in logs and the run report
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::ResolutionMiss { .. } => "resolution_miss",
            ExportError::Repository { .. } => "repository_error",
            ExportError::ConversionFailed { .. } => "conversion_failed",
            ExportError::ArchiveFailed { .. } => "archive_failed",
            ExportError::AttachFailed { .. } => "attach_failed",
        }
    }
}

/// Errors reported by a [`Converter`](crate::converter::Converter)
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The converter binary could not be started
    #[error("failed to launch {binary}: {source}")]
    Launch {
        /// The binary that was being launched
        binary: PathBuf,
        /// The spawn error
        #[source]
        source: std::io::Error,
    },

    /// The converter wrote to stderr
    #[error("converter reported diagnostics: {stderr}")]
    Diagnostics {
        /// Captured stderr, lossily decoded
        stderr: String,
    },

    /// The converter exited unsuccessfully
    #[error("converter exited with status {}", describe_exit_code(.code))]
    ExitStatus {
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
    },

    /// Preparing the workspace or target directory failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "<signal>".to_string(),
    }
}
