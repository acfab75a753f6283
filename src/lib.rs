//! # zarr-export
//!
//! Batch-converts images held in an image repository's managed storage to Zarr
//! with `bioformats2raw`, zips each result and attaches the zip back onto the
//! source image as a file annotation.
//!
//! ## Pipeline
//!
//! For every image of a selection (images, or every image of some datasets):
//!
//! 1. [`PathResolver`] finds the image's primary file, skipping import logs
//!    and metadata sidecars
//! 2. [`ConversionRunner`] runs a [`Converter`] against it in a per-image
//!    temporary directory
//! 3. [`archive::compress_dir`] zips the output
//! 4. [`attach::attach`] uploads the zip as an `application/zip` annotation
//! 5. the output tree and the zip are deleted
//!
//! A failure at any stage skips that image only; see [`ExportOrchestrator`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use zarr_export::{
//!     Bioformats2Raw, Config, ConversionRunner, ExportOrchestrator, ExportPaths,
//!     HttpRepository, Repository, Selection,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let repository: Arc<dyn Repository> = Arc::new(HttpRepository::new(&config.repository)?);
//!     let paths = ExportPaths::resolve(&config.paths, repository.as_ref()).await?;
//!
//!     let converter = Bioformats2Raw::new(
//!         &paths.converter_dir,
//!         &config.converter.binary,
//!         config.converter.success_policy,
//!     );
//!     let runner = ConversionRunner::new(paths, Arc::new(converter));
//!     let orchestrator = ExportOrchestrator::new(repository, runner, config.temp_dir());
//!
//!     let report = orchestrator.run(&Selection::datasets([51])).await?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Zip packaging of conversion output
pub mod archive;
/// File annotation attachment
pub mod attach;
/// Configuration types
pub mod config;
/// Image to Zarr conversion
pub mod converter;
/// Error types
pub mod error;
/// Batch export pipeline
pub mod export;
/// Repository access
pub mod repository;
/// Managed-file resolution
pub mod resolver;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{Config, ExportPaths, SuccessPolicy};
pub use converter::{Bioformats2Raw, ConversionRunner, Converter};
pub use error::{ConversionError, Error, ExportError, Result};
pub use export::ExportOrchestrator;
pub use repository::{HttpRepository, Repository};
pub use resolver::PathResolver;
pub use types::{
    AnnotationLink, DataType, Dataset, DatasetId, ExportJob, ExportReport, Image, ImageId,
    ImageOutcome, ImageStatus, ManagedFileRecord, Selection,
};
