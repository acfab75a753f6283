//! Batch export pipeline
//!
//! For every image in the expanded selection the orchestrator runs, in order:
//! 1. Resolve - find the image's primary file in managed storage
//! 2. Convert - run the converter into a fresh per-attempt workspace
//! 3. Archive - zip the conversion output
//! 4. Attach - upload the zip as a file annotation on the image
//! 5. Cleanup - remove the output tree and the zip
//!
//! A failing stage skips the image and the loop moves on. A failed lookup
//! during selection expansion only drops that id. Only a selection that
//! expands to no images at all stops the run.

mod cleanup;

use crate::archive::compress_dir;
use crate::attach::{ARCHIVE_MIME_TYPE, attach};
use crate::converter::ConversionRunner;
use crate::error::{ConversionError, Error, ExportError, Result};
use crate::repository::Repository;
use crate::resolver::PathResolver;
use crate::types::{
    AnnotationLink, DataType, DatasetId, ExportJob, ExportReport, Image, ImageId, ImageOutcome,
    ImageStatus, Selection,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Archive file name for an image: `<name>.zip` with path separators replaced
pub fn archive_file_name(image: &Image) -> String {
    let name = image.name.trim();
    if name.is_empty() {
        return format!("image-{}.zip", image.id);
    }
    format!("{}.zip", name.replace(['/', '\\'], "_"))
}

/// Drives the per-image pipeline over a selection
pub struct ExportOrchestrator {
    repository: Arc<dyn Repository>,
    resolver: PathResolver,
    runner: ConversionRunner,
    temp_root: PathBuf,
}

impl ExportOrchestrator {
    /// Create an orchestrator writing temporary data below `temp_root`
    pub fn new(
        repository: Arc<dyn Repository>,
        runner: ConversionRunner,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver: PathResolver::new(repository.clone()),
            repository,
            runner,
            temp_root: temp_root.into(),
        }
    }

    /// Export every image in `selection`
    ///
    /// Returns [`Error::EmptySelection`] before doing any work when the
    /// selection expands to nothing. Per-image failures end up in the report.
    pub async fn run(&self, selection: &Selection) -> Result<ExportReport> {
        let started = Instant::now();
        let mut report = ExportReport::default();

        let images = self.expand_selection(selection, &mut report).await;
        if images.is_empty() {
            let message = report.messages.join("\n");
            warn!(data_type = %selection.data_type, message = %message, "nothing to export");
            return Err(Error::EmptySelection { message });
        }

        info!(
            data_type = %selection.data_type,
            image_count = images.len(),
            temp_root = ?self.temp_root,
            "starting export"
        );

        for image in images {
            let outcome = self.export_image(image).await;
            report.push_message(outcome.to_string());
            report.outcomes.push(outcome);
        }

        report.elapsed = started.elapsed();
        info!(
            exported = report.exported(),
            skipped = report.skipped(),
            elapsed = ?report.elapsed,
            "export finished"
        );
        Ok(report)
    }

    /// Turn the selection into a flat, order-preserving list of images
    ///
    /// Ids that do not exist are reported in `report`. A repository error on
    /// one id is reported too and the remaining ids are still looked up. When
    /// the result is empty, the reason is appended to `report` as well.
    pub async fn expand_selection(
        &self,
        selection: &Selection,
        report: &mut ExportReport,
    ) -> Vec<Image> {
        let mut missing = Vec::new();
        let mut images = Vec::new();

        for &id in &selection.ids {
            match selection.data_type {
                DataType::Image => match self.repository.get_image(ImageId(id)).await {
                    Ok(Some(image)) => images.push(image),
                    Ok(None) => missing.push(id),
                    Err(e) => lookup_failed(report, "look up Image", id, &e),
                },
                DataType::Dataset => {
                    let dataset_id = DatasetId(id);
                    let dataset = match self.repository.get_dataset(dataset_id).await {
                        Ok(Some(dataset)) => dataset,
                        Ok(None) => {
                            missing.push(id);
                            continue;
                        }
                        Err(e) => {
                            lookup_failed(report, "look up Dataset", id, &e);
                            continue;
                        }
                    };
                    match self.repository.dataset_images(dataset_id).await {
                        Ok(children) => {
                            debug!(
                                dataset_id = id,
                                dataset = %dataset.name,
                                image_count = children.len(),
                                "expanded dataset"
                            );
                            images.extend(children);
                        }
                        Err(e) => lookup_failed(report, "list images of Dataset", id, &e),
                    }
                }
            }
        }

        if !missing.is_empty() {
            let ids: Vec<String> = missing.iter().map(i64::to_string).collect();
            report.push_message(format!(
                "Can't find {}(s) with ID(s): {}",
                selection.data_type,
                ids.join(", ")
            ));
        }

        if images.is_empty() {
            match selection.data_type {
                DataType::Dataset => report.push_message("No image found in dataset(s)"),
                DataType::Image => report.push_message("No objects found"),
            }
        }

        images
    }

    /// Fresh scratch directory `image-<id>-<random>` below the temp root
    ///
    /// Every attempt gets its own directory, so an image that comes up again
    /// never sees what an earlier failed attempt left behind.
    fn create_workspace(&self, image_id: ImageId) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.temp_root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("image-{}-", image_id))
            .tempdir_in(&self.temp_root)?;
        Ok(dir.keep())
    }

    async fn export_image(&self, image: Image) -> ImageOutcome {
        info!(image_id = image.id.get(), name = %image.name, "processing image");

        let mut job = ExportJob::new(image);

        let status = match self.process(&mut job).await {
            Ok((archive_name, link)) => ImageStatus::Exported { archive_name, link },
            Err(e) => {
                warn!(
                    image_id = job.image.id.get(),
                    source = ?job.source.as_ref().map(|s| s.name.as_str()),
                    workspace = ?job.workspace,
                    code = e.code(),
                    error = %e,
                    "skipping image"
                );
                ImageStatus::Skipped(e)
            }
        };

        cleanup::remove_artifacts(&job).await;

        ImageOutcome {
            image: job.image,
            status,
        }
    }

    async fn process(
        &self,
        job: &mut ExportJob,
    ) -> std::result::Result<(String, AnnotationLink), ExportError> {
        let image_id = job.image.id;

        let source = self
            .resolver
            .resolve(image_id)
            .await
            .map_err(|e| ExportError::Repository {
                image_id,
                reason: e.to_string(),
            })?
            .ok_or(ExportError::ResolutionMiss { image_id })?;
        let source = job.source.insert(source);

        let workspace = self
            .create_workspace(image_id)
            .map_err(|e| ExportError::ConversionFailed {
                image_id,
                source: ConversionError::Io(e),
            })?;
        let workspace = job.workspace.insert(workspace).clone();

        let output_dir = self
            .runner
            .convert(source, &workspace)
            .await
            .map_err(|source| ExportError::ConversionFailed { image_id, source })?;
        let output_dir = job.output_dir.insert(output_dir).clone();

        let archive_name = archive_file_name(&job.image);
        let archive_path = workspace.join(&archive_name);
        self.archive(image_id, output_dir, archive_path.clone()).await?;
        job.archive_path = Some(archive_path.clone());

        let link = attach(
            self.repository.as_ref(),
            &archive_path,
            &job.image,
            &archive_name,
            ARCHIVE_MIME_TYPE,
        )
        .await
        .map_err(|e| ExportError::AttachFailed {
            image_id,
            reason: e.to_string(),
        })?;

        Ok((archive_name, link))
    }

    /// Zip `output_dir` off the async runtime; a partial archive is removed on failure
    async fn archive(
        &self,
        image_id: ImageId,
        output_dir: PathBuf,
        archive_path: PathBuf,
    ) -> std::result::Result<(), ExportError> {
        let target = archive_path.clone();
        let result = spawn_blocking(move || compress_dir(&output_dir, &target))
            .await
            .map_err(|e| format!("archive task panicked: {}", e))
            .and_then(|r| r.map_err(|e| e.to_string()));

        match result {
            Ok(summary) => {
                debug!(
                    image_id = image_id.get(),
                    entries = summary.entries,
                    "archived conversion output"
                );
                Ok(())
            }
            Err(reason) => {
                cleanup::remove_file_quietly(image_id.get(), &archive_path).await;
                Err(ExportError::ArchiveFailed {
                    image_id,
                    archive: archive_path,
                    reason,
                })
            }
        }
    }
}

fn lookup_failed(report: &mut ExportReport, action: &str, id: i64, error: &Error) {
    warn!(id, action, error = %error, "selection lookup failed");
    report.push_message(format!("Failed to {} {}: {}", action, id, error));
}
