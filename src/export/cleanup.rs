//! Removal of per-image temporary artifacts

use crate::types::ExportJob;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Remove everything `job` produced, then its workspace if it is empty
///
/// Errors are logged as warnings but never fail the image. A workspace that
/// still holds files (e.g. the leftovers of a failed conversion) is kept.
pub(crate) async fn remove_artifacts(job: &ExportJob) {
    let image_id = job.image.id.get();

    if let Some(output_dir) = &job.output_dir {
        match fs::remove_dir_all(output_dir).await {
            Ok(()) => debug!(image_id, ?output_dir, "removed conversion output"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(image_id, ?output_dir, error = %e, "failed to remove conversion output")
            }
        }
    }

    if let Some(archive_path) = &job.archive_path {
        remove_file_quietly(image_id, archive_path).await;
    }

    let Some(workspace) = &job.workspace else {
        return;
    };
    match fs::remove_dir(workspace).await {
        Ok(()) => debug!(image_id, ?workspace, "removed workspace"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(
            image_id,
            ?workspace,
            source = ?job.source.as_ref().map(|s| s.name.as_str()),
            error = %e,
            "workspace kept"
        ),
    }
}

/// Delete a file, ignoring a file that is already gone
pub(crate) async fn remove_file_quietly(image_id: i64, path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(image_id, ?path, "removed file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(image_id, ?path, error = %e, "failed to remove file"),
    }
}
