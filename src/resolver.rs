//! Locate an image's primary file in managed storage

use crate::error::Result;
use crate::repository::Repository;
use crate::types::{ImageId, ManagedFileRecord};
use std::sync::Arc;
use tracing::debug;

/// Filename suffixes of fileset members that are never image data
pub const SIDECAR_SUFFIXES: &[&str] = &[".log", ".txt", ".xml"];

/// Whether `name` is an import log or metadata sidecar (case-sensitive)
///
/// ```
/// use zarr_export::resolver::is_sidecar;
///
/// assert!(is_sidecar("cells.czi.log"));
/// assert!(is_sidecar("companion.xml"));
/// assert!(!is_sidecar("cells.czi"));
/// assert!(!is_sidecar("NOTES.TXT"));
/// ```
#[must_use]
pub fn is_sidecar(name: &str) -> bool {
    SIDECAR_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Resolves images to their source file in managed storage
pub struct PathResolver {
    repository: Arc<dyn Repository>,
}

impl PathResolver {
    /// Create a resolver backed by `repository`
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// First non-sidecar file of the image's fileset
    ///
    /// `Ok(None)` means there is nothing to export for this image.
    pub async fn resolve(&self, image_id: ImageId) -> Result<Option<ManagedFileRecord>> {
        let records = self.repository.original_files(image_id).await?;
        let total = records.len();
        let found = records.into_iter().find(|r| !is_sidecar(&r.name));

        debug!(
            image_id = image_id.get(),
            total,
            found = ?found,
            "resolved managed file"
        );
        Ok(found)
    }
}
