//! The image repository as seen by the export pipeline
//!
//! The pipeline only needs a narrow slice of the repository: object lookup,
//! dataset expansion, the managed-file query, two configuration keys and file
//! annotation creation. [`Repository`] captures exactly that, so the pipeline can
//! run against the HTTP gateway in production and an in-memory fake in tests.
//!
//! - [`HttpRepository`]: JSON gateway client built on `reqwest`

mod http;

#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpRepository;

use crate::error::Result;
use crate::types::{AnnotationLink, Dataset, DatasetId, Image, ImageId, ManagedFileRecord};
use async_trait::async_trait;
use std::path::Path;

/// A local file to upload as a file annotation
#[derive(Debug, Clone, Copy)]
pub struct FileUpload<'a> {
    /// File on local disk
    pub path: &'a Path,
    /// Name shown in the repository
    pub display_name: &'a str,
    /// Media type of the upload
    pub mime_type: &'a str,
}

/// Repository operations used by the export pipeline
///
/// All calls assume an already-authenticated session.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Look up an image, `None` if it does not exist
    async fn get_image(&self, id: ImageId) -> Result<Option<Image>>;

    /// Look up a dataset, `None` if it does not exist
    async fn get_dataset(&self, id: DatasetId) -> Result<Option<Dataset>>;

    /// Child images of a dataset, in repository order
    async fn dataset_images(&self, id: DatasetId) -> Result<Vec<Image>>;

    /// Every original file in the image's fileset, in query order
    ///
    /// Follows image → fileset → used files → original file. Sidecar files
    /// (import logs, metadata) are included.
    async fn original_files(&self, id: ImageId) -> Result<Vec<ManagedFileRecord>>;

    /// Read a server configuration value, `None` if unset
    async fn config_value(&self, key: &str) -> Result<Option<String>>;

    /// Upload a file and link it to `image` as a file annotation
    ///
    /// Either the link exists afterwards or the call failed.
    async fn attach_file_annotation(
        &self,
        image: &Image,
        upload: &FileUpload<'_>,
    ) -> Result<AnnotationLink>;
}
