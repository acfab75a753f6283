//! Attach archives to images as file annotations

use crate::error::Result;
use crate::repository::{FileUpload, Repository};
use crate::types::{AnnotationLink, Image};
use std::path::Path;
use tracing::info;

/// Media type of the archives this crate produces
pub const ARCHIVE_MIME_TYPE: &str = "application/zip";

/// Upload `archive_path` and link it to `image`
///
/// No retry; the repository call either creates the link or fails.
pub async fn attach(
    repository: &dyn Repository,
    archive_path: &Path,
    image: &Image,
    display_name: &str,
    mime_type: &str,
) -> Result<AnnotationLink> {
    let upload = FileUpload {
        path: archive_path,
        display_name,
        mime_type,
    };
    let link = repository.attach_file_annotation(image, &upload).await?;

    info!(
        image_id = image.id.get(),
        annotation_id = link.annotation_id,
        file_id = link.file_id,
        display_name,
        "attached file annotation"
    );
    Ok(link)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::FakeRepository;
    use crate::types::ImageId;

    #[tokio::test]
    async fn test_attach_uploads_archive_bytes() {
        let temp = tempfile::TempDir::new().unwrap();
        let archive = temp.path().join("cells.zip");
        std::fs::write(&archive, b"zip bytes").unwrap();
        let repo = FakeRepository::default();
        let image = Image {
            id: ImageId(4),
            name: "cells".into(),
        };

        let link = attach(&repo, &archive, &image, "cells.zip", ARCHIVE_MIME_TYPE)
            .await
            .unwrap();

        assert_eq!(link.annotation_id, 1001);
        let calls = repo.attach_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].image_id, ImageId(4));
        assert_eq!(calls[0].display_name, "cells.zip");
        assert_eq!(calls[0].mime_type, "application/zip");
        assert_eq!(calls[0].bytes, b"zip bytes");
    }

    #[tokio::test]
    async fn test_attach_failure_propagates() {
        let temp = tempfile::TempDir::new().unwrap();
        let archive = temp.path().join("cells.zip");
        std::fs::write(&archive, b"zip").unwrap();
        let repo = FakeRepository::default().failing_attach(4);
        let image = Image {
            id: ImageId(4),
            name: "cells".into(),
        };

        let result = attach(&repo, &archive, &image, "cells.zip", ARCHIVE_MIME_TYPE).await;
        assert!(result.is_err());
    }
}
