//! JSON gateway client for the image repository

use super::{FileUpload, Repository};
use crate::config::RepositoryConfig;
use crate::error::{Error, Result};
use crate::types::{AnnotationLink, Dataset, DatasetId, Image, ImageId, ManagedFileRecord};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::io::ReaderStream;
use tracing::debug;

#[derive(Deserialize)]
struct ConfigValue {
    value: Option<String>,
}

/// Repository client speaking JSON over HTTP
///
/// # Examples
///
/// ```no_run
/// use zarr_export::config::RepositoryConfig;
/// use zarr_export::repository::{HttpRepository, Repository};
/// use zarr_export::types::ImageId;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = HttpRepository::new(&RepositoryConfig::default())?;
/// let files = repo.original_files(ImageId(42)).await?;
/// println!("{} managed file(s)", files.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: reqwest::Client,
    base_url: String,
    session_key: Option<String>,
}

impl HttpRepository {
    /// Build a client from configuration
    pub fn new(config: &RepositoryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_key: config.session_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn get(&self, path: &str) -> Result<Response> {
        debug!(path, "repository GET");
        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await?;
        Ok(response)
    }

    /// GET returning `None` on 404
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self.get(path).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(response.json().await?))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = check_status(self.get(path).await?).await?;
        Ok(response.json().await?)
    }
}

/// Map non-success responses to [`Error::Repository`]
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    } else {
        body
    };
    Err(Error::Repository {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl Repository for HttpRepository {
    async fn get_image(&self, id: ImageId) -> Result<Option<Image>> {
        self.get_optional(&format!("/api/images/{}", id)).await
    }

    async fn get_dataset(&self, id: DatasetId) -> Result<Option<Dataset>> {
        self.get_optional(&format!("/api/datasets/{}", id)).await
    }

    async fn dataset_images(&self, id: DatasetId) -> Result<Vec<Image>> {
        self.get_json(&format!("/api/datasets/{}/images", id)).await
    }

    async fn original_files(&self, id: ImageId) -> Result<Vec<ManagedFileRecord>> {
        self.get_json(&format!("/api/images/{}/original-files", id)).await
    }

    async fn config_value(&self, key: &str) -> Result<Option<String>> {
        let path = format!("/api/config/{}", key);
        let value: Option<ConfigValue> = self.get_optional(&path).await?;
        Ok(value.and_then(|v| v.value))
    }

    async fn attach_file_annotation(
        &self,
        image: &Image,
        upload: &FileUpload<'_>,
    ) -> Result<AnnotationLink> {
        let file = tokio::fs::File::open(upload.path).await?;
        let size = file.metadata().await?.len();

        debug!(
            image_id = image.id.get(),
            path = ?upload.path,
            size,
            "uploading file annotation"
        );

        let request = self
            .client
            .post(self.url(&format!("/api/images/{}/file-annotations", image.id)))
            .query(&[("name", upload.display_name), ("mimetype", upload.mime_type)])
            .header(reqwest::header::CONTENT_TYPE, upload.mime_type)
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)));

        let response = check_status(self.authorize(request).send().await?).await?;
        Ok(response.json().await?)
    }
}
