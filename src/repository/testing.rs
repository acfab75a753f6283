//! In-memory repository used by unit tests

use super::{FileUpload, Repository};
use crate::error::{Error, Result};
use crate::types::{AnnotationLink, Dataset, DatasetId, Image, ImageId, ManagedFileRecord};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A recorded attach call
#[derive(Debug, Clone)]
pub(crate) struct AttachCall {
    pub image_id: ImageId,
    pub display_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub(crate) struct FakeRepository {
    images: HashMap<i64, Image>,
    datasets: HashMap<i64, (Dataset, Vec<Image>)>,
    files: HashMap<i64, Vec<ManagedFileRecord>>,
    config: HashMap<String, String>,
    failing_lookups: HashSet<i64>,
    failing_gets: HashSet<i64>,
    failing_attach: HashSet<i64>,
    attach_calls: Mutex<Vec<AttachCall>>,
    file_queries: Mutex<Vec<ImageId>>,
}

impl FakeRepository {
    pub fn with_image(mut self, id: i64, name: &str, files: Vec<ManagedFileRecord>) -> Self {
        self.images.insert(
            id,
            Image {
                id: ImageId(id),
                name: name.to_string(),
            },
        );
        self.files.insert(id, files);
        self
    }

    pub fn with_dataset(mut self, id: i64, name: &str, image_ids: &[i64]) -> Self {
        let children = image_ids
            .iter()
            .filter_map(|i| self.images.get(i).cloned())
            .collect();
        self.datasets.insert(
            id,
            (
                Dataset {
                    id: DatasetId(id),
                    name: name.to_string(),
                },
                children,
            ),
        );
        self
    }

    pub fn with_config(mut self, key: &str, value: &str) -> Self {
        self.config.insert(key.to_string(), value.to_string());
        self
    }

    pub fn failing_lookup(mut self, image_id: i64) -> Self {
        self.failing_lookups.insert(image_id);
        self
    }

    /// Make `get_image` / `get_dataset` fail for `id`
    pub fn failing_get(mut self, id: i64) -> Self {
        self.failing_gets.insert(id);
        self
    }

    pub fn failing_attach(mut self, image_id: i64) -> Self {
        self.failing_attach.insert(image_id);
        self
    }

    fn check_get(&self, id: i64) -> Result<()> {
        if self.failing_gets.contains(&id) {
            return Err(Error::Repository {
                status: 503,
                message: "busy".into(),
            });
        }
        Ok(())
    }

    pub fn attach_calls(&self) -> Vec<AttachCall> {
        self.attach_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn file_queries(&self) -> Vec<ImageId> {
        self.file_queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Repository for FakeRepository {
    async fn get_image(&self, id: ImageId) -> Result<Option<Image>> {
        self.check_get(id.get())?;
        Ok(self.images.get(&id.get()).cloned())
    }

    async fn get_dataset(&self, id: DatasetId) -> Result<Option<Dataset>> {
        self.check_get(id.get())?;
        Ok(self.datasets.get(&id.get()).map(|(d, _)| d.clone()))
    }

    async fn dataset_images(&self, id: DatasetId) -> Result<Vec<Image>> {
        Ok(self
            .datasets
            .get(&id.get())
            .map(|(_, images)| images.clone())
            .unwrap_or_default())
    }

    async fn original_files(&self, id: ImageId) -> Result<Vec<ManagedFileRecord>> {
        if let Ok(mut queries) = self.file_queries.lock() {
            queries.push(id);
        }
        if self.failing_lookups.contains(&id.get()) {
            return Err(Error::Repository {
                status: 500,
                message: "query failed".into(),
            });
        }
        Ok(self.files.get(&id.get()).cloned().unwrap_or_default())
    }

    async fn config_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.config.get(key).cloned())
    }

    async fn attach_file_annotation(
        &self,
        image: &Image,
        upload: &FileUpload<'_>,
    ) -> Result<AnnotationLink> {
        let bytes = tokio::fs::read(upload.path).await?;
        let call = AttachCall {
            image_id: image.id,
            display_name: upload.display_name.to_string(),
            mime_type: upload.mime_type.to_string(),
            bytes,
        };
        let count = match self.attach_calls.lock() {
            Ok(mut calls) => {
                calls.push(call);
                calls.len() as i64
            }
            Err(_) => return Err(Error::Other("attach log poisoned".into())),
        };
        if self.failing_attach.contains(&image.id.get()) {
            return Err(Error::Repository {
                status: 503,
                message: "upload rejected".into(),
            });
        }
        Ok(AnnotationLink {
            annotation_id: 1000 + count,
            file_id: 2000 + count,
        })
    }
}
