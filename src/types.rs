//! Core types for zarr-export

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ExportError;

macro_rules! repository_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Get the inner i64 value
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

repository_id!(
    /// Repository identifier of an image
    ImageId
);

repository_id!(
    /// Repository identifier of a dataset
    DatasetId
);

/// An image record owned by the repository
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Repository id
    pub id: ImageId,
    /// Display name
    pub name: String,
}

/// A dataset record owned by the repository
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Repository id
    pub id: DatasetId,
    /// Display name
    pub name: String,
}

/// One physical file tracked in the repository's managed storage
///
/// An image's fileset usually holds several of these: the original data files
/// plus import logs and metadata sidecars.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedFileRecord {
    /// Directory component, relative to the managed-storage root
    pub path: String,
    /// File component
    pub name: String,
}

impl ManagedFileRecord {
    /// Create a record from its directory and file components
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }
}

/// The kind of object a selection names
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Each id is a dataset; its child images are exported
    Dataset,
    /// Each id is an image
    Image,
}

impl DataType {
    /// The repository's name for this object type
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Dataset => "Dataset",
            DataType::Image => "Image",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Dataset" => Ok(DataType::Dataset),
            "Image" => Ok(DataType::Image),
            other => Err(format!(
                "unknown data type '{}', expected 'Dataset' or 'Image'",
                other
            )),
        }
    }
}

/// The user's batch selection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// What kind of objects `ids` refers to
    pub data_type: DataType,
    /// Object ids, processed in this order
    pub ids: Vec<i64>,
}

impl Selection {
    /// Select images directly
    pub fn images(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            data_type: DataType::Image,
            ids: ids.into_iter().collect(),
        }
    }

    /// Select every image in the given datasets
    pub fn datasets(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            data_type: DataType::Dataset,
            ids: ids.into_iter().collect(),
        }
    }
}

/// Working state for one image during a batch run
///
/// Each field is only filled in once the stage before it succeeded, so cleanup
/// can remove exactly what was produced.
#[derive(Debug)]
pub struct ExportJob {
    /// The image being exported
    pub image: Image,
    /// Resolved source file, if any
    pub source: Option<ManagedFileRecord>,
    /// Scratch directory of this attempt, set once it was created
    pub workspace: Option<PathBuf>,
    /// Converter output directory, set only after a successful conversion
    pub output_dir: Option<PathBuf>,
    /// Finished archive, set only after archiving completed
    pub archive_path: Option<PathBuf>,
}

impl ExportJob {
    /// Start a job for `image`
    pub fn new(image: Image) -> Self {
        Self {
            image,
            source: None,
            workspace: None,
            output_dir: None,
            archive_path: None,
        }
    }
}

/// Handle returned by the repository after attaching an archive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationLink {
    /// The new file annotation
    pub annotation_id: i64,
    /// The uploaded original file backing the annotation
    pub file_id: i64,
}

/// What happened to one image
#[derive(Debug)]
pub enum ImageStatus {
    /// The archive was attached
    Exported {
        /// Display name of the attached archive
        archive_name: String,
        /// The created annotation
        link: AnnotationLink,
    },
    /// The image was skipped at some stage
    Skipped(ExportError),
}

/// Per-image result of a batch run
#[derive(Debug)]
pub struct ImageOutcome {
    /// The image
    pub image: Image,
    /// Final status
    pub status: ImageStatus,
}

impl ImageOutcome {
    /// Whether the archive was attached
    pub fn is_exported(&self) -> bool {
        matches!(self.status, ImageStatus::Exported { .. })
    }
}

impl fmt::Display for ImageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            ImageStatus::Exported { archive_name, .. } => write!(
                f,
                "Image {} ({}): attached {}",
                self.image.id, self.image.name, archive_name
            ),
            ImageStatus::Skipped(err) => write!(
                f,
                "Image {} ({}): skipped: {}",
                self.image.id, self.image.name, err
            ),
        }
    }
}

/// Textual report accumulated over a batch run
#[derive(Debug, Default)]
pub struct ExportReport {
    /// User-facing messages in the order they were produced
    pub messages: Vec<String>,
    /// One entry per processed image
    pub outcomes: Vec<ImageOutcome>,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl ExportReport {
    /// Number of images whose archive was attached
    pub fn exported(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_exported()).count()
    }

    /// Number of images that were skipped
    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.exported()
    }

    pub(crate) fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in &self.messages {
            writeln!(f, "{}", message)?;
        }
        write!(
            f,
            "Exported {} of {} image(s) in {:.1?}",
            self.exported(),
            self.outcomes.len(),
            self.elapsed
        )
    }
}
