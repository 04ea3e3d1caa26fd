//! Error types for Ursabot.

use crate::ids::ImageId;
use std::fmt;
use thiserror::Error;

/// Opaque failure reported by an external build or push action.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    // Definition errors
    #[error("Invalid image configuration: {0}")]
    Configuration(String),

    #[error("Unknown image: {0}")]
    UnknownImage(ImageId),

    // Graph errors
    #[error("Cycle detected in image dependencies: {}", .images.join(", "))]
    CyclicDependency { images: Vec<String> },

    #[error("Duplicate images: {}", display_duplicates(.duplicates))]
    DuplicateImage { duplicates: Vec<Duplicate> },

    // Query errors
    #[error("No image matches the filter conditions")]
    ImageNotFound,

    #[error("Multiple images match the filter conditions: {}", .0.join(", "))]
    AmbiguousImage(Vec<String>),

    // Action errors
    #[error("Failed to build image {image}: {source}")]
    BuildFailed {
        image: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to push image {image}: {source}")]
    PushFailed {
        image: String,
        #[source]
        source: BoxError,
    },

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// A qualified name shared by more than one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub qualified_name: String,
    /// Insertion indices of every image carrying the name.
    pub indices: Vec<usize>,
}

impl fmt::Display for Duplicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices: Vec<String> = self.indices.iter().map(|i| i.to_string()).collect();
        write!(f, "{} (at {})", self.qualified_name, indices.join(", "))
    }
}

fn display_duplicates(duplicates: &[Duplicate]) -> String {
    duplicates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
