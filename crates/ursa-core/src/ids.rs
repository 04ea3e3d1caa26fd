//! Arena handles for images.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an image inside the [`ImageCollection`](crate::ImageCollection)
/// that owns it. Handles are only handed out by the collection, so a handle
/// always refers to an image inserted before any image that uses it as base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(usize);

impl ImageId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Insertion index within the owning collection.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
