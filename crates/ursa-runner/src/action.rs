//! Core action traits and types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::info;
use ursa_core::{ImageId, ResolvedImage};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with code {code}")]
    Exit { command: String, code: i32 },

    #[error("`{command}` was terminated by a signal")]
    Terminated { command: String },

    #[error("{0}")]
    Other(String),
}

/// An image produced by a [`BuildAction`].
#[derive(Debug, Clone, Serialize)]
pub struct BuiltImage {
    pub id: ImageId,
    pub qualified_name: String,
    pub reference: String,
    pub built_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl BuiltImage {
    /// Record a successful build of `image` that began at `started`.
    pub fn finished(image: &ResolvedImage, started: Instant) -> Self {
        Self {
            id: image.id,
            qualified_name: image.qualified_name.clone(),
            reference: image.reference.clone(),
            built_at: Utc::now(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Turns a resolved image into a built artifact.
#[async_trait]
pub trait BuildAction: Send + Sync {
    async fn build(&self, image: &ResolvedImage) -> Result<BuiltImage, ActionError>;
}

/// Publishes a built artifact to a registry.
#[async_trait]
pub trait PushAction: Send + Sync {
    async fn push(&self, image: &BuiltImage) -> Result<(), ActionError>;
}

/// Actions that only report what they would do.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRun;

#[async_trait]
impl BuildAction for DryRun {
    async fn build(&self, image: &ResolvedImage) -> Result<BuiltImage, ActionError> {
        let started = Instant::now();
        info!(
            image = %image.qualified_name,
            from = %image.from,
            steps = image.steps.len(),
            "Would build image"
        );
        Ok(BuiltImage::finished(image, started))
    }
}

#[async_trait]
impl PushAction for DryRun {
    async fn push(&self, image: &BuiltImage) -> Result<(), ActionError> {
        info!(reference = %image.reference, "Would push image");
        Ok(())
    }
}
