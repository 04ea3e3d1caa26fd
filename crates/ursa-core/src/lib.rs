//! Ursabot Core
//!
//! Docker image hierarchy model shared by the scheduler, runner and CLI.
//! An [`ImageCollection`] owns every [`ImageNode`]; nodes reference their
//! parent image by [`ImageId`] or name an externally pulled base image.

pub mod collection;
pub mod dockerfile;
pub mod error;
pub mod filter;
pub mod ids;
pub mod image;
pub mod platform;
pub mod steps;
pub mod validation;

pub use collection::{ImageCollection, ImageSet};
pub use dockerfile::Dockerfile;
pub use error::{BoxError, Duplicate, Error, Result};
pub use filter::{ImageFilter, Predicate};
pub use ids::ImageId;
pub use image::{Base, ImageNode, ImageSpec, ResolvedImage};
pub use steps::{Command, Step};
