//! Build ordering for Ursabot image hierarchies.

pub mod dag;
pub mod plan;

pub use dag::BuildGraph;
pub use plan::{BuildPlan, PlannedImage, plan};
