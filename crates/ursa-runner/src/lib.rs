//! Image build execution for Ursabot.
//!
//! The runner walks a build plan and hands each resolved image to a
//! [`BuildAction`], optionally followed by a [`PushAction`]. Actions are
//! opaque: [`DockerCli`] shells out to the `docker` binary, [`DryRun`] only
//! logs.

pub mod action;
pub mod docker;
pub mod dockerfiles;
pub mod executor;

pub use action::{ActionError, BuildAction, BuiltImage, DryRun, PushAction};
pub use docker::DockerCli;
pub use dockerfiles::write_dockerfiles;
pub use executor::{BuildReport, ImageBuilder};
