//! Build and push actions backed by the `docker` command-line client.

use crate::action::{ActionError, BuildAction, BuiltImage, PushAction};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};
use ursa_core::ResolvedImage;

/// Docker client invoking the `docker` binary.
///
/// The Dockerfile is streamed over stdin while `context` is sent as the
/// build context, so files referenced by `ADD`/`COPY` steps are resolved
/// relative to it.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    host: Option<String>,
    context: PathBuf,
}

impl DockerCli {
    pub fn new(context: impl Into<PathBuf>) -> Self {
        Self {
            program: "docker".to_string(),
            host: None,
            context: context.into(),
        }
    }

    /// Daemon to talk to, e.g. `tcp://127.0.0.1:2375`.
    pub fn with_host(mut self, host: Option<String>) -> Self {
        self.host = host;
        self
    }

    /// Use a different client binary, e.g. `podman`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(host) = &self.host {
            cmd.arg("-H").arg(host);
        }
        cmd.args(args);
        // Dropping the child on cancellation stops the build.
        cmd.kill_on_drop(true);
        cmd
    }

    async fn execute(
        &self,
        mut cmd: Command,
        description: String,
        input: Option<&str>,
    ) -> Result<(), ActionError> {
        debug!(command = %description, "Executing docker command");

        cmd.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(|e| ActionError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            // A client that exits early closes the pipe; its exit status
            // tells the real story.
            if let Err(e) = stdin.write_all(input.as_bytes()).await
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(ActionError::Spawn {
                    program: self.program.clone(),
                    source: e,
                });
            }
        }

        let status = child.wait().await.map_err(|e| ActionError::Spawn {
            program: self.program.clone(),
            source: e,
        })?;

        match status.code() {
            Some(0) => Ok(()),
            Some(code) => Err(ActionError::Exit {
                command: description,
                code,
            }),
            None => Err(ActionError::Terminated {
                command: description,
            }),
        }
    }

    /// Authenticate against the registry, passing the password over stdin.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ActionError> {
        let cmd = self.command(&["login", "--username", username, "--password-stdin"]);
        self.execute(cmd, format!("{} login", self.program), Some(password))
            .await?;
        info!(username = %username, "Logged in to the registry");
        Ok(())
    }
}

#[async_trait]
impl BuildAction for DockerCli {
    async fn build(&self, image: &ResolvedImage) -> Result<BuiltImage, ActionError> {
        let started = Instant::now();
        let dockerfile = image.dockerfile().to_string();
        let context = self.context.to_string_lossy();

        let cmd = self.command(&["build", "--tag", &image.reference, "--file", "-", &context]);
        self.execute(
            cmd,
            format!("{} build --tag {}", self.program, image.reference),
            Some(&dockerfile),
        )
        .await?;

        Ok(BuiltImage::finished(image, started))
    }
}

#[async_trait]
impl PushAction for DockerCli {
    async fn push(&self, image: &BuiltImage) -> Result<(), ActionError> {
        let cmd = self.command(&["push", &image.reference]);
        self.execute(cmd, format!("{} push {}", self.program, image.reference), None)
            .await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use ursa_core::{ImageCollection, ImageSpec, Step};

    fn resolved() -> ResolvedImage {
        let mut images = ImageCollection::new();
        let id = images
            .push(
                ImageSpec::new("cpp", "ubuntu:18.04")
                    .arch("amd64")
                    .os("ubuntu-18.04")
                    .step(Step::run("echo hello")),
            )
            .unwrap();
        images.resolve(id).unwrap()
    }

    #[tokio::test]
    async fn test_successful_client() {
        let docker = DockerCli::new(".").with_program("true");
        let built = docker.build(&resolved()).await.unwrap();
        assert_eq!(built.reference, "amd64-ubuntu-18.04-cpp:latest");
        docker.push(&built).await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_client_reports_exit_code() {
        let docker = DockerCli::new(".").with_program("false");
        let err = docker.build(&resolved()).await.unwrap_err();
        assert!(matches!(err, ActionError::Exit { code: 1, .. }));
    }

    #[tokio::test]
    async fn test_missing_client() {
        let docker = DockerCli::new(".").with_program("ursabot-no-such-docker");
        let err = docker.build(&resolved()).await.unwrap_err();
        assert!(matches!(err, ActionError::Spawn { .. }));
    }
}
