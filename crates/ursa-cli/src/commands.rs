//! CLI command definitions.

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Build, list and export the docker images
    Docker {
        #[command(flatten)]
        args: DockerArgs,

        #[command(subcommand)]
        command: DockerCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Image selection and daemon options shared by the docker subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct DockerArgs {
    /// Architecture, aliases like x86_64 or aarch64 are accepted
    #[arg(long)]
    pub arch: Option<String>,

    /// Operating system, e.g. ubuntu-18.04
    #[arg(long)]
    pub os: Option<String>,

    /// Variant, e.g. conda or cuda; pass an empty string for plain images
    #[arg(long)]
    pub variant: Option<String>,

    /// Image name, e.g. cpp or python-3
    #[arg(long)]
    pub name: Option<String>,

    /// Image tag, e.g. worker; pass an empty string for untagged images
    #[arg(long)]
    pub tag: Option<String>,

    /// Docker daemon to connect to
    #[arg(long)]
    pub docker_host: Option<String>,

    /// Registry username used before pushing
    #[arg(long)]
    pub docker_username: Option<String>,

    /// Registry password used before pushing
    #[arg(long)]
    pub docker_password: Option<String>,
}

#[derive(Subcommand)]
pub enum DockerCommands {
    /// List the selected images
    ListImages,

    /// Show the build order of the selected images
    Plan {
        /// Output format, defaults to the configured one
        #[arg(short, long, value_enum)]
        format: Option<PlanFormat>,
    },

    /// Build the selected images
    Build {
        /// Push each image after it has been built
        #[arg(long)]
        push: bool,

        /// Number of images built at the same time
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Only log what would be built and pushed
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the Dockerfile of each selected image
    WriteDockerfiles {
        /// Target directory
        #[arg(short, long, default_value = "images")]
        directory: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set configuration value
    Set {
        /// Key
        key: String,

        /// Value
        value: String,
    },
}
