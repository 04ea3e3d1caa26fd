//! Ursabot CLI entrypoint.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod handlers;
mod images;

use commands::{Commands, ConfigCommands, DockerCommands};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "ursabot")]
#[command(author, version, about = "Build the Ursabot docker image hierarchy", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Logs go to stderr so that `plan --format json` stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = CliConfig::load().unwrap_or_default();

    match cli.command {
        Commands::Docker { args, command } => match command {
            DockerCommands::ListImages => handlers::list_images(&config, &args).await?,
            DockerCommands::Plan { format } => handlers::plan(&config, &args, format).await?,
            DockerCommands::Build {
                push,
                jobs,
                dry_run,
            } => handlers::build(&config, &args, push, jobs, dry_run).await?,
            DockerCommands::WriteDockerfiles { directory } => {
                handlers::write_dockerfiles(&config, &args, &directory).await?
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => handlers::show_config(&config)?,
            ConfigCommands::Set { key, value } => handlers::set_config(&key, &value)?,
        },
    }

    Ok(())
}
