//! Command handlers.

use crate::commands::{DockerArgs, PlanFormat};
use crate::config::{CliConfig, OutputFormat};
use crate::images::catalog;
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use ursa_core::platform::canonical_arch;
use ursa_core::{ImageCollection, ImageFilter, ImageSet};
use ursa_runner::{BuildAction, DockerCli, DryRun, ImageBuilder, PushAction};

type HandlerResult = Result<(), Box<dyn std::error::Error>>;

/// Translate the selection flags into a filter, resolving arch aliases.
pub fn image_filter(args: &DockerArgs) -> ImageFilter {
    let mut filter = ImageFilter::new();
    if let Some(arch) = &args.arch {
        filter = filter.arch(canonical_arch(arch));
    }
    if let Some(os) = &args.os {
        filter = filter.os(os.as_str());
    }
    if let Some(variant) = &args.variant {
        filter = filter.variant(variant.as_str());
    }
    if let Some(name) = &args.name {
        filter = filter.name(name.as_str());
    }
    if let Some(tag) = &args.tag {
        filter = filter.tag(tag.as_str());
    }
    filter
}

fn select<'a>(images: &'a ImageCollection, args: &DockerArgs) -> ImageSet<'a> {
    let filter = image_filter(args);
    let set = images.all().filter(&filter);
    debug!(selected = set.len(), total = images.len(), "Selected images");
    set
}

/// List the selected images.
pub async fn list_images(config: &CliConfig, args: &DockerArgs) -> HandlerResult {
    let images = catalog(&config.org)?;
    let set = select(&images, args);

    if set.is_empty() {
        println!("{} No images match the given filters", style("i").blue());
        return Ok(());
    }

    for image in set.iter() {
        println!(
            "{} {}",
            style(format!("{:<48}", image.qualified_name())).bold(),
            style(image.title().unwrap_or_default()).dim()
        );
    }
    println!("\n{} images", set.len());
    Ok(())
}

/// Show the build order of the selected images.
pub async fn plan(
    config: &CliConfig,
    args: &DockerArgs,
    format: Option<PlanFormat>,
) -> HandlerResult {
    let images = catalog(&config.org)?;
    let set = select(&images, args);
    let plan = ursa_scheduler::plan(&set)?;

    let format = format.unwrap_or(match config.output_format {
        OutputFormat::Table => PlanFormat::Table,
        OutputFormat::Json => PlanFormat::Json,
    });

    match format {
        PlanFormat::Json => println!("{}", plan.to_json()?),
        PlanFormat::Table => {
            for planned in plan.iter() {
                let from = match &planned.depends_on {
                    Some(base) => style(base.clone()).cyan(),
                    None => style(planned.image.from.clone()).dim(),
                };
                println!(
                    "{:>4}  {} <- {}",
                    planned.position,
                    style(format!("{:<48}", planned.image.qualified_name)).bold(),
                    from
                );
            }
        }
    }
    Ok(())
}

fn image_builder<A>(action: A, push: bool, jobs: usize) -> ImageBuilder
where
    A: BuildAction + PushAction + 'static,
{
    let action = Arc::new(action);
    let builder = ImageBuilder::new(action.clone()).concurrency(jobs);
    if push { builder.with_push(action) } else { builder }
}

/// Build, and optionally push, the selected images.
pub async fn build(
    config: &CliConfig,
    args: &DockerArgs,
    push: bool,
    jobs: Option<usize>,
    dry_run: bool,
) -> HandlerResult {
    let images = catalog(&config.org)?;
    let set = select(&images, args);
    let jobs = jobs.unwrap_or(config.jobs);

    if set.is_empty() {
        println!("{} No images match the given filters", style("!").yellow());
        return Ok(());
    }

    println!(
        "{} Building {} images{}",
        style("▶").cyan(),
        style(set.len()).bold(),
        if dry_run { " (dry run)" } else { "" }
    );

    let builder = if dry_run {
        image_builder(DryRun, push, jobs)
    } else {
        let host = args.docker_host.clone().or_else(|| config.docker_host.clone());
        let docker = DockerCli::new(&config.context_dir).with_host(host);

        let username = args.docker_username.as_ref().or(config.docker_username.as_ref());
        if push && let (Some(username), Some(password)) = (username, &args.docker_password) {
            docker.login(username, password).await?;
        }
        image_builder(docker, push, jobs)
    };

    let report = builder.run(&set).await?;

    println!(
        "{} Built {} images in {:.1}s",
        style("✓").green(),
        report.built.len(),
        report.duration_ms as f64 / 1000.0
    );
    if push {
        println!("{} Pushed {} images", style("✓").green(), report.pushed.len());
    }
    Ok(())
}

/// Write the Dockerfiles of the selected images into `directory`.
pub async fn write_dockerfiles(
    config: &CliConfig,
    args: &DockerArgs,
    directory: &Path,
) -> HandlerResult {
    let images = catalog(&config.org)?;
    let set = select(&images, args);
    let written = ursa_runner::write_dockerfiles(&set, directory).await?;

    for path in &written {
        println!("  {}", style(path.display()).dim());
    }
    println!(
        "{} Wrote {} Dockerfiles to {}",
        style("✓").green(),
        written.len(),
        directory.display()
    );
    Ok(())
}

/// Show current configuration.
pub fn show_config(config: &CliConfig) -> HandlerResult {
    let path = CliConfig::config_path()?;
    println!("Config file: {}", style(path.display()).dim());
    println!();
    print!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

/// Set a configuration value.
pub fn set_config(key: &str, value: &str) -> HandlerResult {
    let mut config = CliConfig::load()?;
    config.set(key, value)?;
    config.save()?;
    println!("{} Set {} = {}", style("✓").green(), key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DockerArgs {
        DockerArgs::default()
    }

    #[test]
    fn test_empty_flags_select_everything() {
        let images = catalog("ursalab").unwrap();
        assert!(image_filter(&args()).is_empty());
        assert_eq!(select(&images, &args()).len(), images.len());
    }

    #[test]
    fn test_arch_alias_is_resolved() {
        let images = catalog("ursalab").unwrap();
        let args = DockerArgs {
            arch: Some("aarch64".to_string()),
            os: Some("alpine-3.9".to_string()),
            tag: Some("worker".to_string()),
            ..args()
        };
        let names: Vec<String> = select(&images, &args)
            .iter()
            .map(|image| image.qualified_name())
            .collect();
        assert_eq!(
            names,
            vec![
                "arm64v8-alpine-3.9-cpp:worker",
                "arm64v8-alpine-3.9-python-3:worker",
            ]
        );
    }

    #[test]
    fn test_empty_variant_selects_plain_images() {
        let images = catalog("ursalab").unwrap();
        let args = DockerArgs {
            arch: Some("amd64".to_string()),
            os: Some("ubuntu-18.04".to_string()),
            name: Some("cpp".to_string()),
            variant: Some(String::new()),
            ..args()
        };
        let names: Vec<String> = select(&images, &args)
            .iter()
            .map(|image| image.qualified_name())
            .collect();
        assert_eq!(
            names,
            vec!["amd64-ubuntu-18.04-cpp", "amd64-ubuntu-18.04-cpp:worker"]
        );
    }

    #[tokio::test]
    async fn test_dry_run_build() {
        let config = CliConfig::default();
        let args = DockerArgs {
            variant: Some("conda".to_string()),
            ..args()
        };
        build(&config, &args, true, Some(3), true).await.unwrap();
    }
}
