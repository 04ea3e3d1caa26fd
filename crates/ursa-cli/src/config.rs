//! CLI configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration. Command-line flags take precedence over these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Docker daemon, e.g. `tcp://127.0.0.1:2375`.
    pub docker_host: Option<String>,
    /// Registry username used when pushing.
    pub docker_username: Option<String>,
    /// Registry organization the images are published under.
    #[serde(default = "default_org")]
    pub org: String,
    /// Build context handed to the docker client.
    #[serde(default = "default_context_dir")]
    pub context_dir: PathBuf,
    /// Default number of parallel builds.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Output format.
    #[serde(default)]
    pub output_format: OutputFormat,
}

fn default_org() -> String {
    "ursalab".to_string()
}

fn default_context_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_jobs() -> usize {
    1
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            docker_host: None,
            docker_username: None,
            org: default_org(),
            context_dir: default_context_dir(),
            jobs: default_jobs(),
            output_format: OutputFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl CliConfig {
    /// Load configuration from file.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dirs = directories::ProjectDirs::from("org", "ursalab", "ursabot")
            .ok_or("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.yaml"))
    }

    /// Set a configuration value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "docker_host" => self.docker_host = Some(value.to_string()),
            "docker_username" => self.docker_username = Some(value.to_string()),
            "org" => self.org = value.to_string(),
            "context_dir" => self.context_dir = PathBuf::from(value),
            "jobs" => {
                self.jobs = match value.parse::<usize>() {
                    Ok(jobs) if jobs > 0 => jobs,
                    _ => return Err(format!("Invalid number of jobs: {}", value)),
                };
            }
            "output_format" => {
                self.output_format = match value {
                    "table" => OutputFormat::Table,
                    "json" => OutputFormat::Json,
                    _ => return Err(format!("Invalid output format: {}", value)),
                };
            }
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: CliConfig = serde_yaml::from_str("docker_host: tcp://10.0.0.2:2375\n").unwrap();
        assert_eq!(config.docker_host.as_deref(), Some("tcp://10.0.0.2:2375"));
        assert_eq!(config.org, "ursalab");
        assert_eq!(config.jobs, 1);
        assert_eq!(config.context_dir, PathBuf::from("."));
        assert_eq!(config.output_format, OutputFormat::Table);
    }

    #[test]
    fn test_set() {
        let mut config = CliConfig::default();
        config.set("jobs", "4").unwrap();
        config.set("output_format", "json").unwrap();
        config.set("org", "apache").unwrap();
        assert_eq!(config.jobs, 4);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert_eq!(config.org, "apache");

        assert!(config.set("jobs", "0").is_err());
        assert!(config.set("output_format", "yaml").is_err());
        assert!(config.set("docker_password", "secret").is_err());
    }
}
