//! config command - Show and edit the configuration file

use clap::Subcommand;
use s3x_core::{Config, ConfigManager};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Set the default number of concurrent uploads
    SetConcurrency {
        /// Positive number of uploads
        value: usize,
    },

    /// Set the S3 endpoint URL (for S3-compatible services)
    SetEndpoint {
        /// Endpoint URL, e.g. http://localhost:9000
        url: String,

        /// Use path-style bucket addressing
        #[arg(long)]
        path_style: bool,
    },

    /// Set the region
    SetRegion {
        /// Region name, e.g. us-east-1
        region: String,
    },

    /// Print the configuration file path
    Path,
}

#[derive(Debug, Serialize)]
struct PathOutput {
    path: String,
    exists: bool,
}

/// Execute a config subcommand
pub fn execute(
    cmd: ConfigCommands,
    manager: &ConfigManager,
    mut config: Config,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    match cmd {
        ConfigCommands::Show => {
            show(&config, &formatter);
            ExitCode::Success
        }
        ConfigCommands::Path => {
            let path = manager.config_path();
            if formatter.is_json() {
                formatter.json(&PathOutput {
                    path: path.display().to_string(),
                    exists: path.exists(),
                });
            } else {
                formatter.println(&path.display().to_string());
            }
            ExitCode::Success
        }
        ConfigCommands::SetConcurrency { value } => {
            config.transfer.concurrency = value;
            save(manager, &config, &formatter, &format!("Concurrency set to {value}."))
        }
        ConfigCommands::SetEndpoint { url, path_style } => {
            let message = format!("Endpoint set to {url}.");
            config.storage.endpoint = Some(url);
            config.storage.force_path_style = path_style;
            save(manager, &config, &formatter, &message)
        }
        ConfigCommands::SetRegion { region } => {
            let message = format!("Region set to {region}.");
            config.storage.region = Some(region);
            save(manager, &config, &formatter, &message)
        }
    }
}

fn show(config: &Config, formatter: &Formatter) {
    if formatter.is_json() {
        formatter.json(config);
        return;
    }
    match toml::to_string_pretty(config) {
        Ok(text) => formatter.println(text.trim_end()),
        Err(e) => formatter.error(&format!("Failed to render configuration: {e}")),
    }
}

fn save(manager: &ConfigManager, config: &Config, formatter: &Formatter, message: &str) -> ExitCode {
    match manager.save(config) {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(config);
            } else {
                formatter.success(message);
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to save configuration: {e}"));
            ExitCode::from(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quiet() -> OutputConfig {
        OutputConfig {
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_set_concurrency_persists() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::from_dir(dir.path());

        let code = execute(
            ConfigCommands::SetConcurrency { value: 16 },
            &manager,
            Config::default(),
            quiet(),
        );
        assert_eq!(code, ExitCode::Success);
        assert_eq!(manager.load().unwrap().transfer.concurrency, 16);
    }

    #[test]
    fn test_set_concurrency_zero_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::from_dir(dir.path());

        let code = execute(
            ConfigCommands::SetConcurrency { value: 0 },
            &manager,
            Config::default(),
            quiet(),
        );
        assert_eq!(code, ExitCode::UsageError);
        assert!(!manager.config_path().exists());
    }

    #[test]
    fn test_set_endpoint_and_region() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::from_dir(dir.path());

        let code = execute(
            ConfigCommands::SetEndpoint {
                url: "http://localhost:9000".into(),
                path_style: true,
            },
            &manager,
            Config::default(),
            quiet(),
        );
        assert_eq!(code, ExitCode::Success);

        let config = manager.load().unwrap();
        let code = execute(
            ConfigCommands::SetRegion {
                region: "eu-west-1".into(),
            },
            &manager,
            config,
            quiet(),
        );
        assert_eq!(code, ExitCode::Success);

        let storage = manager.load().unwrap().storage;
        assert_eq!(storage.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(storage.region.as_deref(), Some("eu-west-1"));
        assert!(storage.force_path_style);
    }

    #[test]
    fn test_set_endpoint_invalid_url() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::from_dir(dir.path());

        let code = execute(
            ConfigCommands::SetEndpoint {
                url: "not a url".into(),
                path_style: false,
            },
            &manager,
            Config::default(),
            quiet(),
        );
        assert_eq!(code, ExitCode::UsageError);
    }
}
