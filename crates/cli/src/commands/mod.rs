//! CLI command definitions and execution
//!
//! Each command lives in its own module with an `Args` struct and an
//! `execute` function returning an [`ExitCode`].

use anyhow::Context;
use clap::{Parser, Subcommand};
use s3x_core::{Config, ConfigManager};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod cat;
pub mod completions;
mod config;
pub mod upload;

/// s3x - recursive uploads for S3-compatible storage
///
/// Uploads files and directory trees with detected content types, and
/// streams objects back out.
#[derive(Parser, Debug)]
#[command(name = "s3x")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file or directory tree
    Upload(upload::UploadArgs),

    /// Stream object contents to stdout
    Cat(cat::CatArgs),

    /// Show or change configuration
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    let command = match cli.command {
        Commands::Completions(args) => return completions::execute(args),
        command => command,
    };

    let (manager, config) = match load_config() {
        Ok(loaded) => loaded,
        Err(e) => {
            Formatter::new(output_config).error(&format!("{e:#}"));
            return e
                .downcast_ref::<s3x_core::Error>()
                .map_or(ExitCode::GeneralError, ExitCode::from);
        }
    };

    let output_config = output_config.with_defaults(&config.defaults);
    if output_config.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    match command {
        Commands::Upload(args) => upload::execute(args, &config, output_config).await,
        Commands::Cat(args) => cat::execute(args, &config, output_config).await,
        Commands::Config(cmd) => config::execute(cmd, &manager, config, output_config),
        Commands::Completions(args) => completions::execute(args),
    }
}

fn load_config() -> anyhow::Result<(ConfigManager, Config)> {
    let manager = ConfigManager::new().context("Failed to locate configuration")?;
    let config = manager.load().with_context(|| {
        format!(
            "Failed to load configuration from {}",
            manager.config_path().display()
        )
    })?;
    Ok((manager, config))
}
