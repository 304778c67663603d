//! Shell completion generation
//!
//! Generate shell completion scripts for bash, zsh, fish, and powershell.

use std::io::Write;
use std::path::PathBuf;

use clap::CommandFactory;
use clap_complete::{Generator, Shell};

use super::Cli;
use crate::exit_code::ExitCode;

/// Arguments for the completions command
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Generate shell completions
pub fn execute(args: CompletionsArgs) -> ExitCode {
    let result = match &args.output {
        Some(path) => std::fs::File::create(path)
            .and_then(|mut file| write_completions(args.shell, &mut file)),
        None => write_completions(args.shell, &mut std::io::stdout()),
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            eprintln!("Failed to write completions: {e}");
            ExitCode::GeneralError
        }
    }
}

fn write_completions<G: Generator>(generator: G, out: &mut dyn Write) -> std::io::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(generator, &mut cmd, name, out);
    out.flush()
}
