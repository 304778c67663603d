//! cat command - Stream object contents
//!
//! Copies the object body to stdout as it arrives, without buffering the
//! whole object in memory.

use clap::Args;
use s3x_core::{Config, GetParams, get_object_stream};
use s3x_s3::S3Client;
use tokio::io::AsyncWriteExt;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Stream object contents to stdout
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Object locator (s3://bucket/key)
    pub locator: String,

    /// Specific version ID to retrieve
    #[arg(long)]
    pub version_id: Option<String>,

    /// Byte range, e.g. bytes=0-1023
    #[arg(long, value_parser = parse_range)]
    pub range: Option<String>,
}

/// Accept `bytes=a-b` as-is and a bare `a-b` as shorthand
fn parse_range(s: &str) -> Result<String, String> {
    let spec = s.strip_prefix("bytes=").unwrap_or(s);
    let valid = spec.split_once('-').is_some_and(|(start, end)| {
        let digits = |v: &str| v.chars().all(|c| c.is_ascii_digit());
        (!start.is_empty() || !end.is_empty()) && digits(start) && digits(end)
    });
    if valid {
        Ok(format!("bytes={spec}"))
    } else {
        Err(format!("invalid range '{s}', expected bytes=START-END"))
    }
}

/// Execute the cat command
pub async fn execute(args: CatArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let client = match S3Client::new(&config.storage).await {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to create S3 client: {e}"));
            return ExitCode::from(&e);
        }
    };

    let params = GetParams {
        version_id: args.version_id,
        range: args.range,
    };

    let mut reader = match get_object_stream(&client, &args.locator, params).await {
        Ok(r) => r,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    // Write directly to stdout (not through formatter to preserve binary data)
    let mut stdout = tokio::io::stdout();
    let copied = tokio::io::copy(&mut reader, &mut stdout).await;
    let flushed = stdout.flush().await;

    match copied.and(flushed) {
        Ok(()) => ExitCode::Success,
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => ExitCode::Success,
        Err(e) => {
            formatter.error(&format!("Failed to stream {}: {e}", args.locator));
            ExitCode::NetworkError
        }
    }
}
