//! upload command - Upload a file or directory tree
//!
//! Walks the source, detects a content type per file and uploads everything
//! through a bounded queue. Failures of single files are reported together
//! at the end.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use s3x_core::{
    Config, Error, FailedUploads, Locator, PutParams, UploadSource, UploadSummary, UploadTask,
    UploadedObject, Uploader, parse_locator,
};
use s3x_s3::S3Client;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, ProgressBar};

/// Upload a file or directory tree
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Local file or directory
    pub source: PathBuf,

    /// Destination (s3://bucket/key, or s3://bucket/prefix/ for folders)
    pub destination: String,

    /// Maximum number of concurrent uploads (overrides config)
    #[arg(short = 'c', long)]
    pub concurrency: Option<NonZeroUsize>,

    /// Content type for every uploaded file (skips detection)
    #[arg(long)]
    pub content_type: Option<String>,

    /// Cache-Control header
    #[arg(long)]
    pub cache_control: Option<String>,

    /// Content-Disposition header
    #[arg(long)]
    pub content_disposition: Option<String>,

    /// Content-Encoding header
    #[arg(long)]
    pub content_encoding: Option<String>,

    /// Storage class (e.g. STANDARD_IA)
    #[arg(long)]
    pub storage_class: Option<String>,

    /// Canned ACL (e.g. public-read)
    #[arg(long)]
    pub acl: Option<String>,

    /// User metadata, may be repeated
    #[arg(long = "metadata", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub metadata: Vec<(String, String)>,

    /// Only show what would be uploaded
    #[arg(long)]
    pub dry_run: bool,
}

impl UploadArgs {
    fn put_params(&self) -> PutParams {
        let mut params = PutParams {
            content_type: self.content_type.clone(),
            cache_control: self.cache_control.clone(),
            content_disposition: self.content_disposition.clone(),
            content_encoding: self.content_encoding.clone(),
            storage_class: self.storage_class.clone(),
            acl: self.acl.clone(),
            ..Default::default()
        };
        for (key, value) in &self.metadata {
            params = params.metadata(key, value);
        }
        params
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

#[derive(Debug, Serialize)]
struct UploadOutput {
    status: &'static str,
    destination: String,
    files: usize,
    total_bytes: u64,
    total_size_human: String,
    uploaded: Vec<UploadedOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<FailureOutput>,
}

#[derive(Debug, Serialize)]
struct UploadedOutput {
    source: String,
    target: String,
    size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct FailureOutput {
    source: String,
    target: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct PlannedOutput {
    status: &'static str,
    files: usize,
    planned: Vec<UploadedOutput>,
}

/// Execute the upload command
pub async fn execute(args: UploadArgs, config: &Config, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let destination = match parse_locator(&args.destination) {
        Ok(d) => d,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    let client = match S3Client::new(&config.storage).await {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to create S3 client: {e}"));
            return ExitCode::from(&e);
        }
    };

    let concurrency = args
        .concurrency
        .map_or(config.transfer.concurrency, NonZeroUsize::get);
    let uploader = match Uploader::new(Arc::new(client)).with_concurrency(concurrency) {
        Ok(u) => u,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };
    let params = args.put_params();

    if args.dry_run {
        return match uploader.plan(&args.source, &destination, params).await {
            Ok(tasks) => {
                print_plan(&tasks, &formatter);
                ExitCode::Success
            }
            Err(e) => {
                formatter.error(&e.to_string());
                ExitCode::from(&e)
            }
        };
    }

    let progress = Arc::new(ProgressBar::new(formatter.config(), 0));
    let uploader = if progress.is_visible() {
        uploader.with_observer(Arc::clone(&progress) as _)
    } else {
        uploader
    };

    tracing::debug!(concurrency, "Uploading {} -> {destination}", args.source.display());
    let result = tokio::select! {
        result = uploader.upload_to(&args.source, &destination, params) => result,
        _ = tokio::signal::ctrl_c() => {
            progress.finish_and_clear();
            formatter.error("Interrupted; uploads in flight were abandoned");
            return ExitCode::Interrupted;
        }
    };
    progress.finish_and_clear();

    match result {
        Ok(summary) => {
            print_summary(&summary, &destination, &formatter);
            ExitCode::Success
        }
        Err(Error::PartialFailure(failed)) => {
            print_failures(&failed, &destination, &formatter);
            ExitCode::PartialFailure
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from(&e)
        }
    }
}

fn print_plan(tasks: &[UploadTask], formatter: &Formatter) {
    if formatter.is_json() {
        let planned = tasks
            .iter()
            .map(|task| UploadedOutput {
                source: task.source.display_name(),
                target: task.destination.to_string(),
                size_bytes: match &task.source {
                    UploadSource::Bytes(body) => body.len() as u64,
                    UploadSource::File(path) => std::fs::metadata(path).map_or(0, |m| m.len()),
                },
                content_type: task.content_type.clone(),
            })
            .collect();
        formatter.json(&PlannedOutput {
            status: "dry-run",
            files: tasks.len(),
            planned,
        });
        return;
    }

    for task in tasks {
        formatter.println(&format!(
            "Would upload: {} -> {} ({})",
            task.source.display_name(),
            task.destination,
            task.content_type.as_deref().unwrap_or("unknown type")
        ));
    }
    formatter.success(&format!("{} file(s) planned.", tasks.len()));
}

fn summary_output(summary: &UploadSummary, destination: &Locator) -> UploadOutput {
    UploadOutput {
        status: "success",
        destination: destination.to_string(),
        files: summary.len(),
        total_bytes: summary.total_bytes(),
        total_size_human: humansize::format_size(summary.total_bytes(), humansize::BINARY),
        uploaded: uploaded_output(&summary.uploaded),
        failures: Vec::new(),
    }
}

fn uploaded_output(objects: &[UploadedObject]) -> Vec<UploadedOutput> {
    objects
        .iter()
        .map(|object| UploadedOutput {
            source: object.source.clone(),
            target: object.destination.to_string(),
            size_bytes: object.size_bytes,
            content_type: object.content_type.clone(),
        })
        .collect()
}

fn print_summary(summary: &UploadSummary, destination: &Locator, formatter: &Formatter) {
    if formatter.is_json() {
        formatter.json(&summary_output(summary, destination));
        return;
    }

    for object in &summary.uploaded {
        formatter.println(&format!(
            "{} -> {} ({})",
            object.source,
            object.destination,
            humansize::format_size(object.size_bytes, humansize::BINARY)
        ));
    }
    formatter.success(&format!(
        "Uploaded {} file(s), {}.",
        summary.len(),
        humansize::format_size(summary.total_bytes(), humansize::BINARY)
    ));
}

fn failure_output(failed: &FailedUploads, destination: &Locator) -> UploadOutput {
    UploadOutput {
        status: "partial",
        destination: destination.to_string(),
        files: failed.total,
        total_bytes: failed.uploaded_bytes(),
        total_size_human: humansize::format_size(failed.uploaded_bytes(), humansize::BINARY),
        uploaded: uploaded_output(&failed.uploaded),
        failures: failed
            .failures
            .iter()
            .map(|f| FailureOutput {
                source: f.source.clone(),
                target: f.destination.to_string(),
                error: f.error.to_string(),
            })
            .collect(),
    }
}

fn failure_table(failed: &FailedUploads) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_header(vec!["Source", "Destination", "Error"]);
    for failure in &failed.failures {
        table.add_row(vec![
            failure.source.clone(),
            failure.destination.to_string(),
            failure.error.to_string(),
        ]);
    }
    table
}

fn print_failures(failed: &FailedUploads, destination: &Locator, formatter: &Formatter) {
    if formatter.is_json() {
        formatter.json(&failure_output(failed, destination));
        return;
    }

    formatter.error(&format!(
        "{} of {} uploads failed ({} succeeded)",
        failed.failures.len(),
        failed.total,
        failed.succeeded()
    ));
    // The table goes to stderr with the error so that stdout stays clean
    eprintln!("{}", failure_table(failed));
}
