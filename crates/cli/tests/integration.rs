//! Integration tests for the s3x CLI
//!
//! These tests require a running S3-compatible server and an existing bucket.
//!
//! Run with:
//! ```bash
//! # Start a local MinIO server and create the bucket
//! docker run -d --name s3x-minio -p 9000:9000 \
//!     -e MINIO_ROOT_USER=accesskey \
//!     -e MINIO_ROOT_PASSWORD=secretkey \
//!     minio/minio server /data
//!
//! export TEST_S3_ENDPOINT=http://localhost:9000
//! export TEST_S3_ACCESS_KEY=accesskey
//! export TEST_S3_SECRET_KEY=secretkey
//! export TEST_S3_BUCKET=s3x-test
//!
//! cargo test --features integration
//! ```

#![cfg(feature = "integration")]

use std::path::Path;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::TempDir;

struct TestEnv {
    endpoint: String,
    access_key: String,
    secret_key: String,
    bucket: String,
    config_dir: TempDir,
}

impl TestEnv {
    /// Read the server settings from the environment and write a config file
    fn setup() -> Option<Self> {
        let env = Self {
            endpoint: std::env::var("TEST_S3_ENDPOINT").ok()?,
            access_key: std::env::var("TEST_S3_ACCESS_KEY").ok()?,
            secret_key: std::env::var("TEST_S3_SECRET_KEY").ok()?,
            bucket: std::env::var("TEST_S3_BUCKET").ok()?,
            config_dir: TempDir::new().ok()?,
        };

        let output = env.run(&["config", "set-endpoint", &env.endpoint, "--path-style"]);
        if !output.status.success() {
            eprintln!(
                "Failed to set endpoint: {}",
                String::from_utf8_lossy(&output.stderr)
            );
            return None;
        }
        Some(env)
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_s3x"))
            .args(args)
            .env("S3X_CONFIG_DIR", self.config_dir.path())
            .env("AWS_ACCESS_KEY_ID", &self.access_key)
            .env("AWS_SECRET_ACCESS_KEY", &self.secret_key)
            .env("AWS_REGION", "us-east-1")
            .env("AWS_EC2_METADATA_DISABLED", "true")
            .output()
            .expect("Failed to execute s3x")
    }

    /// Unique prefix so that runs do not see each other's objects
    fn prefix(&self, name: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        format!("s3://{}/{name}-{nanos}/", self.bucket)
    }
}

macro_rules! require_env {
    () => {
        match TestEnv::setup() {
            Some(env) => env,
            None => {
                eprintln!("Skipping: TEST_S3_* environment not set or server unavailable");
                return;
            }
        }
    };
}

fn write_tree(root: &Path) {
    std::fs::create_dir_all(root.join("nested/deeper")).unwrap();
    std::fs::write(root.join("file1.jpg"), b"\xff\xd8\xff\xe0 not really a jpeg").unwrap();
    std::fs::write(root.join("file2.txt"), "hello from s3x").unwrap();
    std::fs::write(root.join("nested/page.html"), "<html></html>").unwrap();
    std::fs::write(root.join("nested/deeper/data.json"), r#"{"ok":true}"#).unwrap();
}

fn cat(env: &TestEnv, locator: &str) -> Output {
    env.run(&["cat", locator])
}

#[test]
fn test_upload_folder_and_cat_back() {
    let env = require_env!();
    let local = TempDir::new().unwrap();
    write_tree(local.path());
    let prefix = env.prefix("folder");

    let output = env.run(&[
        "upload",
        &local.path().to_string_lossy(),
        &prefix,
        "--json",
        "--concurrency",
        "2",
    ]);
    assert!(
        output.status.success(),
        "upload failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["files"], 4);

    let output = cat(&env, &format!("{prefix}file2.txt"));
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello from s3x");

    let output = cat(&env, &format!("{prefix}nested/deeper/data.json"));
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), r#"{"ok":true}"#);
}

#[test]
fn test_upload_single_file_to_key() {
    let env = require_env!();
    let local = TempDir::new().unwrap();
    let file = local.path().join("report.csv");
    std::fs::write(&file, "a,b\n1,2\n").unwrap();
    let target = format!("{}renamed.csv", env.prefix("single"));

    let output = env.run(&["upload", &file.to_string_lossy(), &target]);
    assert!(output.status.success());

    let output = cat(&env, &target);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "a,b\n1,2\n");
}

#[test]
fn test_cat_range() {
    let env = require_env!();
    let local = TempDir::new().unwrap();
    let file = local.path().join("digits.txt");
    std::fs::write(&file, "0123456789").unwrap();
    let prefix = env.prefix("range");

    let output = env.run(&["upload", &file.to_string_lossy(), &prefix]);
    assert!(output.status.success());

    let output = env.run(&["cat", &format!("{prefix}digits.txt"), "--range", "2-5"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "2345");
}

#[test]
fn test_cat_missing_object() {
    let env = require_env!();
    let missing = format!("{}does-not-exist", env.prefix("missing"));

    let output = cat(&env, &missing);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_upload_to_missing_bucket_reports_failures() {
    let env = require_env!();
    let local = TempDir::new().unwrap();
    write_tree(local.path());
    let target = format!("s3://{}-nonexistent-s3x/", env.bucket);

    let output = env.run(&["upload", &local.path().to_string_lossy(), &target, "--json"]);
    assert_eq!(output.status.code(), Some(6));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["status"], "partial");
    assert_eq!(json["failures"].as_array().unwrap().len(), 4);
}
