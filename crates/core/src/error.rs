//! Error types for s3x-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.
//! Per-file upload failures are collected into [`FailedUploads`] rather than
//! aborting a whole directory upload.

use std::fmt;

use thiserror::Error;

use crate::locator::Locator;
use crate::upload::UploadedObject;

/// Result type alias for s3x-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for s3x-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or ambiguous locator string
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// Source and destination shapes disagree (file vs. folder)
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Local path that cannot be turned into an object name
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Local or remote resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more uploads of a batch failed
    #[error("{0}")]
    PartialFailure(FailedUploads),

    /// Opening a remote object stream failed
    #[error("Failed to read {locator}: {source}")]
    RemoteRead {
        locator: String,
        #[source]
        source: Box<Error>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Authentication or permission failure reported by the backend
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidLocator(_)
            | Error::ShapeMismatch(_)
            | Error::InvalidPath(_)
            | Error::InvalidConfig(_)
            | Error::Config(_) => 2, // UsageError
            Error::Network(_) => 3,   // NetworkError
            Error::Auth(_) => 4,      // AuthError
            Error::NotFound(_) => 5,  // NotFound
            Error::PartialFailure(_) => 6,
            Error::RemoteRead { source, .. } => source.exit_code(),
            _ => 1, // GeneralError
        }
    }
}

/// A single file that could not be uploaded
#[derive(Debug)]
pub struct UploadFailure {
    /// Local source path, or `<memory>` for buffer uploads
    pub source: String,
    /// Remote object the file was destined for
    pub destination: Locator,
    /// Error reported while reading the file or storing the object
    pub error: Error,
}

/// Aggregate of every failed upload in one `upload` call
#[derive(Debug)]
pub struct FailedUploads {
    /// Number of uploads attempted
    pub total: usize,
    /// Objects that were stored before the batch settled, in submission order
    pub uploaded: Vec<UploadedObject>,
    /// The uploads that failed, in submission order
    pub failures: Vec<UploadFailure>,
}

impl FailedUploads {
    /// Source paths of the failed uploads
    pub fn sources(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.source.as_str()).collect()
    }

    /// Number of uploads that went through
    pub fn succeeded(&self) -> usize {
        self.uploaded.len()
    }

    /// Bytes stored by the uploads that went through
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded.iter().map(|o| o.size_bytes).sum()
    }
}

impl fmt::Display for FailedUploads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} uploads failed",
            self.failures.len(),
            self.total
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(
                f,
                "{sep}{} -> {} ({})",
                failure.source, failure.destination, failure.error
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for FailedUploads {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidLocator("test".into()).exit_code(), 2);
        assert_eq!(Error::ShapeMismatch("test".into()).exit_code(), 2);
        assert_eq!(Error::InvalidConfig("test".into()).exit_code(), 2);
        assert_eq!(Error::Network("test".into()).exit_code(), 3);
        assert_eq!(Error::Auth("test".into()).exit_code(), 4);
        assert_eq!(Error::NotFound("test".into()).exit_code(), 5);
        assert_eq!(Error::General("test".into()).exit_code(), 1);

        let partial = Error::PartialFailure(FailedUploads {
            total: 1,
            uploaded: vec![],
            failures: vec![],
        });
        assert_eq!(partial.exit_code(), 6);
    }

    #[test]
    fn test_remote_read_uses_inner_exit_code() {
        let err = Error::RemoteRead {
            locator: "s3://bucket/key".into(),
            source: Box::new(Error::NotFound("s3://bucket/key".into())),
        };
        assert_eq!(err.exit_code(), 5);
        assert_eq!(
            err.to_string(),
            "Failed to read s3://bucket/key: Not found: s3://bucket/key"
        );
    }

    #[test]
    fn test_failed_uploads_display() {
        let failed = FailedUploads {
            total: 3,
            uploaded: vec![UploadedObject {
                source: "/data/c.txt".into(),
                destination: Locator::new("bucket", "dir/c.txt"),
                size_bytes: 7,
                etag: None,
                content_type: None,
            }],
            failures: vec![
                UploadFailure {
                    source: "/data/a.txt".into(),
                    destination: Locator::new("bucket", "dir/a.txt"),
                    error: Error::Network("connection reset".into()),
                },
                UploadFailure {
                    source: "/data/b.txt".into(),
                    destination: Locator::new("bucket", "dir/b.txt"),
                    error: Error::Auth("AccessDenied".into()),
                },
            ],
        };

        assert_eq!(failed.succeeded(), 1);
        assert_eq!(failed.uploaded_bytes(), 7);
        assert_eq!(failed.sources(), vec!["/data/a.txt", "/data/b.txt"]);
        assert_eq!(
            failed.to_string(),
            "2 of 3 uploads failed: /data/a.txt -> s3://bucket/dir/a.txt (Network error: connection reset); \
             /data/b.txt -> s3://bucket/dir/b.txt (Authentication failed: AccessDenied)"
        );
    }
}
