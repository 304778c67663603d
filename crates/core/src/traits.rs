//! ObjectStore trait definition
//!
//! This trait defines the storage capability the upload engine and the
//! stream accessor rely on. It allows the core to be decoupled from the
//! specific S3 SDK implementation.

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tokio::io::AsyncRead;

use crate::error::Result;
use crate::locator::Locator;
use crate::params::{GetParams, PutParams};

/// Readable byte stream for a remote object
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Metadata for a stored object
#[derive(Debug, Clone, Serialize)]
pub struct ObjectInfo {
    /// Object key
    pub key: String,

    /// Size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,

    /// ETag (usually MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Version ID on versioned buckets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a stored object
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            size_human: Some(humansize::format_size(
                u64::try_from(size).unwrap_or(0),
                humansize::BINARY,
            )),
            last_modified: None,
            etag: None,
            version_id: None,
            content_type: None,
        }
    }
}

/// Body of a `PutObject` call
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectBody {
    /// Bytes already held in memory
    Bytes(Bytes),
    /// Local file streamed by the store while the request is sent
    File { path: PathBuf, len: u64 },
}

impl ObjectBody {
    /// Body size in bytes
    pub fn len(&self) -> u64 {
        match self {
            ObjectBody::Bytes(bytes) => bytes.len() as u64,
            ObjectBody::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Bytes> for ObjectBody {
    fn from(bytes: Bytes) -> Self {
        ObjectBody::Bytes(bytes)
    }
}

/// A single `PutObject` call
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    /// Fully resolved destination object
    pub locator: Locator,
    /// Object body
    pub body: ObjectBody,
    /// Resolved content type; `None` leaves the backend default in place
    pub content_type: Option<String>,
    /// Caller parameters (the `content_type` override is already folded in)
    pub params: Arc<PutParams>,
}

/// A single `GetObject` call
#[derive(Debug, Clone)]
pub struct GetObjectRequest {
    /// Object to read
    pub locator: Locator,
    /// Version / range selection
    pub params: GetParams,
}

/// Trait for S3-compatible storage operations
///
/// This trait is implemented by the S3 adapter and can be mocked for testing.
/// Retries, if any, are the implementation's business.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object
    async fn put_object(&self, request: PutObjectRequest) -> Result<ObjectInfo>;

    /// Open a read stream for an object
    async fn get_object(&self, request: GetObjectRequest) -> Result<ObjectReader>;
}
