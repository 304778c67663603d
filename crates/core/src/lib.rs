//! s3x-core: Core library for the s3extra upload tools
//!
//! This crate provides:
//! - Locator parsing and key composition
//! - A bounded work queue
//! - The recursive upload engine and content-type sniffing
//! - A streaming read accessor
//! - Configuration management
//! - The ObjectStore trait the S3 adapter implements
//!
//! Nothing here depends on a specific S3 SDK, so the engine can be tested
//! against in-memory stores and filesystems.

pub mod config;
pub mod error;
pub mod fs;
pub mod locator;
pub mod params;
pub mod queue;
pub mod sniff;
pub mod stream;
pub mod traits;
pub mod upload;

pub use config::{Config, ConfigManager, StorageConfig, TransferConfig};
pub use error::{Error, FailedUploads, Result, UploadFailure};
pub use fs::{EntryKind, LocalFs, TokioFs};
pub use locator::{Locator, parse_locator};
pub use params::{GetParams, PutParams};
pub use queue::{DEFAULT_CONCURRENCY, TaskHandle, WorkQueue};
pub use sniff::{ContentSniffer, MimeSniffer, SNIFF_LEN};
pub use stream::{get_object_stream, get_object_stream_at};
pub use traits::{
    GetObjectRequest, ObjectBody, ObjectInfo, ObjectReader, ObjectStore, PutObjectRequest,
};
pub use upload::{
    UploadObserver, UploadSource, UploadSummary, UploadTask, UploadedObject, Uploader,
};
