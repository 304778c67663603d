//! Recursive upload engine
//!
//! Uploads a local file or directory tree to a remote prefix:
//!
//! 1. classify the source and validate the destination shape,
//! 2. walk the tree depth-first and build a flat list of [`UploadTask`]s,
//!    sniffing a content type for each file,
//! 3. submit every task to the [`WorkQueue`] and wait for all of them.
//!
//! Planning finishes before anything is submitted, so a caller mistake
//! (missing path, wrong destination shape) never leaves a half-uploaded
//! tree behind. Failures of individual uploads do not stop their siblings;
//! they are collected into [`Error::PartialFailure`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, FailedUploads, Result, UploadFailure};
use crate::fs::{EntryKind, LocalFs, TokioFs};
use crate::locator::{Locator, SEPARATOR, parse_locator};
use crate::params::PutParams;
use crate::queue::WorkQueue;
use crate::sniff::{ContentSniffer, MimeSniffer, SNIFF_LEN};
use crate::traits::{ObjectBody, ObjectStore, PutObjectRequest};

/// Where the bytes of an upload come from
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// A local regular file, read when the task runs
    File(PathBuf),
    /// An in-memory buffer
    Bytes(Bytes),
}

impl UploadSource {
    /// Name used in logs and failure reports
    pub fn display_name(&self) -> String {
        match self {
            UploadSource::File(path) => path.display().to_string(),
            UploadSource::Bytes(_) => "<memory>".to_string(),
        }
    }
}

/// One file destined for one remote object
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub source: UploadSource,
    /// Fully resolved object locator
    pub destination: Locator,
    /// Resolved content type, `None` when nothing could be determined
    pub content_type: Option<String>,
    pub params: Arc<PutParams>,
}

/// An object that was stored successfully
#[derive(Debug, Clone, Serialize)]
pub struct UploadedObject {
    pub source: String,
    pub destination: Locator,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Result of a fully successful upload call
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadSummary {
    pub uploaded: Vec<UploadedObject>,
}

impl UploadSummary {
    pub fn len(&self) -> usize {
        self.uploaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.uploaded.iter().map(|o| o.size_bytes).sum()
    }
}

/// Progress callbacks, invoked from the worker running each task
pub trait UploadObserver: Send + Sync {
    /// Called once per call with the number of planned uploads
    fn on_planned(&self, _files: usize) {}

    /// Called when an object has been stored
    fn on_uploaded(&self, _object: &UploadedObject) {}

    /// Called when an upload failed
    fn on_failed(&self, _source: &str, _error: &Error) {}
}

/// Recursive uploader over an [`ObjectStore`]
///
/// All calls on one uploader share its [`WorkQueue`], so the concurrency
/// limit holds across concurrent `upload` calls as well.
pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    fs: Arc<dyn LocalFs>,
    sniffer: Arc<dyn ContentSniffer>,
    queue: WorkQueue,
    observer: Option<Arc<dyn UploadObserver>>,
}

impl Uploader {
    /// Create an uploader with the default filesystem, sniffer and queue
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            fs: Arc::new(TokioFs),
            sniffer: Arc::new(MimeSniffer),
            queue: WorkQueue::default(),
            observer: None,
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn LocalFs>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_sniffer(mut self, sniffer: Arc<dyn ContentSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    pub fn with_queue(mut self, queue: WorkQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Replace the queue with a fresh one running at most `limit` uploads
    pub fn with_concurrency(self, limit: usize) -> Result<Self> {
        let queue = WorkQueue::new(limit)?;
        Ok(self.with_queue(queue))
    }

    pub fn with_observer(mut self, observer: Arc<dyn UploadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Upload a local file or directory to the locator string `destination`
    pub async fn upload(
        &self,
        content: impl AsRef<Path>,
        destination: &str,
        params: PutParams,
    ) -> Result<UploadSummary> {
        let destination = parse_locator(destination)?;
        self.upload_to(content.as_ref(), &destination, params).await
    }

    /// Upload a local file or directory to a parsed locator
    ///
    /// Resolves once every upload has settled.
    #[instrument(skip_all, fields(content = %content.display(), destination = %destination))]
    pub async fn upload_to(
        &self,
        content: &Path,
        destination: &Locator,
        params: PutParams,
    ) -> Result<UploadSummary> {
        let tasks = self.plan(content, destination, params).await?;
        self.run(tasks).await
    }

    /// Upload an in-memory buffer to an object-shaped locator
    #[instrument(skip(self, body, params), fields(size = body.len()))]
    pub async fn upload_bytes(
        &self,
        body: Bytes,
        destination: &str,
        params: PutParams,
    ) -> Result<UploadSummary> {
        let destination = parse_locator(destination)?;
        if destination.is_prefix() {
            return Err(Error::ShapeMismatch(format!(
                "destination must name an object when uploading a buffer: {destination}"
            )));
        }

        let content_type = match &params.content_type {
            Some(_) => params.resolve_content_type(None),
            None => {
                let name = destination.file_name().unwrap_or_default();
                let head = &body[..body.len().min(SNIFF_LEN)];
                params.resolve_content_type(self.sniffer.sniff(name, head))
            }
        };

        let task = UploadTask {
            source: UploadSource::Bytes(body),
            destination,
            content_type,
            params: Arc::new(params),
        };
        self.run(vec![task]).await
    }

    /// Build the upload plan for `content` without uploading anything
    ///
    /// Directories require a prefix-shaped destination. A single file is
    /// stored under `prefix + file name` for a prefix-shaped destination and
    /// under the given key verbatim otherwise.
    pub async fn plan(
        &self,
        content: &Path,
        destination: &Locator,
        params: PutParams,
    ) -> Result<Vec<UploadTask>> {
        let params = Arc::new(params);

        match self.fs.stat(content).await? {
            EntryKind::Directory => {
                if !destination.is_prefix() {
                    return Err(Error::ShapeMismatch(format!(
                        "destination must be a folder (end with '{SEPARATOR}') when uploading directory {}: {destination}",
                        content.display()
                    )));
                }
                let mut tasks = Vec::new();
                let mut ancestors = HashSet::new();
                self.walk(
                    content.to_path_buf(),
                    destination.clone(),
                    &params,
                    &mut ancestors,
                    &mut tasks,
                )
                .await?;
                Ok(tasks)
            }
            EntryKind::File => {
                let destination = if destination.is_prefix() {
                    let name = content
                        .file_name()
                        .and_then(|n| n.to_str())
                        .ok_or_else(|| {
                            Error::InvalidPath(format!(
                                "cannot derive an object name from {}",
                                content.display()
                            ))
                        })?;
                    destination.join(name)
                } else {
                    destination.clone()
                };
                let task = self
                    .file_task(content.to_path_buf(), destination, &params)
                    .await;
                Ok(vec![task])
            }
            EntryKind::Other => Err(Error::ShapeMismatch(format!(
                "{} is neither a regular file nor a directory",
                content.display()
            ))),
        }
    }

    /// Depth-first walk; a sub-directory is finished before later siblings
    ///
    /// `ancestors` holds the resolved directories on the current path, so a
    /// symlink pointing back up the tree is skipped instead of recursed into.
    fn walk<'a>(
        &'a self,
        dir: PathBuf,
        prefix: Locator,
        params: &'a Arc<PutParams>,
        ancestors: &'a mut HashSet<PathBuf>,
        tasks: &'a mut Vec<UploadTask>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let identity = self.fs.canonicalize(&dir).await?;
            if !ancestors.insert(identity.clone()) {
                warn!(
                    "Skipping {}: directory cycle back to {}",
                    dir.display(),
                    identity.display()
                );
                return Ok(());
            }

            for name in self.fs.list(&dir).await? {
                let path = dir.join(&name);
                match self.fs.stat(&path).await {
                    Ok(EntryKind::Directory) => {
                        let child = prefix.join(&format!("{name}{SEPARATOR}"));
                        self.walk(path, child, params, ancestors, tasks).await?;
                    }
                    Ok(EntryKind::File) => {
                        let task = self.file_task(path, prefix.join(&name), params).await;
                        tasks.push(task);
                    }
                    Ok(EntryKind::Other) => {
                        warn!("Skipping {}: not a regular file", path.display());
                    }
                    // Removed between listing and stat, or a dangling symlink
                    Err(Error::NotFound(_)) => {
                        warn!("Skipping {}: no longer exists", path.display());
                    }
                    Err(e) => return Err(e),
                }
            }

            ancestors.remove(&identity);
            Ok(())
        })
    }

    async fn file_task(
        &self,
        path: PathBuf,
        destination: Locator,
        params: &Arc<PutParams>,
    ) -> UploadTask {
        let content_type = match &params.content_type {
            Some(_) => params.resolve_content_type(None),
            None => params.resolve_content_type(self.sniff_file(&path).await),
        };

        UploadTask {
            source: UploadSource::File(path),
            destination,
            content_type,
            params: Arc::clone(params),
        }
    }

    async fn sniff_file(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_string_lossy();
        let head = match self.fs.read_head(path, SNIFF_LEN).await {
            Ok(head) => head,
            Err(e) => {
                debug!("Could not read {} for sniffing: {e}", path.display());
                Vec::new()
            }
        };
        self.sniffer.sniff(&name, &head)
    }

    /// Submit planned tasks and wait for every one of them
    pub async fn run(&self, tasks: Vec<UploadTask>) -> Result<UploadSummary> {
        let total = tasks.len();
        if let Some(observer) = &self.observer {
            observer.on_planned(total);
        }

        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let source = task.source.display_name();
                let destination = task.destination.clone();
                debug!(
                    source = %source,
                    destination = %destination,
                    content_type = task.content_type.as_deref().unwrap_or("-"),
                    "Submitting upload"
                );

                let store = Arc::clone(&self.store);
                let fs = Arc::clone(&self.fs);
                let observer = self.observer.clone();
                let name = source.clone();
                let handle = self.queue.submit(async move {
                    let outcome = execute(store.as_ref(), fs.as_ref(), task, name).await;
                    if let Some(observer) = observer {
                        match &outcome {
                            Ok(object) => observer.on_uploaded(object),
                            Err((source, error)) => observer.on_failed(source, error),
                        }
                    }
                    outcome.map_err(|(_, error)| error)
                });
                (source, destination, handle)
            })
            .collect();

        let mut uploaded = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (source, destination, handle) in handles {
            match handle.outcome().await.and_then(|outcome| outcome) {
                Ok(object) => uploaded.push(object),
                Err(error) => {
                    warn!("Failed to upload {source} -> {destination}: {error}");
                    failures.push(UploadFailure {
                        source,
                        destination,
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            info!(files = uploaded.len(), "Upload complete");
            Ok(UploadSummary { uploaded })
        } else {
            Err(Error::PartialFailure(FailedUploads {
                total,
                uploaded,
                failures,
            }))
        }
    }
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

async fn execute(
    store: &dyn ObjectStore,
    fs: &dyn LocalFs,
    task: UploadTask,
    source: String,
) -> std::result::Result<UploadedObject, (String, Error)> {
    let body = match task.source {
        UploadSource::File(path) => match fs.body(&path).await {
            Ok(body) => body,
            Err(e) => return Err((source, e)),
        },
        UploadSource::Bytes(bytes) => ObjectBody::Bytes(bytes),
    };
    let size_bytes = body.len();

    let request = PutObjectRequest {
        locator: task.destination.clone(),
        body,
        content_type: task.content_type.clone(),
        params: task.params,
    };

    match store.put_object(request).await {
        Ok(info) => {
            debug!("Uploaded {source} -> {}", task.destination);
            Ok(UploadedObject {
                source,
                destination: task.destination,
                size_bytes,
                etag: info.etag,
                content_type: task.content_type,
            })
        }
        Err(e) => Err((source, e)),
    }
}
