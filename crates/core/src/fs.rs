//! Local filesystem capability
//!
//! The upload engine only needs to stat, list, read a file head and hand a
//! file body to the store. Keeping those behind a trait lets traversal be
//! tested against an in-memory tree.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};
use crate::traits::ObjectBody;

/// Kind of a local filesystem entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Anything else (socket, fifo, device); never uploaded
    Other,
}

/// Filesystem operations used by the upload engine
#[async_trait]
pub trait LocalFs: Send + Sync {
    /// Classify a path. Missing paths yield [`Error::NotFound`].
    async fn stat(&self, path: &Path) -> Result<EntryKind>;

    /// Names of the immediate children of a directory, in listing order
    async fn list(&self, path: &Path) -> Result<Vec<String>>;

    /// Up to `len` leading bytes of a file
    async fn read_head(&self, path: &Path, len: usize) -> Result<Vec<u8>>;

    /// Upload body for a file
    async fn body(&self, path: &Path) -> Result<ObjectBody>;

    /// Identity of a directory with symlinks resolved, used to detect cycles
    async fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}

/// [`LocalFs`] backed by `tokio::fs`
///
/// Symlinks are followed; the walker skips a directory link that leads back
/// into one of its own ancestors. Listings are sorted by name so that upload plans
/// are deterministic; names that are not valid UTF-8 cannot become object
/// keys and are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl LocalFs for TokioFs {
    async fn stat(&self, path: &Path) -> Result<EntryKind> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error(path, e))?;

        Ok(if metadata.is_dir() {
            EntryKind::Directory
        } else if metadata.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        })
    }

    async fn list(&self, path: &Path) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| io_error(path, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => {
                    tracing::warn!(
                        "Skipping {}: file name is not valid UTF-8",
                        path.join(name).display()
                    );
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn read_head(&self, path: &Path, len: usize) -> Result<Vec<u8>> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| io_error(path, e))?;

        let mut head = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut head).await?;
        Ok(head)
    }

    /// Files are not loaded here; the store streams them from disk
    async fn body(&self, path: &Path) -> Result<ObjectBody> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error(path, e))?;
        Ok(ObjectBody::File {
            path: path.to_path_buf(),
            len: metadata.len(),
        })
    }

    async fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        tokio::fs::canonicalize(path)
            .await
            .map_err(|e| io_error(path, e))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(path.display().to_string())
    } else {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_stat() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"hello").unwrap();

        assert_eq!(TokioFs.stat(dir.path()).await.unwrap(), EntryKind::Directory);
        assert_eq!(TokioFs.stat(&file).await.unwrap(), EntryKind::File);
    }

    #[tokio::test]
    async fn test_stat_missing() {
        let dir = TempDir::new().unwrap();
        let result = TokioFs.stat(&dir.path().join("missing")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["c.txt", "a.txt", "b"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let names = TokioFs.list(dir.path()).await.unwrap();
        assert_eq!(names, vec!["a.txt", "b", "c.txt"]);
    }

    #[tokio::test]
    async fn test_read_head_and_body() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.bin");
        std::fs::write(&file, b"0123456789").unwrap();

        assert_eq!(TokioFs.read_head(&file, 4).await.unwrap(), b"0123");
        assert_eq!(TokioFs.read_head(&file, 100).await.unwrap(), b"0123456789");
        assert_eq!(
            TokioFs.body(&file).await.unwrap(),
            ObjectBody::File {
                path: file.clone(),
                len: 10
            }
        );

        let missing = TokioFs.body(&dir.path().join("gone")).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_canonicalize_resolves_symlink() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("link")).unwrap();

        let resolved = TokioFs.canonicalize(&dir.path().join("link")).await.unwrap();
        assert_eq!(resolved, std::fs::canonicalize(&real).unwrap());
    }
}
