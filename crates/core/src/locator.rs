//! Locator parsing and key composition
//!
//! Handles remote locators in the format: s3://bucket[/key]
//!
//! A locator whose key is empty or ends with `/` is *prefix-shaped* and
//! denotes a folder-like destination. Any other key names a single object.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

/// Separator used inside object keys
pub const SEPARATOR: char = '/';

/// Schemes accepted by [`parse_locator`]
const SCHEMES: &[&str] = &["s3", "s3a", "s3n"];

/// A parsed locator pointing to an S3 location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Locator {
    /// Bucket name
    pub bucket: String,
    /// Object key or prefix (empty for bucket root)
    pub key: String,
}

impl Locator {
    /// Create a new Locator
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Whether this locator denotes a prefix rather than a single object
    pub fn is_prefix(&self) -> bool {
        self.key.is_empty() || self.key.ends_with(SEPARATOR)
    }

    /// Join a child component onto this locator's key
    ///
    /// A missing separator between the current key and `child` is inserted,
    /// so `dir` and `dir/` both yield `dir/child`.
    pub fn join(&self, child: &str) -> Self {
        let mut key = self.key.clone();
        if !key.is_empty() && !key.ends_with(SEPARATOR) {
            key.push(SEPARATOR);
        }
        key.push_str(child);
        Self {
            bucket: self.bucket.clone(),
            key,
        }
    }

    /// Last non-empty component of the key
    pub fn file_name(&self) -> Option<&str> {
        self.key
            .trim_end_matches(SEPARATOR)
            .rsplit(SEPARATOR)
            .next()
            .filter(|name| !name.is_empty())
    }

    /// Get the parent prefix (one level up)
    pub fn parent(&self) -> Option<Self> {
        if self.key.is_empty() {
            return None;
        }
        let key = self.key.trim_end_matches(SEPARATOR);
        let parent = match key.rfind(SEPARATOR) {
            Some(pos) => key[..=pos].to_string(),
            None => String::new(),
        };
        Some(Self {
            bucket: self.bucket.clone(),
            key: parent,
        })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_locator(s)
    }
}

/// Parse a locator string into a [`Locator`]
///
/// The scheme and bucket are validated as a URL. The key is taken verbatim
/// from the input so that characters with URL meaning (`?`, `#`, `%`) stay
/// part of the object key.
pub fn parse_locator(locator: &str) -> Result<Locator> {
    if locator.is_empty() {
        return Err(Error::InvalidLocator("Locator cannot be empty".into()));
    }

    let url = Url::parse(locator).map_err(|e| {
        Error::InvalidLocator(format!("'{locator}': {e}. Use format: s3://bucket[/key]"))
    })?;

    if !SCHEMES.contains(&url.scheme()) {
        return Err(Error::InvalidLocator(format!(
            "'{locator}': unsupported scheme '{}'. Use format: s3://bucket[/key]",
            url.scheme()
        )));
    }

    // Everything after "scheme://"
    let rest = locator
        .split_once("://")
        .map(|(_, rest)| rest)
        .ok_or_else(|| {
            Error::InvalidLocator(format!("'{locator}': missing '://' after scheme"))
        })?;

    let (bucket, key) = match rest.split_once(SEPARATOR) {
        Some((bucket, key)) => (bucket, key),
        None => (rest, ""),
    };

    if bucket.is_empty() {
        return Err(Error::InvalidLocator(format!(
            "'{locator}': bucket name cannot be empty"
        )));
    }

    // Userinfo or a port would make the URL host differ from the raw bucket
    if url.host_str() != Some(bucket) {
        return Err(Error::InvalidLocator(format!(
            "'{locator}': bucket name is not a valid host"
        )));
    }

    Ok(Locator::new(bucket, key))
}
