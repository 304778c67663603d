//! Caller-supplied storage parameters
//!
//! Instead of merging an opaque map over the computed request fields, the
//! recognized overrides are enumerated here. Every field is optional and,
//! when set, wins over whatever the upload engine would have computed.
//! Bucket, key and body are always computed and cannot be overridden.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Parameters applied to every `PutObject` issued by an upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutParams {
    /// Content type; replaces the sniffed type when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Cache-Control header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,

    /// Content-Disposition header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,

    /// Content-Encoding header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,

    /// Content-Language header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,

    /// Storage class (e.g. STANDARD_IA)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Canned ACL (e.g. public-read)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,

    /// User metadata (x-amz-meta-*)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl PutParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    pub fn content_disposition(mut self, value: impl Into<String>) -> Self {
        self.content_disposition = Some(value.into());
        self
    }

    pub fn content_encoding(mut self, value: impl Into<String>) -> Self {
        self.content_encoding = Some(value.into());
        self
    }

    pub fn content_language(mut self, value: impl Into<String>) -> Self {
        self.content_language = Some(value.into());
        self
    }

    pub fn storage_class(mut self, value: impl Into<String>) -> Self {
        self.storage_class = Some(value.into());
        self
    }

    pub fn acl(mut self, value: impl Into<String>) -> Self {
        self.acl = Some(value.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Resolve the content type for one object: an explicit override wins,
    /// otherwise the sniffed value is used. Empty strings count as absent.
    pub fn resolve_content_type(&self, sniffed: Option<String>) -> Option<String> {
        self.content_type
            .clone()
            .or(sniffed)
            .filter(|ct| !ct.is_empty())
    }
}

/// Parameters for opening an object stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetParams {
    /// Specific version to read
    pub version_id: Option<String>,

    /// HTTP range, passed verbatim (e.g. `bytes=0-1023`)
    pub range: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let params = PutParams::new()
            .cache_control("max-age=60")
            .storage_class("STANDARD_IA")
            .metadata("owner", "ops")
            .metadata("env", "prod");

        assert_eq!(params.cache_control.as_deref(), Some("max-age=60"));
        assert_eq!(params.storage_class.as_deref(), Some("STANDARD_IA"));
        assert_eq!(params.metadata.len(), 2);
        assert!(params.content_type.is_none());
    }

    #[test]
    fn test_resolve_content_type_override_wins() {
        let params = PutParams::new().content_type("application/x-custom");
        assert_eq!(
            params.resolve_content_type(Some("image/png".into())).as_deref(),
            Some("application/x-custom")
        );
    }

    #[test]
    fn test_resolve_content_type_sniffed() {
        let params = PutParams::new();
        assert_eq!(
            params.resolve_content_type(Some("image/png".into())).as_deref(),
            Some("image/png")
        );
        assert_eq!(params.resolve_content_type(None), None);
    }

    #[test]
    fn test_resolve_content_type_never_empty() {
        let params = PutParams::new().content_type("");
        assert_eq!(params.resolve_content_type(None), None);

        let params = PutParams::new();
        assert_eq!(params.resolve_content_type(Some(String::new())), None);
    }
}
