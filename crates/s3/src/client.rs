//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from s3x-core.

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, StorageClass};

use s3x_core::{
    Error, GetObjectRequest, ObjectBody, ObjectInfo, ObjectReader, ObjectStore, PutObjectRequest,
    Result, StorageConfig,
};

/// S3 client wrapper
#[derive(Debug, Clone)]
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from storage settings
    ///
    /// Credentials come from the SDK's default provider chain. Endpoint and
    /// region override the SDK defaults when set.
    pub async fn new(storage: &StorageConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &storage.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }

        if let Some(endpoint) = &storage.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| Error::InvalidConfig(format!("Invalid endpoint '{endpoint}': {e}")))?;
            loader = loader.endpoint_url(endpoint);
        }

        let config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(storage.force_path_style)
            .build();

        tracing::debug!(
            endpoint = storage.endpoint.as_deref().unwrap_or("default"),
            path_style = storage.force_path_style,
            "S3 client configured"
        );

        Ok(Self::from_client(aws_sdk_s3::Client::from_conf(s3_config)))
    }

    /// Wrap an already configured SDK client
    pub fn from_client(inner: aws_sdk_s3::Client) -> Self {
        Self { inner }
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put_object(&self, request: PutObjectRequest) -> Result<ObjectInfo> {
        let PutObjectRequest {
            locator,
            body,
            content_type,
            params,
        } = request;
        let size = i64::try_from(body.len()).unwrap_or(i64::MAX);
        let body = match body {
            ObjectBody::Bytes(bytes) => ByteStream::from(bytes),
            ObjectBody::File { path, .. } => {
                ByteStream::from_path(&path).await.map_err(|e| {
                    Error::Io(std::io::Error::other(format!(
                        "Failed to open {}: {e}",
                        path.display()
                    )))
                })?
            }
        };

        let mut builder = self
            .inner
            .put_object()
            .bucket(&locator.bucket)
            .key(&locator.key)
            .body(body)
            .set_content_type(content_type.clone())
            .set_cache_control(params.cache_control.clone())
            .set_content_disposition(params.content_disposition.clone())
            .set_content_encoding(params.content_encoding.clone())
            .set_content_language(params.content_language.clone())
            .set_storage_class(params.storage_class.as_deref().map(StorageClass::from))
            .set_acl(params.acl.as_deref().map(ObjectCannedAcl::from));

        for (key, value) in &params.metadata {
            builder = builder.metadata(key, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &locator.to_string()))?;

        let mut info = ObjectInfo::file(&locator.key, size);
        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }
        info.version_id = response.version_id().map(str::to_string);
        info.content_type = content_type;
        info.last_modified = Some(jiff::Timestamp::now());

        Ok(info)
    }

    async fn get_object(&self, request: GetObjectRequest) -> Result<ObjectReader> {
        let GetObjectRequest { locator, params } = request;

        let response = self
            .inner
            .get_object()
            .bucket(&locator.bucket)
            .key(&locator.key)
            .set_version_id(params.version_id)
            .set_range(params.range)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &locator.to_string()))?;

        Ok(Box::pin(response.body.into_async_read()))
    }
}

/// Convert an SDK failure into the core error taxonomy
fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, what: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();

    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => Error::Network(message),
        _ => classify(what, code.as_deref(), status, message),
    }
}

/// Classify a service error by its S3 error code and HTTP status
fn classify(what: &str, code: Option<&str>, status: Option<u16>, message: String) -> Error {
    match (code, status) {
        (Some("NoSuchKey" | "NoSuchBucket" | "NotFound" | "NoSuchVersion"), _) | (_, Some(404)) => {
            Error::NotFound(what.to_string())
        }
        (
            Some(
                "AccessDenied"
                | "InvalidAccessKeyId"
                | "SignatureDoesNotMatch"
                | "ExpiredToken"
                | "InvalidToken",
            ),
            _,
        )
        | (_, Some(401 | 403)) => Error::Auth(message),
        _ => Error::Network(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found() {
        let err = classify("s3://b/k", Some("NoSuchKey"), Some(404), "gone".into());
        assert!(matches!(err, Error::NotFound(ref w) if w == "s3://b/k"));

        let err = classify("s3://b/k", Some("NoSuchBucket"), None, "gone".into());
        assert!(matches!(err, Error::NotFound(_)));

        // HEAD-style responses carry no code
        let err = classify("s3://b/k", None, Some(404), "gone".into());
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_classify_auth() {
        for code in ["AccessDenied", "InvalidAccessKeyId", "SignatureDoesNotMatch"] {
            let err = classify("s3://b/k", Some(code), Some(403), "denied".into());
            assert!(matches!(err, Error::Auth(_)), "{code}");
        }
        let err = classify("s3://b/k", None, Some(401), "denied".into());
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    fn test_classify_other_is_network() {
        let err = classify("s3://b/k", Some("SlowDown"), Some(503), "busy".into());
        assert!(matches!(err, Error::Network(ref m) if m == "busy"));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_rejected() {
        let storage = StorageConfig {
            endpoint: Some("not a url".into()),
            region: Some("us-east-1".into()),
            force_path_style: true,
        };
        let result = S3Client::new(&storage).await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
