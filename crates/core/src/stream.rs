//! Streaming read access to remote objects

use tracing::debug;

use crate::error::{Error, Result};
use crate::locator::{Locator, parse_locator};
use crate::params::GetParams;
use crate::traits::{GetObjectRequest, ObjectReader, ObjectStore};

/// Open a readable stream for the object at `locator`
///
/// The locator must name an object; folder markers ending in `/` are real
/// objects and are accepted. Store failures are reported as
/// [`Error::RemoteRead`] carrying the locator.
pub async fn get_object_stream(
    store: &dyn ObjectStore,
    locator: &str,
    params: GetParams,
) -> Result<ObjectReader> {
    let locator = parse_locator(locator)?;
    get_object_stream_at(store, &locator, params).await
}

/// Same as [`get_object_stream`] for an already parsed locator
pub async fn get_object_stream_at(
    store: &dyn ObjectStore,
    locator: &Locator,
    params: GetParams,
) -> Result<ObjectReader> {
    if locator.key.is_empty() {
        return Err(Error::ShapeMismatch(format!(
            "locator must name an object, not a bucket: {locator}"
        )));
    }

    debug!("Opening read stream for {locator}");
    let request = GetObjectRequest {
        locator: locator.clone(),
        params,
    };
    store
        .get_object(request)
        .await
        .map_err(|e| Error::RemoteRead {
            locator: locator.to_string(),
            source: Box::new(e),
        })
}
