//! GCS storage backend for Zarr access.

use std::sync::Arc;

use object_store::gcp::GoogleCloudStorageBuilder;
use zarrs_object_store::AsyncObjectStore;
use zarrs_storage::storage_adapter::async_to_sync::{
    AsyncToSyncBlockOn, AsyncToSyncStorageAdapter,
};

use super::SourceError;

/// Blocking executor that works from within a tokio runtime.
///
/// `block_in_place` moves the current task off the async worker thread so
/// the runtime handle can drive the future without nesting runtimes.
#[derive(Clone, Copy)]
pub struct TokioBlockOn;

impl AsyncToSyncBlockOn for TokioBlockOn {
    fn block_on<F: core::future::Future>(&self, future: F) -> F::Output {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
    }
}

/// Async GCS-backed store.
pub type AsyncGcsStorage = AsyncObjectStore<object_store::gcp::GoogleCloudStorage>;

/// Sync adapter over GCS, usable with the synchronous zarrs API.
pub type GcsStorage = AsyncToSyncStorageAdapter<AsyncGcsStorage, TokioBlockOn>;

/// Open a bucket as Zarr-readable storage from service-account key JSON.
pub fn open_bucket(
    bucket: &str,
    service_account_key: &str,
) -> Result<Arc<GcsStorage>, SourceError> {
    let gcs = GoogleCloudStorageBuilder::new()
        .with_bucket_name(bucket)
        .with_service_account_key(service_account_key)
        .build()
        .map_err(|e| SourceError::Zarr(format!("failed to create GCS client: {e}")))?;

    let async_store = Arc::new(AsyncObjectStore::new(gcs));
    Ok(Arc::new(AsyncToSyncStorageAdapter::new(
        async_store,
        TokioBlockOn,
    )))
}
