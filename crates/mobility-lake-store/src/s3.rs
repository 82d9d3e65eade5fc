// crates/mobility-lake-store/src/s3.rs
// ============================================================================
// Module: S3 Blob Store
// Description: Zone buckets on an S3-compatible object store.
// Purpose: Run the lake against MinIO or AWS S3 with a blocking interface.
// Dependencies: mobility-lake-core, aws-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! [`S3BlobStore`] owns a private tokio runtime and blocks on every request,
//! so pipeline components stay synchronous. When called from inside a
//! multi-threaded runtime the request runs via `block_in_place`; from a
//! current-thread runtime it runs on a helper thread. Listing follows
//! continuation tokens until the result is complete.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::BucketLocationConstraint;
use aws_sdk_s3::types::CreateBucketConfiguration;
use mobility_lake_core::BlobStore;
use mobility_lake_core::BlobStoreError;
use mobility_lake_core::ObjectInfo;
use mobility_lake_core::interfaces::validate_bucket_name;
use mobility_lake_core::interfaces::validate_object_key;
use mobility_lake_core::interfaces::validate_prefix;
use time::OffsetDateTime;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Region without a location constraint on bucket creation.
const DEFAULT_REGION: &str = "us-east-1";

// ============================================================================
// SECTION: Options
// ============================================================================

/// Connection options for an S3-compatible endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3StoreOptions {
    /// Custom endpoint URL, e.g. a local MinIO server.
    pub endpoint: Option<String>,
    /// Region override; the AWS default chain applies when unset.
    pub region: Option<String>,
    /// Uses path-style addressing (required by most MinIO setups).
    pub force_path_style: bool,
}

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on a store future using a compatible runtime.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, BlobStoreError>
where
    F: Future<Output = Result<T, BlobStoreError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| BlobStoreError::Io(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx
            .recv()
            .unwrap_or_else(|_| {
                Err(BlobStoreError::Io("s3 helper thread join failed".to_string()))
            });
    }
    runtime.block_on(future)
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// S3-backed blob store.
pub struct S3BlobStore {
    /// Underlying S3 client.
    client: Client,
    /// Region used for bucket creation.
    region: Option<String>,
    /// Tokio runtime for blocking S3 operations.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for S3BlobStore {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl S3BlobStore {
    /// Builds a client from the AWS default chain plus `options`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Io`] when the runtime cannot start.
    pub fn connect(options: &S3StoreOptions) -> Result<Self, BlobStoreError> {
        let runtime = Runtime::new().map_err(|err| BlobStoreError::Io(err.to_string()))?;
        let region = options.region.clone();
        let endpoint = options.endpoint.clone();
        let loader_region = region.clone();
        let shared_config = block_on_with_runtime(&runtime, async move {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = loader_region {
                loader = loader.region(Region::new(region));
            }
            if let Some(endpoint) = endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            Ok(loader.load().await)
        })?;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if options.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(s3_builder.build()),
            region,
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Returns the runtime or an error if shut down.
    fn runtime(&self) -> Result<&Runtime, BlobStoreError> {
        self.runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| BlobStoreError::Io("s3 runtime closed".to_string()))
    }
}

impl BlobStore for S3BlobStore {
    fn put(&self, bucket: &str, key: &str, bytes: &[u8]) -> Result<(), BlobStoreError> {
        validate_bucket_name(bucket)?;
        validate_object_key(key)?;
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let key = key.to_string();
        let body = ByteStream::from(bytes.to_vec());
        block_on_with_runtime(self.runtime()?, async move {
            match client.put_object().bucket(&bucket).key(key).body(body).send().await {
                Ok(_) => Ok(()),
                Err(err) if err.raw_response().is_some_and(|raw| raw.status().as_u16() == 404) => {
                    Err(BlobStoreError::BucketNotFound(bucket))
                }
                Err(err) => Err(BlobStoreError::Backend(err.to_string())),
            }
        })
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, BlobStoreError> {
        validate_bucket_name(bucket)?;
        validate_object_key(key)?;
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let key = key.to_string();
        block_on_with_runtime(self.runtime()?, async move {
            let output = match client.get_object().bucket(&bucket).key(&key).send().await {
                Ok(output) => output,
                Err(err)
                    if err.as_service_error().is_some_and(|service| service.is_no_such_key()) =>
                {
                    return Err(BlobStoreError::NotFound {
                        bucket,
                        key,
                    });
                }
                Err(err) => return Err(BlobStoreError::Backend(err.to_string())),
            };
            let data =
                output.body.collect().await.map_err(|err| BlobStoreError::Io(err.to_string()))?;
            Ok(data.into_bytes().to_vec())
        })
    }

    fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>, BlobStoreError> {
        validate_bucket_name(bucket)?;
        validate_prefix(prefix)?;
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let prefix = prefix.to_string();
        block_on_with_runtime(self.runtime()?, async move {
            let mut objects = Vec::new();
            let mut continuation: Option<String> = None;
            loop {
                let mut request = client.list_objects_v2().bucket(&bucket);
                if !prefix.is_empty() {
                    request = request.prefix(&prefix);
                }
                if let Some(token) = continuation.take() {
                    request = request.continuation_token(token);
                }
                let page = match request.send().await {
                    Ok(page) => page,
                    Err(err)
                        if err
                            .as_service_error()
                            .is_some_and(|service| service.is_no_such_bucket()) =>
                    {
                        return Err(BlobStoreError::BucketNotFound(bucket));
                    }
                    Err(err) => return Err(BlobStoreError::Backend(err.to_string())),
                };
                for object in page.contents() {
                    let Some(key) = object.key() else {
                        continue;
                    };
                    let last_modified = object
                        .last_modified()
                        .and_then(|stamp| OffsetDateTime::from_unix_timestamp(stamp.secs()).ok())
                        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
                    objects.push(ObjectInfo {
                        key: key.to_string(),
                        last_modified,
                        size: object.size().and_then(|size| u64::try_from(size).ok()).unwrap_or(0),
                    });
                }
                match page.next_continuation_token() {
                    Some(token) if page.is_truncated().unwrap_or(false) => {
                        continuation = Some(token.to_string());
                    }
                    _ => break,
                }
            }
            objects.sort_by(|left, right| left.key.cmp(&right.key));
            Ok(objects)
        })
    }

    fn bucket_exists(&self, bucket: &str) -> Result<bool, BlobStoreError> {
        validate_bucket_name(bucket)?;
        let client = self.client.clone();
        let bucket = bucket.to_string();
        block_on_with_runtime(self.runtime()?, async move {
            match client.head_bucket().bucket(bucket).send().await {
                Ok(_) => Ok(true),
                Err(err)
                    if err.as_service_error().is_some_and(|service| service.is_not_found()) =>
                {
                    Ok(false)
                }
                Err(err) => Err(BlobStoreError::Backend(err.to_string())),
            }
        })
    }

    fn ensure_bucket(&self, bucket: &str) -> Result<(), BlobStoreError> {
        if self.bucket_exists(bucket)? {
            return Ok(());
        }
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let constraint = self
            .region
            .as_deref()
            .filter(|region| *region != DEFAULT_REGION)
            .map(|region| {
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build()
            });
        block_on_with_runtime(self.runtime()?, async move {
            let mut request = client.create_bucket().bucket(bucket);
            if let Some(constraint) = constraint {
                request = request.create_bucket_configuration(constraint);
            }
            match request.send().await {
                Ok(_) => Ok(()),
                Err(err)
                    if err.as_service_error().is_some_and(|service| {
                        service.is_bucket_already_owned_by_you()
                    }) =>
                {
                    Ok(())
                }
                Err(err) => Err(BlobStoreError::Backend(err.to_string())),
            }
        })
    }
}
