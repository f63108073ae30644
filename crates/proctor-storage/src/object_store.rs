// crates/proctor-storage/src/object_store.rs
// ============================================================================
// Module: Object Store Blob Storage
// Description: S3-compatible storage for recordings and reports.
// Purpose: Persist artifacts in two durable buckets with strict key validation.
// Dependencies: crate::blob, proctor-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! [`ObjectStoreBlobStorage`] writes recordings to a videos bucket and reports
//! to a reports bucket, returning `videos/{key}` or `reports/{key}`. Reads are
//! bounded by a configured maximum size. The S3 client owns a private Tokio
//! runtime so the synchronous [`BlobStorage`] calls can block on it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::path::Component;
use std::path::Path;
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::Client;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use proctor_config::S3StorageConfig;
use tokio::io::AsyncReadExt;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;

use crate::blob::BlobStorage;
use crate::blob::MAX_KEY_LENGTH;
use crate::blob::StorageBackendKind;
use crate::blob::StorageError;
use crate::blob::StorageNamespace;
use crate::blob::parse_reference;
use crate::blob::validate_key;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum total key length including the prefix.
const MAX_TOTAL_KEY_LENGTH: usize = 1024;
/// Read buffer size for streamed object bodies.
const READ_CHUNK_BYTES: usize = 8192;

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Blocks on an object-store future using a compatible runtime.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, StorageError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| StorageError::Io(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx
            .recv()
            .unwrap_or_else(|_| Err(StorageError::Io("object store thread join failed".to_string())));
    }

    runtime.block_on(future)
}

// ============================================================================
// SECTION: Object Store Client
// ============================================================================

/// Minimal object-store client abstraction.
pub(crate) trait ObjectStoreClient: Send + Sync {
    /// Writes a single object.
    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Reads a single object with a size limit.
    fn get(&self, bucket: &str, key: &str, max_bytes: usize) -> Result<Vec<u8>, StorageError>;
}

/// S3-backed object-store client.
struct S3ObjectStoreClient {
    /// Underlying S3 client.
    client: Client,
    /// Tokio runtime for blocking S3 operations.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for S3ObjectStoreClient {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl S3ObjectStoreClient {
    /// Builds a new S3 client from configuration and the AWS provider chain.
    fn new(config: &S3StorageConfig) -> Result<Self, StorageError> {
        let runtime = Runtime::new().map_err(|err| StorageError::Io(err.to_string()))?;
        let region = config.region.clone();
        let endpoint = config.endpoint.clone();
        let shared_config = block_on_with_runtime(&runtime, async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(Region::new(region));
            }
            if let Some(endpoint) = endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            Ok(loader.load().await)
        })?;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if config.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(s3_builder.build()),
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Returns the runtime or an error if shut down.
    fn runtime(&self) -> Result<&Runtime, StorageError> {
        self.runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| StorageError::Io("object store runtime closed".to_string()))
    }
}

impl ObjectStoreClient for S3ObjectStoreClient {
    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let client = self.client.clone();
        let content_type = content_type.map(str::to_string);
        block_on_with_runtime(self.runtime()?, async move {
            let body = ByteStream::from(bytes);
            let mut request = client.put_object().bucket(bucket).key(key).body(body);
            if let Some(content_type) = content_type {
                request = request.content_type(content_type);
            }
            request.send().await.map_err(|err| StorageError::Backend(err.to_string()))?;
            Ok(())
        })
    }

    fn get(&self, bucket: &str, key: &str, max_bytes: usize) -> Result<Vec<u8>, StorageError> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let client = self.client.clone();
        block_on_with_runtime(self.runtime()?, async move {
            let output = client
                .get_object()
                .bucket(bucket)
                .key(key.clone())
                .send()
                .await
                .map_err(|err| {
                    if err.as_service_error().is_some_and(GetObjectError::is_no_such_key) {
                        StorageError::NotFound(key.clone())
                    } else {
                        StorageError::Backend(err.to_string())
                    }
                })?;
            if let Some(length) = output.content_length() {
                let actual_bytes = usize::try_from(length).unwrap_or(usize::MAX);
                if actual_bytes > max_bytes {
                    return Err(StorageError::TooLarge {
                        reference: key.clone(),
                        max_bytes,
                        actual_bytes,
                    });
                }
            }
            let mut reader = output.body.into_async_read();
            let mut buffer = Vec::new();
            let mut total_bytes = 0usize;
            let mut chunk = [0u8; READ_CHUNK_BYTES];
            loop {
                let read = reader
                    .read(&mut chunk)
                    .await
                    .map_err(|err| StorageError::Io(err.to_string()))?;
                if read == 0 {
                    break;
                }
                total_bytes = total_bytes
                    .checked_add(read)
                    .ok_or_else(|| StorageError::Io("object size overflow".to_string()))?;
                if total_bytes > max_bytes {
                    return Err(StorageError::TooLarge {
                        reference: key.clone(),
                        max_bytes,
                        actual_bytes: total_bytes,
                    });
                }
                buffer.extend_from_slice(&chunk[.. read]);
            }
            Ok(buffer)
        })
    }
}

// ============================================================================
// SECTION: Object Store Blob Storage
// ============================================================================

/// S3-compatible blob storage.
pub struct ObjectStoreBlobStorage {
    /// Object-store client implementation.
    client: Arc<dyn ObjectStoreClient>,
    /// Bucket holding recordings.
    videos_bucket: String,
    /// Bucket holding reports.
    reports_bucket: String,
    /// Normalized key prefix (empty or ending in `/`).
    prefix: String,
    /// Maximum object size read into memory.
    max_object_bytes: usize,
}

impl ObjectStoreBlobStorage {
    /// Creates storage from object-store configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when configuration or client setup fails.
    pub fn new(config: &S3StorageConfig) -> Result<Self, StorageError> {
        config.validate().map_err(|err| StorageError::Invalid(err.to_string()))?;
        let prefix = normalize_prefix(config.prefix.as_deref().unwrap_or(""))?;
        let client = Arc::new(S3ObjectStoreClient::new(config)?);
        Ok(Self {
            client,
            videos_bucket: config.videos_bucket.trim().to_string(),
            reports_bucket: config.reports_bucket.trim().to_string(),
            prefix,
            max_object_bytes: config.max_object_bytes,
        })
    }

    /// Creates storage over a custom client (tests only).
    #[cfg(test)]
    pub(crate) fn from_client(
        client: Arc<dyn ObjectStoreClient>,
        prefix: &str,
        max_object_bytes: usize,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            client,
            videos_bucket: "videos".to_string(),
            reports_bucket: "reports".to_string(),
            prefix: normalize_prefix(prefix)?,
            max_object_bytes,
        })
    }

    /// Returns the bucket for a namespace.
    fn bucket(&self, namespace: StorageNamespace) -> &str {
        match namespace {
            StorageNamespace::Videos => &self.videos_bucket,
            StorageNamespace::Reports => &self.reports_bucket,
        }
    }

    /// Returns the full object key for a validated key.
    fn object_key(&self, key: &str) -> Result<String, StorageError> {
        validate_key(key)?;
        let full = format!("{}{key}", self.prefix);
        if full.len() > MAX_TOTAL_KEY_LENGTH {
            return Err(StorageError::Invalid("object key exceeds length limit".to_string()));
        }
        Ok(full)
    }

    /// Writes an artifact and returns its namespaced reference.
    fn write(
        &self,
        namespace: StorageNamespace,
        key: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<String, StorageError> {
        let object_key = self.object_key(key)?;
        self.client.put(self.bucket(namespace), &object_key, bytes.to_vec(), content_type)?;
        Ok(namespace.reference(key))
    }
}

impl BlobStorage for ObjectStoreBlobStorage {
    fn save_video(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        self.write(StorageNamespace::Videos, key, bytes, None)
    }

    fn save_report(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.write(StorageNamespace::Reports, key, bytes, Some(content_type))
    }

    fn open(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let (namespace, key) = parse_reference(reference)?;
        let object_key = self.object_key(key)?;
        match self.client.get(self.bucket(namespace), &object_key, self.max_object_bytes) {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::NotFound(_)) => Err(StorageError::NotFound(reference.to_string())),
            Err(StorageError::TooLarge {
                max_bytes,
                actual_bytes,
                ..
            }) => Err(StorageError::TooLarge {
                reference: reference.to_string(),
                max_bytes,
                actual_bytes,
            }),
            Err(err) => Err(err),
        }
    }

    fn backend(&self) -> StorageBackendKind {
        StorageBackendKind::ObjectStore
    }
}

// ============================================================================
// SECTION: Key Helpers
// ============================================================================

/// Normalizes a key prefix to empty or `segment/.../`.
fn normalize_prefix(raw: &str) -> Result<String, StorageError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if trimmed.starts_with('/') {
        return Err(StorageError::Invalid(
            "prefix must be relative (no leading slash)".to_string(),
        ));
    }
    if trimmed.contains('\\') {
        return Err(StorageError::Invalid("prefix must not contain backslashes".to_string()));
    }
    let normalized = trimmed.strip_suffix('/').unwrap_or(trimmed);
    for component in Path::new(normalized).components() {
        match component {
            Component::Normal(value) => {
                let segment = value.to_string_lossy();
                if segment.len() > MAX_KEY_LENGTH {
                    return Err(StorageError::Invalid(
                        "prefix segment exceeds length limit".to_string(),
                    ));
                }
                validate_key(&segment)?;
            }
            _ => {
                return Err(StorageError::Invalid(
                    "prefix must be relative without traversal".to_string(),
                ));
            }
        }
    }
    Ok(format!("{normalized}/"))
}

// ============================================================================
// SECTION: In-Memory Test Client
// ============================================================================

#[cfg(test)]
type ObjectMap = std::collections::BTreeMap<(String, String), (Vec<u8>, Option<String>)>;

#[cfg(test)]
#[derive(Default)]
struct InMemoryObjectStore {
    objects: Mutex<ObjectMap>,
}

#[cfg(test)]
impl InMemoryObjectStore {
    fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.objects
            .lock()
            .ok()?
            .get(&(bucket.to_string(), key.to_string()))
            .and_then(|(_, content_type)| content_type.clone())
    }

    fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .is_ok_and(|objects| objects.contains_key(&(bucket.to_string(), key.to_string())))
    }
}

#[cfg(test)]
impl ObjectStoreClient for InMemoryObjectStore {
    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        self.objects
            .lock()
            .map_err(|_| StorageError::Io("object store lock poisoned".to_string()))?
            .insert((bucket.to_string(), key.to_string()), (bytes, content_type.map(str::to_string)));
        Ok(())
    }

    fn get(&self, bucket: &str, key: &str, max_bytes: usize) -> Result<Vec<u8>, StorageError> {
        let bytes = self
            .objects
            .lock()
            .map_err(|_| StorageError::Io("object store lock poisoned".to_string()))?
            .get(&(bucket.to_string(), key.to_string()))
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        if bytes.len() > max_bytes {
            return Err(StorageError::TooLarge {
                reference: key.to_string(),
                max_bytes,
                actual_bytes: bytes.len(),
            });
        }
        Ok(bytes)
    }
}
