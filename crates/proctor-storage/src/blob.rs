// crates/proctor-storage/src/blob.rs
// ============================================================================
// Module: Blob Storage Interface
// Description: Storage trait, reference parsing, and backend selection.
// Purpose: Give the HTTP surface one seam for saving and reading artifacts.
// Dependencies: proctor-config, thiserror
// ============================================================================

//! ## Overview
//! Artifacts live in one of two namespaces, `videos` and `reports`. A
//! reference returned by a save call is opaque to callers; `open` accepts it
//! back, and also accepts `videos/{key}`, `reports/{key}`, or a bare key, which
//! resolves in the reports namespace. Keys are single path segments.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use proctor_config::StorageBackend;
use proctor_config::StorageConfig;
use thiserror::Error;

use crate::local::LocalBlobStorage;
use crate::object_store::ObjectStoreBlobStorage;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a single key segment.
pub(crate) const MAX_KEY_LENGTH: usize = 255;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Blob storage errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Referenced artifact does not exist.
    #[error("storage not found: {0}")]
    NotFound(String),
    /// Key or reference is malformed.
    #[error("storage invalid key: {0}")]
    Invalid(String),
    /// Local I/O failure.
    #[error("storage io error: {0}")]
    Io(String),
    /// Remote backend returned an error.
    #[error("storage backend error: {0}")]
    Backend(String),
    /// Artifact exceeds the configured read limit.
    #[error("storage object too large: {reference} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Requested reference.
        reference: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
    /// Backend could not be constructed.
    #[error("storage startup failure: {0}")]
    Startup(String),
}

// ============================================================================
// SECTION: Namespaces
// ============================================================================

/// Artifact namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageNamespace {
    /// Session recordings.
    Videos,
    /// Rendered reports.
    Reports,
}

impl StorageNamespace {
    /// Returns the namespace prefix used in references.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::Reports => "reports",
        }
    }

    /// Parses a namespace prefix.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "videos" => Some(Self::Videos),
            "reports" => Some(Self::Reports),
            _ => None,
        }
    }

    /// Formats the namespaced reference for a key.
    #[must_use]
    pub fn reference(self, key: &str) -> String {
        format!("{}/{key}", self.as_str())
    }
}

/// Backend kinds, used by the HTTP layer to choose how artifacts are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackendKind {
    /// Local filesystem directories.
    Local,
    /// Remote object store.
    ObjectStore,
}

impl StorageBackendKind {
    /// Returns the backend label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::ObjectStore => "s3",
        }
    }
}

// ============================================================================
// SECTION: Blob Storage
// ============================================================================

/// Artifact storage backend.
pub trait BlobStorage: Send + Sync {
    /// Stores a video under `key` and returns its reference.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the key is invalid or the write fails.
    fn save_video(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError>;

    /// Stores a report under `key` and returns its reference.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the key is invalid or the write fails.
    fn save_report(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Reads an artifact by reference or namespaced key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] when the artifact is absent, or another
    /// [`StorageError`] when the reference is invalid or the read fails.
    fn open(&self, reference: &str) -> Result<Vec<u8>, StorageError>;

    /// Returns the backend kind.
    fn backend(&self) -> StorageBackendKind;
}

/// Shared blob storage trait object.
pub type SharedBlobStorage = Arc<dyn BlobStorage>;

// ============================================================================
// SECTION: Backend Selection
// ============================================================================

/// Builds the configured storage backend.
///
/// # Errors
///
/// Returns [`StorageError::Startup`] when the backend cannot be constructed.
pub fn build_blob_storage(config: &StorageConfig) -> Result<SharedBlobStorage, StorageError> {
    match config.backend {
        StorageBackend::Local => {
            let storage = LocalBlobStorage::new(&config.video_dir, &config.report_dir)
                .map_err(|err| StorageError::Startup(err.to_string()))?;
            Ok(Arc::new(storage))
        }
        StorageBackend::S3 => {
            let storage = ObjectStoreBlobStorage::new(&config.s3)
                .map_err(|err| StorageError::Startup(err.to_string()))?;
            Ok(Arc::new(storage))
        }
    }
}

// ============================================================================
// SECTION: Key Helpers
// ============================================================================

/// Validates a single storage key segment.
///
/// # Errors
///
/// Returns [`StorageError::Invalid`] for empty, `.`/`..`, over-long, or
/// separator-bearing keys.
pub fn validate_key(value: &str) -> Result<(), StorageError> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(StorageError::Invalid("key is invalid".to_string()));
    }
    if value.len() > MAX_KEY_LENGTH {
        return Err(StorageError::Invalid("key exceeds length limit".to_string()));
    }
    if value.contains(['/', '\\', '\0']) {
        return Err(StorageError::Invalid("key contains invalid characters".to_string()));
    }
    Ok(())
}

/// Splits a namespaced reference into its namespace and validated key.
///
/// References without a `/` resolve in the reports namespace.
///
/// # Errors
///
/// Returns [`StorageError::Invalid`] for unknown namespaces or invalid keys.
pub fn parse_reference(reference: &str) -> Result<(StorageNamespace, &str), StorageError> {
    let (namespace, key) = match reference.split_once('/') {
        Some((prefix, rest)) => {
            let namespace = StorageNamespace::parse(prefix).ok_or_else(|| {
                StorageError::Invalid(format!("unknown storage namespace: {prefix}"))
            })?;
            (namespace, rest)
        }
        None => (StorageNamespace::Reports, reference),
    };
    validate_key(key)?;
    Ok((namespace, key))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
