// crates/proctor-storage/src/lib.rs
// ============================================================================
// Module: Proctor Storage Library
// Description: Blob storage for session recordings and rendered reports.
// Purpose: Persist artifacts without call sites knowing the backend.
// Dependencies: proctor-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! `proctor-storage` exposes the [`BlobStorage`] trait and two backends: a
//! local filesystem variant that writes into a videos and a reports directory,
//! and an S3-compatible variant that writes into a videos and a reports
//! bucket. The backend is chosen once at startup by [`build_blob_storage`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod blob;
pub mod local;
pub mod object_store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use blob::BlobStorage;
pub use blob::SharedBlobStorage;
pub use blob::StorageBackendKind;
pub use blob::StorageError;
pub use blob::StorageNamespace;
pub use blob::build_blob_storage;
pub use blob::parse_reference;
pub use blob::validate_key;
pub use local::LocalBlobStorage;
pub use object_store::ObjectStoreBlobStorage;
