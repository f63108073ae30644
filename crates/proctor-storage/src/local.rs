// crates/proctor-storage/src/local.rs
// ============================================================================
// Module: Local Blob Storage
// Description: Filesystem-backed storage for recordings and reports.
// Purpose: Persist artifacts under configured videos and reports directories.
// Dependencies: crate::blob
// ============================================================================

//! ## Overview
//! [`LocalBlobStorage`] writes each artifact to `{dir}/{key}` and returns the
//! concrete file path as its reference. Both directories are created when the
//! store is constructed so static file hosting can mount them immediately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::blob::BlobStorage;
use crate::blob::StorageBackendKind;
use crate::blob::StorageError;
use crate::blob::StorageNamespace;
use crate::blob::parse_reference;
use crate::blob::validate_key;

// ============================================================================
// SECTION: Local Storage
// ============================================================================

/// Filesystem-backed blob storage.
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    /// Directory holding recordings.
    video_dir: PathBuf,
    /// Directory holding reports.
    report_dir: PathBuf,
}

impl LocalBlobStorage {
    /// Creates the storage, creating both directories if missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when a directory cannot be created.
    pub fn new(video_dir: &Path, report_dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(video_dir).map_err(|err| StorageError::Io(err.to_string()))?;
        fs::create_dir_all(report_dir).map_err(|err| StorageError::Io(err.to_string()))?;
        Ok(Self {
            video_dir: video_dir.to_path_buf(),
            report_dir: report_dir.to_path_buf(),
        })
    }

    /// Returns the recordings directory.
    #[must_use]
    pub fn video_dir(&self) -> &Path {
        &self.video_dir
    }

    /// Returns the reports directory.
    #[must_use]
    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    /// Returns the directory for a namespace.
    fn dir_for(&self, namespace: StorageNamespace) -> &Path {
        match namespace {
            StorageNamespace::Videos => &self.video_dir,
            StorageNamespace::Reports => &self.report_dir,
        }
    }

    /// Writes bytes under a namespace and returns the file path reference.
    fn write(
        &self,
        namespace: StorageNamespace,
        key: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        validate_key(key)?;
        let path = self.dir_for(namespace).join(key);
        fs::write(&path, bytes).map_err(|err| StorageError::Io(err.to_string()))?;
        Ok(path.to_string_lossy().into_owned())
    }

    /// Resolves a file path reference or namespaced key to a file path.
    fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let candidate = Path::new(reference);
        for dir in [&self.video_dir, &self.report_dir] {
            if let Ok(rest) = candidate.strip_prefix(dir) {
                let key = rest
                    .to_str()
                    .ok_or_else(|| StorageError::Invalid("key must be utf-8".to_string()))?;
                validate_key(key)?;
                return Ok(dir.join(key));
            }
        }
        let (namespace, key) = parse_reference(reference)?;
        Ok(self.dir_for(namespace).join(key))
    }
}

impl BlobStorage for LocalBlobStorage {
    fn save_video(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        self.write(StorageNamespace::Videos, key, bytes)
    }

    fn save_report(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.write(StorageNamespace::Reports, key, bytes)
    }

    fn open(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(reference)?;
        fs::read(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(reference.to_string()),
            _ => StorageError::Io(err.to_string()),
        })
    }

    fn backend(&self) -> StorageBackendKind {
        StorageBackendKind::Local
    }
}
