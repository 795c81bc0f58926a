//! # Content-Addressed Evidence Store
//!
//! Stores envelope blobs by their content digest. Files are named by
//! digest (`{algorithm}/{digest_hex}.bin`), so a blob's storage reference
//! is derivable from its bytes alone and a store can be rebuilt or audited
//! from its filenames.
//!
//! ## Integrity Invariant
//!
//! Every retrieval recomputes the digest of the returned bytes and verifies
//! it against the requested id. Corruption or substitution is detected at
//! read time, never passed through.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use probatum_core::error::StoreError;
use probatum_core::{ContentDigest, DigestAlgorithm};

/// The storage reference of a stored blob: the Keccak-256 digest of its
/// exact bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(pub ContentDigest);

impl ContentId {
    /// Compute the content id of a blob.
    pub fn of(blob: &[u8]) -> Self {
        Self(ContentDigest::of_bytes(DigestAlgorithm::Keccak256, blob))
    }

    /// The underlying digest.
    pub fn digest(&self) -> &ContentDigest {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Blob storage keyed by content digest.
///
/// `put` is idempotent: storing the same bytes twice returns the same id
/// and leaves one copy.
pub trait EvidenceStore {
    /// Store a blob, returning its content id.
    fn put(&self, blob: &[u8]) -> Result<ContentId, StoreError>;

    /// Retrieve a blob by content id, verifying its digest.
    fn get(&self, id: &ContentId) -> Result<Vec<u8>, StoreError>;

    /// Whether a blob is stored under this id.
    fn contains(&self, id: &ContentId) -> Result<bool, StoreError>;
}

/// A filesystem-backed evidence store.
#[derive(Debug, Clone)]
pub struct FsEvidenceStore {
    /// Root directory; blobs live at `{root}/{algorithm}/{digest_hex}.bin`.
    root: PathBuf,
}

impl FsEvidenceStore {
    /// Create a store rooted at the given directory. The directory is
    /// created lazily on first `put`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory of this store.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Filesystem path for a content id.
    pub fn blob_path(&self, id: &ContentId) -> PathBuf {
        self.root
            .join(id.digest().algorithm.as_str())
            .join(format!("{}.bin", id.digest().to_hex()))
    }
}

impl EvidenceStore for FsEvidenceStore {
    fn put(&self, blob: &[u8]) -> Result<ContentId, StoreError> {
        let id = ContentId::of(blob);
        let path = self.blob_path(&id);
        if path.exists() {
            return Ok(id);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write-then-rename so a crashed write never leaves a digest-named
        // file with wrong contents.
        let tmp = path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(blob)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &path)?;
        tracing::debug!(id = %id, bytes = blob.len(), "stored evidence blob");
        Ok(id)
    }

    fn get(&self, id: &ContentId) -> Result<Vec<u8>, StoreError> {
        let path = self.blob_path(id);
        let blob = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        if ContentId::of(&blob) != *id {
            return Err(StoreError::DigestMismatch(id.to_string()));
        }
        Ok(blob)
    }

    fn contains(&self, id: &ContentId) -> Result<bool, StoreError> {
        Ok(self.blob_path(id).exists())
    }
}

/// An in-memory evidence store for tests and ephemeral pipelines.
#[derive(Debug, Default)]
pub struct MemoryEvidenceStore {
    blobs: Mutex<HashMap<ContentId, Vec<u8>>>,
}

impl MemoryEvidenceStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvidenceStore for MemoryEvidenceStore {
    fn put(&self, blob: &[u8]) -> Result<ContentId, StoreError> {
        let id = ContentId::of(blob);
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("store mutex poisoned")))?;
        blobs.entry(id).or_insert_with(|| blob.to_vec());
        Ok(id)
    }

    fn get(&self, id: &ContentId) -> Result<Vec<u8>, StoreError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("store mutex poisoned")))?;
        blobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn contains(&self, id: &ContentId) -> Result<bool, StoreError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Io(std::io::Error::other("store mutex poisoned")))?;
        Ok(blobs.contains_key(id))
    }
}
