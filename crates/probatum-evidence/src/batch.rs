//! # Evidence Batches
//!
//! An `EvidenceBatcher` accumulates leaves as submissions arrive and seals
//! them into `EvidenceBatch`es, which pair the leaf list with its Merkle
//! tree. The batch root is the single value anchored externally for the
//! whole batch; individual submissions are later proven against it with
//! inclusion proofs.
//!
//! A sealed batch is immutable. Its export record carries the root
//! alongside the leaves and proofs, and re-import rebuilds the tree and
//! rejects a record whose stored root does not match — a mutated export
//! cannot be loaded as if it were intact.

use serde::{Deserialize, Serialize};

use probatum_core::error::{IntegrityError, RangeError};

use crate::leaf::EvidenceLeaf;
use crate::merkle::{verify_proof, MerkleProof, MerkleTree};

/// A sealed batch of evidence leaves with its Merkle tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceBatch {
    leaves: Vec<EvidenceLeaf>,
    tree: MerkleTree,
}

impl EvidenceBatch {
    /// Seal a batch from its leaves.
    pub fn from_leaves(leaves: Vec<EvidenceLeaf>) -> Self {
        let hashes: Vec<[u8; 32]> = leaves.iter().map(EvidenceLeaf::hash).collect();
        let tree = MerkleTree::build(&hashes);
        Self { leaves, tree }
    }

    /// Number of leaves in the batch.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// All leaves, in insertion order.
    pub fn leaves(&self) -> &[EvidenceLeaf] {
        &self.leaves
    }

    /// The leaf at `index`.
    pub fn leaf(&self, index: usize) -> Result<&EvidenceLeaf, RangeError> {
        self.leaves.get(index).ok_or(RangeError {
            index,
            len: self.leaves.len(),
        })
    }

    /// The batch root, or `None` for an empty batch. An empty batch has
    /// nothing to anchor.
    pub fn root(&self) -> Option<[u8; 32]> {
        self.tree.root()
    }

    /// Generate an inclusion proof for the leaf at `index`.
    pub fn generate_proof(&self, index: usize) -> Result<MerkleProof, RangeError> {
        self.tree.generate_proof(index)
    }

    /// Check that the leaf at `index` is committed under this batch's root.
    ///
    /// Always true for an unmutated batch; exists so audit tooling can
    /// re-check a batch it deserialized.
    pub fn verify_item(&self, index: usize) -> Result<bool, RangeError> {
        let proof = self.generate_proof(index)?;
        let Some(root) = self.root() else {
            return Ok(false);
        };
        Ok(verify_proof(&proof.leaf_hash, &proof.siblings, &root))
    }

    /// Export the batch with its root and all inclusion proofs.
    pub fn export(&self) -> BatchExport {
        BatchExport {
            merkle_root: self.root().map(hex::encode),
            evidence_count: self.leaves.len(),
            items: self.leaves.clone(),
            proofs: (0..self.leaves.len())
                // Indices are in range by construction.
                .filter_map(|i| self.tree.generate_proof(i).ok())
                .collect(),
        }
    }

    /// Re-import an exported batch, verifying its root.
    ///
    /// # Errors
    ///
    /// `IntegrityError` when the tree rebuilt from the items does not
    /// produce the stored root — the export was mutated after sealing.
    pub fn import(export: BatchExport) -> Result<Self, IntegrityError> {
        let batch = Self::from_leaves(export.items);
        let rebuilt = batch.root().map(hex::encode);
        if export.merkle_root != rebuilt || export.evidence_count != batch.len() {
            return Err(IntegrityError {
                reference: export.merkle_root.unwrap_or_default(),
                computed: rebuilt.unwrap_or_default(),
            });
        }
        Ok(batch)
    }
}

/// Wire form of a sealed batch: leaves, proofs, and the root they commit
/// to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchExport {
    /// The anchored root as lowercase hex, absent for an empty batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<String>,
    /// Number of evidence items.
    pub evidence_count: usize,
    /// The evidence leaves, in commitment order.
    pub items: Vec<EvidenceLeaf>,
    /// One inclusion proof per item, same order.
    pub proofs: Vec<MerkleProof>,
}

/// Accumulates evidence leaves and seals them into batches.
///
/// With a capacity set, a push that fills the batch seals it immediately
/// and starts a new one; sealed batches collect in order until taken.
#[derive(Debug, Clone, Default)]
pub struct EvidenceBatcher {
    pending: Vec<EvidenceLeaf>,
    capacity: Option<usize>,
    completed: Vec<EvidenceBatch>,
}

/// A point-in-time view of a batcher's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatcherStatus {
    /// Leaves waiting in the open batch.
    pub pending: usize,
    /// Configured batch capacity, if bounded.
    pub capacity: Option<usize>,
    /// Batches sealed and not yet taken.
    pub completed_batches: usize,
}

impl EvidenceBatcher {
    /// Create an unbounded batcher; it seals only on [`seal`](Self::seal).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a batcher that auto-seals every `capacity` leaves.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    /// Add a leaf, returning the index it holds within its batch.
    ///
    /// When the push fills a bounded batcher's open batch, the batch is
    /// sealed into the completed list and the next push starts fresh.
    pub fn push(&mut self, leaf: EvidenceLeaf) -> usize {
        self.pending.push(leaf);
        let index = self.pending.len() - 1;
        if self.capacity.is_some_and(|cap| self.pending.len() >= cap) {
            let batch = EvidenceBatch::from_leaves(std::mem::take(&mut self.pending));
            tracing::debug!(
                leaves = batch.len(),
                root = batch.root().map(hex::encode).unwrap_or_default(),
                "auto-sealed evidence batch"
            );
            self.completed.push(batch);
        }
        index
    }

    /// Number of leaves in the open batch.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the open batch is empty.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Progress snapshot.
    pub fn status(&self) -> BatcherStatus {
        BatcherStatus {
            pending: self.pending.len(),
            capacity: self.capacity,
            completed_batches: self.completed.len(),
        }
    }

    /// Batches sealed so far, oldest first.
    pub fn completed(&self) -> &[EvidenceBatch] {
        &self.completed
    }

    /// Remove and return the sealed batches, oldest first.
    pub fn take_completed(&mut self) -> Vec<EvidenceBatch> {
        std::mem::take(&mut self.completed)
    }

    /// Seal the open batch, consuming the batcher. Previously auto-sealed
    /// batches are returned first, the final (possibly partial) batch last;
    /// an empty open batch is not sealed.
    pub fn seal(mut self) -> Vec<EvidenceBatch> {
        if !self.pending.is_empty() {
            let batch = EvidenceBatch::from_leaves(std::mem::take(&mut self.pending));
            tracing::debug!(
                leaves = batch.len(),
                root = batch.root().map(hex::encode).unwrap_or_default(),
                "sealed evidence batch"
            );
            self.completed.push(batch);
        }
        self.completed
    }
}
