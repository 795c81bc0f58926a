//! # Batch Merkle Tree
//!
//! The commitment structure over a batch of evidence leaf hashes. Pair
//! hashing is order-insensitive: siblings are sorted lexicographically
//! before concatenation, so proof verification needs no direction bits —
//! a proof is just the sibling hashes from leaf level to root.
//!
//! ## Algorithm
//!
//! - Node: `keccak256(min(a, b) ‖ max(a, b))`.
//! - A level with an odd node count duplicates its last node, pairing it
//!   with itself.
//! - A single-leaf tree's root is the leaf hash itself.
//! - The empty tree has no root.
//!
//! ## Security Invariant
//!
//! [`verify_proof`] depends only on the leaf hash, the sibling path, and
//! the root — never on the batch's leaf count. A verifier holding nothing
//! but an anchored root can check any proof.

use serde::{Deserialize, Serialize};

use probatum_core::error::RangeError;
use probatum_core::hash::keccak256;
use probatum_core::hexutil::hex_bytes32;

/// Hash a sibling pair, sorting lexicographically first.
pub fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut buf = [0u8; 64];
    if a <= b {
        buf[..32].copy_from_slice(a);
        buf[32..].copy_from_slice(b);
    } else {
        buf[..32].copy_from_slice(b);
        buf[32..].copy_from_slice(a);
    }
    keccak256(&buf)
}

/// An inclusion proof for one leaf of a batch tree.
///
/// Sibling hashes run bottom-up, leaf level first. The index is carried
/// for the audit record; verification does not use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleProof {
    /// Index of the proven leaf at generation time.
    pub leaf_index: usize,
    /// Hash of the proven leaf.
    #[serde(with = "hex_bytes32")]
    pub leaf_hash: [u8; 32],
    /// Sibling hashes from leaf level to just below the root.
    #[serde(with = "hex_nodes")]
    pub siblings: Vec<[u8; 32]>,
}

/// A Merkle tree over a fixed list of leaf hashes.
///
/// Built once from the full leaf list; all levels are retained so proof
/// generation is a walk, not a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// levels[0] is the leaf level; the last level holds the root.
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree from leaf hashes.
    pub fn build(leaves: &[[u8; 32]]) -> Self {
        let mut levels: Vec<Vec<[u8; 32]>> = vec![leaves.to_vec()];
        while levels[levels.len() - 1].len() > 1 {
            let current = &levels[levels.len() - 1];
            let mut next = Vec::with_capacity((current.len() + 1) / 2);
            for pair in current.chunks(2) {
                let right = pair.get(1).unwrap_or(&pair[0]);
                next.push(hash_pair(&pair[0], right));
            }
            levels.push(next);
        }
        Self { levels }
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// The root hash, or `None` for the empty tree.
    pub fn root(&self) -> Option<[u8; 32]> {
        self.levels.last().and_then(|top| top.first().copied())
    }

    /// Generate an inclusion proof for the leaf at `index`.
    ///
    /// # Errors
    ///
    /// `RangeError` if `index` is not a leaf position of this tree.
    pub fn generate_proof(&self, index: usize) -> Result<MerkleProof, RangeError> {
        if index >= self.leaf_count() {
            return Err(RangeError {
                index,
                len: self.leaf_count(),
            });
        }
        let mut siblings = Vec::new();
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            // A duplicated last node is its own sibling.
            let sibling = position ^ 1;
            let sibling = if sibling < level.len() { sibling } else { position };
            siblings.push(level[sibling]);
            position /= 2;
        }
        Ok(MerkleProof {
            leaf_index: index,
            leaf_hash: self.levels[0][index],
            siblings,
        })
    }
}

/// Verify an inclusion proof against a root.
///
/// Folds the sibling path over the leaf hash with sorted-pair hashing and
/// compares the result to `root`. Depends on nothing else — in particular
/// not on the leaf count of the batch the proof came from.
pub fn verify_proof(leaf_hash: &[u8; 32], siblings: &[[u8; 32]], root: &[u8; 32]) -> bool {
    let mut current = *leaf_hash;
    for sibling in siblings {
        current = hash_pair(&current, sibling);
    }
    current == *root
}

/// Serde module for sibling lists, each node as lowercase hex.
mod hex_nodes {
    use probatum_core::hexutil;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        nodes: &[[u8; 32]],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(nodes.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<[u8; 32]>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .into_iter()
            .map(|s| {
                let raw = hexutil::decode(&s).map_err(serde::de::Error::custom)?;
                if raw.len() != 32 {
                    return Err(serde::de::Error::custom(format!(
                        "expected 32 bytes, got {}",
                        raw.len()
                    )));
                }
                let mut out = [0u8; 32];
                out.copy_from_slice(&raw);
                Ok(out)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf(i: u8) -> [u8; 32] {
        keccak256(&[i])
    }

    #[test]
    fn test_empty_tree_has_no_root() {
        let tree = MerkleTree::build(&[]);
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(tree.root(), None);
    }

    #[test]
    fn test_single_leaf_root_is_leaf() {
        let l = leaf(1);
        let tree = MerkleTree::build(&[l]);
        assert_eq!(tree.root(), Some(l));
        let proof = tree.generate_proof(0).unwrap();
        assert!(proof.siblings.is_empty());
        assert!(verify_proof(&l, &proof.siblings, &l));
    }

    #[test]
    fn test_two_leaf_root() {
        let (a, b) = (leaf(1), leaf(2));
        let tree = MerkleTree::build(&[a, b]);
        assert_eq!(tree.root(), Some(hash_pair(&a, &b)));
    }

    #[test]
    fn test_pair_hash_is_order_insensitive() {
        let (a, b) = (leaf(1), leaf(2));
        assert_eq!(hash_pair(&a, &b), hash_pair(&b, &a));
        assert_eq!(
            MerkleTree::build(&[a, b]).root(),
            MerkleTree::build(&[b, a]).root()
        );
    }

    #[test]
    fn test_odd_level_duplicates_last_node() {
        let (a, b, c) = (leaf(1), leaf(2), leaf(3));
        let tree = MerkleTree::build(&[a, b, c]);
        let expected = hash_pair(&hash_pair(&a, &b), &hash_pair(&c, &c));
        assert_eq!(tree.root(), Some(expected));
    }

    #[test]
    fn test_proofs_verify_for_every_index() {
        for size in [1usize, 2, 3, 4, 5, 7, 8, 9, 15, 16, 17, 33] {
            let leaves: Vec<[u8; 32]> = (0..size as u8).map(leaf).collect();
            let tree = MerkleTree::build(&leaves);
            let root = tree.root().unwrap();
            for (i, l) in leaves.iter().enumerate() {
                let proof = tree.generate_proof(i).unwrap();
                assert_eq!(proof.leaf_index, i);
                assert_eq!(proof.leaf_hash, *l);
                assert!(
                    verify_proof(l, &proof.siblings, &root),
                    "proof failed at size={size}, index={i}"
                );
            }
        }
    }

    #[test]
    fn test_duplicated_last_leaf_proof() {
        // The last leaf of an odd level pairs with itself; its proof must
        // carry itself as the first sibling.
        let leaves: Vec<[u8; 32]> = (0..5u8).map(leaf).collect();
        let tree = MerkleTree::build(&leaves);
        let proof = tree.generate_proof(4).unwrap();
        assert_eq!(proof.siblings[0], leaves[4]);
        assert!(verify_proof(&leaves[4], &proof.siblings, &tree.root().unwrap()));
    }

    #[test]
    fn test_wrong_leaf_fails_verification() {
        let leaves: Vec<[u8; 32]> = (0..8u8).map(leaf).collect();
        let tree = MerkleTree::build(&leaves);
        let root = tree.root().unwrap();
        let proof = tree.generate_proof(2).unwrap();
        assert!(!verify_proof(&leaf(99), &proof.siblings, &root));
    }

    #[test]
    fn test_tampered_sibling_fails_verification() {
        let leaves: Vec<[u8; 32]> = (0..8u8).map(leaf).collect();
        let tree = MerkleTree::build(&leaves);
        let root = tree.root().unwrap();
        let mut proof = tree.generate_proof(2).unwrap();
        proof.siblings[1][0] ^= 0x01;
        assert!(!verify_proof(&proof.leaf_hash, &proof.siblings, &root));
    }

    #[test]
    fn test_out_of_range_proof_rejected() {
        let leaves: Vec<[u8; 32]> = (0..3u8).map(leaf).collect();
        let tree = MerkleTree::build(&leaves);
        let err = tree.generate_proof(3).unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.len, 3);
        assert!(MerkleTree::build(&[]).generate_proof(0).is_err());
    }

    #[test]
    fn test_proof_serde_roundtrip() {
        let leaves: Vec<[u8; 32]> = (0..6u8).map(leaf).collect();
        let tree = MerkleTree::build(&leaves);
        let proof = tree.generate_proof(3).unwrap();
        let json = serde_json::to_string(&proof).unwrap();
        assert!(!json.contains("0x"));
        let back: MerkleProof = serde_json::from_str(&json).unwrap();
        assert_eq!(back, proof);
    }

    proptest! {
        #[test]
        fn prop_every_proof_verifies(count in 1usize..64, seed in any::<u8>()) {
            let leaves: Vec<[u8; 32]> = (0..count)
                .map(|i| keccak256(&[seed, i as u8]))
                .collect();
            let tree = MerkleTree::build(&leaves);
            let root = tree.root().unwrap();
            for i in 0..count {
                let proof = tree.generate_proof(i).unwrap();
                prop_assert!(verify_proof(&leaves[i], &proof.siblings, &root));
            }
        }

        #[test]
        fn prop_root_changes_with_any_leaf(count in 2usize..32, idx in 0usize..32, seed in any::<u8>()) {
            let idx = idx % count;
            let mut leaves: Vec<[u8; 32]> = (0..count)
                .map(|i| keccak256(&[seed, i as u8]))
                .collect();
            let before = MerkleTree::build(&leaves).root();
            leaves[idx][0] ^= 0xff;
            let after = MerkleTree::build(&leaves).root();
            prop_assert_ne!(before, after);
        }
    }
}
