//! Merkle tree proof implementation
//!
//! This module provides a proof structure for verifying inclusion in a Merkle tree.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use serde::{Serialize, Deserialize};

use crate::crypto::{self, BlockHasher};

/// A proof of inclusion in a Merkle tree
///
/// Sibling hashes run from the leaf level up to just below the root. Bit `i`
/// of `leaf_index` tells whether the node at level `i` is a right child.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    /// Hashes of the siblings along the path from leaf to root
    pub sibling_hashes: Vec<[u8; 32]>,

    /// The position of the leaf in the tree
    pub leaf_index: u64,
}

impl Debug for InclusionProof {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let hashes: Vec<String> = self
            .sibling_hashes
            .iter()
            .map(|hash| hex::encode(&hash[0..4])) // Show first 4 bytes of hash
            .collect();
        write!(
            f,
            "InclusionProof {{ leaf_index: {}, sibling_hashes: {:?} }}",
            self.leaf_index, hashes
        )
    }
}

impl InclusionProof {
    /// Create a new proof
    pub fn new(sibling_hashes: Vec<[u8; 32]>, leaf_index: u64) -> Self {
        InclusionProof {
            sibling_hashes,
            leaf_index,
        }
    }

    /// Calculate the root hash implied by this proof for `block`
    pub fn compute_root(&self, block: &[u8], hasher: &dyn BlockHasher) -> [u8; 32] {
        let mut current_hash = hasher.hash(block);
        let mut index = self.leaf_index;

        for sibling in &self.sibling_hashes {
            current_hash = if index & 1 == 0 {
                // Current is the left child, sibling is the right child
                hasher.hash_pair(&current_hash, sibling)
            } else {
                // Current is the right child, sibling is the left child
                hasher.hash_pair(sibling, &current_hash)
            };
            index >>= 1;
        }

        current_hash
    }

    /// Verify that `block` sits at `leaf_index` under `root`
    pub fn verify(&self, block: &[u8], root: &[u8; 32], hasher: &dyn BlockHasher) -> bool {
        // An index with bits above the proof depth names a leaf the tree cannot hold
        let depth = self.sibling_hashes.len();
        if depth < 64 && self.leaf_index >> depth != 0 {
            return false;
        }

        crypto::verify_hash(root, &self.compute_root(block, hasher))
    }

    /// Get the number of sibling hashes
    pub fn len(&self) -> usize {
        self.sibling_hashes.len()
    }

    /// Check if the proof is empty
    pub fn is_empty(&self) -> bool {
        self.sibling_hashes.is_empty()
    }
}
