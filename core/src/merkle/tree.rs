//! Merkle tree implementation
//!
//! The tree is stored level by level, leaves first, and is immutable once
//! built so proof generation can share it across threads.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::config::HashAlgorithm;
use crate::error::{CoreError, Result};
use super::proof::InclusionProof;

/// A binary Merkle tree over a sequence of blocks
#[derive(Clone, Serialize, Deserialize)]
pub struct MerkleTree {
    /// Node hashes per level; `levels[0]` are the leaves, the last level is the root
    levels: Vec<Vec<[u8; 32]>>,

    /// Hash algorithm used for every node
    hash_algorithm: HashAlgorithm,
}

impl Debug for MerkleTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "MerkleTree {{ root: {}, depth: {}, num_leaves: {}, hash_algorithm: {:?} }}",
            hex::encode(&self.root()[0..4]), // Show first 4 bytes of hash
            self.depth(),
            self.num_leaves(),
            self.hash_algorithm
        )
    }
}

impl MerkleTree {
    /// Build a tree over `blocks`
    pub fn from_blocks<B>(blocks: &[B], hash_algorithm: HashAlgorithm) -> Result<Self>
    where
        B: AsRef<[u8]> + Sync,
    {
        if blocks.is_empty() {
            return Err(CoreError::InvalidArgument(
                "cannot build a Merkle tree over zero blocks".to_string(),
            ));
        }

        let hasher = hash_algorithm.hasher();
        let leaves: Vec<[u8; 32]> = blocks
            .par_iter()
            .map(|block| hasher.hash(block.as_ref()))
            .collect();

        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let parents = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hasher.hash_pair(left, right),
                    [last] => hasher.hash_pair(last, last),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                })
                .collect();
            levels.push(parents);
        }

        Ok(MerkleTree {
            levels,
            hash_algorithm,
        })
    }

    /// Root hash of the tree
    pub fn root(&self) -> [u8; 32] {
        self.levels[self.levels.len() - 1][0]
    }

    /// Number of leaves
    pub fn num_leaves(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of levels above the leaves; also the length of every proof
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Hash algorithm of the tree
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Hash of the leaf at `index`
    pub fn leaf_hash(&self, index: usize) -> Option<[u8; 32]> {
        self.levels[0].get(index).copied()
    }

    /// Generate the inclusion proof for the leaf at `index`
    pub fn generate_proof(&self, index: usize) -> Result<InclusionProof> {
        if index >= self.num_leaves() {
            return Err(CoreError::InvalidArgument(format!(
                "leaf {} outside tree of {} leaves",
                index,
                self.num_leaves()
            )));
        }

        let mut position = index;
        let mut sibling_hashes = Vec::with_capacity(self.depth());
        for level in &self.levels[..self.depth()] {
            // A dangling last node is paired with itself
            let sibling = level.get(position ^ 1).unwrap_or(&level[position]);
            sibling_hashes.push(*sibling);
            position /= 2;
        }

        Ok(InclusionProof::new(sibling_hashes, index as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{BlockHasher, Sha256Hasher};

    fn blocks(count: usize) -> Vec<Vec<u8>> {
        (0..count).map(|i| format!("block {}", i).into_bytes()).collect()
    }

    #[test]
    fn test_empty_tree_rejected() {
        let empty: Vec<Vec<u8>> = Vec::new();
        assert!(matches!(
            MerkleTree::from_blocks(&empty, HashAlgorithm::Sha256),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_single_leaf() {
        let tree = MerkleTree::from_blocks(&blocks(1), HashAlgorithm::Sha256).unwrap();

        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.root(), Sha256Hasher.hash(b"block 0"));
        assert_eq!(tree.leaf_hash(0), Some(tree.root()));
        assert_eq!(tree.leaf_hash(1), None);

        let proof = tree.generate_proof(0).unwrap();
        assert!(proof.sibling_hashes.is_empty());
        assert!(proof.verify(b"block 0", &tree.root(), &Sha256Hasher));
    }

    #[test]
    fn test_four_leaf_root() {
        // Mimicking a tree with the following structure:
        //        root
        //       /    \
        //     n1      n2
        //    / \     / \
        //   a   b   c   d
        let h = Sha256Hasher;
        let leaves: Vec<&[u8]> = vec![&b"a"[..], &b"b"[..], &b"c"[..], &b"d"[..]];
        let tree = MerkleTree::from_blocks(&leaves, HashAlgorithm::Sha256).unwrap();

        let n1 = h.hash_pair(&h.hash(b"a"), &h.hash(b"b"));
        let n2 = h.hash_pair(&h.hash(b"c"), &h.hash(b"d"));
        assert_eq!(tree.root(), h.hash_pair(&n1, &n2));
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.leaf_hash(3), Some(h.hash(b"d")));

        let proof = tree.generate_proof(2).unwrap();
        assert_eq!(proof.sibling_hashes, vec![h.hash(b"d"), n1]);
    }

    #[test]
    fn test_odd_level_duplicates_last_node() {
        let h = Sha256Hasher;
        let leaves: Vec<&[u8]> = vec![&b"a"[..], &b"b"[..], &b"c"[..]];
        let tree = MerkleTree::from_blocks(&leaves, HashAlgorithm::Sha256).unwrap();

        let n1 = h.hash_pair(&h.hash(b"a"), &h.hash(b"b"));
        let n2 = h.hash_pair(&h.hash(b"c"), &h.hash(b"c"));
        assert_eq!(tree.root(), h.hash_pair(&n1, &n2));

        let proof = tree.generate_proof(2).unwrap();
        assert_eq!(proof.sibling_hashes[0], h.hash(b"c"));
        assert!(proof.verify(b"c", &tree.root(), &h));
    }

    #[test]
    fn test_every_proof_verifies_and_has_equal_length() {
        for count in [2usize, 5, 7, 8, 13] {
            let data = blocks(count);
            let tree = MerkleTree::from_blocks(&data, HashAlgorithm::Blake2s).unwrap();
            let hasher = tree.hash_algorithm().hasher();

            for (i, block) in data.iter().enumerate() {
                let proof = tree.generate_proof(i).unwrap();
                assert_eq!(proof.sibling_hashes.len(), tree.depth());
                assert!(proof.verify(block, &tree.root(), hasher.as_ref()));
            }
        }
    }

    #[test]
    fn test_proof_out_of_range() {
        let tree = MerkleTree::from_blocks(&blocks(3), HashAlgorithm::Sha256).unwrap();
        assert!(tree.generate_proof(3).is_err());
    }

    #[test]
    fn test_root_changes_with_content() {
        let mut data = blocks(6);
        let before = MerkleTree::from_blocks(&data, HashAlgorithm::Sha256).unwrap().root();
        data[4][0] ^= 0x01;
        let after = MerkleTree::from_blocks(&data, HashAlgorithm::Sha256).unwrap().root();

        assert_ne!(before, after);
    }
}
