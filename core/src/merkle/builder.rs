//! Merkle commitment builder
//!
//! Turns a flat sequence of equally sized blocks into a Merkle-mode
//! database: every stored cell is the block followed by its encoded
//! inclusion proof, and the tree root is published with the database.

use log::{debug, info};
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;

use crate::config::HashAlgorithm;
use crate::database::{Database, MerkleInfo, Records, VerificationMode};
use crate::error::{to_randomness_error, CoreError, Result};
use crate::layout::GridLayout;
use super::block::AuthenticatedBlock;
use super::codec::encode_proof;
use super::tree::MerkleTree;

/// Builds Merkle-mode databases
#[derive(Debug, Clone, Copy, Default)]
pub struct MerkleBuilder {
    hash_algorithm: HashAlgorithm,
}

impl MerkleBuilder {
    /// Create a builder hashing with `hash_algorithm`
    pub fn new(hash_algorithm: HashAlgorithm) -> Self {
        MerkleBuilder { hash_algorithm }
    }

    /// Commit to `blocks` and lay them out over `num_rows` rows
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` - no blocks, blocks of different or zero length, or zero rows
    /// * `InvalidLayout` - the block count is not a multiple of `num_rows`
    pub fn build(&self, blocks: Vec<Vec<u8>>, num_rows: usize) -> Result<Database> {
        let block_len = match blocks.first() {
            Some(first) if !first.is_empty() => first.len(),
            Some(_) => {
                return Err(CoreError::InvalidArgument("blocks must not be empty".to_string()))
            }
            None => {
                return Err(CoreError::InvalidArgument(
                    "cannot commit to zero blocks".to_string(),
                ))
            }
        };
        if let Some(position) = blocks.iter().position(|b| b.len() != block_len) {
            return Err(CoreError::InvalidArgument(format!(
                "block {} has {} bytes, expected {}",
                position,
                blocks[position].len(),
                block_len
            )));
        }
        if num_rows == 0 {
            return Err(CoreError::InvalidArgument("number of rows must be positive".to_string()));
        }
        if blocks.len() % num_rows != 0 {
            return Err(CoreError::InvalidLayout(format!(
                "{} blocks cannot be split evenly over {} rows",
                blocks.len(),
                num_rows
            )));
        }
        let blocks_per_row = blocks.len() / num_rows;

        // The tree is complete before any proof is taken from it
        let tree = MerkleTree::from_blocks(&blocks, self.hash_algorithm)?;
        debug!("Built {:?}", tree);

        let proofs: Vec<Vec<u8>> = (0..blocks.len())
            .into_par_iter()
            .map(|index| encode_proof(&tree.generate_proof(index)?))
            .collect::<Result<_>>()?;

        let proof_len = proofs.first().map(Vec::len).unwrap_or_default();
        if proofs.iter().any(|p| p.len() != proof_len) {
            return Err(CoreError::InvalidLayout(
                "inclusion proofs of a tree must share one length".to_string(),
            ));
        }

        let stored_block_size = block_len + proof_len;
        let mut rows = vec![Vec::with_capacity(blocks_per_row * stored_block_size); num_rows];
        for (index, (block, proof)) in blocks.into_iter().zip(proofs).enumerate() {
            let stored = AuthenticatedBlock::new(block, proof);
            rows[index / blocks_per_row].extend_from_slice(&stored.to_bytes());
        }

        let layout = GridLayout::with_block_length(num_rows, blocks_per_row, stored_block_size, block_len)?;
        let info = MerkleInfo {
            root: tree.root(),
            proof_len,
            hash_algorithm: self.hash_algorithm,
        };
        info!(
            "Committed {} blocks of {} bytes over {} rows, root {}, proof length {}",
            tree.num_leaves(),
            block_len,
            num_rows,
            hex::encode(info.root),
            proof_len
        );

        Database::new(layout, Records::Bytes(rows), VerificationMode::Tree(info))
    }
}

/// Build a Merkle-mode database of random blocks
///
/// Draws `total_bits / (8 * block_len)` blocks of `block_len` random bytes.
pub fn random_merkle<R: RngCore + CryptoRng>(
    rng: &mut R,
    total_bits: usize,
    num_rows: usize,
    block_len: usize,
    hash_algorithm: HashAlgorithm,
) -> Result<Database> {
    if block_len == 0 {
        return Err(CoreError::InvalidArgument("block length must be positive".to_string()));
    }
    let num_blocks = total_bits / (8 * block_len);
    if num_blocks == 0 {
        return Err(CoreError::InvalidArgument(format!(
            "{} bits cannot hold a block of {} bytes",
            total_bits, block_len
        )));
    }

    let mut blocks = Vec::with_capacity(num_blocks);
    for _ in 0..num_blocks {
        let mut block = vec![0u8; block_len];
        rng.try_fill_bytes(&mut block).map_err(to_randomness_error)?;
        blocks.push(block);
    }

    MerkleBuilder::new(hash_algorithm).build(blocks, num_rows)
}
