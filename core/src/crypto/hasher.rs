//! Block hasher implementations
//!
//! This module provides a trait for the 32-byte hash functions used to commit
//! to database blocks, and concrete implementations using different hash
//! algorithms.

use sha2::{Sha256, Digest};
use blake2::Blake2s256;
use sha3::Keccak256;
use std::fmt::Debug;

use crate::config::HashAlgorithm;

/// Hash function producing the 32-byte digests stored in Merkle trees and
/// serialized inclusion proofs
pub trait BlockHasher: Debug + Send + Sync {
    /// Hash a single byte string
    fn hash(&self, data: &[u8]) -> [u8; 32];

    /// Hash the concatenation `left || right` of two child digests
    fn hash_pair(&self, left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
        let mut joined = [0u8; 64];
        joined[..32].copy_from_slice(left);
        joined[32..].copy_from_slice(right);
        self.hash(&joined)
    }

    /// Algorithm identifier for this hasher
    fn algorithm(&self) -> HashAlgorithm;
}

fn finalize_32<D: Digest>(hasher: D) -> [u8; 32] {
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 implementation of BlockHasher
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl BlockHasher for Sha256Hasher {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(data);
        finalize_32(hasher)
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }
}

/// Blake2s implementation of BlockHasher
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake2sHasher;

impl BlockHasher for Blake2sHasher {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = Blake2s256::new();
        hasher.update(data);
        finalize_32(hasher)
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Blake2s
    }
}

/// Keccak-256 implementation of BlockHasher
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakHasher;

impl BlockHasher for KeccakHasher {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(data);
        finalize_32(hasher)
    }

    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Keccak256
    }
}

impl HashAlgorithm {
    /// Instantiate the hasher for this algorithm
    pub fn hasher(self) -> Box<dyn BlockHasher> {
        match self {
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher),
            HashAlgorithm::Blake2s => Box::new(Blake2sHasher),
            HashAlgorithm::Keccak256 => Box::new(KeccakHasher),
        }
    }
}
