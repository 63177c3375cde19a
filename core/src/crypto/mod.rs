//! Cryptographic primitives for the verifiable PIR database
//!
//! This module provides the block hashers used for commitments, the
//! identifier hasher that maps identifiers to table buckets, and
//! constant-time digest comparison.

mod hasher;

pub use hasher::{BlockHasher, Blake2sHasher, KeccakHasher, Sha256Hasher};

use blake2::{Blake2b, Digest};
use blake2::digest::consts::U32;
use constant_time_eq::constant_time_eq;

use crate::error::{CoreError, Result};

/// BLAKE2b with a 256-bit output
type Blake2b256 = Blake2b<U32>;

/// Map an identifier to a bucket index in `[0, table_len)`
///
/// The identifier's UTF-8 bytes are hashed with BLAKE2b-256, the first eight
/// bytes of the digest are read as a big-endian `u64` and reduced modulo
/// `table_len`. Clients compute the same index locally to know which bucket
/// to query.
///
/// # Errors
///
/// Returns `InvalidArgument` if `table_len` is zero.
pub fn hash_to_index(identifier: &str, table_len: usize) -> Result<usize> {
    if table_len == 0 {
        return Err(CoreError::InvalidArgument(
            "table length must be positive".to_string(),
        ));
    }

    let digest = Blake2b256::digest(identifier.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);

    Ok((u64::from_be_bytes(prefix) % table_len as u64) as usize)
}

/// Verify a hash in constant time to prevent timing attacks
///
/// # Arguments
///
/// * `expected` - Expected hash value
/// * `actual` - Actual hash value to verify
///
/// # Returns
///
/// True if the hashes match, false otherwise
pub fn verify_hash(expected: &[u8; 32], actual: &[u8; 32]) -> bool {
    constant_time_eq(expected, actual)
}
