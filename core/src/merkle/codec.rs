//! Binary wire format for inclusion proofs
//!
//! Layout, little-endian:
//!
//! ```text
//! [4 bytes   ] number of sibling hashes (u32)
//! [32 * n    ] sibling hashes, leaf level first
//! [8 bytes   ] leaf index (u64), always the last 8 bytes of the buffer
//! ```
//!
//! The hash width is not encoded. Changing it requires a new
//! [`PROOF_FORMAT_VERSION`].

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{CoreError, Result};
use super::proof::InclusionProof;

/// Version of the proof wire format
pub const PROOF_FORMAT_VERSION: u8 = 1;

/// Width of every hash in an encoded proof
pub const PROOF_HASH_BYTES: usize = 32;

const COUNT_BYTES: usize = 4;
const INDEX_BYTES: usize = 8;

/// Encoded length of a proof with `num_hashes` sibling hashes
pub fn encoded_proof_len(num_hashes: usize) -> usize {
    COUNT_BYTES + num_hashes * PROOF_HASH_BYTES + INDEX_BYTES
}

/// Serialize a proof
pub fn encode_proof(proof: &InclusionProof) -> Result<Vec<u8>> {
    let num_hashes = u32::try_from(proof.sibling_hashes.len()).map_err(|_| {
        CoreError::InvalidArgument(format!(
            "{} sibling hashes do not fit the proof format",
            proof.sibling_hashes.len()
        ))
    })?;

    let mut buf = BytesMut::with_capacity(encoded_proof_len(proof.sibling_hashes.len()));
    buf.put_u32_le(num_hashes);
    for hash in &proof.sibling_hashes {
        buf.put_slice(hash);
    }
    buf.put_u64_le(proof.leaf_index);

    Ok(buf.to_vec())
}

/// Deserialize a proof written by [`encode_proof`]
pub fn decode_proof(bytes: &[u8]) -> Result<InclusionProof> {
    if bytes.len() < COUNT_BYTES + INDEX_BYTES {
        return Err(CoreError::ProofDecodeError(format!(
            "proof of {} bytes is shorter than the {} byte minimum",
            bytes.len(),
            COUNT_BYTES + INDEX_BYTES
        )));
    }

    let mut buf = bytes;
    let num_hashes = buf.get_u32_le() as usize;

    let expected = num_hashes
        .checked_mul(PROOF_HASH_BYTES)
        .and_then(|hashes| hashes.checked_add(COUNT_BYTES + INDEX_BYTES));
    if expected != Some(bytes.len()) {
        return Err(CoreError::ProofDecodeError(format!(
            "proof of {} bytes does not hold {} hashes",
            bytes.len(),
            num_hashes
        )));
    }

    let mut sibling_hashes = Vec::with_capacity(num_hashes);
    for _ in 0..num_hashes {
        let mut hash = [0u8; PROOF_HASH_BYTES];
        buf.copy_to_slice(&mut hash);
        sibling_hashes.push(hash);
    }

    // Exactly the index remains after the length check
    let leaf_index = buf.get_u64_le();

    Ok(InclusionProof::new(sibling_hashes, leaf_index))
}
