//! Block payload paired with its serialized inclusion proof
//!
//! A Merkle-mode cell stores `payload || proof`. The split offset is the
//! block's recorded length and the proof length is fixed per database.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::crypto::BlockHasher;
use crate::error::{CoreError, Result};
use super::codec::decode_proof;
use super::proof::InclusionProof;

/// One stored block of a Merkle-mode database
#[derive(Clone, PartialEq, Eq)]
pub struct AuthenticatedBlock {
    payload: Vec<u8>,
    proof: Vec<u8>,
}

impl Debug for AuthenticatedBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "AuthenticatedBlock {{ payload_len: {}, proof_len: {} }}",
            self.payload.len(),
            self.proof.len()
        )
    }
}

impl AuthenticatedBlock {
    /// Pair a payload with its encoded proof
    pub fn new(payload: Vec<u8>, proof: Vec<u8>) -> Self {
        AuthenticatedBlock { payload, proof }
    }

    /// Split a stored cell into payload and proof
    pub fn from_cell(cell: &[u8], block_len: usize, proof_len: usize) -> Result<Self> {
        let end = block_len
            .checked_add(proof_len)
            .filter(|&end| end <= cell.len())
            .ok_or_else(|| {
                CoreError::InvalidArgument(format!(
                    "cell of {} bytes cannot hold a {} byte block and a {} byte proof",
                    cell.len(),
                    block_len,
                    proof_len
                ))
            })?;

        Ok(AuthenticatedBlock {
            payload: cell[..block_len].to_vec(),
            proof: cell[block_len..end].to_vec(),
        })
    }

    /// Raw block bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Encoded proof bytes
    pub fn proof_bytes(&self) -> &[u8] {
        &self.proof
    }

    /// Decode the embedded proof
    pub fn proof(&self) -> Result<InclusionProof> {
        decode_proof(&self.proof)
    }

    /// Stored size, `payload + proof`
    pub fn len(&self) -> usize {
        self.payload.len() + self.proof.len()
    }

    /// Whether both parts are empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty() && self.proof.is_empty()
    }

    /// Stored representation, `payload || proof`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&self.proof);
        out
    }

    /// Check that the embedded proof authenticates exactly this payload at
    /// leaf `expected_index` under `root`
    pub fn verify(&self, root: &[u8; 32], expected_index: u64, hasher: &dyn BlockHasher) -> Result<bool> {
        let proof = self.proof()?;
        Ok(proof.leaf_index == expected_index && proof.verify(&self.payload, root, hasher))
    }
}
