//! Merkle commitments over database blocks
//!
//! This module builds a binary Merkle tree over the blocks of a database,
//! embeds one serialized inclusion proof next to every block and publishes the
//! root, so a client can check any block it retrieves without trusting the
//! server.
//!
//! Tree shape: leaf = H(block), node = H(left || right). A level with an odd
//! number of nodes pairs its last node with itself, so every proof in a tree
//! has the same number of sibling hashes.

mod block;
mod builder;
mod codec;
mod proof;
mod tree;

pub use block::AuthenticatedBlock;
pub use builder::{random_merkle, MerkleBuilder};
pub use codec::{decode_proof, encode_proof, encoded_proof_len, PROOF_FORMAT_VERSION, PROOF_HASH_BYTES};
pub use proof::InclusionProof;
pub use tree::MerkleTree;
