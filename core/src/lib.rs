//! # Verifiable PIR Database Core
//!
//! Database construction for verifiable private information retrieval.
//! This crate lays blocks out on a grid, fills them from random sources or a
//! corpus of identity/payload records, and commits to them with either a
//! Merkle tree or a per-row digest so clients can check what a server returns.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod auth;
pub mod config;
pub mod corpus;
pub mod crypto;
pub mod database;
pub mod encoder;
pub mod error;
pub mod layout;
pub mod merkle;
pub mod utils;

/// Re-export common types for ease of use
pub use config::{CoreConfig, HashAlgorithm};
pub use crypto::{hash_to_index, BlockHasher};
pub use database::{AuthInfo, Database, MerkleInfo, Records, VerificationMode};
pub use error::{CoreError, Result};
pub use layout::{compute_rows_and_columns, GridLayout};
pub use merkle::{AuthenticatedBlock, InclusionProof, MerkleBuilder, MerkleTree};

/// Version of the core crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
