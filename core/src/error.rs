//! Error types for the core crate
//!
//! This module provides a consolidated error type for database construction,
//! commitment building and corpus ingestion.

use thiserror::Error;
use std::io;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Caller supplied a parameter that cannot produce a consistent result
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Block count cannot be partitioned into the requested rows
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// IO error (randomness source or corpus file)
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Structurally malformed corpus stream
    #[error("Corpus format error: {0}")]
    CorpusFormatError(String),

    /// Requested item could not be located
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialized inclusion proof is malformed
    #[error("Proof decode error: {0}")]
    ProofDecodeError(String),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Bincode error
    #[error("Bincode error: {0}")]
    BincodeError(#[from] bincode::Error),

    /// Hex decoding error
    #[error("Hex decoding error: {0}")]
    HexError(#[from] hex::FromHexError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for the core crate
pub type Result<T> = std::result::Result<T, CoreError>;

/// Wrap a randomness source failure as an IoError
pub fn to_randomness_error(err: rand::Error) -> CoreError {
    CoreError::IoError(io::Error::new(io::ErrorKind::Other, err))
}
