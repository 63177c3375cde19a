/// Verifiable PIR database - grid layouts, Merkle commitments and corpus ingestion
///
/// This is the root crate that provides workspace-level documentation.
/// Actual implementation is in the subcrates:
/// - `vpir-db-core`: database layouts, encoders, commitments and ingestion
/// - `vpir-db-builder`: command-line builder that produces persisted databases
pub use vpir_db_core as core;

/// Returns the version of the package.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
