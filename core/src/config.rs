//! Configuration for the core crate
//!
//! This module provides configuration options for database construction,
//! including grid geometry, commitment hashing and corpus ingestion.

use std::path::{Path, PathBuf};
use log::LevelFilter;
use serde::{Serialize, Deserialize};

use crate::error::{CoreError, Result};

/// Size in bytes of one field unit inside a payload cell
pub const FIELD_ELEMENT_BYTES: usize = 16;

/// Default number of payload bytes embedded per field unit
pub const DEFAULT_CHUNK_BYTES: usize = 15;

/// Default ceiling on a single corpus record's payload (16 KiB)
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 16 * 1024;

/// Default ratio of bucket table length to number of corpus records
pub const DEFAULT_TABLE_LENGTH_RATIO: f64 = 0.2;

/// Hash algorithm to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HashAlgorithm {
    /// SHA-256
    #[default]
    Sha256,

    /// Blake2s
    Blake2s,

    /// Keccak-256
    Keccak256,
}

/// Grid geometry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Number of rows for non-square layouts
    pub num_rows: usize,

    /// Whether to arrange blocks in a square matrix
    pub square_matrix: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            num_rows: 1,
            square_matrix: false,
        }
    }
}

/// Merkle tree configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MerkleConfig {
    /// Hash algorithm to use for the Merkle tree
    pub hash_algorithm: HashAlgorithm,
}

/// Corpus ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory holding the corpus shards
    pub corpus_dir: PathBuf,

    /// Records with a larger payload are dropped
    pub max_payload_bytes: usize,

    /// Bucket table length as a fraction of the number of records
    pub table_length_ratio: f64,

    /// Payload bytes per field unit
    pub chunk_bytes: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            corpus_dir: PathBuf::from("data/corpus"),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            table_length_ratio: DEFAULT_TABLE_LENGTH_RATIO,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Grid geometry configuration
    pub layout: LayoutConfig,

    /// Merkle tree configuration
    pub merkle: MerkleConfig,

    /// Corpus ingestion configuration
    pub ingest: IngestConfig,

    /// Default log filter for binaries, e.g. `info` or `debug`
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            layout: LayoutConfig::default(),
            merkle: MerkleConfig::default(),
            ingest: IngestConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl CoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config: CoreConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Check that the configuration describes a buildable database
    pub fn validate(&self) -> Result<()> {
        if self.layout.num_rows == 0 {
            return Err(CoreError::ConfigError("layout.num_rows must be positive".to_string()));
        }
        if self.ingest.chunk_bytes == 0 || self.ingest.chunk_bytes > FIELD_ELEMENT_BYTES {
            return Err(CoreError::ConfigError(format!(
                "ingest.chunk_bytes must be in 1..={}, got {}",
                FIELD_ELEMENT_BYTES, self.ingest.chunk_bytes
            )));
        }
        if self.ingest.table_length_ratio.is_nan() || self.ingest.table_length_ratio <= 0.0 {
            return Err(CoreError::ConfigError(
                "ingest.table_length_ratio must be positive".to_string(),
            ));
        }
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(CoreError::ConfigError(format!(
                "log_level {:?} is not a log level",
                self.log_level
            )));
        }
        Ok(())
    }

    /// Create a development configuration
    pub fn development() -> Self {
        let mut config = Self::default();
        config.log_level = "debug".to_string();
        config
    }

    /// Create a testing configuration
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.log_level = "debug".to_string();
        config.layout.square_matrix = true;
        config.ingest.max_payload_bytes = 1024;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = CoreConfig::default();

        assert_eq!(config.merkle.hash_algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.layout.num_rows, 1);
        assert!(!config.layout.square_matrix);
        assert_eq!(config.ingest.max_payload_bytes, 16384);
        assert_eq!(config.ingest.chunk_bytes, 15);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let config = CoreConfig::development();
        assert_eq!(config.log_level, "debug");
        assert!(config.validate().is_ok());

        let config = CoreConfig::testing();
        assert!(config.layout.square_matrix);
        assert_eq!(config.ingest.max_payload_bytes, 1024);
    }

    #[test]
    fn test_validate_rejects_bad_chunk_width() {
        let mut config = CoreConfig::default();
        config.ingest.chunk_bytes = 17;
        assert!(matches!(config.validate(), Err(CoreError::ConfigError(_))));

        config.ingest.chunk_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let mut config = CoreConfig::default();
        config.log_level = "chatty".to_string();
        assert!(matches!(config.validate(), Err(CoreError::ConfigError(_))));

        config.log_level = "TRACE".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_rows() {
        let mut config = CoreConfig::default();
        config.layout.num_rows = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_io() {
        let mut config = CoreConfig::default();
        config.merkle.hash_algorithm = HashAlgorithm::Keccak256;
        config.ingest.corpus_dir = PathBuf::from("/tmp/shards");

        let temp_file = NamedTempFile::new().unwrap();

        config.to_file(temp_file.path()).unwrap();
        let loaded_config = CoreConfig::from_file(temp_file.path()).unwrap();

        assert_eq!(loaded_config.merkle.hash_algorithm, HashAlgorithm::Keccak256);
        assert_eq!(loaded_config.ingest.corpus_dir, PathBuf::from("/tmp/shards"));
        assert_eq!(loaded_config.ingest.max_payload_bytes, config.ingest.max_payload_bytes);
        assert_eq!(loaded_config.log_level, config.log_level);
    }

    #[test]
    fn test_missing_config_file() {
        let result = CoreConfig::from_file("/nonexistent/vpir-config.json");
        assert!(matches!(result, Err(CoreError::IoError(_))));
    }
}
