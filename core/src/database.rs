//! Database representation
//!
//! A database is a grid layout, the records stored in it and the public
//! commitment a verifier checks answers against.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::config::{HashAlgorithm, FIELD_ELEMENT_BYTES};
use crate::error::{CoreError, Result};
use crate::layout::GridLayout;
use crate::merkle::AuthenticatedBlock;

/// One field unit as consumed by the external field-arithmetic library
pub type FieldElement = [u8; FIELD_ELEMENT_BYTES];

/// Public-key algorithm identifiers carried in key metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PublicKeyAlgorithm {
    /// RSA
    Rsa = 1,
    /// ElGamal
    ElGamal = 16,
    /// DSA
    Dsa = 17,
    /// ECDH
    Ecdh = 18,
    /// ECDSA
    Ecdsa = 19,
}

impl PublicKeyAlgorithm {
    /// Every supported algorithm
    pub const ALL: [PublicKeyAlgorithm; 5] = [
        PublicKeyAlgorithm::Rsa,
        PublicKeyAlgorithm::ElGamal,
        PublicKeyAlgorithm::Dsa,
        PublicKeyAlgorithm::Ecdh,
        PublicKeyAlgorithm::Ecdsa,
    ];

    /// Numeric algorithm identifier
    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Metadata about one identifier in a keys database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    /// Identity label, e.g. `Full Name <email@example.com>`
    pub user_id: String,

    /// Key creation time
    pub creation_time: DateTime<Utc>,

    /// Public-key algorithm
    pub pub_key_algorithm: PublicKeyAlgorithm,
}

/// Records stored in a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Records {
    /// Row-major byte rows, each `num_columns * block_size` bytes
    Bytes(Vec<Vec<u8>>),

    /// Flat row-major field units, `capacity` of them
    Elements(Vec<FieldElement>),

    /// Per-identifier metadata, one per block
    Keys(Vec<KeyInfo>),
}

/// Digest-based authentication information
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    /// Hash of all row digests
    pub global_digest: [u8; 32],

    /// One digest per row, concatenated
    pub per_row_digests: Vec<u8>,

    /// Group the row digests live in
    pub group_identifier: String,

    /// Hash algorithm used for the global digest
    pub hash_algorithm: HashAlgorithm,

    /// Size of one encoded group element
    pub element_size: usize,

    /// Size of one encoded scalar
    pub scalar_size: usize,
}

impl Debug for AuthInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AuthInfo")
            .field("global_digest", &hex::encode(&self.global_digest[0..4]))
            .field("per_row_digests_len", &self.per_row_digests.len())
            .field("group_identifier", &self.group_identifier)
            .field("hash_algorithm", &self.hash_algorithm)
            .field("element_size", &self.element_size)
            .field("scalar_size", &self.scalar_size)
            .finish()
    }
}

/// Merkle-tree authentication information
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleInfo {
    /// Root of the tree over every block
    pub root: [u8; 32],

    /// Serialized length of every embedded inclusion proof
    pub proof_len: usize,

    /// Hash algorithm the tree was built with
    pub hash_algorithm: HashAlgorithm,
}

impl Debug for MerkleInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "MerkleInfo {{ root: {}, proof_len: {}, hash_algorithm: {:?} }}",
            hex::encode(&self.root[0..4]),
            self.proof_len,
            self.hash_algorithm
        )
    }
}

/// How answers from a database are authenticated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VerificationMode {
    /// Aggregate digest over per-row digests
    Digest(AuthInfo),

    /// Merkle tree with per-block inclusion proofs
    Tree(MerkleInfo),

    /// Unauthenticated
    #[default]
    None,
}

/// A built database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    layout: GridLayout,
    records: Records,
    verification: VerificationMode,
}

impl Database {
    /// Assemble a database, checking that the records fill the layout
    pub fn new(layout: GridLayout, records: Records, verification: VerificationMode) -> Result<Self> {
        layout.validate()?;
        match &records {
            Records::Bytes(rows) => {
                if rows.len() != layout.num_rows() {
                    return Err(CoreError::InvalidArgument(format!(
                        "{} rows for a layout of {} rows",
                        rows.len(),
                        layout.num_rows()
                    )));
                }
                if let Some(row) = rows.iter().find(|r| r.len() != layout.row_size()) {
                    return Err(CoreError::InvalidArgument(format!(
                        "row of {} bytes for a row size of {}",
                        row.len(),
                        layout.row_size()
                    )));
                }
            }
            Records::Elements(elements) => {
                if elements.len() != layout.capacity() {
                    return Err(CoreError::InvalidArgument(format!(
                        "{} elements for a capacity of {}",
                        elements.len(),
                        layout.capacity()
                    )));
                }
            }
            Records::Keys(keys) => {
                if keys.len() != layout.num_blocks() {
                    return Err(CoreError::InvalidArgument(format!(
                        "{} keys for {} blocks",
                        keys.len(),
                        layout.num_blocks()
                    )));
                }
            }
        }

        Ok(Database {
            layout,
            records,
            verification,
        })
    }

    /// Grid layout
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Stored records
    pub fn records(&self) -> &Records {
        &self.records
    }

    /// Verification mode
    pub fn verification(&self) -> &VerificationMode {
        &self.verification
    }

    /// Merkle information, if this is a tree-mode database
    pub fn merkle_info(&self) -> Option<&MerkleInfo> {
        match &self.verification {
            VerificationMode::Tree(info) => Some(info),
            _ => None,
        }
    }

    /// Digest information, if this is a digest-mode database
    pub fn auth_info(&self) -> Option<&AuthInfo> {
        match &self.verification {
            VerificationMode::Digest(info) => Some(info),
            _ => None,
        }
    }

    /// Whether the records are identifier metadata
    pub fn is_keys_database(&self) -> bool {
        matches!(self.records, Records::Keys(_))
    }

    /// Byte rows, for byte-backed databases
    pub fn rows(&self) -> Option<&[Vec<u8>]> {
        match &self.records {
            Records::Bytes(rows) => Some(rows),
            _ => None,
        }
    }

    /// Field units, for element-backed databases
    pub fn elements(&self) -> Option<&[FieldElement]> {
        match &self.records {
            Records::Elements(elements) => Some(elements),
            _ => None,
        }
    }

    /// Key metadata, for keys databases
    pub fn keys(&self) -> Option<&[KeyInfo]> {
        match &self.records {
            Records::Keys(keys) => Some(keys),
            _ => None,
        }
    }

    /// Raw bytes of the cell at `(row, column)`
    pub fn cell(&self, row: usize, column: usize) -> Result<&[u8]> {
        self.layout.block_index(row, column)?;
        let rows = self.rows().ok_or_else(|| {
            CoreError::InvalidArgument("database is not byte-backed".to_string())
        })?;
        let size = self.layout.block_size();
        Ok(&rows[row][column * size..(column + 1) * size])
    }

    pub(crate) fn cell_mut(&mut self, row: usize, column: usize) -> Result<&mut [u8]> {
        self.layout.block_index(row, column)?;
        let size = self.layout.block_size();
        match &mut self.records {
            Records::Bytes(rows) => Ok(&mut rows[row][column * size..(column + 1) * size]),
            _ => Err(CoreError::InvalidArgument("database is not byte-backed".to_string())),
        }
    }

    pub(crate) fn layout_mut(&mut self) -> &mut GridLayout {
        &mut self.layout
    }

    pub(crate) fn set_verification(&mut self, verification: VerificationMode) {
        self.verification = verification;
    }

    /// Split the Merkle-mode cell at `(row, column)` into payload and proof
    pub fn authenticated_block(&self, row: usize, column: usize) -> Result<AuthenticatedBlock> {
        let info = self.merkle_info().ok_or_else(|| {
            CoreError::InvalidArgument("database has no Merkle commitment".to_string())
        })?;
        let block = self.layout.block_index(row, column)?;
        let block_len = self.layout.block_length(block).unwrap_or_default();
        AuthenticatedBlock::from_cell(self.cell(row, column)?, block_len, info.proof_len)
    }

    /// Persist the database with bincode
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a database written by [`Database::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let database: Database = bincode::deserialize_from(reader)?;
        Database::new(database.layout, database.records, database.verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    fn byte_database() -> Database {
        let layout = GridLayout::with_uniform_lengths(2, 3, 2);
        let rows = vec![vec![1, 2, 3, 4, 5, 6], vec![7, 8, 9, 10, 11, 12]];
        Database::new(layout, Records::Bytes(rows), VerificationMode::None).unwrap()
    }

    #[test]
    fn test_cell_access() {
        let db = byte_database();
        assert_eq!(db.cell(0, 0).unwrap(), &[1, 2]);
        assert_eq!(db.cell(1, 2).unwrap(), &[11, 12]);
        assert!(db.cell(2, 0).is_err());
        assert!(db.merkle_info().is_none());
        assert!(db.auth_info().is_none());
        assert!(db.authenticated_block(0, 0).is_err());
    }

    #[test]
    fn test_new_rejects_mismatched_rows() {
        let layout = GridLayout::new(2, 3, 2);
        let rows = vec![vec![0; 6], vec![0; 5]];
        assert!(matches!(
            Database::new(layout.clone(), Records::Bytes(rows), VerificationMode::None),
            Err(CoreError::InvalidArgument(_))
        ));

        let rows = vec![vec![0; 6]];
        assert!(Database::new(layout, Records::Bytes(rows), VerificationMode::None).is_err());
    }

    #[test]
    fn test_new_rejects_mismatched_elements_and_keys() {
        let layout = GridLayout::new(1, 2, 2);
        assert!(Database::new(
            layout.clone(),
            Records::Elements(vec![[0u8; FIELD_ELEMENT_BYTES]; 3]),
            VerificationMode::None
        )
        .is_err());
        assert!(Database::new(layout, Records::Keys(Vec::new()), VerificationMode::None).is_err());
    }

    #[test]
    fn test_keys_database() {
        let key = KeyInfo {
            user_id: "Alice <alice@x.com>".to_string(),
            creation_time: Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap(),
            pub_key_algorithm: PublicKeyAlgorithm::Ecdsa,
        };
        let layout = GridLayout::with_uniform_lengths(1, 1, 2);
        let db = Database::new(layout, Records::Keys(vec![key.clone()]), VerificationMode::None).unwrap();

        assert!(db.is_keys_database());
        assert_eq!(db.keys().unwrap()[0], key);
        assert_eq!(key.pub_key_algorithm.id(), 19);
        assert!(db.cell(0, 0).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let db = byte_database();
        let temp_file = NamedTempFile::new().unwrap();

        db.save(temp_file.path()).unwrap();
        let loaded = Database::load(temp_file.path()).unwrap();

        assert_eq!(loaded, db);
    }

    #[test]
    fn test_load_rejects_inconsistent_rows() {
        let inconsistent = Database {
            layout: GridLayout::with_uniform_lengths(2, 3, 2),
            records: Records::Bytes(vec![vec![0; 6], vec![0; 1]]),
            verification: VerificationMode::None,
        };
        let temp_file = NamedTempFile::new().unwrap();
        inconsistent.save(temp_file.path()).unwrap();

        assert!(matches!(
            Database::load(temp_file.path()),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_load_garbage_fails() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), b"\xff\xff\xff").unwrap();

        assert!(Database::load(temp_file.path()).is_err());
    }
}
