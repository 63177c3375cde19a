//! Digest-mode authentication
//!
//! Every row is committed to by an external group-based committer; the
//! concatenated row digests are then hashed into one public global digest.
//! The group arithmetic itself lives behind [`RowCommitter`].

use log::info;

use crate::config::HashAlgorithm;
use crate::crypto;
use crate::database::{AuthInfo, Database, Records, VerificationMode};
use crate::error::{CoreError, Result};

/// Commits to one database row in an external group
#[cfg_attr(test, mockall::automock)]
pub trait RowCommitter {
    /// Identifier of the group the digests live in
    fn group_identifier(&self) -> String;

    /// Size of one encoded group element; every row digest has this size
    fn element_size(&self) -> usize;

    /// Size of one encoded scalar
    fn scalar_size(&self) -> usize;

    /// Digest of one row's bytes
    fn commit_row(&self, row: &[u8]) -> Result<Vec<u8>>;
}

impl AuthInfo {
    /// Commit to every row of `database`
    pub fn build(
        database: &Database,
        committer: &dyn RowCommitter,
        hash_algorithm: HashAlgorithm,
    ) -> Result<Self> {
        let rows = match database.records() {
            Records::Bytes(rows) => rows,
            _ => {
                return Err(CoreError::InvalidArgument(
                    "digest authentication needs a byte-backed database".to_string(),
                ))
            }
        };

        let element_size = committer.element_size();
        let mut per_row_digests = Vec::with_capacity(rows.len() * element_size);
        for (index, row) in rows.iter().enumerate() {
            let digest = committer.commit_row(row)?;
            if digest.len() != element_size {
                return Err(CoreError::InvalidArgument(format!(
                    "row {} digest has {} bytes, expected {}",
                    index,
                    digest.len(),
                    element_size
                )));
            }
            per_row_digests.extend_from_slice(&digest);
        }

        let global_digest = hash_algorithm.hasher().hash(&per_row_digests);

        Ok(AuthInfo {
            global_digest,
            per_row_digests,
            group_identifier: committer.group_identifier(),
            hash_algorithm,
            element_size,
            scalar_size: committer.scalar_size(),
        })
    }

    /// Digest of row `row`
    pub fn row_digest(&self, row: usize) -> Option<&[u8]> {
        let start = row.checked_mul(self.element_size)?;
        let end = start.checked_add(self.element_size)?;
        self.per_row_digests.get(start..end)
    }

    /// Check that the global digest commits to the stored row digests
    pub fn verify_global_digest(&self) -> bool {
        let computed = self.hash_algorithm.hasher().hash(&self.per_row_digests);
        crypto::verify_hash(&self.global_digest, &computed)
    }
}

/// Attach digest-mode authentication to a database
pub fn attach_digest(
    mut database: Database,
    committer: &dyn RowCommitter,
    hash_algorithm: HashAlgorithm,
) -> Result<Database> {
    let info = AuthInfo::build(&database, committer, hash_algorithm)?;
    info!(
        "Committed {} rows in group {}, global digest {}",
        database.layout().num_rows(),
        info.group_identifier,
        hex::encode(info.global_digest)
    );
    database.set_verification(VerificationMode::Digest(info));
    Ok(database)
}
