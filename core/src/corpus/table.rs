//! Bucket table built from corpus records
//!
//! Every email found in a record's identity labels is hashed to a bucket and
//! the record's payload is appended there. An email is only ever assigned its
//! first payload; later records for the same email are ignored.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info};

use crate::crypto::hash_to_index;
use crate::error::{CoreError, Result};
use super::email::extract_email;
use super::reader::DecodedRecord;

/// Diagnostic counters collected while filling a bucket table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Records offered to the table
    pub records: usize,

    /// Records dropped for exceeding the payload ceiling
    pub oversized: usize,

    /// Identity labels without an extractable email
    pub labels_without_email: usize,

    /// Emails ignored because an earlier record already claimed them
    pub duplicate_emails: usize,

    /// Payloads appended to a bucket
    pub assigned: usize,

    /// Records dropped by the reader before reaching the table
    pub undecodable: usize,
}

/// Payload bytes per bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketTable {
    table_len: usize,
    buckets: BTreeMap<usize, Vec<u8>>,
    stats: IngestStats,
}

/// Bucket table length for `num_records` records
pub fn table_length_for(num_records: usize, ratio: f64) -> usize {
    ((num_records as f64 * ratio) as usize).max(1)
}

impl BucketTable {
    /// Distribute `records` over `table_len` buckets
    ///
    /// Records whose payload is strictly longer than `max_payload_bytes` are
    /// dropped whole.
    pub fn build<'a, I>(records: I, table_len: usize, max_payload_bytes: usize) -> Result<Self>
    where
        I: IntoIterator<Item = &'a DecodedRecord>,
    {
        if table_len == 0 {
            return Err(CoreError::InvalidArgument(
                "table length must be positive".to_string(),
            ));
        }

        let mut buckets: BTreeMap<usize, Vec<u8>> = BTreeMap::new();
        let mut seen_emails = HashSet::new();
        let mut stats = IngestStats::default();

        for record in records {
            stats.records += 1;
            if record.payload.len() > max_payload_bytes {
                stats.oversized += 1;
                continue;
            }

            // A record with several emails lands in several buckets
            for label in &record.ids {
                let email = match extract_email(label) {
                    Ok(email) => email,
                    Err(_) => {
                        stats.labels_without_email += 1;
                        continue;
                    }
                };
                if !seen_emails.insert(email.clone()) {
                    stats.duplicate_emails += 1;
                    continue;
                }

                let bucket = hash_to_index(&email, table_len)?;
                buckets.entry(bucket).or_default().extend_from_slice(&record.payload);
                stats.assigned += 1;
            }
        }

        debug!("{:?}", stats);
        info!(
            "Assigned {} payloads to {} of {} buckets",
            stats.assigned,
            buckets.len(),
            table_len
        );

        Ok(BucketTable {
            table_len,
            buckets,
            stats,
        })
    }

    /// Number of buckets
    pub fn table_len(&self) -> usize {
        self.table_len
    }

    /// Payload bytes of `bucket`, if any were assigned
    pub fn bucket(&self, bucket: usize) -> Option<&[u8]> {
        self.buckets.get(&bucket).map(Vec::as_slice)
    }

    /// Non-empty buckets in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.buckets.iter().map(|(&index, bytes)| (index, bytes.as_slice()))
    }

    /// Number of non-empty buckets
    pub fn occupied(&self) -> usize {
        self.buckets.len()
    }

    /// Longest bucket payload
    pub fn max_bytes(&self) -> usize {
        self.buckets.values().map(Vec::len).max().unwrap_or(0)
    }

    /// Counters collected while building
    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut IngestStats {
        &mut self.stats
    }
}
