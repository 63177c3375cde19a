//! Payload database embedding
//!
//! Bucket payloads are cut into `chunk_bytes` pieces and each piece is stored
//! left-aligned in its own 16-byte field unit, so that every unit stays below
//! the field modulus of the external arithmetic library.

use log::info;

use crate::config::{CoreConfig, LayoutConfig, FIELD_ELEMENT_BYTES};
use crate::database::Database;
use crate::encoder;
use crate::error::{CoreError, Result};
use crate::layout::compute_rows_and_columns;
use crate::utils::measure_time;
use super::reader::read_corpus_dir;
use super::table::{table_length_for, BucketTable, IngestStats};

fn check_chunk_bytes(chunk_bytes: usize) -> Result<()> {
    if chunk_bytes == 0 || chunk_bytes > FIELD_ELEMENT_BYTES {
        return Err(CoreError::InvalidArgument(format!(
            "chunk size must be in 1..={}, got {}",
            FIELD_ELEMENT_BYTES, chunk_bytes
        )));
    }
    Ok(())
}

fn grid_for(table_len: usize, layout: &LayoutConfig) -> Result<(usize, usize)> {
    if layout.square_matrix {
        return Ok(compute_rows_and_columns(table_len, true));
    }
    if layout.num_rows == 0 {
        return Err(CoreError::InvalidArgument("number of rows must be positive".to_string()));
    }
    Ok((layout.num_rows, (table_len + layout.num_rows - 1) / layout.num_rows))
}

/// Embed a bucket table into a zero-initialized byte database
///
/// Every cell is `ceil(max_bytes / chunk_bytes)` field units wide. Bucket `k`
/// lives in cell `(k / columns, k % columns)` and its block length is the
/// bucket's payload length in bytes.
pub fn build_payload_database(
    table: &BucketTable,
    layout: &LayoutConfig,
    chunk_bytes: usize,
) -> Result<Database> {
    check_chunk_bytes(chunk_bytes)?;

    let block_units = ((table.max_bytes() + chunk_bytes - 1) / chunk_bytes).max(1);
    let (num_rows, num_columns) = grid_for(table.table_len(), layout)?;
    let mut database = encoder::zeroed(num_rows, num_columns, block_units * FIELD_ELEMENT_BYTES)?;

    for (bucket, payload) in table.iter() {
        let (row, column) = database.layout().position(bucket)?;
        let cell = database.cell_mut(row, column)?;
        for (unit, chunk) in cell
            .chunks_exact_mut(FIELD_ELEMENT_BYTES)
            .zip(payload.chunks(chunk_bytes))
        {
            unit[..chunk.len()].copy_from_slice(chunk);
        }
        database.layout_mut().set_block_length(bucket, payload.len())?;
    }

    info!(
        "Embedded {} buckets in a {}x{} grid of {}-unit blocks",
        table.occupied(),
        num_rows,
        num_columns,
        block_units
    );
    Ok(database)
}

/// Reassemble the payload bytes stored for `bucket`
pub fn extract_bucket_payload(database: &Database, bucket: usize, chunk_bytes: usize) -> Result<Vec<u8>> {
    check_chunk_bytes(chunk_bytes)?;

    let (row, column) = database.layout().position(bucket)?;
    let length = database.layout().block_length(bucket).unwrap_or_default();
    let cell = database.cell(row, column)?;

    let mut payload = Vec::with_capacity(length);
    for unit in cell.chunks_exact(FIELD_ELEMENT_BYTES) {
        let remaining = length - payload.len();
        if remaining == 0 {
            break;
        }
        payload.extend_from_slice(&unit[..remaining.min(chunk_bytes)]);
    }

    if payload.len() != length {
        return Err(CoreError::InvalidLayout(format!(
            "bucket {} records {} bytes but its cell holds {}",
            bucket,
            length,
            payload.len()
        )));
    }
    Ok(payload)
}

/// Build the payload database for the corpus directory named in `config`
pub fn ingest_directory(config: &CoreConfig) -> Result<(Database, IngestStats)> {
    let ingest = &config.ingest;
    let contents = measure_time("Reading corpus", || read_corpus_dir(&ingest.corpus_dir))?;
    info!(
        "Read {} records from {} ({} undecodable)",
        contents.records.len(),
        ingest.corpus_dir.display(),
        contents.skipped
    );

    let table_len = table_length_for(contents.records.len(), ingest.table_length_ratio);
    let mut table = BucketTable::build(&contents.records, table_len, ingest.max_payload_bytes)?;
    table.stats_mut().undecodable = contents.skipped;

    let database = measure_time("Embedding payloads", || {
        build_payload_database(&table, &config.layout, ingest.chunk_bytes)
    })?;
    Ok((database, *table.stats()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::reader::DecodedRecord;
    use crate::crypto::hash_to_index;
    use std::fs;
    use tempfile::tempdir;

    fn record(id: &str, payload: &[u8]) -> DecodedRecord {
        DecodedRecord {
            ids: vec![id.to_string()],
            payload: payload.to_vec(),
            timestamp: 0,
        }
    }

    fn single_row() -> LayoutConfig {
        LayoutConfig::default()
    }

    #[test]
    fn test_chunks_are_left_aligned_in_units() {
        let payload: Vec<u8> = (1..=20).collect();
        let table = BucketTable::build(&[record("A <a@example.org>", &payload)], 1, 1024).unwrap();
        let db = build_payload_database(&table, &single_row(), 15).unwrap();

        assert_eq!(db.layout().block_size(), 32);
        assert_eq!(db.layout().block_length(0), Some(20));

        let cell = db.cell(0, 0).unwrap();
        assert_eq!(&cell[..15], &payload[..15]);
        assert_eq!(cell[15], 0);
        assert_eq!(&cell[16..21], &payload[15..]);
        assert!(cell[21..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reference_corpus_database() {
        let records = vec![
            record("Alice <alice@x.com>", &[0xDE, 0xAD, 0xBE, 0xEF]),
            record("no email here", &[0x00]),
            record("Alice2 <alice@x.com>", &[0xFF, 0xFF]),
        ];
        let table = BucketTable::build(&records, 10, 16384).unwrap();
        let db = build_payload_database(&table, &single_row(), 15).unwrap();
        let bucket = hash_to_index("alice@x.com", 10).unwrap();

        assert_eq!((db.layout().num_rows(), db.layout().num_columns()), (1, 10));
        assert_eq!(db.layout().block_size(), FIELD_ELEMENT_BYTES);
        assert_eq!(db.layout().used_capacity(), 4);
        assert_eq!(extract_bucket_payload(&db, bucket, 15).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);

        for other in (0..10).filter(|&k| k != bucket) {
            assert!(extract_bucket_payload(&db, other, 15).unwrap().is_empty());
            let (row, column) = db.layout().position(other).unwrap();
            assert!(db.cell(row, column).unwrap().iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_square_layout_and_round_trip() {
        let records: Vec<DecodedRecord> = (0..40)
            .map(|i| record(&format!("User {} <user{}@example.org>", i, i), &vec![i as u8 + 1; i % 37 + 1]))
            .collect();
        let table = BucketTable::build(&records, 10, 1024).unwrap();
        let layout = LayoutConfig {
            num_rows: 1,
            square_matrix: true,
        };
        let db = build_payload_database(&table, &layout, 7).unwrap();

        assert_eq!((db.layout().num_rows(), db.layout().num_columns()), (4, 4));
        assert_eq!(db.layout().block_size(), ((table.max_bytes() + 6) / 7) * FIELD_ELEMENT_BYTES);
        for (bucket, payload) in table.iter() {
            assert_eq!(extract_bucket_payload(&db, bucket, 7).unwrap(), payload);
        }
    }

    #[test]
    fn test_multi_row_layout() {
        let table = BucketTable::build(&[record("A <a@example.org>", b"x")], 10, 1024).unwrap();
        let layout = LayoutConfig {
            num_rows: 3,
            square_matrix: false,
        };
        let db = build_payload_database(&table, &layout, 15).unwrap();

        assert_eq!((db.layout().num_rows(), db.layout().num_columns()), (3, 4));
    }

    #[test]
    fn test_empty_table_gets_one_unit() {
        let table = BucketTable::build(&[record("nobody", b"x")], 4, 1024).unwrap();
        let db = build_payload_database(&table, &single_row(), 15).unwrap();

        assert_eq!(db.layout().block_size(), FIELD_ELEMENT_BYTES);
        assert_eq!(db.layout().used_capacity(), 0);
    }

    #[test]
    fn test_chunk_size_bounds() {
        let table = BucketTable::build(&[record("A <a@example.org>", b"x")], 1, 1024).unwrap();

        assert!(matches!(
            build_payload_database(&table, &single_row(), 0),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(build_payload_database(&table, &single_row(), 17).is_err());
        assert!(build_payload_database(&table, &single_row(), 16).is_ok());
    }

    #[test]
    fn test_ingest_directory() {
        let dir = tempdir().unwrap();
        let shard = concat!(
            r#"{"id": ["Alice <alice@x.com>"], "packet": "deadbeef", "timestamp": 1}"#,
            "\n",
            r#"{"id": ["no email here"], "packet": "00", "timestamp": 2}"#,
            "\n",
            r#"{"id": ["Alice2 <alice@x.com>"], "packet": "ffff", "timestamp": 3}"#,
            "\n",
            r#"{"id": ["Broken <broken@x.com>"], "packet": "not hex", "timestamp": 4}"#,
            "\n",
        );
        fs::write(dir.path().join("shard-000.json"), shard).unwrap();

        let mut config = CoreConfig::default();
        config.ingest.corpus_dir = dir.path().to_path_buf();
        config.ingest.table_length_ratio = 4.0;

        let (db, stats) = ingest_directory(&config).unwrap();
        let bucket = hash_to_index("alice@x.com", 12).unwrap();

        assert_eq!(db.layout().num_blocks(), 12);
        assert_eq!(stats.records, 3);
        assert_eq!(stats.undecodable, 1);
        assert_eq!(stats.assigned, 1);
        assert_eq!(extract_bucket_payload(&db, bucket, 15).unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_ingest_corrupt_corpus_fails() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("shard.json"), "{not json\n").unwrap();

        let mut config = CoreConfig::default();
        config.ingest.corpus_dir = dir.path().to_path_buf();

        assert!(matches!(ingest_directory(&config), Err(CoreError::CorpusFormatError(_))));
    }
}
