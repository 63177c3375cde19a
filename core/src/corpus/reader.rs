//! Corpus shard reader
//!
//! Shards are newline-delimited JSON, one record per line:
//! `{"id": ["Name <mail@host.tld>"], "packet": "<hex>", "timestamp": 1600000000}`.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Serialize, Deserialize};

use crate::error::{CoreError, Result};

/// One record as it appears in a shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Identity labels
    pub id: Vec<String>,

    /// Hex-encoded payload
    pub packet: String,

    /// Record timestamp
    pub timestamp: i64,
}

/// A record with its payload decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    /// Identity labels
    pub ids: Vec<String>,

    /// Raw payload bytes
    pub payload: Vec<u8>,

    /// Record timestamp
    pub timestamp: i64,
}

impl TryFrom<CorpusRecord> for DecodedRecord {
    type Error = CoreError;

    fn try_from(record: CorpusRecord) -> Result<Self> {
        Ok(DecodedRecord {
            payload: hex::decode(&record.packet)?,
            ids: record.id,
            timestamp: record.timestamp,
        })
    }
}

/// Records read from a corpus, with the number skipped along the way
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusContents {
    /// Successfully decoded records, in corpus order
    pub records: Vec<DecodedRecord>,

    /// Records dropped because they could not be decoded
    pub skipped: usize,
}

impl CorpusContents {
    fn absorb(&mut self, other: CorpusContents) {
        self.records.extend(other.records);
        self.skipped += other.skipped;
    }
}

/// Read one shard
///
/// A line that is not JSON at all means the stream is corrupt and fails the
/// whole read. A JSON value that is not a record, or a record whose packet is
/// not hex, is skipped.
pub fn read_corpus<R: Read>(reader: R, source: &str) -> Result<CorpusContents> {
    let mut contents = CorpusContents::default();

    for (number, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let value: serde_json::Value = serde_json::from_str(&line).map_err(|e| {
            CoreError::CorpusFormatError(format!("{} line {}: {}", source, number + 1, e))
        })?;

        let decoded = serde_json::from_value::<CorpusRecord>(value)
            .map_err(CoreError::from)
            .and_then(DecodedRecord::try_from);
        match decoded {
            Ok(record) => contents.records.push(record),
            Err(e) => {
                warn!("Skipping record at {} line {}: {}", source, number + 1, e);
                contents.skipped += 1;
            }
        }
    }

    Ok(contents)
}

/// Read every shard in `dir`, in file-name order
pub fn read_corpus_dir<P: AsRef<Path>>(dir: P) -> Result<CorpusContents> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    paths.retain(|path| path.is_file());
    paths.sort();

    let mut contents = CorpusContents::default();
    for path in paths {
        let file = File::open(&path)?;
        let shard = read_corpus(file, &path.display().to_string())?;
        debug!(
            "Read {} records ({} skipped) from {}",
            shard.records.len(),
            shard.skipped,
            path.display()
        );
        contents.absorb(shard);
    }

    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_records() {
        let shard = concat!(
            r#"{"id": ["Alice <alice@x.com>"], "packet": "deadbeef", "timestamp": 10}"#,
            "\n\n",
            r#"{"id": [], "packet": "", "timestamp": 11}"#,
            "\n",
        );
        let contents = read_corpus(shard.as_bytes(), "shard").unwrap();

        assert_eq!(contents.skipped, 0);
        assert_eq!(contents.records.len(), 2);
        assert_eq!(contents.records[0].payload, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(contents.records[0].ids, vec!["Alice <alice@x.com>".to_string()]);
        assert_eq!(contents.records[1].timestamp, 11);
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let shard = concat!(
            r#"{"id": ["a <a@b.cd>"], "packet": "zz", "timestamp": 1}"#,
            "\n",
            r#"{"id": "not a list", "packet": "00", "timestamp": 2}"#,
            "\n",
            r#"{"id": ["b <b@b.cd>"], "packet": "00", "timestamp": 3}"#,
            "\n",
        );
        let contents = read_corpus(shard.as_bytes(), "shard").unwrap();

        assert_eq!(contents.skipped, 2);
        assert_eq!(contents.records.len(), 1);
        assert_eq!(contents.records[0].timestamp, 3);
    }

    #[test]
    fn test_corrupt_stream_fails() {
        let shard = concat!(
            r#"{"id": ["a <a@b.cd>"], "packet": "00", "timestamp": 1}"#,
            "\n",
            r#"{"id": ["a <a@b.cd>"], "packet": "#,
            "\n",
        );
        assert!(matches!(
            read_corpus(shard.as_bytes(), "shard"),
            Err(CoreError::CorpusFormatError(_))
        ));
    }

    #[test]
    fn test_read_dir_in_name_order() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{"id": [], "packet": "02", "timestamp": 2}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{"id": [], "packet": "01", "timestamp": 1}"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let contents = read_corpus_dir(dir.path()).unwrap();
        let payloads: Vec<Vec<u8>> = contents.records.into_iter().map(|r| r.payload).collect();

        assert_eq!(payloads, vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_missing_dir_is_io_error() {
        assert!(matches!(
            read_corpus_dir("/nonexistent/vpir-corpus"),
            Err(CoreError::IoError(_))
        ));
    }
}
