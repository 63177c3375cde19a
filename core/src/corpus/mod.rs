//! Corpus ingestion
//!
//! Turns a directory of identity/payload records into a payload database:
//! records are read and decoded, their emails hashed into buckets, and the
//! buckets embedded cell by cell.

pub mod email;
pub mod payload;
pub mod reader;
pub mod table;

pub use email::extract_email;
pub use payload::{build_payload_database, extract_bucket_payload, ingest_directory};
pub use reader::{read_corpus, read_corpus_dir, CorpusContents, CorpusRecord, DecodedRecord};
pub use table::{table_length_for, BucketTable, IngestStats};
