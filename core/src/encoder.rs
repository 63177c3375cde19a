//! Multi-granularity database encoders
//!
//! Fills a freshly sized grid with single bits, byte blocks, field units or
//! identifier metadata. Randomness always comes from the caller, so a seeded
//! generator reproduces a database exactly. A randomness failure aborts the
//! build; no partially filled database is ever returned.

use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use rand::distributions::Alphanumeric;
use rand::{CryptoRng, Rng, RngCore};

use crate::config::FIELD_ELEMENT_BYTES;
use crate::database::{
    Database, FieldElement, KeyInfo, PublicKeyAlgorithm, Records, VerificationMode,
};
use crate::error::{to_randomness_error, CoreError, Result};
use crate::layout::GridLayout;

/// Bits per field unit
const FIELD_ELEMENT_BITS: usize = 8 * FIELD_ELEMENT_BYTES;

/// Units per identifier in a keys database
const KEY_ENTRY_LENGTH: usize = 2;

/// Characters in a random identifier
const RANDOM_IDENTIFIER_LENGTH: usize = 32;

fn require_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(CoreError::InvalidArgument(format!("{} must be positive", name)));
    }
    Ok(())
}

/// Tiny databases still get one column
fn at_least_one_column(columns: usize) -> usize {
    columns.max(1)
}

/// All-zero byte database; every block length starts at zero
pub fn zeroed(num_rows: usize, num_columns: usize, block_size: usize) -> Result<Database> {
    require_positive("number of rows", num_rows)?;

    let rows = vec![vec![0u8; num_columns * block_size]; num_rows];
    let layout = GridLayout::new(num_rows, num_columns, block_size);
    Database::new(layout, Records::Bytes(rows), VerificationMode::None)
}

/// Random byte blocks, `total_bits / (128 * rows * block_size)` columns
pub fn random_multi_bit<R: RngCore + CryptoRng>(
    rng: &mut R,
    total_bits: usize,
    num_rows: usize,
    block_size: usize,
) -> Result<Database> {
    require_positive("number of rows", num_rows)?;
    require_positive("block size", block_size)?;

    let num_columns = at_least_one_column(total_bits / (FIELD_ELEMENT_BITS * num_rows * block_size));
    let mut rows = Vec::with_capacity(num_rows);
    for _ in 0..num_rows {
        let mut row = vec![0u8; num_columns * block_size];
        rng.try_fill_bytes(&mut row).map_err(to_randomness_error)?;
        rows.push(row);
    }
    debug!("Filled {}x{} multi-bit grid, block size {}", num_rows, num_columns, block_size);

    let layout = GridLayout::with_uniform_lengths(num_rows, num_columns, block_size);
    Database::new(layout, Records::Bytes(rows), VerificationMode::None)
}

/// One random bit per cell, stored as a `0`/`1` byte
///
/// Each bit costs one full random byte; only its most significant bit is kept.
pub fn random_single_bit<R: RngCore + CryptoRng>(
    rng: &mut R,
    total_bits: usize,
    num_rows: usize,
) -> Result<Database> {
    require_positive("number of rows", num_rows)?;

    let num_columns = at_least_one_column(total_bits / num_rows);
    let mut rows = Vec::with_capacity(num_rows);
    for _ in 0..num_rows {
        let mut row = Vec::with_capacity(num_columns);
        for _ in 0..num_columns {
            let mut byte = [0u8; 1];
            rng.try_fill_bytes(&mut byte).map_err(to_randomness_error)?;
            row.push(byte[0] >> 7);
        }
        rows.push(row);
    }
    debug!("Filled {}x{} single-bit grid", num_rows, num_columns);

    let layout = GridLayout::with_uniform_lengths(num_rows, num_columns, 1);
    Database::new(layout, Records::Bytes(rows), VerificationMode::None)
}

/// Random field units, `total_bits / (128 * rows * block_size)` columns
pub fn random_elements<R: RngCore + CryptoRng>(
    rng: &mut R,
    total_bits: usize,
    num_rows: usize,
    block_size: usize,
) -> Result<Database> {
    require_positive("number of rows", num_rows)?;
    require_positive("block size", block_size)?;

    let num_columns = at_least_one_column(total_bits / (FIELD_ELEMENT_BITS * num_rows * block_size));
    let count = num_rows * num_columns * block_size;

    let mut bytes = vec![0u8; count * FIELD_ELEMENT_BYTES];
    rng.try_fill_bytes(&mut bytes).map_err(to_randomness_error)?;
    let elements: Vec<FieldElement> = bytes
        .chunks_exact(FIELD_ELEMENT_BYTES)
        .map(|chunk| {
            let mut element = [0u8; FIELD_ELEMENT_BYTES];
            element.copy_from_slice(chunk);
            element
        })
        .collect();
    debug!("Filled {}x{} element grid, block size {}", num_rows, num_columns, block_size);

    let layout = GridLayout::with_uniform_lengths(num_rows, num_columns, block_size);
    Database::new(layout, Records::Elements(elements), VerificationMode::None)
}

/// Keys database of random identifier metadata
pub fn random_keys<R: RngCore + CryptoRng>(rng: &mut R, num_identifiers: usize) -> Result<Database> {
    require_positive("number of identifiers", num_identifiers)?;

    let keys = (0..num_identifiers)
        .map(|_| random_key(rng))
        .collect::<Result<Vec<_>>>()?;

    let layout = GridLayout::with_uniform_lengths(1, num_identifiers, KEY_ENTRY_LENGTH);
    Database::new(layout, Records::Keys(keys), VerificationMode::None)
}

fn random_key<R: RngCore + CryptoRng>(rng: &mut R) -> Result<KeyInfo> {
    let user_id: String = (0..RANDOM_IDENTIFIER_LENGTH)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    let algorithm = PublicKeyAlgorithm::ALL[rng.gen_range(0..PublicKeyAlgorithm::ALL.len())];

    Ok(KeyInfo {
        user_id,
        creation_time: random_date(rng)?,
        pub_key_algorithm: algorithm,
    })
}

/// Uniform timestamp in [1970-01-01, 2070-01-01)
fn random_date<R: RngCore>(rng: &mut R) -> Result<DateTime<Utc>> {
    let min = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).single();
    let max = Utc.with_ymd_and_hms(2070, 1, 1, 0, 0, 0).single();
    let (min, max) = min.zip(max).ok_or_else(|| {
        CoreError::InvalidArgument("creation date range is not representable".to_string())
    })?;

    let seconds = rng.gen_range(min.timestamp()..max.timestamp());
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| CoreError::InvalidArgument(format!("timestamp {} out of range", seconds)))
}
