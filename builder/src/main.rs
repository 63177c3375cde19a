use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::path::PathBuf;
use vpir_db_core::config::{CoreConfig, HashAlgorithm};
use vpir_db_core::corpus::ingest_directory;
use vpir_db_core::database::Database;
use vpir_db_core::encoder;
use vpir_db_core::merkle::random_merkle;
use vpir_db_core::utils::measure_time;

/// Kind of database to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Payload database from a corpus directory
    Corpus,
    /// Random blocks committed with a Merkle tree
    Merkle,
    /// Random byte blocks
    MultiBit,
    /// One random bit per cell
    SingleBit,
    /// Random field units
    Elements,
    /// Random identifier metadata
    Keys,
}

/// Commitment hash on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HashArg {
    Sha256,
    Blake2s,
    Keccak256,
}

impl From<HashArg> for HashAlgorithm {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Sha256 => HashAlgorithm::Sha256,
            HashArg::Blake2s => HashAlgorithm::Blake2s,
            HashArg::Keccak256 => HashAlgorithm::Keccak256,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "Verifiable PIR database builder")]
struct Args {
    /// Config file path
    #[clap(short, long, env = "VPIR_CONFIG")]
    config: Option<PathBuf>,

    /// Kind of database to build
    #[clap(short, long, value_enum, default_value_t = Mode::Corpus)]
    mode: Mode,

    /// Where to write the built database
    #[clap(short, long, env = "VPIR_OUTPUT", default_value = "database.bin")]
    output: PathBuf,

    /// Corpus directory
    #[clap(long, env = "VPIR_CORPUS_DIR")]
    corpus_dir: Option<PathBuf>,

    /// Number of rows
    #[clap(long)]
    rows: Option<usize>,

    /// Arrange blocks in a square matrix
    #[clap(long)]
    square: bool,

    /// Commitment hash algorithm
    #[clap(long, value_enum)]
    hash: Option<HashArg>,

    /// Database size in bits for random modes
    #[clap(long, default_value_t = 1 << 20)]
    bits: usize,

    /// Block size for random modes (bytes, or field units for elements)
    #[clap(long, default_value_t = 16)]
    block_size: usize,

    /// Number of identifiers for the keys mode
    #[clap(long, default_value_t = 1000)]
    identifiers: usize,

    /// Seed for reproducible random databases
    #[clap(long, env = "VPIR_SEED")]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Configuration comes first so it can set the default log filter
    let config = load_config(&args)?;

    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, config.log_level.as_str()),
    );

    let database = measure_time("Building database", || build(&args, &config))?;

    info!(
        "Built {}x{} database, block size {}, {} of {} units used",
        database.layout().num_rows(),
        database.layout().num_columns(),
        database.layout().block_size(),
        database.layout().used_capacity(),
        database.layout().capacity()
    );
    if let Some(merkle) = database.merkle_info() {
        info!("Merkle root {}", hex::encode(merkle.root));
    }

    database
        .save(&args.output)
        .with_context(|| format!("writing database to {}", args.output.display()))?;
    info!("Database written to {}", args.output.display());

    Ok(())
}

/// Load the config file, if any, and apply command-line overrides
fn load_config(args: &Args) -> Result<CoreConfig> {
    let mut config = CoreConfig::new();

    if let Some(config_path) = &args.config {
        config = CoreConfig::from_file(config_path)
            .with_context(|| format!("loading config {}", config_path.display()))?;
    }

    // Override config with command-line arguments
    if let Some(corpus_dir) = args.corpus_dir.clone() {
        config.ingest.corpus_dir = corpus_dir;
    }
    if let Some(rows) = args.rows {
        config.layout.num_rows = rows;
    }
    if args.square {
        config.layout.square_matrix = true;
    }
    if let Some(hash) = args.hash {
        config.merkle.hash_algorithm = hash.into();
    }
    config.validate()?;

    Ok(config)
}

fn seeded_rng(seed: Option<u64>) -> ChaCha20Rng {
    match seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    }
}

fn build(args: &Args, config: &CoreConfig) -> Result<Database> {
    let rows = config.layout.num_rows;
    if args.mode != Mode::Corpus && config.layout.square_matrix {
        bail!("--square only applies to corpus databases");
    }

    let database = match args.mode {
        Mode::Corpus => {
            let (database, stats) = ingest_directory(config)?;
            info!("Ingestion stats: {:?}", stats);
            database
        }
        Mode::Merkle => random_merkle(
            &mut seeded_rng(args.seed),
            args.bits,
            rows,
            args.block_size,
            config.merkle.hash_algorithm,
        )?,
        Mode::MultiBit => {
            encoder::random_multi_bit(&mut seeded_rng(args.seed), args.bits, rows, args.block_size)?
        }
        Mode::SingleBit => encoder::random_single_bit(&mut seeded_rng(args.seed), args.bits, rows)?,
        Mode::Elements => {
            encoder::random_elements(&mut seeded_rng(args.seed), args.bits, rows, args.block_size)?
        }
        Mode::Keys => encoder::random_keys(&mut seeded_rng(args.seed), args.identifiers)?,
    };
    Ok(database)
}
