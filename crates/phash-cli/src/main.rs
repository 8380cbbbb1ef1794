use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};
use phash_core::config::LogLevel;
use phash_core::engine::{self, EngineKind};
use phash_core::logging::{self, LOG_ENV};
use phash_core::{
    hamming_distance, hashes_similar, Config, CrossCorrelation, Fingerprinter, Verdict,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "phash")]
#[command(about = "Compute and compare perceptual image hashes")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use the deterministic mock engine instead of libpHash (for testing)
    #[arg(long, global = true)]
    mock: bool,

    /// Write a rotating log file to this directory instead of stderr
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the 64-bit DCT hash of an image
    Hash {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the Marr-wavelet hash of an image as hex
    Wavelet {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Wavelet scale
        #[arg(long)]
        alpha: Option<f32>,

        /// Wavelet level
        #[arg(long)]
        lvl: Option<f32>,
    },

    /// Print the radial digest of an image
    Digest {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Gaussian blur deviation
        #[arg(long)]
        sigma: Option<f64>,

        /// Gamma correction
        #[arg(long)]
        gamma: Option<f64>,

        /// Number of projection angles
        #[arg(long)]
        angles: Option<u32>,
    },

    /// Hamming distance between two 64-bit hashes given in hex
    Distance {
        hash1: String,
        hash2: String,

        /// Largest distance still reported as similar
        #[arg(long)]
        max_distance: Option<u32>,
    },

    /// Normalized Hamming distance between two byte hashes
    ///
    /// Each hash is a hex string ("a1ff03") or comma-separated integers
    /// ("161,255,3"); integers are truncated to bytes.
    Distance2 { a: String, b: String },

    /// Compare two images by radial digest cross-correlation
    Compare {
        #[arg(value_name = "FILE1")]
        file1: PathBuf,

        #[arg(value_name = "FILE2")]
        file2: PathBuf,

        /// Gaussian blur deviation
        #[arg(long)]
        sigma: Option<f64>,

        /// Gamma correction
        #[arg(long)]
        gamma: Option<f64>,

        /// Number of projection angles
        #[arg(long)]
        angles: Option<u32>,

        /// Minimum peak cross-correlation for a match
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Digest two images and cross-correlate the digests
    Crosscorr {
        #[arg(value_name = "FILE1")]
        file1: PathBuf,

        #[arg(value_name = "FILE2")]
        file2: PathBuf,

        /// Gaussian blur deviation
        #[arg(long)]
        sigma: Option<f64>,

        /// Gamma correction
        #[arg(long)]
        gamma: Option<f64>,

        /// Number of projection angles
        #[arg(long)]
        angles: Option<u32>,

        /// Minimum peak cross-correlation for a match
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "phash.json")]
        path: PathBuf,
    },
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        Config::default()
    };

    config.log_level = match cli.verbose {
        0 => config.log_level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    if cli.mock {
        config.engine = EngineKind::Mock;
    }
    config.validate()?;

    init_logging(cli.log_dir.as_deref(), config.log_level.to_level_filter())?;

    match cli.command {
        Commands::Hash { file } => {
            let hash = fingerprinter(&config)?.imagehash(&file)?;
            println!("{:016x}", hash);
        }

        Commands::Wavelet { file, alpha, lvl } => {
            let mut options = config.wavelet;
            options.alpha = alpha.unwrap_or(options.alpha);
            options.lvl = lvl.unwrap_or(options.lvl);

            let hash = fingerprinter(&config)?.mh_imagehash(&file, &options)?;
            println!("{}", hex::encode(hash));
        }

        Commands::Digest {
            file,
            sigma,
            gamma,
            angles,
        } => {
            let mut options = config.digest;
            options.sigma = sigma.unwrap_or(options.sigma);
            options.gamma = gamma.unwrap_or(options.gamma);
            options.n = angles.unwrap_or(options.n);

            let digest = fingerprinter(&config)?.image_digest(&file, &options)?;
            let coeffs = digest
                .coeffs()
                .unwrap_or_default()
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(",");
            println!("size: {}", digest.size());
            println!("coeffs: {}", coeffs);
        }

        Commands::Distance {
            hash1,
            hash2,
            max_distance,
        } => {
            let (a, b) = (parse_hash64(&hash1)?, parse_hash64(&hash2)?);
            let max_distance = max_distance.unwrap_or(config.max_hamming_distance);
            let distance = hamming_distance(a, b);
            debug!("distance {:016x} {:016x}: {}", a, b, distance);

            let verdict = if hashes_similar(a, b, max_distance) {
                "similar"
            } else {
                "different"
            };
            println!("distance: {}", distance);
            println!("verdict: {}", verdict);
        }

        Commands::Distance2 { a, b } => {
            let (a, b) = (parse_bytes(&a)?, parse_bytes(&b)?);
            let distance = fingerprinter(&config)?.hamming_distance2(&a, &b)?;
            println!("{:.6}", distance);
        }

        Commands::Compare {
            file1,
            file2,
            sigma,
            gamma,
            angles,
            threshold,
        } => {
            let mut options = config.compare;
            options.sigma = sigma.unwrap_or(options.sigma);
            options.gamma = gamma.unwrap_or(options.gamma);
            options.n = angles.unwrap_or(options.n);
            options.threshold = threshold.unwrap_or(options.threshold);

            let result = fingerprinter(&config)?.compare_images_detailed(&file1, &file2, &options)?;
            print_correlation(&result);
        }

        Commands::Crosscorr {
            file1,
            file2,
            sigma,
            gamma,
            angles,
            threshold,
        } => {
            let mut options = config.digest;
            options.sigma = sigma.unwrap_or(options.sigma);
            options.gamma = gamma.unwrap_or(options.gamma);
            options.n = angles.unwrap_or(options.n);
            let threshold = threshold.unwrap_or(config.crosscorr_threshold);

            let fingerprinter = fingerprinter(&config)?;
            let x = fingerprinter.image_digest(&file1, &options)?;
            let y = fingerprinter.image_digest(&file2, &options)?;
            let result = fingerprinter.crosscorr(&x, &y, threshold)?;
            print_correlation(&result);
        }

        Commands::GenerateConfig { path } => {
            Config::default().save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
        }
    }

    Ok(())
}

fn init_logging(log_dir: Option<&Path>, level: LevelFilter) -> anyhow::Result<()> {
    match log_dir {
        Some(dir) => logging::init_logger(dir, level)
            .map_err(|e| anyhow!("Failed to initialize logging in {}: {}", dir.display(), e)),
        None => {
            env_logger::Builder::new()
                .filter_level(level)
                .parse_env(LOG_ENV)
                .init();
            Ok(())
        }
    }
}

fn print_correlation(result: &CrossCorrelation) {
    let verdict = match result.verdict {
        Verdict::Same => "same",
        Verdict::Different => "different",
    };
    println!("pcc: {:.6}", result.pcc);
    println!("verdict: {}", verdict);
}

/// Create and install the configured engine
fn fingerprinter(config: &Config) -> anyhow::Result<Fingerprinter> {
    let engine = engine::create(config.engine)?;
    engine::install(engine.clone())?;
    info!("Using hash engine '{}'", engine.name());
    Ok(Fingerprinter::new(engine))
}

/// Parse a 64-bit hash written in hex, with or without `0x`
fn parse_hash64(text: &str) -> anyhow::Result<u64> {
    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
    u64::from_str_radix(digits, 16).with_context(|| format!("Invalid 64-bit hex hash '{}'", text))
}

/// Parse a byte hash: hex, or comma-separated integers when a comma is present
fn parse_bytes(text: &str) -> anyhow::Result<Vec<i64>> {
    if text.contains(',') {
        return text
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<i64>()
                    .with_context(|| format!("Invalid integer '{}' in '{}'", part, text))
            })
            .collect();
    }

    let bytes = hex::decode(text).with_context(|| format!("Invalid hex byte string '{}'", text))?;
    if bytes.is_empty() {
        bail!("Empty byte hash");
    }
    Ok(bytes.into_iter().map(i64::from).collect())
}
