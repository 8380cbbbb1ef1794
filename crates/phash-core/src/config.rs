use crate::engine::EngineKind;
use crate::error::{Error, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters for the Marr-wavelet hash
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaveletOptions {
    /// Scale factor of the Marr wavelet
    pub alpha: f32,

    /// Level of the wavelet
    pub lvl: f32,
}

impl Default for WaveletOptions {
    fn default() -> Self {
        Self {
            alpha: 2.0,
            lvl: 1.0,
        }
    }
}

/// Parameters for the radial digest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DigestOptions {
    /// Deviation of the gaussian filter
    pub sigma: f64,

    /// Gamma correction
    pub gamma: f64,

    /// Number of angular samples
    pub n: u32,
}

impl Default for DigestOptions {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            gamma: 1.0,
            n: 180,
        }
    }
}

/// Parameters for a whole-image comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareOptions {
    /// Deviation of the gaussian filter
    pub sigma: f64,

    /// Gamma correction
    pub gamma: f64,

    /// Number of angular samples
    pub n: u32,

    /// Peak cross-correlation at or above which images are the same
    pub threshold: f64,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            sigma: 3.5,
            gamma: 1.0,
            n: 180,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Default cross-correlation threshold
pub const DEFAULT_THRESHOLD: f64 = 0.90;

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

/// Defaults for every hashing and comparison operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Wavelet hash parameters
    pub wavelet: WaveletOptions,

    /// Radial digest parameters
    pub digest: DigestOptions,

    /// Whole-image comparison parameters
    pub compare: CompareOptions,

    /// Threshold for comparing two digests
    pub crosscorr_threshold: f64,

    /// Largest Hamming distance at which two 64-bit hashes are similar
    pub max_hamming_distance: u32,

    /// Which hash engine to use
    pub engine: EngineKind,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wavelet: WaveletOptions::default(),
            digest: DigestOptions::default(),
            compare: CompareOptions::default(),
            crosscorr_threshold: DEFAULT_THRESHOLD,
            max_hamming_distance: 10,
            engine: EngineKind::Native,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.digest.n == 0 || self.compare.n == 0 {
            return Err(Error::Configuration(
                "Number of angular samples must be positive".to_string(),
            ));
        }

        if !self.crosscorr_threshold.is_finite() || !self.compare.threshold.is_finite() {
            return Err(Error::Configuration(
                "Cross-correlation thresholds must be finite".to_string(),
            ));
        }

        if self.max_hamming_distance > 64 {
            return Err(Error::Configuration(
                "Hamming distance threshold must be between 0 and 64".to_string(),
            ));
        }

        Ok(())
    }
}
