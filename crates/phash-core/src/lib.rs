//! Perceptual image fingerprints and comparison.
//!
//! This library computes and compares three families of image fingerprint:
//! - 64-bit robust (DCT) hashes, compared by Hamming distance
//! - Marr-wavelet byte hashes, compared by normalized Hamming distance
//! - Radial digests, compared by peak cross-correlation
//!
//! Pixel-level work is delegated to a [`HashEngine`] (libpHash with the
//! `libphash` feature). This crate owns input validation, marshalling of
//! buffers across the engine boundary, and the comparison decisions.
//!
//! The free functions below use the process-wide engine registered with
//! [`engine::install`]; use [`Fingerprinter`] to pass an engine explicitly.

// -- Standard Library --
use std::path::Path;

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use compare::{hamming_distance, hashes_similar, Fingerprinter};
pub use config::{CompareOptions, Config, DigestOptions, LogLevel, WaveletOptions};
pub use digest::Digest;
pub use engine::{CrossCorrelation, EngineKind, HashEngine, MockEngine, Verdict};
pub use error::{DigestSide, Error, Result};

// -- Public Modules --
pub mod compare;
pub mod config;
pub mod digest;
pub mod engine;
pub mod logging;
pub mod marshal;
pub mod validation;

/// 64-bit robust (DCT) hash of an image file
///
/// Readability is checked before the engine lookup, so a missing file is
/// reported as such even when no engine is installed.
pub fn imagehash<P: AsRef<Path>>(file: P) -> Result<u64> {
    validation::ensure_readable(&file)?;
    Fingerprinter::installed()?.imagehash(file)
}

/// Marr-wavelet hash of an image file
pub fn mh_imagehash<P: AsRef<Path>>(filename: P, options: &WaveletOptions) -> Result<Vec<u8>> {
    validation::ensure_readable(&filename)?;
    Fingerprinter::installed()?.mh_imagehash(filename, options)
}

/// Radial digest of an image file
pub fn image_digest<P: AsRef<Path>>(file: P, options: &DigestOptions) -> Result<Digest> {
    validation::ensure_readable(&file)?;
    Fingerprinter::installed()?.image_digest(file, options)
}

/// Normalized Hamming distance between two byte hashes
pub fn hamming_distance2<H: marshal::HostValue<u8>>(hash_a: &[H], hash_b: &[H]) -> Result<f64> {
    Fingerprinter::installed()?.hamming_distance2(hash_a, hash_b)
}

/// Peak cross-correlation of two radial digests
pub fn crosscorr(x: &Digest, y: &Digest, threshold: f64) -> Result<CrossCorrelation> {
    Fingerprinter::installed()?.crosscorr(x, y, threshold)
}

/// Peak cross-correlation between the digests of two image files
pub fn compare_images<P: AsRef<Path>, Q: AsRef<Path>>(
    file1: P,
    file2: Q,
    options: &CompareOptions,
) -> Result<f64> {
    validation::ensure_readable(&file1)?;
    validation::ensure_readable(&file2)?;
    Fingerprinter::installed()?.compare_images(file1, file2, options)
}
