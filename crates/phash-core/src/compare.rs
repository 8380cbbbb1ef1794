//! # Comparison Engine
//!
//! Hashing and comparison operations over a [`HashEngine`].
//!
//! Every operation follows the same steps: validate inputs (file readability,
//! digest well-formedness), marshal them into native buffers, make exactly
//! one engine call, and convert the result back. Buffers are released when
//! they go out of scope, on success and on every error path.
//!
//! ## Interpreting results
//!
//! - 64-bit hashes: Hamming distance in `[0, 64]`. Roughly 0-3 is the same
//!   image, 4-10 a similar one, more is a different one.
//! - Wavelet hashes: normalized Hamming distance in `[0.0, 1.0]`.
//! - Radial digests: peak cross-correlation (pcc); images are the same when
//!   the pcc reaches the threshold (0.90 by default).

use std::os::raw::c_int;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::config::{CompareOptions, DigestOptions, WaveletOptions};
use crate::digest::Digest;
use crate::engine::{self, CrossCorrelation, EngineFailure, HashEngine};
use crate::error::{DigestSide, Error, Result};
use crate::logging::log_engine_failure;
use crate::marshal::{c_path, HostValue, NativeBuffer};
use crate::validation::{ensure_readable, ensure_well_formed};

/// Hamming distance between two 64-bit hashes, in `[0, 64]`
pub fn hamming_distance(hash1: u64, hash2: u64) -> u32 {
    (hash1 ^ hash2).count_ones()
}

/// Whether two 64-bit hashes are within `max_distance` bits of each other
pub fn hashes_similar(hash1: u64, hash2: u64, max_distance: u32) -> bool {
    hamming_distance(hash1, hash2) <= max_distance
}

fn angles(n: u32) -> Result<c_int> {
    if n == 0 {
        return Err(Error::invalid_argument("N", "number of angles must be positive"));
    }
    c_int::try_from(n).map_err(|_| {
        Error::invalid_argument("N", format!("{} angles exceeds the engine limit", n))
    })
}

/// Entry point for hashing and comparing images
#[derive(Clone)]
pub struct Fingerprinter {
    engine: Arc<dyn HashEngine>,
}

impl std::fmt::Debug for Fingerprinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fingerprinter")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl Fingerprinter {
    /// Create a fingerprinter over the given engine
    pub fn new(engine: Arc<dyn HashEngine>) -> Self {
        Self { engine }
    }

    /// Create a fingerprinter over the process-wide engine
    pub fn installed() -> Result<Self> {
        Ok(Self::new(engine::installed()?))
    }

    pub fn engine(&self) -> &dyn HashEngine {
        self.engine.as_ref()
    }

    fn failed(&self, operation: &'static str, failure: EngineFailure) -> Error {
        log_engine_failure(self.engine.name(), operation, failure.status, &failure.detail);
        Error::library(operation, failure.to_string())
    }

    /// 64-bit robust (DCT) hash of an image file
    pub fn imagehash<P: AsRef<Path>>(&self, file: P) -> Result<u64> {
        let file = file.as_ref();
        ensure_readable(file)?;
        let c_file = c_path(file, "file")?;

        debug!("imagehash: {}", file.display());
        self.engine
            .dct_hash(&c_file)
            .map_err(|f| self.failed("imagehash", f))
    }

    /// Marr-wavelet hash of an image file; the engine decides the length
    pub fn mh_imagehash<P: AsRef<Path>>(&self, file: P, options: &WaveletOptions) -> Result<Vec<u8>> {
        let file = file.as_ref();
        ensure_readable(file)?;
        let c_file = c_path(file, "filename")?;

        debug!(
            "mh_imagehash: {} (alpha={}, lvl={})",
            file.display(),
            options.alpha,
            options.lvl
        );
        let hash = self
            .engine
            .mh_hash(&c_file, options.alpha, options.lvl)
            .map_err(|f| self.failed("mh_imagehash", f))?;

        Ok(hash.to_host())
    }

    /// Radial digest of an image file
    pub fn image_digest<P: AsRef<Path>>(&self, file: P, options: &DigestOptions) -> Result<Digest> {
        let file = file.as_ref();
        ensure_readable(file)?;
        let n = angles(options.n)?;
        let c_file = c_path(file, "file")?;

        debug!(
            "image_digest: {} (sigma={}, gamma={}, N={})",
            file.display(),
            options.sigma,
            options.gamma,
            n
        );
        let coeffs = self
            .engine
            .image_digest(&c_file, options.sigma, options.gamma, n)
            .map_err(|f| self.failed("image_digest", f))?;

        Ok(Digest::new(None, coeffs.to_host()))
    }

    /// Normalized Hamming distance between two byte hashes, in `[0.0, 1.0]`
    ///
    /// Values wider than a byte are truncated when marshalled.
    pub fn hamming_distance2<H: HostValue<u8>>(&self, hash_a: &[H], hash_b: &[H]) -> Result<f64> {
        let a = marshal_bytes(hash_a, "hashA")?;
        let b = marshal_bytes(hash_b, "hashB")?;

        let distance = self
            .engine
            .hamming2(&a, &b)
            .map_err(|f| self.failed("hamming_distance2", f))?;

        if !(0.0..=1.0).contains(&distance) {
            return Err(self.failed(
                "hamming_distance2",
                EngineFailure::new(-1, format!("distance {} out of range", distance)),
            ));
        }
        Ok(distance)
    }

    /// Peak cross-correlation of two digests
    ///
    /// Sizes may differ; either digest may be empty.
    pub fn crosscorr(&self, x: &Digest, y: &Digest, threshold: f64) -> Result<CrossCorrelation> {
        let x_coeffs = ensure_well_formed(x, DigestSide::X)?;
        let y_coeffs = ensure_well_formed(y, DigestSide::Y)?;

        let x_buffer = marshal_bytes(x_coeffs, "x")?;
        let y_buffer = marshal_bytes(y_coeffs, "y")?;

        debug!(
            "crosscorr: sizes {} and {} (threshold={})",
            x_buffer.len(),
            y_buffer.len(),
            threshold
        );
        self.engine
            .crosscorr(&x_buffer, &y_buffer, threshold)
            .map_err(|f| self.failed("crosscorr", f))
    }

    /// Peak cross-correlation between the digests of two image files
    pub fn compare_images<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        file1: P,
        file2: Q,
        options: &CompareOptions,
    ) -> Result<f64> {
        Ok(self.compare_images_detailed(file1, file2, options)?.pcc)
    }

    /// Like [`compare_images`](Self::compare_images), but also returns the
    /// engine's same/different decision
    pub fn compare_images_detailed<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        file1: P,
        file2: Q,
        options: &CompareOptions,
    ) -> Result<CrossCorrelation> {
        let (file1, file2) = (file1.as_ref(), file2.as_ref());
        ensure_readable(file1)?;
        ensure_readable(file2)?;
        let n = angles(options.n)?;
        let c_file1 = c_path(file1, "file1")?;
        let c_file2 = c_path(file2, "file2")?;

        debug!(
            "compare_images: {} vs {} (sigma={}, gamma={}, N={}, threshold={})",
            file1.display(),
            file2.display(),
            options.sigma,
            options.gamma,
            n,
            options.threshold
        );
        self.engine
            .compare(
                &c_file1,
                &c_file2,
                options.sigma,
                options.gamma,
                n,
                options.threshold,
            )
            .map_err(|f| self.failed("compare_images", f))
    }
}

/// Marshal host values into a byte buffer the engine can index with an `int`
fn marshal_bytes<H: HostValue<u8>>(values: &[H], param: &'static str) -> Result<NativeBuffer<u8>> {
    let buffer = NativeBuffer::from_host(values).map_err(|e| match e {
        Error::LibraryFailure { detail, .. } => Error::invalid_argument(param, detail),
        other => other,
    })?;
    buffer.c_len(param)?;
    Ok(buffer)
}
