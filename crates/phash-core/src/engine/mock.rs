//! Mock hash engine for testing.
//!
//! Decodes the image and derives every hash from a BLAKE3 digest of the
//! grayscale pixels. Identical pixels give identical hashes; anything else
//! gives unrelated ones. This is NOT a perceptual hash.

use std::ffi::CStr;
use std::os::raw::c_int;

use image::GrayImage;

use super::{
    widen_distance, CrossCorrelation, EngineFailure, EngineResult, HashEngine, Verdict,
};
use crate::marshal::NativeBuffer;

/// Length of the wavelet hash, as produced by libpHash
pub const MH_HASH_LEN: usize = 72;

const FAILURE: i32 = -1;

/// Deterministic engine; safe to share between threads
#[derive(Debug, Clone, Default)]
pub struct MockEngine;

impl MockEngine {
    pub fn new() -> Self {
        Self
    }

    fn decode(file: &CStr) -> EngineResult<GrayImage> {
        let path = file
            .to_str()
            .map_err(|_| EngineFailure::new(FAILURE, "path is not valid UTF-8"))?;

        image::open(path)
            .map(|img| img.to_luma8())
            .map_err(|e| EngineFailure::new(FAILURE, format!("cannot decode '{}': {}", path, e)))
    }

    fn pixel_hasher(img: &GrayImage, domain: &[u8]) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(domain);
        hasher.update(&img.width().to_le_bytes());
        hasher.update(&img.height().to_le_bytes());
        hasher.update(img.as_raw());
        hasher
    }

    fn bytes(hasher: &blake3::Hasher, len: usize) -> EngineResult<NativeBuffer<u8>> {
        let mut out = vec![0u8; len];
        hasher.finalize_xof().fill(&mut out);
        NativeBuffer::from_slice(&out).map_err(|e| EngineFailure::new(FAILURE, e.to_string()))
    }

    fn digest(&self, file: &CStr, sigma: f64, gamma: f64, n: c_int) -> EngineResult<Vec<u8>> {
        let len = usize::try_from(n)
            .ok()
            .filter(|&len| len > 0)
            .ok_or_else(|| EngineFailure::new(FAILURE, format!("invalid number of angles {}", n)))?;

        let img = Self::decode(file)?;
        let mut hasher = Self::pixel_hasher(&img, b"radial");
        hasher.update(&sigma.to_le_bytes());
        hasher.update(&gamma.to_le_bytes());
        Ok(Self::bytes(&hasher, len)?.to_host())
    }
}

/// Peak circular Pearson correlation over the shared prefix of `x` and `y`
fn peak_correlation(x: &[u8], y: &[u8]) -> f64 {
    let n = x.len().min(y.len());
    if n == 0 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);

    // Identical sequences correlate perfectly, constant ones included
    if x == y {
        return 1.0;
    }

    let mean = |v: &[u8]| v.iter().map(|&c| f64::from(c)).sum::<f64>() / n as f64;
    let (mean_x, mean_y) = (mean(x), mean(y));

    let mut peak = 0.0f64;
    for shift in 0..n {
        let (mut num, mut den_x, mut den_y) = (0.0, 0.0, 0.0);
        for i in 0..n {
            let dx = f64::from(x[i]) - mean_x;
            let dy = f64::from(y[(n + i - shift) % n]) - mean_y;
            num += dx * dy;
            den_x += dx * dx;
            den_y += dy * dy;
        }

        // Constant sequences have no defined correlation
        let den = (den_x * den_y).sqrt();
        if den > 0.0 {
            peak = peak.max(num / den);
        }
    }
    peak
}

fn decide(pcc: f64, threshold: f64) -> CrossCorrelation {
    let verdict = if pcc >= threshold {
        Verdict::Same
    } else {
        Verdict::Different
    };
    CrossCorrelation { verdict, pcc }
}

impl HashEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn dct_hash(&self, file: &CStr) -> EngineResult<u64> {
        let img = Self::decode(file)?;
        let hash = Self::pixel_hasher(&img, b"dct").finalize();

        let mut word = [0u8; 8];
        word.copy_from_slice(&hash.as_bytes()[..8]);
        Ok(u64::from_le_bytes(word))
    }

    fn mh_hash(&self, file: &CStr, alpha: f32, lvl: f32) -> EngineResult<NativeBuffer<u8>> {
        let img = Self::decode(file)?;
        let mut hasher = Self::pixel_hasher(&img, b"mh");
        hasher.update(&alpha.to_le_bytes());
        hasher.update(&lvl.to_le_bytes());
        Self::bytes(&hasher, MH_HASH_LEN)
    }

    fn image_digest(
        &self,
        file: &CStr,
        sigma: f64,
        gamma: f64,
        n: c_int,
    ) -> EngineResult<NativeBuffer<u8>> {
        let coeffs = self.digest(file, sigma, gamma, n)?;
        NativeBuffer::from_slice(&coeffs).map_err(|e| EngineFailure::new(FAILURE, e.to_string()))
    }

    fn hamming2(&self, a: &NativeBuffer<u8>, b: &NativeBuffer<u8>) -> EngineResult<f64> {
        let (a, b) = (a.as_slice(), b.as_slice());
        let shared = a.len().min(b.len());

        let differing: u32 = a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum();
        let shared_distance = if shared == 0 {
            0.0
        } else {
            f64::from(differing) / (shared as f64 * 8.0)
        };

        Ok(widen_distance(shared_distance, a.len(), b.len()))
    }

    fn crosscorr(
        &self,
        x: &NativeBuffer<u8>,
        y: &NativeBuffer<u8>,
        threshold: f64,
    ) -> EngineResult<CrossCorrelation> {
        Ok(decide(peak_correlation(x.as_slice(), y.as_slice()), threshold))
    }

    fn compare(
        &self,
        file1: &CStr,
        file2: &CStr,
        sigma: f64,
        gamma: f64,
        n: c_int,
        threshold: f64,
    ) -> EngineResult<CrossCorrelation> {
        let x = self.digest(file1, sigma, gamma, n)?;
        let y = self.digest(file2, sigma, gamma, n)?;
        Ok(decide(peak_correlation(&x, &y), threshold))
    }
}
