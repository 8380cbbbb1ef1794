//! Hash engines.
//!
//! All pixel-level work (DCT hash, Marr-wavelet hash, radial projections,
//! cross-correlation peak search) happens behind [`HashEngine`]. Each method
//! is one synchronous, single-shot call; failures are returned as
//! [`EngineFailure`] and never retried.
//!
//! ## Engines
//!
//! - `LibPhash` - the native libpHash library (feature `libphash`)
//! - [`MockEngine`] - deterministic engine for testing
//!
//! ## Registry
//!
//! One engine can be installed per process with [`install`]; [`installed`]
//! returns it. The registry is set once and never torn down.

#[cfg(feature = "libphash")]
mod libphash;
mod mock;

#[cfg(feature = "libphash")]
pub use libphash::LibPhash;
pub use mock::MockEngine;

use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_int;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::marshal::NativeBuffer;

/// Failure status reported by an engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    /// Raw status code (negative for libpHash)
    pub status: i32,

    /// What went wrong
    pub detail: String,
}

impl EngineFailure {
    pub fn new(status: i32, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}: {}", self.status, self.detail)
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineFailure>;

/// Same/different decision of a radial comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Different,
    Same,
}

impl Verdict {
    /// Decision from a libpHash result code; `None` for the error code
    pub fn from_status(status: c_int) -> Option<Self> {
        match status {
            0 => Some(Self::Different),
            1 => Some(Self::Same),
            _ => None,
        }
    }

    /// Integer form: 1 for same, 0 for different
    pub fn code(self) -> i32 {
        match self {
            Self::Different => 0,
            Self::Same => 1,
        }
    }
}

/// Result of comparing two radial digests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossCorrelation {
    /// Decision against the requested threshold
    pub verdict: Verdict,

    /// Peak cross-correlation
    pub pcc: f64,
}

impl CrossCorrelation {
    pub fn is_match(&self) -> bool {
        self.verdict == Verdict::Same
    }

    pub fn match_code(&self) -> i32 {
        self.verdict.code()
    }
}

/// Extend a distance over the shared prefix of two byte hashes to their full
/// lengths; every byte past the shorter hash counts as eight differing bits
pub(crate) fn widen_distance(shared_distance: f64, len_a: usize, len_b: usize) -> f64 {
    let (shared, longest) = (len_a.min(len_b), len_a.max(len_b));
    if longest == 0 {
        return 0.0;
    }
    (shared_distance * shared as f64 + (longest - shared) as f64) / longest as f64
}

/// The native hash engine call contract
pub trait HashEngine: Send + Sync {
    /// Engine identifier for logging
    fn name(&self) -> &'static str;

    /// 64-bit DCT hash of an image file
    fn dct_hash(&self, file: &CStr) -> EngineResult<u64>;

    /// Marr-wavelet hash; the engine chooses the length
    fn mh_hash(&self, file: &CStr, alpha: f32, lvl: f32) -> EngineResult<NativeBuffer<u8>>;

    /// Radial digest coefficients over `n` angles
    fn image_digest(
        &self,
        file: &CStr,
        sigma: f64,
        gamma: f64,
        n: c_int,
    ) -> EngineResult<NativeBuffer<u8>>;

    /// Normalized Hamming distance between two byte hashes
    fn hamming2(&self, a: &NativeBuffer<u8>, b: &NativeBuffer<u8>) -> EngineResult<f64>;

    /// Peak cross-correlation of two digests' coefficients
    fn crosscorr(
        &self,
        x: &NativeBuffer<u8>,
        y: &NativeBuffer<u8>,
        threshold: f64,
    ) -> EngineResult<CrossCorrelation>;

    /// Digest both files and correlate them in one call
    #[allow(clippy::too_many_arguments)]
    fn compare(
        &self,
        file1: &CStr,
        file2: &CStr,
        sigma: f64,
        gamma: f64,
        n: c_int,
        threshold: f64,
    ) -> EngineResult<CrossCorrelation>;
}

/// Engine selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    /// libpHash
    #[default]
    Native,

    /// Deterministic mock (testing only)
    Mock,
}

/// Create an engine of the requested kind
pub fn create(kind: EngineKind) -> Result<Arc<dyn HashEngine>> {
    match kind {
        EngineKind::Native => native(),
        EngineKind::Mock => Ok(Arc::new(MockEngine::default())),
    }
}

#[cfg(feature = "libphash")]
fn native() -> Result<Arc<dyn HashEngine>> {
    Ok(Arc::new(LibPhash))
}

#[cfg(not(feature = "libphash"))]
fn native() -> Result<Arc<dyn HashEngine>> {
    Err(Error::library(
        "engine",
        "built without the `libphash` feature; no native engine available",
    ))
}

static ENGINE: OnceCell<Arc<dyn HashEngine>> = OnceCell::new();

/// Install the process-wide engine; only the first call succeeds
pub fn install(engine: Arc<dyn HashEngine>) -> Result<()> {
    let name = engine.name();
    ENGINE.set(engine).map_err(|_| {
        let current = ENGINE.get().map(|e| e.name()).unwrap_or("unknown");
        Error::Configuration(format!(
            "Hash engine '{}' already installed; cannot install '{}'",
            current, name
        ))
    })?;

    log::debug!("Installed hash engine '{}'", name);
    Ok(())
}

/// The process-wide engine
///
/// With the `libphash` feature, libpHash is installed on first use when no
/// other engine was.
pub fn installed() -> Result<Arc<dyn HashEngine>> {
    #[cfg(feature = "libphash")]
    {
        Ok(ENGINE.get_or_init(|| Arc::new(LibPhash)).clone())
    }

    #[cfg(not(feature = "libphash"))]
    {
        ENGINE
            .get()
            .cloned()
            .ok_or_else(|| Error::library("engine", "no hash engine installed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_codes() {
        assert_eq!(Verdict::from_status(1), Some(Verdict::Same));
        assert_eq!(Verdict::from_status(0), Some(Verdict::Different));
        assert_eq!(Verdict::from_status(-1), None);
        assert_eq!(Verdict::Same.code(), 1);
        assert_eq!(Verdict::Different.code(), 0);
    }

    #[test]
    fn test_widen_distance_equal_lengths() {
        assert_eq!(widen_distance(0.25, 8, 8), 0.25);
        assert_eq!(widen_distance(0.0, 0, 0), 0.0);
    }

    #[test]
    fn test_widen_distance_length_mismatch() {
        // One identical byte plus one missing byte
        assert_eq!(widen_distance(0.0, 2, 1), 0.5);
        assert_eq!(widen_distance(0.0, 1, 2), 0.5);
        // Everything missing
        assert_eq!(widen_distance(0.0, 3, 0), 1.0);
        // Half the shared bits differ over 4 of 8 bytes
        assert_eq!(widen_distance(0.5, 4, 8), 0.75);
    }

    #[test]
    fn test_create_mock_engine() {
        let engine = create(EngineKind::Mock).unwrap();
        assert_eq!(engine.name(), "mock");
    }

    #[cfg(not(feature = "libphash"))]
    #[test]
    fn test_native_engine_unavailable() {
        let err = create(EngineKind::Native).err().unwrap();
        assert!(matches!(
            err,
            Error::LibraryFailure {
                operation: "engine",
                ..
            }
        ));
    }

    #[test]
    fn test_second_install_rejected() {
        let _ = install(Arc::new(MockEngine::default()));
        let err = install(Arc::new(MockEngine::default())).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(installed().is_ok());
    }
}
