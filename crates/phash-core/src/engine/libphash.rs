//! Bindings to the native libpHash library.

use std::ffi::CStr;
use std::os::raw::{c_char, c_double, c_float, c_int};
use std::ptr;

use super::{
    widen_distance, CrossCorrelation, EngineFailure, EngineResult, HashEngine, Verdict,
};
use crate::marshal::NativeBuffer;

/// libpHash `Digest` layout
#[repr(C)]
struct RawDigest {
    id: *mut c_char,
    coeffs: *mut u8,
    size: c_int,
}

// C wrappers compiled from `native/phash_shim.cpp` by the build script
extern "C" {
    fn phash_shim_dct_imagehash(file: *const c_char, hash: *mut u64) -> c_int;
    fn phash_shim_mh_imagehash(
        filename: *const c_char,
        n: *mut c_int,
        alpha: c_float,
        lvl: c_float,
    ) -> *mut u8;
    fn phash_shim_image_digest(
        file: *const c_char,
        sigma: c_double,
        gamma: c_double,
        digest: *mut RawDigest,
        n: c_int,
    ) -> c_int;
    fn phash_shim_hammingdistance2(
        hash_a: *mut u8,
        len_a: c_int,
        hash_b: *mut u8,
        len_b: c_int,
    ) -> c_double;
    fn phash_shim_crosscorr(
        x: *const RawDigest,
        y: *const RawDigest,
        pcc: *mut c_double,
        threshold: c_double,
    ) -> c_int;
    fn phash_shim_compare_images(
        file1: *const c_char,
        file2: *const c_char,
        pcc: *mut c_double,
        sigma: c_double,
        gamma: c_double,
        n: c_int,
        threshold: c_double,
    ) -> c_int;
}

fn c_len(buffer: &NativeBuffer<u8>) -> EngineResult<c_int> {
    c_int::try_from(buffer.len())
        .map_err(|_| EngineFailure::new(-1, format!("length {} too large", buffer.len())))
}

/// Engine backed by libpHash
#[derive(Debug, Clone, Copy, Default)]
pub struct LibPhash;

impl HashEngine for LibPhash {
    fn name(&self) -> &'static str {
        "libphash"
    }

    fn dct_hash(&self, file: &CStr) -> EngineResult<u64> {
        let mut hash: u64 = 0;
        let status = unsafe { phash_shim_dct_imagehash(file.as_ptr(), &mut hash) };
        if status < 0 {
            return Err(EngineFailure::new(status, "ph_dct_imagehash failed"));
        }
        Ok(hash)
    }

    fn mh_hash(&self, file: &CStr, alpha: f32, lvl: f32) -> EngineResult<NativeBuffer<u8>> {
        let mut n: c_int = 0;
        let raw = unsafe { phash_shim_mh_imagehash(file.as_ptr(), &mut n, alpha, lvl) };
        if raw.is_null() {
            return Err(EngineFailure::new(-1, "ph_mh_imagehash returned no hash"));
        }

        // Adopt before checking the length so the allocation is always freed
        let len = usize::try_from(n).unwrap_or(0);
        let hash = unsafe { NativeBuffer::adopt(raw, len) };
        if n <= 0 {
            return Err(EngineFailure::new(n, "ph_mh_imagehash returned an empty hash"));
        }
        Ok(hash)
    }

    fn image_digest(
        &self,
        file: &CStr,
        sigma: f64,
        gamma: f64,
        n: c_int,
    ) -> EngineResult<NativeBuffer<u8>> {
        let mut digest = RawDigest {
            id: ptr::null_mut(),
            coeffs: ptr::null_mut(),
            size: 0,
        };
        let status =
            unsafe { phash_shim_image_digest(file.as_ptr(), sigma, gamma, &mut digest, n) };

        let len = usize::try_from(digest.size).unwrap_or(0);
        let coeffs = unsafe { NativeBuffer::adopt(digest.coeffs, len) };
        if status < 0 {
            return Err(EngineFailure::new(status, "ph_image_digest failed"));
        }
        Ok(coeffs)
    }

    fn hamming2(&self, a: &NativeBuffer<u8>, b: &NativeBuffer<u8>) -> EngineResult<f64> {
        // libpHash rejects unequal or empty lengths; compare the shared prefix
        let shared = c_len(a)?.min(c_len(b)?);
        if shared == 0 {
            return Ok(widen_distance(0.0, a.len(), b.len()));
        }

        let distance = unsafe {
            phash_shim_hammingdistance2(
                a.as_ptr() as *mut u8,
                shared,
                b.as_ptr() as *mut u8,
                shared,
            )
        };
        if distance < 0.0 {
            return Err(EngineFailure::new(
                -1,
                format!("ph_hammingdistance2 rejected length {}", shared),
            ));
        }
        Ok(widen_distance(distance, a.len(), b.len()))
    }

    fn crosscorr(
        &self,
        x: &NativeBuffer<u8>,
        y: &NativeBuffer<u8>,
        threshold: f64,
    ) -> EngineResult<CrossCorrelation> {
        // libpHash walks `y.size` elements of both inputs; use the shared prefix
        let shared = c_len(x)?.min(c_len(y)?);
        if shared == 0 {
            return Ok(CrossCorrelation {
                verdict: Verdict::Different,
                pcc: 0.0,
            });
        }

        let raw_x = RawDigest {
            id: ptr::null_mut(),
            coeffs: x.as_ptr() as *mut u8,
            size: shared,
        };
        let raw_y = RawDigest {
            id: ptr::null_mut(),
            coeffs: y.as_ptr() as *mut u8,
            size: shared,
        };

        let mut pcc: c_double = 0.0;
        let status = unsafe { phash_shim_crosscorr(&raw_x, &raw_y, &mut pcc, threshold) };
        let verdict = Verdict::from_status(status)
            .ok_or_else(|| EngineFailure::new(status, "ph_crosscorr failed"))?;
        Ok(CrossCorrelation { verdict, pcc })
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
        let mut pcc: c_double = 0.0;
        let status = unsafe {
            phash_shim_compare_images(
                file1.as_ptr(),
                file2.as_ptr(),
                &mut pcc,
                sigma,
                gamma,
                n,
                threshold,
            )
        };
        let verdict = Verdict::from_status(status)
            .ok_or_else(|| EngineFailure::new(status, "ph_compare_images failed"))?;
        Ok(CrossCorrelation { verdict, pcc })
    }
}
