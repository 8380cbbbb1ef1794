//! # Array Marshalling
//!
//! Moves numeric sequences between Rust and the C-allocated buffers the hash
//! engine reads and writes.
//!
//! A [`NativeBuffer`] owns exactly one allocation from the C allocator and
//! releases it in `Drop`, so every exit path of an operation (success,
//! validation failure, engine failure) frees what it allocated exactly once.
//! Buffers returned by the engine are taken over with [`NativeBuffer::adopt`]
//! and follow the same rule.
//!
//! ## Narrowing
//!
//! Host values are narrowed to the element width by truncation: `256 -> 0`,
//! `-1 -> 255` for bytes. No range check is performed.

use std::ffi::{c_void, CString};
use std::fmt;
use std::mem;
use std::os::raw::c_int;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::slice;

use crate::error::{Error, Result};

extern "C" {
    fn malloc(size: usize) -> *mut c_void;
    fn free(ptr: *mut c_void);
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u32 {}
    impl Sealed for f64 {}
}

/// Element types the engine exchanges: bytes, 32-bit words and doubles
pub trait NativeElement: Copy + Send + Sync + 'static + sealed::Sealed {
    /// Human-readable element name used in diagnostics
    const NAME: &'static str;
}

impl NativeElement for u8 {
    const NAME: &'static str = "u8";
}

impl NativeElement for u32 {
    const NAME: &'static str = "u32";
}

impl NativeElement for f64 {
    const NAME: &'static str = "f64";
}

/// A host value that can be stored into a native element of type `T`
pub trait HostValue<T: NativeElement>: Copy {
    /// Convert to the native width, truncating out-of-range values
    fn narrow(self) -> T;
}

macro_rules! narrow_by_cast {
    ($target:ty => $($host:ty),+) => {
        $(
            impl HostValue<$target> for $host {
                #[inline]
                fn narrow(self) -> $target {
                    self as $target
                }
            }
        )+
    };
}

narrow_by_cast!(u8 => u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
narrow_by_cast!(u32 => u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);
narrow_by_cast!(f64 => f32, f64);

/// Fixed-size buffer allocated with the C allocator
pub struct NativeBuffer<T: NativeElement> {
    ptr: NonNull<T>,
    len: usize,
}

// The buffer is the sole owner of its allocation.
unsafe impl<T: NativeElement> Send for NativeBuffer<T> {}
unsafe impl<T: NativeElement> Sync for NativeBuffer<T> {}

impl<T: NativeElement> NativeBuffer<T> {
    /// A zero-length buffer; owns no allocation
    pub fn empty() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
        }
    }

    /// Allocate `len * size_of::<T>()` bytes. Contents are uninitialised
    /// until the caller writes every element.
    fn allocate(len: usize) -> Result<Self> {
        if len == 0 {
            return Ok(Self::empty());
        }

        let bytes = len.checked_mul(mem::size_of::<T>()).ok_or_else(|| {
            Error::library(
                "marshal",
                format!("buffer of {} {} elements overflows", len, T::NAME),
            )
        })?;

        let raw = unsafe { malloc(bytes) }.cast::<T>();
        let ptr = NonNull::new(raw).ok_or_else(|| {
            Error::library("marshal", format!("allocation of {} bytes failed", bytes))
        })?;

        live::acquired();
        Ok(Self { ptr, len })
    }

    /// Copy host values into a new buffer, narrowing each one to `T`
    pub fn from_host<H: HostValue<T>>(values: &[H]) -> Result<Self> {
        let buffer = Self::allocate(values.len())?;
        for (i, value) in values.iter().enumerate() {
            unsafe { buffer.ptr.as_ptr().add(i).write(value.narrow()) };
        }
        Ok(buffer)
    }

    /// Copy a slice of native elements into a new buffer
    pub fn from_slice(values: &[T]) -> Result<Self> {
        let buffer = Self::allocate(values.len())?;
        if !values.is_empty() {
            unsafe { ptr::copy_nonoverlapping(values.as_ptr(), buffer.ptr.as_ptr(), values.len()) };
        }
        Ok(buffer)
    }

    /// Take ownership of a buffer allocated by the engine.
    ///
    /// A null pointer yields an empty buffer. A non-null pointer with
    /// `len == 0` is released immediately.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to `len` initialised elements obtained
    /// from the C allocator, and must not be freed by anyone else.
    pub unsafe fn adopt(ptr: *mut T, len: usize) -> Self {
        match NonNull::new(ptr) {
            Some(ptr) if len > 0 => {
                live::acquired();
                Self { ptr, len }
            }
            Some(ptr) => {
                free(ptr.as_ptr().cast());
                Self::empty()
            }
            None => Self::empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Pointer for passing to the engine; dangling when empty
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Copy the contents back into a host vector of the same length
    pub fn to_host(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    /// Length as the engine's `int` length parameter
    pub fn c_len(&self, param: &'static str) -> Result<c_int> {
        c_int::try_from(self.len).map_err(|_| {
            Error::invalid_argument(
                param,
                format!("length {} exceeds the engine limit of {}", self.len, c_int::MAX),
            )
        })
    }
}

impl<T: NativeElement> Drop for NativeBuffer<T> {
    fn drop(&mut self) {
        if self.len > 0 {
            unsafe { free(self.ptr.as_ptr().cast()) };
            live::released();
        }
    }
}

impl<T: NativeElement> fmt::Debug for NativeBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBuffer")
            .field("element", &T::NAME)
            .field("len", &self.len)
            .finish()
    }
}

/// Convert a path to the NUL-terminated string the engine expects
pub fn c_path(path: &Path, param: &'static str) -> Result<CString> {
    let text = path
        .to_str()
        .ok_or_else(|| Error::invalid_argument(param, "path is not valid UTF-8"))?;

    CString::new(text)
        .map_err(|_| Error::invalid_argument(param, "path contains an interior NUL byte"))
}

/// Count of live allocations on the current thread, for leak checks in tests
#[cfg(test)]
pub(crate) fn live_buffers() -> isize {
    live::count()
}

mod live {
    #[cfg(test)]
    thread_local! {
        static LIVE: std::cell::Cell<isize> = std::cell::Cell::new(0);
    }

    #[inline]
    pub(super) fn acquired() {
        #[cfg(test)]
        LIVE.with(|c| c.set(c.get() + 1));
    }

    #[inline]
    pub(super) fn released() {
        #[cfg(test)]
        LIVE.with(|c| c.set(c.get() - 1));
    }

    #[cfg(test)]
    pub(super) fn count() -> isize {
        LIVE.with(|c| c.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_truncate_out_of_range_values() {
        let buffer = NativeBuffer::<u8>::from_host(&[0i64, 255, 256, -1, 511, 1000]).unwrap();
        assert_eq!(buffer.to_host(), vec![0, 255, 0, 255, 255, 232]);
    }

    #[test]
    fn test_words_truncate_out_of_range_values() {
        let buffer = NativeBuffer::<u32>::from_host(&[1i64, -1, 1 << 32, (1 << 32) + 7]).unwrap();
        assert_eq!(buffer.to_host(), vec![1, u32::MAX, 0, 7]);
    }

    #[test]
    fn test_doubles_preserve_order() {
        let values = [3.5f64, -0.25, 1e10, 0.0];
        let buffer = NativeBuffer::<f64>::from_host(&values).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.to_host(), values.to_vec());
    }

    #[test]
    fn test_zero_length_input() {
        let before = live_buffers();
        let buffer = NativeBuffer::<u8>::from_host::<i64>(&[]).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.as_slice(), &[] as &[u8]);
        assert_eq!(buffer.c_len("hash").unwrap(), 0);
        assert_eq!(live_buffers(), before);
    }

    #[test]
    fn test_buffers_released_on_drop() {
        let before = live_buffers();
        {
            let a = NativeBuffer::<u8>::from_slice(&[1, 2, 3]).unwrap();
            let b = NativeBuffer::<f64>::from_host(&[1.0f32, 2.0]).unwrap();
            assert_eq!(live_buffers(), before + 2);
            assert_eq!(a.len() + b.len(), 5);
        }
        assert_eq!(live_buffers(), before);
    }

    #[test]
    fn test_buffers_released_on_early_error() {
        fn marshal_then_fail(values: &[u8]) -> Result<f64> {
            let _buffer = NativeBuffer::<u8>::from_slice(values)?;
            Err(Error::library("test", "failed after allocation"))
        }

        let before = live_buffers();
        assert!(marshal_then_fail(&[9, 9, 9]).is_err());
        assert_eq!(live_buffers(), before);
    }

    #[test]
    fn test_adopt_takes_ownership() {
        let before = live_buffers();
        let raw = unsafe { malloc(4) }.cast::<u8>();
        assert!(!raw.is_null());
        unsafe {
            for i in 0..4 {
                raw.add(i).write(i as u8 * 10);
            }
        }

        let buffer = unsafe { NativeBuffer::adopt(raw, 4) };
        assert_eq!(live_buffers(), before + 1);
        assert_eq!(buffer.to_host(), vec![0, 10, 20, 30]);
        drop(buffer);
        assert_eq!(live_buffers(), before);
    }

    #[test]
    fn test_adopt_null_is_empty() {
        let buffer = unsafe { NativeBuffer::<u8>::adopt(ptr::null_mut(), 72) };
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_c_path_rejects_interior_nul() {
        let err = c_path(Path::new("bad\0name.png"), "file").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { param: "file", .. }));

        let ok = c_path(Path::new("images/a.png"), "file").unwrap();
        assert_eq!(ok.to_str().unwrap(), "images/a.png");
    }
}
