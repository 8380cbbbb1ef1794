#![allow(dead_code)]

use image::{GrayImage, Luma, Rgb, RgbImage};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use phash_core::engine::{self, MockEngine};

/// Install the mock engine as the process-wide engine (first call wins)
pub fn install_mock_engine() {
    let _ = engine::install(Arc::new(MockEngine::new()));
}

/// Create a gradient test image
pub fn create_gradient_image(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();

    let path = dir.join(name);
    let img = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 128]));
    img.save(&path).unwrap();
    path
}

/// Create a checkerboard test image
pub fn create_checker_image(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();

    let path = dir.join(name);
    let img = GrayImage::from_fn(64, 64, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Luma([230])
        } else {
            Luma([20])
        }
    });
    img.save(&path).unwrap();
    path
}

/// Create a file with an image extension but no image data
pub fn create_dummy_image(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();

    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(b"DUMMY IMAGE DATA").unwrap();
    path
}
