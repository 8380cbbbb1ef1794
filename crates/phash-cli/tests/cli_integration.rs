//! CLI integration tests for the `phash` binary.
//!
//! Every engine-backed command runs with `--mock` so no native library is
//! needed.

use assert_cmd::Command;
use image::{GrayImage, Luma};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn phash() -> Command {
    Command::cargo_bin("phash").unwrap()
}

fn create_test_image(dir: &Path, name: &str, seed: u32) -> PathBuf {
    let path = dir.join(name);
    let img = GrayImage::from_fn(48, 48, |x, y| Luma([((x * seed + y * 7) % 256) as u8]));
    img.save(&path).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    phash()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("hash"))
        .stdout(predicate::str::contains("wavelet"))
        .stdout(predicate::str::contains("digest"))
        .stdout(predicate::str::contains("distance2"))
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("crosscorr"))
        .stdout(predicate::str::contains("generate-config"));
}

#[test]
fn test_hash_prints_sixteen_hex_digits() {
    let temp_dir = TempDir::new().unwrap();
    let image = create_test_image(temp_dir.path(), "a.png", 3);

    phash()
        .args(["--mock", "hash"])
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^[0-9a-f]{16}\n$").unwrap());
}

#[test]
fn test_hash_missing_file_fails() {
    phash()
        .args(["--mock", "hash", "does/not/exist.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does/not/exist.png"));
}

#[test]
fn test_wavelet_prints_hex() {
    let temp_dir = TempDir::new().unwrap();
    let image = create_test_image(temp_dir.path(), "a.png", 3);

    phash()
        .args(["--mock", "wavelet"])
        .arg(&image)
        .args(["--alpha", "2", "--lvl", "1"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^([0-9a-f]{2})+\n$").unwrap());
}

#[test]
fn test_digest_reports_requested_size() {
    let temp_dir = TempDir::new().unwrap();
    let image = create_test_image(temp_dir.path(), "a.png", 3);

    phash()
        .args(["--mock", "digest"])
        .arg(&image)
        .args(["--angles", "90"])
        .assert()
        .success()
        .stdout(predicate::str::contains("size: 90"));
}

#[test]
fn test_digest_zero_angles_fails() {
    let temp_dir = TempDir::new().unwrap();
    let image = create_test_image(temp_dir.path(), "a.png", 3);

    phash()
        .args(["--mock", "digest"])
        .arg(&image)
        .args(["--angles", "0"])
        .assert()
        .failure();
}

#[test]
fn test_distance() {
    phash()
        .args(["distance", "ffffffffffffffff", "0"])
        .assert()
        .success()
        .stdout("distance: 64\nverdict: different\n");

    phash()
        .args(["distance", "0x0b", "0x01"])
        .assert()
        .success()
        .stdout("distance: 2\nverdict: similar\n");
}

#[test]
fn test_distance_uses_max_hamming_distance() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("phash.json");
    fs::write(&config, r#"{ "max_hamming_distance": 1 }"#).unwrap();

    phash()
        .arg("--config")
        .arg(&config)
        .args(["distance", "0x0b", "0x01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("verdict: different"));

    phash()
        .args(["distance", "0x0b", "0x01", "--max-distance", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("verdict: different"));
}

#[test]
fn test_distance_invalid_hex_fails() {
    phash()
        .args(["distance", "not-hex", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-hex"));
}

#[test]
fn test_distance2_truncates_integers() {
    phash()
        .args(["--mock", "distance2", "000000", "000000"])
        .assert()
        .success()
        .stdout("0.000000\n");

    phash()
        .args(["--mock", "distance2", "256,-1", "0,255"])
        .assert()
        .success()
        .stdout("0.000000\n");
}

#[test]
fn test_compare_same_image() {
    let temp_dir = TempDir::new().unwrap();
    let image = create_test_image(temp_dir.path(), "a.png", 3);

    phash()
        .args(["--mock", "compare"])
        .arg(&image)
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("pcc: 1.000000"))
        .stdout(predicate::str::contains("verdict: same"));
}

#[test]
fn test_crosscorr_same_image() {
    let temp_dir = TempDir::new().unwrap();
    let image = create_test_image(temp_dir.path(), "a.png", 3);

    phash()
        .args(["--mock", "crosscorr"])
        .arg(&image)
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("pcc: 1.000000"))
        .stdout(predicate::str::contains("verdict: same"));
}

#[test]
fn test_crosscorr_uses_configured_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let image = create_test_image(temp_dir.path(), "a.png", 3);
    let config = temp_dir.path().join("phash.json");
    // No correlation reaches 1.5
    fs::write(&config, r#"{ "engine": "Mock", "crosscorr_threshold": 1.5 }"#).unwrap();

    phash()
        .arg("--config")
        .arg(&config)
        .arg("crosscorr")
        .arg(&image)
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("verdict: different"));
}

#[test]
fn test_compare_uses_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let image = create_test_image(temp_dir.path(), "a.png", 3);
    let config = temp_dir.path().join("phash.json");
    fs::write(&config, r#"{ "engine": "Mock" }"#).unwrap();

    phash()
        .arg("--config")
        .arg(&config)
        .arg("compare")
        .arg(&image)
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("verdict: same"));
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("phash.json");
    fs::write(&config, r#"{ "no_such_field": 1 }"#).unwrap();

    phash()
        .arg("--config")
        .arg(&config)
        .args(["distance", "0", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_generate_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("generated.json");

    phash()
        .arg("generate-config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file generated"));

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("max_hamming_distance"));
    assert!(contents.contains("threshold"));
}

#[test]
fn test_log_dir_writes_log_file() {
    let temp_dir = TempDir::new().unwrap();
    let image = create_test_image(temp_dir.path(), "a.png", 3);
    let log_dir = temp_dir.path().join("logs");

    phash()
        .arg("--mock")
        .arg("--log-dir")
        .arg(&log_dir)
        .arg("hash")
        .arg(&image)
        .assert()
        .success();

    assert!(log_dir.join("phash.log").exists());
}
