//! Integration tests for zipsift-cli.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;
use zipsift_core::test_utils::JPEG_BYTES;
use zipsift_core::test_utils::PDF_BYTES;
use zipsift_core::test_utils::ZipTestBuilder;
use zipsift_core::test_utils::write_archive;

fn zipsift_cmd() -> Command {
    cargo_bin_cmd!("zipsift")
}

/// Writes an archive with one genuine and one disguised JPEG plus a text file.
fn sample_archive(dir: &Path) -> PathBuf {
    let data = ZipTestBuilder::new()
        .add_directory("img/")
        .add_file("img/cat.jpg", JPEG_BYTES)
        .add_file("img/cat.txt", JPEG_BYTES)
        .add_file("docs/readme.txt", b"plain words\n")
        .add_file("docs/manual.pdf", PDF_BYTES)
        .build();
    write_archive(dir, "sample.zip", &data)
}

#[test]
fn test_version_flag() {
    zipsift_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("zipsift"));
}

#[test]
fn test_extract_help() {
    zipsift_cmd()
        .arg("extract")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--rule"))
        .stdout(predicate::str::contains("--on-conflict"));
}

#[test]
fn test_extract_rejects_disguised_file() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_archive(temp.path());
    let out = temp.path().join("out");

    zipsift_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&out)
        .args(["--rule", "jpg=image/jpeg", "--rule", "txt=text/plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("partially complete"))
        .stdout(predicate::str::contains("img/cat.txt"));

    assert!(out.join("img/cat.jpg").exists());
    assert!(out.join("docs/readme.txt").exists());
    assert!(!out.join("img/cat.txt").exists());
    assert!(!out.join("docs/manual.pdf").exists());
}

#[test]
fn test_extract_prefix_flattened() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_archive(temp.path());
    let out = temp.path().join("out");

    zipsift_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&out)
        .args(["--prefix", "docs", "--flatten"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extraction complete"));

    assert!(out.join("readme.txt").exists());
    assert!(out.join("manual.pdf").exists());
    assert!(!out.join("docs").exists());
}

#[test]
fn test_extract_greedy_name() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_archive(temp.path());
    let out = temp.path().join("out");

    zipsift_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&out)
        .args(["--name", "manual.pdf", "--greedy"])
        .assert()
        .success();

    assert!(out.join("docs/manual.pdf").exists());
    assert!(!out.join("docs/readme.txt").exists());
}

#[test]
fn test_extract_json_output() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_archive(temp.path());
    let out = temp.path().join("out");

    let output = zipsift_cmd()
        .arg("--json")
        .arg("extract")
        .arg(&archive)
        .arg(&out)
        .args(["--rule", "jpg=image/jpeg", "--name", "img/cat.jpg"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["operation"], "extract");
    assert_eq!(json["status"], "complete");
    assert_eq!(json["data"]["placed"][0]["entry"], "img/cat.jpg");
}

#[test]
fn test_extract_suffix_keeps_existing_file() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_archive(temp.path());
    let out = temp.path().join("out");
    fs::create_dir_all(out.join("docs")).unwrap();
    fs::write(out.join("docs/readme.txt"), b"mine").unwrap();

    zipsift_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(&out)
        .args([
            "--name",
            "docs/readme.txt",
            "--on-conflict",
            "suffix",
            "--suffix-value",
            "new",
        ])
        .assert()
        .success();

    assert_eq!(fs::read(out.join("docs/readme.txt")).unwrap(), b"mine");
    assert!(out.join("docs/readme_new.txt").exists());
}

#[test]
fn test_extract_remove_archive() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_archive(temp.path());
    let out = temp.path().join("out");

    zipsift_cmd()
        .arg("--quiet")
        .arg("extract")
        .arg(&archive)
        .arg(&out)
        .args(["--all", "--remove-archive"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(!archive.exists());
}

#[test]
fn test_extract_refuses_staging_dir_holding_archive() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_archive(temp.path());
    let out = TempDir::new().expect("failed to create temp dir");

    zipsift_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(out.path())
        .arg("--staging-dir")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging directory"));

    assert!(archive.exists());
}

#[test]
fn test_extract_not_a_zip() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let bogus = temp.path().join("bogus.zip");
    fs::write(&bogus, b"definitely not a zip").unwrap();

    zipsift_cmd()
        .arg("extract")
        .arg(&bogus)
        .arg(temp.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot open archive"));
}

#[test]
fn test_extract_bad_rule() {
    zipsift_cmd()
        .args(["extract", "a.zip", "--rule", "jpg"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("EXT=TYPE"));
}

#[test]
fn test_extract_bad_signature_db() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_archive(temp.path());
    let db = temp.path().join("magic.db");
    fs::write(&db, "0 zz image/png\n").unwrap();

    zipsift_cmd()
        .arg("extract")
        .arg(&archive)
        .arg(temp.path().join("out"))
        .args(["--rule", "png=image/png"])
        .arg("--signature-db")
        .arg(&db)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid signature database"));
}

#[test]
fn test_list_short() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_archive(temp.path());

    zipsift_cmd()
        .arg("list")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("img/cat.jpg"))
        .stdout(predicate::str::contains("docs/manual.pdf"));
}

#[test]
fn test_list_long_with_prefix() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let archive = sample_archive(temp.path());

    zipsift_cmd()
        .arg("list")
        .arg(&archive)
        .args(["--long", "--prefix", "docs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total: 2 files"))
        .stdout(predicate::str::contains("img/").not());
}
