use std::fs;
use std::io::Cursor;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

/// `pack` runs the whole assembly pipeline offline, so the CLI can be
/// exercised end to end without any destination configured.
#[test]
fn pack_assembles_an_archive_offline() {
    let tmp = tempdir().unwrap();
    let photo_a = tmp.path().join("a.jpg");
    let photo_b = tmp.path().join("b.png");
    fs::write(&photo_a, b"jpeg-ish bytes").unwrap();
    fs::write(&photo_b, b"png-ish bytes").unwrap();
    let out = tmp.path().join("bundle.zip");

    let mut cmd = Command::cargo_bin("photo-bundle").expect("Binary exists");
    cmd.arg("pack")
        .arg("--id")
        .arg("TRF-2025-001")
        .arg("--out")
        .arg(&out)
        .arg(&photo_a)
        .arg(&photo_b);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Pack complete"));

    let bytes = fs::read(&out).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(zip.len(), 3, "two photos plus the manifest");
    assert!(zip.by_name("MANIFEST.txt").is_ok());
}

#[test]
fn pack_rejects_out_of_range_compression_levels() {
    let tmp = tempdir().unwrap();
    let photo = tmp.path().join("a.jpg");
    fs::write(&photo, b"bytes").unwrap();

    let mut cmd = Command::cargo_bin("photo-bundle").expect("Binary exists");
    cmd.arg("pack")
        .arg("--id")
        .arg("EQ-1")
        .arg("--out")
        .arg(tmp.path().join("out.zip"))
        .arg("--level")
        .arg("12")
        .arg(&photo);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--level"));
}

#[test]
fn send_requires_an_identifier() {
    let tmp = tempdir().unwrap();
    let photo = tmp.path().join("a.jpg");
    fs::write(&photo, b"bytes").unwrap();
    let config = tmp.path().join("config.yaml");
    fs::write(
        &config,
        b"destination:\n  kind: local\n  root: ./uploads\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("photo-bundle").expect("Binary exists");
    cmd.arg("send").arg("--config").arg(&config).arg(&photo);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("identifier"));
}

#[test]
fn send_deposits_photos_for_local_destinations() {
    let tmp = tempdir().unwrap();
    let photo = tmp.path().join("IMG 01.JPG");
    fs::write(&photo, b"photo bytes").unwrap();
    let root = tmp.path().join("data");
    let config = tmp.path().join("config.yaml");
    fs::write(
        &config,
        format!("destination:\n  kind: local\n  root: {}\n", root.display()),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("photo-bundle").expect("Binary exists");
    cmd.arg("send")
        .arg("--config")
        .arg(&config)
        .arg("--id")
        .arg("EQ-009")
        .arg(&photo);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Send complete"))
        .stdout(predicate::str::contains("Next identifier: EQ-010"));

    assert!(root.join("EQ-009").join("EQ-009_IMG_01_001.jpg").is_file());
    assert!(root.join("EQ-009").join("registro.csv").is_file());
    assert!(root.join("EQ-009_inspecao.zip").is_file());
}
