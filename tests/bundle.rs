use std::io::{Cursor, Read};

use chrono::{TimeZone, Utc};
use photo_bundle::batch::RawPhoto;
use photo_bundle::bundle::{apply_serial_to_name, assemble, AssembleOptions, MANIFEST_NAME};
use photo_bundle::normalize::Normalizer;

fn opts(identifier: &str, archive_name: &str) -> AssembleOptions {
    AssembleOptions {
        identifier: identifier.to_string(),
        archive_name: archive_name.to_string(),
        compression_level: 9,
        generated_at: Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap(),
    }
}

fn fixed_photos() -> Vec<RawPhoto> {
    vec![
        RawPhoto::new(Some("a.jpg".to_string()), b"first photo bytes".to_vec()),
        RawPhoto::new(Some("b.jpg".to_string()), b"second photo bytes".to_vec()),
        RawPhoto::new(Some("c.png".to_string()), b"third photo bytes".to_vec()),
    ]
}

fn entry_names(archive: &[u8]) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

fn read_entry(archive: &[u8], name: &str) -> String {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut out = String::new();
    entry.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn assemble_is_deterministic_for_identical_inputs() {
    let normalizer = Normalizer::new(false);
    let options = opts("TRF-2025-001", "fotos_NS-TRF-2025-001.zip");

    let first = assemble(fixed_photos(), &options, &normalizer).unwrap();
    let second = assemble(fixed_photos(), &options, &normalizer).unwrap();

    assert_eq!(first.data, second.data, "archives must be byte-identical");
}

#[test]
fn assemble_includes_corrupt_photo_unchanged() {
    // Two decodable payloads and one blob that is no image at all; with
    // conversion off everything passes through untouched.
    let photos = vec![
        RawPhoto::new(Some("ok1.jpg".to_string()), b"jpeg-ish bytes".to_vec()),
        RawPhoto::new(Some("ok2.jpg".to_string()), b"more jpeg-ish bytes".to_vec()),
        RawPhoto::new(Some("broken.jpg".to_string()), b"\x00\x01garbage".to_vec()),
    ];
    let normalizer = Normalizer::new(false);
    let bundle = assemble(photos, &opts("TRF-2025-001", "fotos.zip"), &normalizer).unwrap();

    assert_eq!(bundle.entries.len(), 3);
    assert!(bundle.skipped_conversions.is_empty());

    let names = entry_names(&bundle.data);
    assert_eq!(names.len(), 4, "three photos plus the manifest");
    assert!(names.contains(&MANIFEST_NAME.to_string()));

    let manifest = read_entry(&bundle.data, MANIFEST_NAME);
    assert!(manifest.contains("identificador: TRF-2025-001"));
    assert!(manifest.contains("total_fotos: 3"));
    for entry in &bundle.entries {
        assert!(manifest.contains(entry.as_str()), "manifest misses {entry}");
    }
}

#[test]
fn assemble_reports_failed_conversions_and_keeps_bytes() {
    // A corrupt "legacy" file: conversion is attempted, fails, and the
    // original bytes still make it into the archive.
    let photos = vec![RawPhoto::new(
        Some("scan.bmp".to_string()),
        b"definitely not a bitmap".to_vec(),
    )];
    let normalizer = Normalizer::new(true);
    let bundle = assemble(photos, &opts("EQ-1", "fotos.zip"), &normalizer).unwrap();

    assert_eq!(bundle.entries, vec!["EQ-1_scan_001.bmp".to_string()]);
    assert_eq!(bundle.skipped_conversions, bundle.entries);
}

#[test]
fn assemble_renames_converted_entries_to_jpg() {
    let mut bmp = Vec::new();
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2));
    img.write_to(&mut Cursor::new(&mut bmp), image::ImageFormat::Bmp)
        .unwrap();

    let photos = vec![RawPhoto::new(Some("scan.bmp".to_string()), bmp)];
    let normalizer = Normalizer::new(true);
    let bundle = assemble(photos, &opts("EQ-1", "fotos.zip"), &normalizer).unwrap();

    assert_eq!(bundle.entries, vec!["EQ-1_scan_001.jpg".to_string()]);
    assert!(bundle.skipped_conversions.is_empty());
}

#[test]
fn assemble_deduplicates_colliding_names() {
    let photos = vec![
        RawPhoto::new(Some("x.jpg".to_string()), b"one".to_vec()),
        RawPhoto::new(Some("x.jpg".to_string()), b"two".to_vec()),
    ];
    let normalizer = Normalizer::new(false);
    let bundle = assemble(photos, &opts("", "fotos.zip"), &normalizer).unwrap();
    // Counters alone keep the names apart here; nothing collides.
    assert_eq!(bundle.entries, vec!["x_001.jpg", "x_002.jpg"]);
}

#[test]
fn stronger_compression_yields_smaller_archives() {
    let repetitive = vec![b'A'; 16 * 1024];
    let photos = || vec![RawPhoto::new(Some("a.txt".to_string()), repetitive.clone())];
    let normalizer = Normalizer::new(false);

    let mut o0 = opts("EQ", "fotos.zip");
    o0.compression_level = 0;
    let mut o9 = opts("EQ", "fotos.zip");
    o9.compression_level = 9;

    let stored = assemble(photos(), &o0, &normalizer).unwrap();
    let packed = assemble(photos(), &o9, &normalizer).unwrap();
    assert!(packed.data.len() < stored.data.len());
}

#[test]
fn apply_serial_to_name_builds_tagged_archive_names() {
    assert_eq!(
        apply_serial_to_name("fotos", "TRF 01", Some(2)),
        "fotos_NS-TRF_01_parte02.zip"
    );
    assert_eq!(apply_serial_to_name("fotos", "AB", None), "fotos_NS-AB.zip");
    assert_eq!(apply_serial_to_name("relatorio.zip", "", None), "relatorio.zip");
    assert_eq!(apply_serial_to_name("x.tar.gz", "A", None), "x_tar_NS-A.zip");
    assert_eq!(apply_serial_to_name("", "AB", None), "fotos_NS-AB.zip");
    assert_eq!(
        apply_serial_to_name("fotos", "EQ-9", Some(11)),
        "fotos_NS-EQ-9_parte11.zip"
    );
}
