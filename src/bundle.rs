//! Bundle assembly: normalized, uniquely named photos packed into a deflate
//! archive together with a `MANIFEST.txt` index.
//!
//! Assembly is deterministic: entry timestamps are pinned and the manifest
//! generation time comes from the caller, so the same ordered photo list with
//! the same options produces byte-identical archives. Content-versioning
//! destinations rely on that to make re-sends idempotent.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::batch::RawPhoto;
use crate::normalize::Normalizer;
use crate::sanitize::{ensure_unique, replace_extension, sanitize, unique_photo_name};

/// Fixed name of the manifest member inside every archive.
pub const MANIFEST_NAME: &str = "MANIFEST.txt";

/// Strongest deflate level; the default for assembled bundles.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 9;

/// Stem used when the configured archive base name sanitizes to nothing.
const FALLBACK_ARCHIVE_STEM: &str = "fotos";

#[derive(Debug)]
pub enum BundleError {
    Io(std::io::Error),
    Zip(zip::result::ZipError),
}

impl From<std::io::Error> for BundleError {
    fn from(e: std::io::Error) -> Self {
        BundleError::Io(e)
    }
}

impl From<zip::result::ZipError> for BundleError {
    fn from(e: zip::result::ZipError) -> Self {
        BundleError::Zip(e)
    }
}

/// Options for assembling one bundle. Whether legacy formats get converted
/// is decided by the [`Normalizer`] handed to [`assemble`].
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// User-entered identifier; embedded verbatim in the manifest.
    pub identifier: String,
    pub archive_name: String,
    /// Deflate level 0-9.
    pub compression_level: u8,
    /// Stamped into the manifest only; callers fix it to reproduce archives.
    pub generated_at: DateTime<Utc>,
}

/// One assembled archive, ready for a transport.
#[derive(Debug)]
pub struct AssembledBundle {
    pub archive_name: String,
    pub data: Vec<u8>,
    /// Final member names, in input order, manifest excluded.
    pub entries: Vec<String>,
    /// Names whose legacy-format conversion failed; their original bytes were
    /// kept.
    pub skipped_conversions: Vec<String>,
}

/// A photo after normalization and naming, ready to enter an archive or the
/// local photo store.
#[derive(Debug)]
pub struct NamedPhoto {
    pub name: String,
    pub data: Vec<u8>,
    pub conversion_skipped: bool,
}

/// Run every photo through conversion and unique naming, in input order.
/// Converted photos carry the canonical extension; name collisions within the
/// set get a numeric suffix.
pub fn normalize_and_name(
    photos: Vec<RawPhoto>,
    identifier: &str,
    normalizer: &Normalizer,
) -> Vec<NamedPhoto> {
    let mut used = HashSet::new();
    let mut named = Vec::with_capacity(photos.len());
    for (index, photo) in photos.into_iter().enumerate() {
        let ext = photo.extension().unwrap_or_default();
        let attempted = normalizer.wants_conversion(&ext);
        let original_name = photo.original_name;
        let normalized = normalizer.normalize(photo.data, &ext);

        let mut name = unique_photo_name(original_name.as_deref(), identifier, (index + 1) as u32);
        if normalized.converted {
            name = replace_extension(&name, &normalized.ext);
        }
        let name = ensure_unique(name, &mut used);

        named.push(NamedPhoto {
            name,
            data: normalized.data,
            conversion_skipped: attempted && !normalized.converted,
        });
    }
    named
}

/// Build one archive from `photos`: each entry written at the requested
/// compression level under its unique name, followed by the manifest.
pub fn assemble(
    photos: Vec<RawPhoto>,
    opts: &AssembleOptions,
    normalizer: &Normalizer,
) -> Result<AssembledBundle, BundleError> {
    let named = normalize_and_name(photos, &opts.identifier, normalizer);

    let file_options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(i32::from(opts.compression_level.min(9))))
        .last_modified_time(zip::DateTime::default());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = Vec::with_capacity(named.len());
    let mut skipped = Vec::new();
    let mut rows = Vec::with_capacity(named.len());

    for photo in &named {
        writer.start_file(photo.name.clone(), file_options)?;
        writer.write_all(&photo.data)?;
        debug!(entry = %photo.name, bytes = photo.data.len(), "wrote archive entry");
        rows.push((
            photo.name.clone(),
            photo.data.len() as u64,
            format!("{:x}", Sha256::digest(&photo.data)),
        ));
        entries.push(photo.name.clone());
        if photo.conversion_skipped {
            skipped.push(photo.name.clone());
        }
    }

    let manifest = render_manifest(opts, &rows);
    writer.start_file(MANIFEST_NAME, file_options)?;
    writer.write_all(manifest.as_bytes())?;

    let data = writer.finish()?.into_inner();
    info!(
        archive = %opts.archive_name,
        entries = entries.len(),
        bytes = data.len(),
        "bundle assembled"
    );
    Ok(AssembledBundle {
        archive_name: opts.archive_name.clone(),
        data,
        entries,
        skipped_conversions: skipped,
    })
}

/// Derive the archive file name: safe stem from `base`, `_NS-<id>` tag when
/// the identifier is non-empty, zero-padded `_parteNN` when a part number is
/// given, and a forced `.zip` extension regardless of what `base` carried.
pub fn apply_serial_to_name(base: &str, identifier: &str, part: Option<u32>) -> String {
    let stem_source = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let mut name = sanitize(stem_source.trim());
    if name.is_empty() {
        name = FALLBACK_ARCHIVE_STEM.to_string();
    }
    if !identifier.is_empty() {
        name.push_str(&format!("_NS-{}", sanitize(identifier)));
    }
    if let Some(part) = part {
        name.push_str(&format!("_parte{part:02}"));
    }
    name.push_str(".zip");
    name
}

fn render_manifest(opts: &AssembleOptions, rows: &[(String, u64, String)]) -> String {
    let mut out = String::new();
    out.push_str(&format!("identificador: {}\n", opts.identifier));
    out.push_str(&format!("arquivo: {}\n", opts.archive_name));
    out.push_str(&format!("gerado_em: {}\n", opts.generated_at.to_rfc3339()));
    out.push_str(&format!("total_fotos: {}\n\n", rows.len()));
    for (name, size, sha) in rows {
        out.push_str(&format!("{name}\t{size}\tsha256={sha}\n"));
    }
    out
}
