//! High-level pipeline: orchestrates one submission from raw photos to
//! delivered bundles.
//!
//! This module provides the top-level orchestration for "dispatching" a
//! session's queued photos. It implements a coordinated pipeline that:
//!   - Validates the submission (identifier present, at least one photo)
//!     before any I/O happens
//!   - Partitions the photos into size-bounded batches
//!   - Assembles one archive per batch (unique names, optional legacy-format
//!     conversion, manifest)
//!   - Hands each archive to exactly one [`Transport`], strictly in order
//!   - Aggregates and returns a report of what was delivered where.
//!
//! # Error Handling
//! Fail-fast per submission: the first batch that fails to assemble or send
//! aborts the remaining batches. Earlier batches stay delivered; nothing is
//! rolled back and nothing is retried.
//!
//! # Callable From
//! - Used by both the CLI and integration tests
//! - Expects a concrete (async) [`Transport`] implementation for delivery

use chrono::Utc;
use tracing::{error, info, warn};

use crate::batch::{chunk, RawPhoto};
use crate::bundle::{apply_serial_to_name, assemble, normalize_and_name, AssembleOptions};
use crate::config::BundleOptions;
use crate::local::LocalStore;
use crate::normalize::Normalizer;
use crate::transport::{SendContext, Transport};

/// Outcome of one submission: one entry per delivered bundle.
#[derive(Debug)]
pub struct DispatchReport {
    pub identifier: String,
    pub bundles: Vec<BundleReport>,
}

#[derive(Debug)]
pub struct BundleReport {
    pub archive_name: String,
    pub size_bytes: u64,
    pub entries: Vec<String>,
    pub skipped_conversions: Vec<String>,
    pub delivery: String,
}

/// Outcome of a local deposit: unpacked files plus the snapshot archive.
#[derive(Debug)]
pub struct DepositReport {
    pub identifier: String,
    pub directory: String,
    pub stored: Vec<String>,
    pub archive: String,
}

/// Entrypoint: deliver `photos` tagged with `identifier` through `transport`,
/// one bundle per batch. When `local_copy` is given, every delivered bundle
/// is also written to that store.
pub async fn dispatch<T: Transport>(
    bundle_opts: &BundleOptions,
    identifier: &str,
    photos: Vec<RawPhoto>,
    transport: &T,
    local_copy: Option<&LocalStore>,
) -> Result<DispatchReport, String> {
    if identifier.trim().is_empty() {
        return Err("identifier must not be empty".to_string());
    }
    if photos.is_empty() {
        return Err("no photos to send".to_string());
    }

    info!(identifier, photos = photos.len(), "[DISPATCH] Starting submission");

    let normalizer = Normalizer::new(bundle_opts.convert_legacy_formats);
    let batches = chunk(photos, bundle_opts.batch_size_ceiling);
    let total = batches.len();
    info!(batches = total, "[DISPATCH] Photos partitioned");

    let ctx = SendContext {
        identifier: identifier.to_string(),
        caption: bundle_opts.caption.clone(),
    };
    let generated_at = Utc::now();
    let mut reports = Vec::with_capacity(total);

    for (index, batch) in batches.into_iter().enumerate() {
        let part = if total > 1 {
            Some((index + 1) as u32)
        } else {
            None
        };
        let archive_name = apply_serial_to_name(&bundle_opts.archive_base_name, identifier, part);
        let opts = AssembleOptions {
            identifier: identifier.to_string(),
            archive_name: archive_name.clone(),
            compression_level: bundle_opts.compression_level,
            generated_at,
        };

        let bundle = match assemble(batch.photos, &opts, &normalizer) {
            Ok(bundle) => bundle,
            Err(e) => {
                error!(archive = %archive_name, error = ?e, "[DISPATCH][ERROR] Bundle assembly failed");
                return Err(format!("Bundle assembly failed for {archive_name}: {e:?}"));
            }
        };
        if !bundle.skipped_conversions.is_empty() {
            warn!(
                archive = %archive_name,
                skipped = bundle.skipped_conversions.len(),
                "[DISPATCH] Some photos kept their original bytes, conversion failed"
            );
        }

        let delivery = match transport.send(&bundle.data, &archive_name, &ctx).await {
            Ok(delivery) => {
                info!(archive = %archive_name, location = %delivery.location, "[DISPATCH] Bundle delivered");
                delivery
            }
            Err(e) => {
                // Earlier bundles stay delivered: fail fast, no rollback.
                error!(archive = %archive_name, error = %e, "[DISPATCH][ERROR] Delivery failed, aborting remaining batches");
                return Err(format!("Delivery failed for {archive_name}: {e}"));
            }
        };

        if let Some(store) = local_copy {
            if let Err(e) = store.send(&bundle.data, &archive_name, &ctx).await {
                error!(archive = %archive_name, error = %e, "[DISPATCH][ERROR] Local copy failed");
                return Err(format!("Local copy failed for {archive_name}: {e}"));
            }
        }

        reports.push(BundleReport {
            archive_name,
            size_bytes: bundle.data.len() as u64,
            entries: bundle.entries,
            skipped_conversions: bundle.skipped_conversions,
            delivery: delivery.location,
        });
    }

    Ok(DispatchReport {
        identifier: identifier.to_string(),
        bundles: reports,
    })
}

/// Local route: photos land unpacked in the identifier directory with one
/// `registro.csv` row each, and the `<id>_inspecao.zip` snapshot of that
/// directory is rebuilt from scratch.
pub fn deposit(
    store: &LocalStore,
    bundle_opts: &BundleOptions,
    identifier: &str,
    photos: Vec<RawPhoto>,
) -> Result<DepositReport, String> {
    if identifier.trim().is_empty() {
        return Err("identifier must not be empty".to_string());
    }
    if photos.is_empty() {
        return Err("no photos to store".to_string());
    }

    info!(identifier, photos = photos.len(), "[DEPOSIT] Storing photos locally");

    let normalizer = Normalizer::new(bundle_opts.convert_legacy_formats);
    let named = normalize_and_name(photos, identifier, &normalizer);
    let files: Vec<(String, Vec<u8>)> = named.into_iter().map(|p| (p.name, p.data)).collect();

    let stored = match store.store_photos(identifier, &files) {
        Ok(paths) => paths,
        Err(e) => {
            error!(identifier, error = %e, "[DEPOSIT][ERROR] Local store failed");
            return Err(format!("Local store failed: {e}"));
        }
    };
    let archive = match store.rebuild_inspection_archive(identifier, bundle_opts.compression_level)
    {
        Ok(path) => path,
        Err(e) => {
            error!(identifier, error = %e, "[DEPOSIT][ERROR] Snapshot rebuild failed");
            return Err(format!("Snapshot rebuild failed: {e}"));
        }
    };

    Ok(DepositReport {
        identifier: identifier.to_string(),
        directory: store.identifier_dir(identifier).display().to_string(),
        stored: stored.iter().map(|p| p.display().to_string()).collect(),
        archive: archive.display().to_string(),
    })
}
