//! Local filesystem sink: per-identifier photo folders, an append-only
//! `registro.csv`, and a rebuilt `<id>_inspecao.zip` snapshot.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::sanitize::sanitize;
use crate::transport::{Delivery, SendContext, Transport, TransportError};

/// Running log of everything stored for an identifier, one row per file:
/// `timestamp,identifier,filename`.
pub const REGISTRY_FILE: &str = "registro.csv";

/// Suffix of the per-identifier snapshot archive.
const INSPECTION_SUFFIX: &str = "_inspecao.zip";

/// Writes bundles and photos under `<root>/<sanitized identifier>/`.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory that holds everything stored for `identifier`.
    pub fn identifier_dir(&self, identifier: &str) -> PathBuf {
        self.root.join(sanitize(identifier))
    }

    /// Path of the snapshot archive sitting next to the identifier directory.
    pub fn inspection_archive_path(&self, identifier: &str) -> PathBuf {
        self.root
            .join(format!("{}{INSPECTION_SUFFIX}", sanitize(identifier)))
    }

    /// Write each named photo into the identifier directory and append one
    /// `registro.csv` row per photo. Existing files are overwritten silently.
    /// Directory creation is idempotent, so concurrent submissions with the
    /// same identifier may race on it without failing.
    pub fn store_photos(
        &self,
        identifier: &str,
        photos: &[(String, Vec<u8>)],
    ) -> Result<Vec<PathBuf>, TransportError> {
        let dir = self.identifier_dir(identifier);
        fs::create_dir_all(&dir)?;
        let mut registry = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(REGISTRY_FILE))?;

        let mut stored = Vec::with_capacity(photos.len());
        for (name, data) in photos {
            let path = dir.join(name);
            fs::write(&path, data)?;
            writeln!(registry, "{},{},{}", Utc::now().to_rfc3339(), identifier, name)?;
            debug!(path = %path.display(), bytes = data.len(), "stored photo");
            stored.push(path);
        }
        info!(count = photos.len(), dir = %dir.display(), "photos stored locally");
        Ok(stored)
    }

    /// Rebuild `<id>_inspecao.zip` from the current contents of the
    /// identifier directory, fully replacing any previous snapshot. The
    /// archive is staged in a temporary file and renamed into place, so a
    /// failed rebuild never leaves a truncated snapshot behind.
    pub fn rebuild_inspection_archive(
        &self,
        identifier: &str,
        compression_level: u8,
    ) -> Result<PathBuf, TransportError> {
        let dir = self.identifier_dir(identifier);
        let archive_path = self.inspection_archive_path(identifier);

        let mut names: Vec<String> = fs::read_dir(&dir)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                if entry.path().is_file() {
                    entry.file_name().to_str().map(str::to_string)
                } else {
                    None
                }
            })
            .collect();
        names.sort();

        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i32::from(compression_level.min(9))))
            .last_modified_time(zip::DateTime::default());

        let staging = tempfile::NamedTempFile::new_in(&self.root)?;
        let mut writer = ZipWriter::new(staging.reopen()?);
        for name in &names {
            writer.start_file(name.clone(), options).map_err(zip_to_io)?;
            let data = fs::read(dir.join(name))?;
            writer.write_all(&data)?;
        }
        writer.finish().map_err(zip_to_io)?;
        staging
            .persist(&archive_path)
            .map_err(|e| TransportError::Io(e.error))?;

        info!(
            archive = %archive_path.display(),
            entries = names.len(),
            "inspection archive rebuilt"
        );
        Ok(archive_path)
    }
}

fn zip_to_io(e: zip::result::ZipError) -> TransportError {
    TransportError::Io(std::io::Error::other(e))
}

#[async_trait]
impl Transport for LocalStore {
    async fn send(
        &self,
        payload: &[u8],
        target_name: &str,
        ctx: &SendContext,
    ) -> Result<Delivery, TransportError> {
        let dir = self.identifier_dir(&ctx.identifier);
        fs::create_dir_all(&dir)?;
        let path = dir.join(target_name);
        fs::write(&path, payload)?;
        info!(path = %path.display(), bytes = payload.len(), "bundle written locally");
        Ok(Delivery {
            location: path.display().to_string(),
        })
    }
}
