use std::path::PathBuf;

use tracing::info;

use crate::batch::DEFAULT_BATCH_CEILING;
use crate::bundle::DEFAULT_COMPRESSION_LEVEL;

/// Options shaping every assembled bundle.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub archive_base_name: String,
    pub convert_legacy_formats: bool,
    /// Deflate level 0-9.
    pub compression_level: u8,
    /// Per-batch byte ceiling for destinations with an upload limit.
    pub batch_size_ceiling: u64,
    pub caption: Option<String>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            archive_base_name: "fotos".to_string(),
            convert_legacy_formats: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            batch_size_ceiling: DEFAULT_BATCH_CEILING,
            caption: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocalDestination {
    pub root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GithubDestination {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub base_path: String,
}

#[derive(Debug, Clone)]
pub struct TelegramDestination {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct DriveDestination {
    pub access_token: String,
    pub root_folder_id: String,
}

#[derive(Debug, Clone)]
pub enum Destination {
    Local(LocalDestination),
    Github(GithubDestination),
    Telegram(TelegramDestination),
    Drive(DriveDestination),
}

impl Destination {
    pub fn kind(&self) -> &'static str {
        match self {
            Destination::Local(_) => "local",
            Destination::Github(_) => "github",
            Destination::Telegram(_) => "telegram",
            Destination::Drive(_) => "drive",
        }
    }

    pub fn trace_loaded(&self) {
        match self {
            Destination::Local(l) => {
                info!(root = %l.root.display(), "Loaded local destination");
            }
            Destination::Github(g) => {
                info!(
                    owner = %g.owner,
                    repo = %g.repo,
                    branch = %g.branch,
                    base_path = %g.base_path,
                    token_len = g.token.len(),
                    "Loaded GitHub destination"
                );
            }
            Destination::Telegram(t) => {
                info!(
                    chat_id = %t.chat_id,
                    token_len = t.token.len(),
                    "Loaded Telegram destination"
                );
            }
            Destination::Drive(d) => {
                info!(
                    root_folder_id = %d.root_folder_id,
                    token_len = d.access_token.len(),
                    "Loaded Drive destination"
                );
            }
        }
    }
}

/// Fully resolved configuration for one dispatch run.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub identifier: Option<String>,
    pub bundle: BundleOptions,
    pub destination: Destination,
    /// When set, bundles sent to a remote destination are also written here.
    pub local_copy_root: Option<PathBuf>,
}

impl DispatchConfig {
    pub fn trace_loaded(&self) {
        info!(
            destination = self.destination.kind(),
            identifier = self.identifier.as_deref().unwrap_or("<unset>"),
            convert_legacy = self.bundle.convert_legacy_formats,
            compression_level = self.bundle.compression_level,
            batch_ceiling = self.bundle.batch_size_ceiling,
            "Loaded DispatchConfig"
        );
        self.destination.trace_loaded();
    }
}
