use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::{
    BundleOptions, Destination, DispatchConfig, DriveDestination, GithubDestination,
    LocalDestination, TelegramDestination,
};

#[derive(Deserialize)]
struct StaticConfig {
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    bundle: BundleSection,
    destination: DestinationYaml,
    #[serde(default)]
    local_copy_root: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct BundleSection {
    archive_base_name: Option<String>,
    convert_legacy_formats: Option<bool>,
    compression_level: Option<u8>,
    batch_size_ceiling: Option<u64>,
    caption: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum DestinationYaml {
    Local {
        root: PathBuf,
    },
    Github {
        owner: String,
        repo: String,
        #[serde(default = "default_branch")]
        branch: String,
        #[serde(default)]
        base_path: String,
    },
    Telegram {
        chat_id: String,
    },
    Drive {
        root_folder_id: String,
    },
}

fn default_branch() -> String {
    "main".to_string()
}

/// Loads a static YAML config file (no secrets) and resolves destination
/// credentials from the environment. Credentials are validated here, eagerly,
/// so a missing token fails as one clear precondition error instead of deep
/// inside a network call.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DispatchConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let static_conf: StaticConfig = match serde_yaml::from_str(&content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    let destination = match static_conf.destination {
        DestinationYaml::Local { root } => Destination::Local(LocalDestination { root }),
        DestinationYaml::Github {
            owner,
            repo,
            branch,
            base_path,
        } => {
            let token = require_env("GITHUB_TOKEN")?;
            Destination::Github(GithubDestination {
                token,
                owner,
                repo,
                branch,
                base_path,
            })
        }
        DestinationYaml::Telegram { chat_id } => {
            let token = require_env("TELEGRAM_BOT_TOKEN")?;
            Destination::Telegram(TelegramDestination { token, chat_id })
        }
        DestinationYaml::Drive { root_folder_id } => {
            let access_token = require_env("DRIVE_ACCESS_TOKEN")?;
            Destination::Drive(DriveDestination {
                access_token,
                root_folder_id,
            })
        }
    };

    let defaults = BundleOptions::default();
    let section = static_conf.bundle;
    let compression_level = section
        .compression_level
        .unwrap_or(defaults.compression_level);
    if compression_level > 9 {
        error!(compression_level, "compression_level out of range");
        anyhow::bail!("compression_level must be between 0 and 9, got {compression_level}");
    }
    let bundle = BundleOptions {
        archive_base_name: section
            .archive_base_name
            .unwrap_or(defaults.archive_base_name),
        convert_legacy_formats: section
            .convert_legacy_formats
            .unwrap_or(defaults.convert_legacy_formats),
        compression_level,
        batch_size_ceiling: section
            .batch_size_ceiling
            .unwrap_or(defaults.batch_size_ceiling),
        caption: section.caption.filter(|c| !c.is_empty()),
    };

    let config = DispatchConfig {
        identifier: static_conf.identifier.filter(|i| !i.trim().is_empty()),
        bundle,
        destination,
        local_copy_root: static_conf.local_copy_root,
    };
    config.trace_loaded();
    Ok(config)
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            info!(var = name, "credential found in environment");
            Ok(value)
        }
        _ => {
            error!(var = name, "required credential missing from environment");
            Err(anyhow::anyhow!("{name} environment variable not set"))
        }
    }
}
