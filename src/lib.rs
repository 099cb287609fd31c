pub mod batch;
pub mod bundle;
pub mod config;
pub mod dispatch;
pub mod drive;
pub mod github;
pub mod load_config;
pub mod local;
pub mod normalize;
pub mod sanitize;
pub mod session;
pub mod telegram;
pub mod transport;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::batch::RawPhoto;
use crate::bundle::{apply_serial_to_name, assemble, AssembleOptions, DEFAULT_COMPRESSION_LEVEL};
use crate::config::{Destination, DispatchConfig};
use crate::dispatch::{deposit, dispatch};
use crate::drive::DriveTransport;
use crate::github::GithubTransport;
use crate::load_config::load_config;
use crate::local::LocalStore;
use crate::normalize::Normalizer;
use crate::session::Session;
use crate::telegram::TelegramTransport;
use crate::transport::Transport;

#[derive(Parser)]
#[clap(
    name = "photo-bundle",
    version,
    about = "Bundle tagged inspection photos and deliver them to a local folder, GitHub, Telegram or Drive"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline for one submission using the given config file
    Send {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Equipment identifier; overrides the one in the config file
        #[clap(long)]
        id: Option<String>,
        /// Photo files to send
        #[clap(required = true)]
        photos: Vec<PathBuf>,
    },
    /// Assemble a bundle offline and write it to a local path, without sending
    Pack {
        /// Equipment identifier embedded in names and manifest
        #[clap(long)]
        id: String,
        /// Where to write the assembled archive
        #[clap(long)]
        out: PathBuf,
        /// Re-encode legacy image formats to JPEG
        #[clap(long)]
        convert: bool,
        /// Deflate level, 0-9
        #[clap(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
        level: u8,
        /// Photo files to pack
        #[clap(required = true)]
        photos: Vec<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Send { config, id, photos } => {
            let mut config = load_config(config)?;
            if let Some(id) = id {
                config.identifier = Some(id);
            }
            let Some(identifier) = config.identifier.clone() else {
                bail!("No identifier: pass --id or set `identifier` in the config file");
            };

            let mut session = Session::new(identifier);
            for photo in read_photos(&photos)? {
                session.add_photo(photo);
            }
            let queued = session.take_photos();

            let result = match &config.destination {
                Destination::Local(dest) => {
                    let store = LocalStore::new(dest.root.clone());
                    deposit(&store, &config.bundle, session.identifier(), queued)
                        .map(|report| format!("{report:#?}"))
                }
                Destination::Github(dest) => {
                    let transport = GithubTransport::new(dest.clone());
                    send_bundles(&config, session.identifier(), queued, &transport).await
                }
                Destination::Telegram(dest) => {
                    let transport = TelegramTransport::new(dest.clone());
                    send_bundles(&config, session.identifier(), queued, &transport).await
                }
                Destination::Drive(dest) => {
                    let transport = DriveTransport::new(dest.clone());
                    send_bundles(&config, session.identifier(), queued, &transport).await
                }
            };

            match result {
                Ok(report) => {
                    println!("Send complete.\nReport:");
                    println!("{report}");
                    session.advance_serial();
                    println!("Next identifier: {}", session.identifier());
                    Ok(())
                }
                Err(e) => {
                    eprintln!("[ERROR] Send failed: {e}");
                    Err(anyhow::Error::msg(e))
                }
            }
        }
        Commands::Pack {
            id,
            out,
            convert,
            level,
            photos,
        } => {
            if level > 9 {
                bail!("--level must be between 0 and 9");
            }
            let photos = read_photos(&photos)?;
            let archive_name = out
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .unwrap_or_else(|| apply_serial_to_name("fotos", &id, None));
            let opts = AssembleOptions {
                identifier: id,
                archive_name,
                compression_level: level,
                generated_at: chrono::Utc::now(),
            };
            let normalizer = Normalizer::new(convert);
            let bundle = assemble(photos, &opts, &normalizer)
                .map_err(|e| anyhow::anyhow!("Bundle assembly failed: {e:?}"))?;
            std::fs::write(&out, &bundle.data)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!(
                "Pack complete: {} ({} entries, {} bytes)",
                out.display(),
                bundle.entries.len(),
                bundle.data.len()
            );
            Ok(())
        }
    }
}

async fn send_bundles<T: Transport>(
    config: &DispatchConfig,
    identifier: &str,
    photos: Vec<RawPhoto>,
    transport: &T,
) -> Result<String, String> {
    let local_copy = config.local_copy_root.clone().map(LocalStore::new);
    let report = dispatch(
        &config.bundle,
        identifier,
        photos,
        transport,
        local_copy.as_ref(),
    )
    .await?;
    Ok(format!("{report:#?}"))
}

/// Read each path into an in-memory photo, keeping the original file name.
fn read_photos(paths: &[PathBuf]) -> Result<Vec<RawPhoto>> {
    let mut photos = Vec::with_capacity(paths.len());
    for path in paths {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read photo {}", path.display()))?;
        let original_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        photos.push(RawPhoto::new(original_name, data));
    }
    Ok(photos)
}
