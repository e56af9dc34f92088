use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use content_studio::pipeline::capture::{self, CaptureLimits};
use content_studio::posts::{Backend, NewPost, Platform};
use content_studio::state::{
    EditAction, EditorSession, ImageStore, MemoryImageStore, SqliteImageStore, CAPTURED_IMAGE_KEY,
    EDITED_IMAGE_KEY,
};
use content_studio::{Result, StudioConfig, StudioError};

#[derive(Parser, Debug)]
#[command(name = "content-studio", version, about = "Capture, edit and schedule images")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate an image file and hand it to the editor
    Capture { file: PathBuf },
    /// Apply edits to the captured image (e.g. rotate_90 crop:0,0,100,100)
    Edit {
        actions: Vec<EditAction>,
        /// Undo this many steps after applying
        #[arg(long, default_value_t = 0)]
        undo: usize,
        /// Also write the result to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List pickable images under a folder
    Scan { folder: PathBuf },
    /// Upload the edited image and schedule a post
    Schedule {
        #[arg(long)]
        caption: String,
        /// RFC 3339 time, e.g. 2026-11-01T09:00:00Z
        #[arg(long)]
        at: DateTime<Utc>,
        #[arg(long = "platform", required = true)]
        platforms: Vec<Platform>,
    },
    /// List scheduled posts
    Posts,
    /// Remove stored images older than the configured max age
    Cleanup,
}

/// Main application state
struct Studio {
    config: StudioConfig,
    /// Durable store, or memory-only if it could not be opened
    store: Arc<dyn ImageStore>,
    backend: Backend,
}

impl Studio {
    /// Composition root: config, store and backend are built once here
    async fn new() -> Result<Self> {
        let config = StudioConfig::load()?;

        let store: Arc<dyn ImageStore> = match SqliteImageStore::open(config.store_path()).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::warn!(error = %e, "Image store unavailable, continuing in memory-only mode");
                Arc::new(MemoryImageStore::new())
            }
        };
        store.cleanup_expired(config.image_max_age()).await;

        let backend = Backend::from_config(&config).await?;

        Ok(Studio {
            config,
            store,
            backend,
        })
    }

    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Capture { file } => {
                let limits = CaptureLimits::from_config(&self.config);
                let payload = capture::capture_file(&file, &limits).await?;
                self.store.set_item(CAPTURED_IMAGE_KEY, &payload).await?;
                println!("Captured {} ({}, {} bytes)", file.display(), payload.mime, payload.len());
            }
            Command::Edit { actions, undo, out } => {
                let mut session = EditorSession::from_store(self.store.as_ref(), self.config.output_format)
                    .await?
                    .ok_or_else(|| StudioError::Config("nothing captured yet; run `capture` first".into()))?;

                for action in actions {
                    session.apply(action).await?;
                }
                for _ in 0..undo {
                    if session.undo().is_none() {
                        break;
                    }
                }

                for (i, entry) in session.history().entries().iter().enumerate() {
                    let marker = if i == session.history().cursor() { ">" } else { " " };
                    println!("{} {:>2} {:<24} {}", marker, i, entry.action.label(), entry.timestamp.format("%H:%M:%S"));
                }

                if let Err(e) = session.persist(self.store.as_ref()).await {
                    // Edits stay usable for this run; the next screen just won't see them
                    tracing::warn!(error = %e, "Could not persist edited image");
                }
                if let Some(path) = out {
                    tokio::fs::write(&path, &session.current().bytes).await?;
                    println!("Wrote {}", path.display());
                }
            }
            Command::Scan { folder } => {
                let found = capture::scan_folder(&folder);
                for path in &found {
                    println!("{}", path.display());
                }
                println!("{} images", found.len());
            }
            Command::Schedule {
                caption,
                at,
                platforms,
            } => {
                let image = match self.store.get_item(EDITED_IMAGE_KEY).await? {
                    Some(image) => image,
                    None => self
                        .store
                        .get_item(CAPTURED_IMAGE_KEY)
                        .await?
                        .ok_or_else(|| StudioError::Config("no image to post; run `capture` first".into()))?,
                };
                let post = NewPost {
                    caption,
                    image_url: None,
                    platforms,
                    scheduled_at: at,
                };
                let scheduled = self.backend.publish(&image, post).await?;
                println!("Scheduled {} for {}", scheduled.id, scheduled.scheduled_at);
            }
            Command::Posts => {
                for post in self.backend.posts.list().await? {
                    let platforms: Vec<_> = post.platforms.iter().map(|p| p.as_str()).collect();
                    println!(
                        "{} {} {:?} [{}] {}",
                        post.id,
                        post.scheduled_at,
                        post.status,
                        platforms.join(","),
                        post.caption
                    );
                }
            }
            Command::Cleanup => {
                self.store.cleanup_expired(self.config.image_max_age()).await;
                let keys = self.store.keys().await?;
                println!("{} stored images: {}", keys.len(), keys.join(", "));
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result = match Studio::new().await {
        Ok(studio) => studio.run(cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
