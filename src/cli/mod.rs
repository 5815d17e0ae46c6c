//! Command-line interface for songq.
//!
//! Provides the server plus one-shot commands for requesting songs,
//! controlling playback and inspecting the cache. One-shot commands load the
//! saved state, act on it and save it again.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{MediaTool, YtDlp};
use crate::config::{self, paths, ResolvedConfig};
use crate::core::{AddOutcome, Jukebox, QueueTarget};
use crate::domain::{CacheEntry, QueueEntry};
use crate::server;

/// songq - song-request media queue
#[derive(Parser, Debug)]
#[command(name = "songq")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP + WebSocket server
    Serve {
        /// Address to bind to (defaults to server.bind from config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Request a song: resolve, download if needed, and queue it
    Add {
        /// Media URL
        url: String,
    },

    /// Remove songs from the queue by URL or zero-based position
    Remove {
        /// URL or position
        target: String,
    },

    /// Resume the current song
    Play,

    /// Pause the current song
    Pause,

    /// Skip the current song
    Skip,

    /// Show how long until the queue runs dry
    Eta,

    /// List the queue
    Queue,

    /// Resolve and cache a song without queueing it
    Cache {
        /// Media URL
        url: String,
    },

    /// Look a song up in the cache without downloading
    Lookup {
        /// Media URL or bare id
        url: String,
    },

    /// Remove invalid, orphaned and duplicate cache entries
    Cleanup,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve { bind } => serve(bind).await,
            Commands::Config => show_config().await,
            command => run_once(command).await,
        }
    }
}

/// Build the jukebox from config, creating directories and loading state
async fn open_jukebox(cfg: &ResolvedConfig) -> Result<Jukebox> {
    paths::ensure_dirs(cfg)?;
    let jukebox = Jukebox::from_config(cfg).context("Failed to set up jukebox")?;
    jukebox.start().await.context("Failed to load saved state")?;
    Ok(jukebox)
}

/// Start the server and save state on Ctrl-C
async fn serve(bind: Option<String>) -> Result<()> {
    let cfg = config::config()?;
    let jukebox = Arc::new(open_jukebox(cfg).await?);
    let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());

    let served = server::serve(Arc::clone(&jukebox), &bind).await;
    jukebox
        .shutdown()
        .await
        .context("Failed to save state on shutdown")?;
    served
}

/// Run a one-shot command against the saved state
async fn run_once(command: Commands) -> Result<()> {
    let cfg = config::config()?;
    let jukebox = open_jukebox(cfg).await?;

    let result = dispatch(&jukebox, command).await;

    jukebox.cleanup_cache().await;
    jukebox.save().await.context("Failed to save state")?;
    result
}

async fn dispatch(jukebox: &Jukebox, command: Commands) -> Result<()> {
    match command {
        Commands::Add { url } => {
            let outcome = jukebox
                .add_to_queue(&url)
                .await
                .with_context(|| format!("Failed to add {}", url))?;
            match &outcome {
                AddOutcome::Queued { .. } => println!("{}", outcome.message()),
                AddOutcome::Blocked { .. } => eprintln!("{}", outcome.message()),
            }
        }
        Commands::Remove { target } => {
            let target = match target.parse::<usize>() {
                Ok(position) => QueueTarget::Position(position),
                Err(_) => QueueTarget::Url(target),
            };
            let removed = jukebox.remove_from_queue(target).await?;
            println!("Removed {} entries from queue", removed);
        }
        Commands::Play => match jukebox.play().await {
            Some(_) => print_now_playing(jukebox).await,
            None => println!("Queue is empty"),
        },
        Commands::Pause => match jukebox.pause().await {
            Some(_) => print_now_playing(jukebox).await,
            None => println!("Queue is empty"),
        },
        Commands::Skip => match jukebox.skip().await {
            Some(skipped) => {
                println!("Skipped: {}", describe(&skipped.skipped.song));
                match skipped.next {
                    Some(next) => println!("Now playing: {}", describe(&next.song)),
                    None => println!("Queue is now empty"),
                }
            }
            None => println!("Nothing to skip. Queue is empty."),
        },
        Commands::Eta => {
            println!("Queue empty in: {}", jukebox.queue_empty_in_as_string().await);
        }
        Commands::Queue => list_queue(&jukebox.queue_entries().await),
        Commands::Cache { url } => {
            let entry = jukebox
                .cache_song(&url)
                .await
                .with_context(|| format!("Failed to cache {}", url))?;
            print_entry(&entry);
        }
        Commands::Lookup { url } => {
            let id = url
                .parse()
                .with_context(|| format!("Not a media URL or id: {}", url))?;
            match jukebox.get_cache_entry_by_id(&id).await {
                Some(entry) => print_entry(&entry),
                None => println!("{} is not cached", id),
            }
        }
        Commands::Cleanup => {
            let removed = jukebox.cleanup_cache().await;
            println!("Removed {} cache entries", removed);
        }
        other @ (Commands::Serve { .. } | Commands::Config) => {
            anyhow::bail!("{:?} is not a one-shot command", other)
        }
    }
    Ok(())
}

fn describe(entry: &CacheEntry) -> String {
    format!("{} - {}", entry.artist, entry.title)
}

async fn print_now_playing(jukebox: &Jukebox) {
    if let Some(head) = jukebox.now_playing().await {
        let state = if head.paused { "Paused" } else { "Playing" };
        println!("{}: {}", state, describe(&head.song));
    }
}

fn list_queue(entries: &[QueueEntry]) {
    if entries.is_empty() {
        println!("Queue is empty. Use 'songq add <url>' to request a song.");
        return;
    }

    println!("{:<4} {:<13} {:<9} {:<50}", "POS", "ID", "LENGTH", "SONG");
    println!("{}", "-".repeat(80));

    for (pos, entry) in entries.iter().enumerate() {
        let mut song = describe(&entry.song);
        if entry.paused {
            song.push_str(" [paused]");
        }
        if entry.from_backup_playlist {
            song.push_str(" [backup]");
        }
        println!(
            "{:<4} {:<13} {:<9} {:<50}",
            pos,
            entry.id().as_str(),
            format_length(entry.duration()),
            song
        );
    }

    println!("\nTotal: {} songs", entries.len());
}

fn format_length(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

fn print_entry(entry: &CacheEntry) {
    println!("  ID:       {}", entry.id);
    println!("  Title:    {}", entry.title);
    println!("  Artist:   {}", entry.artist);
    println!("  URL:      {}", entry.url);
    println!("  Length:   {}", format_length(entry.duration));
    match entry.block_reason {
        Some(reason) => println!("  Blocked:  {}", reason),
        None if entry.blocked => println!("  Blocked:  yes"),
        None => {}
    }
    if let Some(local) = &entry.local_data {
        println!("  File:     {}", local.full_path.display());
        println!("  Fetched:  {}", local.downloaded_at);
        if let Some(played) = local.last_played_at {
            println!("  Played:   {}", played);
        }
    }
}

/// Show resolved configuration
async fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("songq configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:      {}", cfg.home.display());
    println!("  Downloads: {}", cfg.download_dir.display());
    println!("  Cache:     {}", cfg.cache_file.display());
    println!("  Queue:     {}", cfg.queue_file.display());
    println!();
    println!("Music:");
    println!("  Max song duration: {}s", cfg.music.max_song_duration_seconds);
    println!(
        "  Cookies from:      {}",
        cfg.music.cookies_from_browser.browser_name().unwrap_or("(none)")
    );
    println!();
    println!("Download:");
    println!("  Binary:            {}", cfg.download.binary);
    println!("  Output template:   {}", cfg.download.output_template);
    println!("  File watch limit:  {}s", cfg.download.file_watch_timeout_seconds);
    match cfg.download.process_timeout_seconds {
        Some(seconds) => println!("  Process limit:     {}s", seconds),
        None => println!("  Process limit:     (none)"),
    }

    let tool = YtDlp::with_binary_path(&cfg.download.binary);
    match tool.health_check().await {
        Ok(version) => println!("  {} version:   {}", tool.name(), version),
        Err(e) => println!("  {} unavailable: {}", tool.name(), e),
    }
    println!();
    println!("Server:");
    println!("  Bind: {}", cfg.server.bind);

    Ok(())
}
