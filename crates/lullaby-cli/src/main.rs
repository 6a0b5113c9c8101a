//! Lullaby - generate songs from text prompts
//!
//! Thin command-line front end over `lullaby-core`:
//! - `generate` submits a prompt and waits for the finished song
//! - `status` checks (or waits on) a job submitted earlier
//! - `providers` lists the configured providers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use lullaby_core::music::client::MusicHttp;
use lullaby_core::music::normalize::normalize;
use lullaby_core::music::types::MusicParameters;
use lullaby_core::{
    build_adapter, GenerationOrchestrator, GenerationRequest, ProviderId,
    ProviderJob, Settings,
};

/// Lullaby - text-to-music generation
#[derive(Parser)]
#[command(name = "lullaby")]
#[command(about = "Generate songs from text prompts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Provider to use instead of the configured one (suno, udio, piapi_suno, demo)
    #[arg(short, long, global = true)]
    provider: Option<ProviderId>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a prompt and wait for the song
    Generate {
        /// What the song should be about
        prompt: String,

        #[arg(long)]
        title: Option<String>,

        /// Genre or style tags
        #[arg(long)]
        style: Option<String>,

        /// Custom lyrics to sing instead of generated ones
        #[arg(long)]
        lyrics: Option<String>,

        #[arg(long)]
        instrumental: bool,

        #[arg(long)]
        bpm: Option<u32>,

        /// Musical key, e.g. "C major"
        #[arg(long)]
        key: Option<String>,

        /// Repeat for several instruments
        #[arg(long = "instrument")]
        instruments: Vec<String>,

        #[arg(long)]
        dynamics: Option<String>,

        #[arg(long)]
        vocal_style: Option<String>,

        /// Print the submitted job and return without polling
        #[arg(long)]
        no_wait: bool,

        /// Download the finished audio to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the status of a submitted job
    Status {
        /// Task id returned by the provider
        task_id: String,

        /// Keep polling until the job finishes
        #[arg(long)]
        wait: bool,
    },

    /// List providers and whether they are configured
    Providers,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => {
            let mut settings = Settings::load_from_path(path)?;
            settings.apply_env(|key| std::env::var(key).ok());
            Ok(settings)
        }
        None => Settings::load(),
    }
}

/// Cancel the token on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, abandoning the wait");
            trigger.cancel();
        }
    });
    cancel
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = load_settings(cli.config.as_ref())?;
    let provider = cli.provider.unwrap_or_else(|| settings.effective_provider());

    match cli.command {
        Commands::Providers => {
            println!("Providers:");
            for id in ProviderId::all() {
                let marker = match settings.settings_for(*id) {
                    Ok(_) => "✓",
                    Err(_) => "✗",
                };
                let active = if *id == provider { " (active)" } else { "" };
                println!(
                    "  {} {:<12} {}{} - {}",
                    marker,
                    id.storage_key(),
                    id,
                    active,
                    id.pricing_hint()
                );
            }
        }
        Commands::Generate {
            prompt,
            title,
            style,
            lyrics,
            instrumental,
            bpm,
            key,
            instruments,
            dynamics,
            vocal_style,
            no_wait,
            output,
        } => {
            let http = MusicHttp::new();
            let adapter = build_adapter(&settings.settings_for(provider)?, http.clone())?;
            let orchestrator =
                GenerationOrchestrator::new(adapter).with_budget(settings.poll_budget());

            let mut request = GenerationRequest::new(prompt).with_instrumental(instrumental);
            if let Some(title) = title {
                request = request.with_title(title);
            }
            if let Some(style) = style {
                request = request.with_style(style);
            }
            if let Some(lyrics) = lyrics {
                request = request.with_lyrics(lyrics);
            }
            let params = MusicParameters {
                bpm,
                key,
                instruments,
                dynamics,
                vocal_style,
            };
            if params != MusicParameters::default() {
                request = request.with_music_parameters(params);
            }

            let job = orchestrator.submit(&request).await?;
            if no_wait {
                return print_json(&serde_json::to_value(&job)?);
            }

            let song = orchestrator.wait(&job, &cancel_on_ctrl_c()).await?;
            if let (Some(path), Some(url)) = (&output, &song.audio_url) {
                let bytes = http.download_audio(url).await?;
                tokio::fs::write(path, &bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!("Saved {} bytes to {}", bytes.len(), path.display());
            }
            print_json(&json!({"job": job, "song": song}))?;
        }
        Commands::Status { task_id, wait } => {
            let adapter = build_adapter(&settings.settings_for(provider)?, MusicHttp::new())?;
            let job = ProviderJob::new(provider, task_id);

            if wait {
                let orchestrator =
                    GenerationOrchestrator::new(adapter).with_budget(settings.poll_budget());
                let song = orchestrator.wait(&job, &cancel_on_ctrl_c()).await?;
                print_json(&json!({"status": "COMPLETED", "song": song}))?;
            } else {
                let normalized = normalize(&adapter.fetch_status(&job).await?);
                print_json(&json!({"status": normalized.status, "song": normalized.song}))?;
            }
        }
    }

    Ok(())
}
