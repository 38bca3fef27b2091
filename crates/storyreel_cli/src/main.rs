//! Command-line front end: render a composition job file to a video.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use storyreel_core::config::Settings;
use storyreel_core::models::CompositionRequest;
use storyreel_core::{CancelHandle, Compositor, ProgressSink};

#[derive(Parser)]
#[command(name = "storyreel", version, about = "Scene-to-video compositor")]
struct Cli {
    /// Path to a settings TOML file.
    #[arg(long, global = true, env = "STORYREEL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a composition request (JSON) into a video file.
    Render {
        /// Path to the request JSON.
        job: PathBuf,

        /// Where to write the video; defaults to the artifact's own
        /// file name in the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the configured engine sources in the order they are tried.
    Sources,
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_or_default(path)
            .with_context(|| format!("could not load settings from {}", path.display())),
        None => Ok(Settings::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    storyreel_core::logging::init_tracing("info");

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_ref())?;

    match cli.command {
        Command::Render { job, output } => render(settings, &job, output).await,
        Command::Sources => {
            for source in &settings.engine.sources {
                println!("{}\t{}", source.name, source.manifest_url);
            }
            Ok(())
        }
    }
}

async fn render(settings: Settings, job: &PathBuf, output: Option<PathBuf>) -> Result<()> {
    let raw = std::fs::read(job)
        .with_context(|| format!("could not read job file {}", job.display()))?;
    let request: CompositionRequest =
        serde_json::from_slice(&raw).context("job file is not a valid composition request")?;

    let compositor = Compositor::new(settings);
    let progress = ProgressSink::new(Box::new(|record| {
        info!(
            stage = %record.stage,
            percent = record.percent,
            "{}",
            record.message
        );
    }));
    let cancel = CancelHandle::new();

    let artifact = compositor.compose(&request, &progress, &cancel).await?;

    let path = output.unwrap_or_else(|| PathBuf::from(&artifact.file_name));
    std::fs::write(&path, &artifact.bytes)
        .with_context(|| format!("could not write {}", path.display()))?;
    println!(
        "{} ({:.2}s, {} bytes)",
        path.display(),
        artifact.duration_seconds,
        artifact.bytes.len()
    );
    Ok(())
}
