/// Twindeck - two-lane playlist console for radio automation
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twindeck_console::{restore_sessions, Command, ConsoleConfig, Engine};
use twindeck_core::{CueSheetIndex, FRAMES_PER_SECOND};
use twindeck_metadata::{LoftyMetadataReader, MediaResolver};
use twindeck_playback::session::load_session;
use twindeck_playback::{Console, MixerClient};

type ChildMixer = MixerClient<BufReader<ChildStdout>, ChildStdin>;

#[derive(Parser)]
#[command(name = "twindeck")]
#[command(about = "Two-lane playlist console driving an external mixer", long_about = None)]
struct Cli {
    /// Configuration file path (default: ./twindeck.toml)
    #[arg(short, long, global = true, env = "TWINDECK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the mixer and run the console, reading commands from stdin
    Run,
    /// Parse a cue sheet and print its index
    Cue {
        /// Cue sheet path
        path: PathBuf,
    },
    /// Print the rows of a session file
    Session {
        /// Session file path
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twindeck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            run(cli.config.as_deref()).await?;
        }
        Commands::Cue { path } => {
            show_cuesheet(&path)?;
        }
        Commands::Session { path } => {
            show_session(&path)?;
        }
    }

    Ok(())
}

async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    // Load configuration
    let config = ConsoleConfig::load(config_path)?;
    config.validate()?;

    tracing::info!("Starting Twindeck console");
    tracing::info!("Mixer: {}", config.mixer.command.display());
    tracing::info!("Sessions: {}", config.session.directory.display());

    let (mut child, mixer) = spawn_mixer(&config)?;
    let mut console = Console::new(mixer, config.playback.clone());

    let resolver = MediaResolver::new(Arc::new(LoftyMetadataReader::new()));
    restore_sessions(&mut console, &config.session, &resolver);

    let interval = Duration::from_millis(config.playback.tick_interval_ms);
    let engine = Engine::spawn(console, config.session.clone(), interval)?;
    tracing::info!("Console running, type commands (play left, skip right, quit)");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Shutdown) => break,
                    Ok(command) => engine.send(command)?,
                    Err(e) => tracing::warn!("{}", e),
                }
            }
        }
    }

    tokio::task::spawn_blocking(move || engine.shutdown()).await??;

    if let Err(e) = child.kill() {
        tracing::debug!("Mixer already gone: {}", e);
    }
    let status = child.wait()?;
    tracing::info!("Mixer exited with {}", status);
    Ok(())
}

fn spawn_mixer(config: &ConsoleConfig) -> anyhow::Result<(Child, ChildMixer)> {
    let mut child = std::process::Command::new(&config.mixer.command)
        .args(&config.mixer.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start mixer {}", config.mixer.command.display()))?;

    let stdin = child.stdin.take().context("mixer stdin not captured")?;
    let stdout = child.stdout.take().context("mixer stdout not captured")?;
    tracing::info!("Mixer started (pid {})", child.id());

    let client = MixerClient::new(
        BufReader::new(stdout),
        stdin,
        config.mixer.reply_prefix.clone(),
        config.mixer.target.clone(),
    );
    Ok((child, client))
}

fn show_cuesheet(path: &Path) -> anyhow::Result<()> {
    let reader = LoftyMetadataReader::new();
    let entry = twindeck_cuesheet::cuesheet_entry(path, &reader)
        .with_context(|| format!("cannot read cue sheet {}", path.display()))?;

    println!("{}", entry.display_markup());
    println!("Length: {}s", entry.length_seconds());
    if let Some(index) = entry.cuesheet() {
        print_index(index);
    }
    Ok(())
}

fn print_index(index: &CueSheetIndex) {
    println!("{:<6} {:<6} {:>9} {:>9}  Title", "Track", "Index", "Start", "Length");
    for track in index.tracks() {
        println!(
            "{:<6} {:<6} {:>9} {:>9}  {} - {}{}",
            track.track_number,
            track.index_number,
            timecode(track.offset),
            timecode(track.duration),
            track.performer,
            track.title,
            if track.playable { "" } else { " (missing)" }
        );
    }
}

/// mm:ss:ff from a frame count
fn timecode(frames: u64) -> String {
    let seconds = frames / FRAMES_PER_SECOND;
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 60,
        seconds % 60,
        frames % FRAMES_PER_SECOND
    )
}

fn show_session(path: &Path) -> anyhow::Result<()> {
    let load = load_session(path)?;

    println!("Mode: {}", load.settings.mode);
    println!("Fade: {:?}", load.settings.fade);
    for (row, entry) in load.entries.iter().enumerate() {
        let marker = if load.select == Some(row) { '>' } else { ' ' };
        println!(
            "{marker}{row:>4}  {:>6}  {}",
            entry.length_seconds(),
            entry.display_markup()
        );
    }
    if !load.pending.is_empty() {
        println!("{} rows need re-resolving", load.pending.len());
    }
    for warning in &load.warnings {
        println!("warning: {warning}");
    }
    Ok(())
}
