mod console;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lehra_audio::{AssetLoader, FileLoader, NullAccompaniment, NullPlayer};
use lehra_domain::SessionConfig;
use lehra_engine::{Command, PlaybackCoordinator, Session, TracingSink, VisualSink};
use lehra_services::HttpAssetLoader;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::console::{ConsoleSink, Format};

#[derive(Parser, Debug)]
#[command(author, version, about = "Practice along with a looping lehra", long_about = None)]
struct Cli {
    /// YAML session configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Starting tempo in BPM
    #[arg(long)]
    tempo: Option<f64>,
    #[arg(long)]
    taal: Option<String>,
    #[arg(long)]
    raag: Option<String>,
    #[arg(long)]
    instrument: Option<String>,
    /// Key shift in semitones from C
    #[arg(long, allow_hyphen_values = true)]
    pitch: Option<i32>,
    /// Enable riyaz mode
    #[arg(long)]
    practice: bool,
    #[arg(long)]
    step: Option<u32>,
    /// Minutes between tempo jumps
    #[arg(long)]
    interval: Option<u32>,
    #[arg(long)]
    tanpura: bool,
    /// Fetch recordings from a remote asset store instead of disk
    #[arg(long)]
    asset_url: Option<String>,
    /// Print visual events as JSON lines
    #[arg(long, conflicts_with = "quiet")]
    json: bool,
    /// Send visual events to the log instead of stdout
    #[arg(short, long)]
    quiet: bool,
    /// Quit after this many seconds
    #[arg(long)]
    duration: Option<u64>,
}

impl Cli {
    fn apply(&self, config: &mut SessionConfig) {
        if let Some(tempo) = self.tempo {
            config.tempo = tempo;
        }
        if let Some(taal) = &self.taal {
            config.meter = taal.clone();
        }
        if let Some(raag) = &self.raag {
            config.mode = raag.clone();
        }
        if let Some(instrument) = &self.instrument {
            config.instrument = instrument.clone();
        }
        if let Some(pitch) = self.pitch {
            config.pitch_shift = pitch;
        }
        if self.practice {
            config.practice.enabled = true;
        }
        if let Some(step) = self.step {
            config.practice.step_bpm = step;
        }
        if let Some(interval) = self.interval {
            config.practice.interval_minutes = interval;
        }
        if self.tanpura {
            config.accompaniment.enabled = true;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("load session config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    cli.apply(&mut config);
    let config = config.validated().context("invalid session config")?;

    let rt = Runtime::new()?;
    let result = rt.block_on(run(cli, config));
    // stdin reader may still be parked on a read
    rt.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn run(cli: Cli, config: SessionConfig) -> Result<()> {
    let loader: Arc<dyn AssetLoader> = match &cli.asset_url {
        Some(url) => Arc::new(HttpAssetLoader::new(url.clone())?),
        None => Arc::new(FileLoader::new()),
    };
    let sink: Box<dyn VisualSink> = match (cli.quiet, cli.json) {
        (true, _) => Box::new(TracingSink),
        (false, true) => Box::new(ConsoleSink::new(Format::Json)),
        (false, false) => Box::new(ConsoleSink::new(Format::Text)),
    };
    let mut coordinator = PlaybackCoordinator::new(
        &config,
        Box::new(NullPlayer::new()),
        Box::new(NullAccompaniment::new(config.accompaniment.volume_db)),
        sink,
    )?;
    match loader.load(&config.accompaniment.location).await {
        Ok(clip) => coordinator.set_accompaniment_buffer(clip),
        Err(err) => warn!(%err, "tanpura drone unavailable"),
    }

    let (commands, rx) = mpsc::channel(32);
    commands
        .send(Command::Play)
        .await
        .context("queue initial play")?;

    let stdin_commands = commands.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match line.parse::<Command>() {
                    Ok(command) => {
                        if stdin_commands.send(command).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(%err, "ignoring input"),
                },
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "stdin closed");
                    break;
                }
            }
        }
    });

    if let Some(seconds) = cli.duration {
        let quit = commands.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            quit.send(Command::Quit).await.ok();
        });
    }
    drop(commands);

    info!(
        taal = %config.meter,
        raag = %config.mode,
        instrument = %config.instrument,
        tempo = config.tempo,
        "starting lehra session"
    );
    let mut session = Session::new(
        coordinator,
        loader,
        Duration::from_millis(config.transport.resolution_millis),
    );
    session.run(rx).await;
    Ok(())
}
