use std::path::{Path, PathBuf};
use std::thread;

use clap::{Args, Parser, Subcommand};
use tempo_tracker_core::{
    Engine, EngineConfig, EngineSnapshot, OnsetStream, SnapshotPublisher, TempoError,
};
use tracing_subscriber::EnvFilter;

fn main() -> tempo_tracker_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            engine,
            bpm,
            beats,
            drop_every,
            jitter_ms,
            seed,
            frame_ms,
        } => {
            let stream = OnsetStream::at_bpm(1_000, bpm, beats)
                .drop_every(drop_every.unwrap_or(0))
                .jitter(jitter_ms, seed);
            run_simulation(engine.load()?, stream, frame_ms)
        }
        Commands::Replay {
            engine,
            input,
            frame_ms,
            every_frame,
        } => run_replay(engine.load()?, &input, frame_ms, every_frame),
    }
}

/// Runs the stream on an analysis thread and reads the result back through a
/// snapshot reader, the way a renderer would.
fn run_simulation(
    config: EngineConfig,
    stream: OnsetStream,
    frame_ms: Option<u64>,
) -> tempo_tracker_core::Result<()> {
    tracing::info!(onsets = stream.len(), ?frame_ms, "starting simulation");

    let mut publisher = SnapshotPublisher::new(Engine::new(config));
    let reader = publisher.reader();

    let analysis = thread::spawn(move || -> tempo_tracker_core::Result<u64> {
        let mut beats = 0;
        for (timestamp, trigger) in inputs(&stream, frame_ms) {
            if publisher.update(timestamp, trigger)?.beat {
                beats += 1;
            }
        }
        Ok(beats)
    });
    let beats = analysis
        .join()
        .map_err(|_| TempoError::msg("analysis thread panicked"))??;

    let snapshot = reader.latest()?;
    tracing::info!(beats, bpm = snapshot.bpm, confidence = snapshot.confidence, "simulation done");
    print_snapshot(&snapshot)
}

fn run_replay(
    config: EngineConfig,
    input: &Path,
    frame_ms: Option<u64>,
    every_frame: bool,
) -> tempo_tracker_core::Result<()> {
    tracing::info!(?input, "replaying onsets");

    let stream: OnsetStream = serde_json::from_str(&std::fs::read_to_string(input)?)?;
    let mut engine = Engine::new(config);

    for (timestamp, trigger) in inputs(&stream, frame_ms) {
        let snapshot = engine.update(timestamp, trigger);
        if every_frame || trigger || snapshot.beat {
            print_snapshot(&snapshot)?;
        }
    }
    Ok(())
}

fn inputs(stream: &OnsetStream, frame_ms: Option<u64>) -> Vec<(u64, bool)> {
    match frame_ms {
        Some(frame_ms) => stream.frames(frame_ms).collect(),
        None => stream.triggers().collect(),
    }
}

fn print_snapshot(snapshot: &EngineSnapshot) -> tempo_tracker_core::Result<()> {
    println!("{}", serde_json::to_string(snapshot)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Real-time tempo tracking from onset triggers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Track a synthetic onset stream and print the final snapshot.
    Simulate {
        #[command(flatten)]
        engine: EngineArgs,
        /// Tempo of the generated stream.
        #[arg(long, default_value_t = 120.0)]
        bpm: f64,
        /// Number of onsets to generate.
        #[arg(long, default_value_t = 64)]
        beats: usize,
        /// Drop every n-th onset to simulate missed detections.
        #[arg(long)]
        drop_every: Option<usize>,
        /// Maximum timing error added to each onset.
        #[arg(long, default_value_t = 0)]
        jitter_ms: u64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Update once per frame of this length instead of once per onset.
        #[arg(long)]
        frame_ms: Option<u64>,
    },
    /// Track recorded onsets from a JSON array of millisecond timestamps and
    /// print snapshots as JSON lines.
    Replay {
        #[command(flatten)]
        engine: EngineArgs,
        input: PathBuf,
        /// Update once per frame of this length instead of once per onset.
        #[arg(long)]
        frame_ms: Option<u64>,
        /// Print a snapshot for every update, not only for beats.
        #[arg(long)]
        every_frame: bool,
    },
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// JSON file with engine settings.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Enable the sticky lock regardless of the configuration file.
    #[arg(long)]
    sticky: bool,
}

impl EngineArgs {
    fn load(&self) -> tempo_tracker_core::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if self.sticky {
            config.sticky_enabled = true;
        }
        Ok(config)
    }
}
