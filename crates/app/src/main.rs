use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use piano_roll_core::{
    frequency_hz, route_effects, Clock, Editor, EditorConfig, EditorEvent, ManualClock, ToneSink,
    ToneTrigger,
};
use tracing_subscriber::EnvFilter;

fn main() -> piano_roll_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { script, config } => run_replay(&script, config.as_deref()),
        Commands::Play {
            script,
            seconds,
            fps,
            config,
        } => run_play(&script, seconds, fps, config.as_deref()),
        Commands::Config => print_default_config(),
    }
}

fn run_replay(script: &Path, config: Option<&Path>) -> piano_roll_core::Result<()> {
    tracing::info!(?script, "replaying editor script");

    let mut editor = Editor::new(load_config(config)?)?;
    let mut sink = LoggingSink::default();
    for event in load_script(script)? {
        let effects = editor.handle(event)?;
        route_effects(&effects, &mut sink);
    }

    println!("{}", serde_json::to_string_pretty(&editor.snapshot())?);
    Ok(())
}

fn run_play(
    script: &Path,
    seconds: f64,
    fps: u32,
    config: Option<&Path>,
) -> piano_roll_core::Result<()> {
    tracing::info!(?script, seconds, fps, "simulating playback");

    let mut editor = Editor::new(load_config(config)?)?;
    let mut sink = LoggingSink::default();
    for event in load_script(script)? {
        let effects = editor.handle(event)?;
        route_effects(&effects, &mut sink);
    }
    // Whatever the script did to the transport, play from the top.
    editor.handle(EditorEvent::Stop)?;

    let mut clock = ManualClock::default();
    let interval = 1.0 / fps.max(1) as f64;
    let effects = editor.handle(EditorEvent::TogglePlayback { now: clock.now() })?;
    let mut next = route_effects(&effects, &mut sink);
    while let Some(handle) = next {
        if clock.now() >= seconds {
            break;
        }
        clock.advance(interval);
        let effects = editor.handle(EditorEvent::Tick {
            now: clock.now(),
            handle,
        })?;
        next = route_effects(&effects, &mut sink);
    }

    let reached = editor.scheduler().time_label();
    editor.handle(EditorEvent::Stop)?;
    tracing::info!(tones = sink.played, reached, "playback finished");
    Ok(())
}

fn print_default_config() -> piano_roll_core::Result<()> {
    println!("{}", serde_json::to_string_pretty(&EditorConfig::default())?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> piano_roll_core::Result<EditorConfig> {
    match path {
        Some(path) => EditorConfig::from_json_file(path),
        None => Ok(EditorConfig::default()),
    }
}

fn load_script(path: &Path) -> piano_roll_core::Result<Vec<EditorEvent>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Stands in for a synthesiser by logging every tone it is asked to play.
#[derive(Debug, Default)]
struct LoggingSink {
    played: usize,
}

impl ToneSink for LoggingSink {
    fn trigger(&mut self, tone: ToneTrigger) {
        self.played += 1;
        tracing::info!(
            pitch = tone.pitch,
            frequency_hz = frequency_hz(tone.pitch),
            start = tone.start_time,
            duration = tone.duration,
            "tone"
        );
    }
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
#[command(author, version, about = "Piano roll editing and playback engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a JSON list of editor events and print the resulting snapshot.
    Replay {
        /// Path to the event script.
        script: PathBuf,
        /// Optional editor configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Build notes from an event script, then play them against a simulated clock.
    Play {
        script: PathBuf,
        /// Length of the simulated session in seconds.
        #[arg(long, default_value_t = 8.0)]
        seconds: f64,
        /// Simulated frame rate driving the scheduler ticks.
        #[arg(long, default_value_t = 60)]
        fps: u32,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration as JSON.
    Config,
}
