//! CryptoID Capture CLI
//!
//! Encode, validate and compare fingerprints, and run capture sessions over
//! recorded or piped sample streams.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use cryptoid_capture::{
    collector::{feed_lines, load_recording, recording, InputHub, RecordingFormat},
    config::{Config, SourceConfig},
    core::{is_fallback, CaptureAggregator, ReportBuilder},
    encode, is_well_formed, tolerance,
    transparency::create_shared_log,
    DISCLAIMER, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cryptoid")]
#[command(version = VERSION)]
#[command(about = "Behavioral sample capture and fingerprint derivation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a numeric sequence into a fingerprint
    Encode {
        /// Values to encode
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },

    /// Check whether a fingerprint is well formed
    Validate { signature: String },

    /// Positional similarity of two fingerprints
    Compare {
        first: String,
        second: String,
    },

    /// Replay a recorded sample stream and print the capture report
    Replay {
        /// Recording file
        file: PathBuf,

        /// Recording format (json or jsonl)
        #[arg(long, default_value = "jsonl")]
        format: String,

        /// Input sources to capture (keyboard, pointer, touch, navigation, or all)
        #[arg(long)]
        sources: Option<String>,
    },

    /// Capture JSON Lines samples from stdin until EOF or Ctrl+C
    Capture {
        /// Progress interval in milliseconds
        #[arg(long)]
        poll_ms: Option<u64>,

        /// Input sources to capture (keyboard, pointer, touch, navigation, or all)
        #[arg(long)]
        sources: Option<String>,
    },

    /// Display the disclaimer
    Privacy,

    /// Show configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { values } => cmd_encode(&values),
        Commands::Validate { signature } => cmd_validate(&signature),
        Commands::Compare { first, second } => cmd_compare(&first, &second),
        Commands::Replay {
            file,
            format,
            sources,
        } => cmd_replay(&file, &format, sources.as_deref()),
        Commands::Capture { poll_ms, sources } => cmd_capture(poll_ms, sources.as_deref()),
        Commands::Privacy => {
            println!("{DISCLAIMER}");
            Ok(())
        }
        Commands::Config { init } => cmd_config(init),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file and apply a `--sources` override.
fn load_config(sources: Option<&str>) -> anyhow::Result<Config> {
    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load config, using defaults");
        Config::default()
    });

    if let Some(csv) = sources {
        config.sources = SourceConfig::from_csv(csv);
    }
    if !config.sources.any_enabled() {
        bail!("At least one source must be enabled (keyboard, pointer, touch or navigation)");
    }

    Ok(config)
}

fn cmd_encode(values: &[f64]) -> anyhow::Result<()> {
    let fingerprint = encode(values);
    if is_fallback(&fingerprint) {
        tracing::warn!("input could not be encoded, printed a fallback token");
    }
    println!("{fingerprint}");
    Ok(())
}

fn cmd_validate(signature: &str) -> anyhow::Result<()> {
    if is_well_formed(signature) {
        println!("well-formed");
        Ok(())
    } else {
        println!("malformed");
        std::process::exit(1);
    }
}

fn cmd_compare(first: &str, second: &str) -> anyhow::Result<()> {
    for (label, signature) in [("first", first), ("second", second)] {
        if !is_well_formed(signature) {
            tracing::warn!(argument = label, "fingerprint is malformed, similarity is 0");
        }
    }
    println!("{:.4}", tolerance(first, second));
    Ok(())
}

fn cmd_replay(file: &Path, format: &str, sources: Option<&str>) -> anyhow::Result<()> {
    let format = RecordingFormat::from_name(format)
        .with_context(|| format!("Unknown recording format '{format}' (expected json or jsonl)"))?;
    let config = load_config(sources)?;

    let samples = load_recording(file, format)
        .with_context(|| format!("Could not read recording {}", file.display()))?;
    tracing::info!(samples = samples.len(), file = %file.display(), "replaying recording");

    let hub = InputHub::new(samples.len().max(config.channel_capacity));
    let transparency_log = create_shared_log();
    let mut capture =
        CaptureAggregator::new(&config).with_transparency(Arc::clone(&transparency_log));
    capture.start(&hub)?;

    recording::replay_into(&hub, samples);
    let produced = capture.pump();
    capture.stop();
    tracing::info!(patterns = produced, "replay finished");

    let builder = ReportBuilder::new().with_session_id(session_id());
    println!("{}", builder.build_json(&capture));
    eprintln!();
    eprintln!("{}", transparency_log.summary());
    Ok(())
}

fn cmd_capture(poll_ms: Option<u64>, sources: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(sources)?;
    let poll_interval = poll_ms
        .map(Duration::from_millis)
        .unwrap_or(config.poll_interval);

    eprintln!("CryptoID Capture v{VERSION}");
    eprintln!("Reading JSON Lines samples from stdin. Press Ctrl+C to stop.");
    eprintln!();

    let hub = InputHub::new(config.channel_capacity);
    let transparency_log = create_shared_log();
    let mut capture =
        CaptureAggregator::new(&config).with_transparency(Arc::clone(&transparency_log));
    capture.start(&hub)?;

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let input_done = Arc::new(AtomicBool::new(false));
    let reader = spawn_stdin_reader(hub.clone(), Arc::clone(&input_done));

    let mut last_poll = Instant::now();
    while running.load(Ordering::SeqCst) && capture.is_capturing() {
        capture.pump();

        if last_poll.elapsed() >= poll_interval {
            eprintln!(
                "[{}] patterns: {:>4} | confidence: {:>3.0}%",
                Utc::now().format("%H:%M:%S"),
                capture.pattern_count(),
                capture.overall_confidence() * 100.0
            );
            last_poll = Instant::now();
        }

        if input_done.load(Ordering::SeqCst) {
            capture.pump();
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }

    capture.stop();
    if input_done.load(Ordering::SeqCst) && reader.join().is_err() {
        tracing::warn!("stdin reader thread panicked");
    }

    let builder = ReportBuilder::new().with_session_id(session_id());
    println!("{}", builder.build_json(&capture));
    eprintln!();
    eprintln!("{}", transparency_log.summary());
    Ok(())
}

/// Read stdin line by line and dispatch each parsed sample, waiting for
/// queue space so no piped input is dropped.
fn spawn_stdin_reader(hub: InputHub, done: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        match feed_lines(&hub, stdin.lock()) {
            Ok(count) => tracing::info!(samples = count, "stdin closed"),
            Err(e) => tracing::error!(error = %e, "stdin read failed"),
        }
        done.store(true, Ordering::SeqCst);
    })
}

fn cmd_config(init: bool) -> anyhow::Result<()> {
    if init {
        let path = Config::default().save()?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let config = Config::load()?;
    println!("CryptoID Capture Configuration");
    println!("==============================");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn session_id() -> String {
    format!("SESS-{}", Utc::now().timestamp_millis())
}
