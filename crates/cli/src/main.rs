//! Command-line host for the timeline engine.
//!
//! Loads a timeline description, inspects its resolution at a given time and
//! runs deterministic playback simulations on a manual clock.

mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use timeline_engine::protocol::{OutboundMessage, embed_url, extract_youtube_id, handshake_id};
use timeline_engine::resolve::resolve;
use timeline_engine::time::clamp_time;
use timeline_engine::{
    Command, EngineConfig, ManualClock, SyncOutcome, TimelineDescription, TimelineSession,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "timeline-cli")]
#[command(about = "Inspect and simulate complex timeline descriptions")]
#[command(version)]
struct Cli {
    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the fingerprint and the active set at one point in time
    Inspect {
        /// Timeline description JSON file
        input: PathBuf,

        /// Playhead position in seconds
        #[arg(long, default_value = "0")]
        at: f64,
    },

    /// Play the timeline on a simulated clock and print emitted events
    Simulate {
        /// Timeline description JSON file
        input: PathBuf,

        /// Engine config JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seek to this position before playing
        #[arg(long, default_value = "0")]
        from: f64,

        /// Stop after this many simulated seconds (defaults to the remaining duration)
        #[arg(long)]
        seconds: Option<f64>,
    },

    /// Resolve an embedded-player URL into its remote-control identity
    Embed {
        /// Video URL (youtu.be or youtube.com)
        url: String,

        /// Origin of the hosting page
        #[arg(long)]
        origin: Option<String>,

        /// Annotation id used as the handshake id
        #[arg(long)]
        annotation: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect { input, at } => inspect(&input, at)?,
        Commands::Simulate {
            input,
            config,
            from,
            seconds,
        } => simulate(&input, config.as_deref(), from, seconds)?,
        Commands::Embed {
            url,
            origin,
            annotation,
        } => embed(&url, origin.as_deref(), annotation.as_deref())?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_description(path: &Path) -> Result<TimelineDescription> {
    TimelineDescription::from_json_path(path)
        .with_context(|| format!("Failed to load timeline description {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    EngineConfig::from_json_str(&raw).context("Invalid engine config")
}

fn inspect(input: &Path, at: f64) -> Result<()> {
    let description = load_description(input)?;
    let fingerprint = description.fingerprint();
    let resolution = resolve(&description, clamp_time(at, description.duration));

    println!("Timeline: {}", input.display());
    println!(
        "Fingerprint: duration={} items={} keyframes={}",
        fingerprint.duration(),
        fingerprint.items,
        fingerprint.keyframes
    );
    println!();
    print!("{}", report::items_table(&description));
    println!();
    println!("At {at:.3}s:");
    print!("{}", report::resolution_summary(&resolution));
    Ok(())
}

fn simulate(input: &Path, config: Option<&Path>, from: f64, seconds: Option<f64>) -> Result<()> {
    let description = load_description(input)?;
    let config = load_config(config)?;
    let interval = config.tick_interval();
    let clock = ManualClock::new();

    let mut session = TimelineSession::new(clock.clone(), config);
    if session.sync(description) != SyncOutcome::Created {
        bail!("simulation session was not freshly created");
    }
    let Some(store) = session.store_mut() else {
        bail!("simulation session has no store");
    };

    let budget = seconds.unwrap_or_else(|| (store.duration() - from).max(0.0));
    info!(from, budget, tick_ms = interval.as_millis() as u64, "simulation started");

    for command in [Command::SetTime { time: from }, Command::PlayPause] {
        let outcome = store.handle_command(command);
        report::print_events(store.time(), &outcome.events);
    }

    let rate = store.config().effective_playback_rate();
    let wall_limit = if rate > 0.0 { budget / rate } else { 0.0 };
    let mut wall = 0.0;
    let started = store.time();
    let mut next = store.handle_command(Command::StartClock).next_tick;
    while let Some(token) = next {
        let done = store.time() - started >= budget || store.time() >= store.duration();
        if done || wall >= wall_limit {
            break;
        }
        clock.advance(interval);
        wall += interval.as_secs_f64();
        let outcome = store.handle_command(Command::Tick(token));
        report::print_events(store.time(), &outcome.events);
        next = outcome.next_tick;
    }

    let outcome = store.handle_command(Command::StopClock);
    report::print_events(store.time(), &outcome.events);
    println!();
    print!("{}", report::resolution_summary(&resolve(store.description(), store.time())));
    session.teardown();
    Ok(())
}

fn embed(url: &str, origin: Option<&str>, annotation: Option<&str>) -> Result<()> {
    let Some(video_id) = extract_youtube_id(url) else {
        bail!("not a recognised embedded-player URL: {url}");
    };
    let id = handshake_id(annotation, &video_id);
    let handshake = OutboundMessage::Listening { id: id.clone() }
        .encode()
        .context("Failed to encode handshake")?;

    let embed = embed_url(&video_id, origin).context("Failed to build embed URL")?;

    println!("Video id: {video_id}");
    println!("Embed URL: {embed}");
    println!("Handshake id: {id}");
    println!("Handshake message: {handshake}");
    Ok(())
}
