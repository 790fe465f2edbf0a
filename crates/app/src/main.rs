use std::path::{Path, PathBuf};

use beatshow_core::{
    AppConfig, BeatshowError, EffectMatrix, Extent, GeometryConfig, LoudnessDataset,
    LoudnessEnvelope, PanZoomBackground, PlaybackClock, RhythmDataset, RhythmIndex, Timeline,
    TimelineGenerator,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> beatshow_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Timeline {
            duration,
            geometry,
            seed,
            output,
        } => run_timeline(&config, duration, geometry.as_deref(), seed, output.as_deref()),
        Commands::Inspect {
            rhythm,
            loudness,
            clock,
            threshold,
        } => run_inspect(&config, &rhythm, loudness.as_deref(), clock, threshold),
        Commands::Play {
            timeline,
            geometry,
            rhythm,
            output,
            asset,
            fps,
        } => run_play(
            &config,
            &timeline,
            geometry.as_deref(),
            rhythm.as_deref(),
            &output,
            asset.as_deref(),
            fps,
        ),
    }
}

fn run_timeline(
    config: &AppConfig,
    duration_seconds: f64,
    geometry: Option<&Path>,
    seed: Option<u64>,
    output: Option<&Path>,
) -> beatshow_core::Result<()> {
    let geometry = resolve_geometry(config, geometry)?;
    tracing::info!(duration_seconds, ?seed, "generating timeline");

    let duration_ms = duration_seconds * 1000.0;
    let attempts = config.generator.max_attempts;
    let timeline = match seed {
        Some(seed) => TimelineGenerator::seeded(geometry, seed)
            .max_attempts(attempts)
            .generate_timeline(duration_ms)?,
        None => TimelineGenerator::new(geometry)
            .max_attempts(attempts)
            .generate_timeline(duration_ms)?,
    };

    let json = timeline.to_json_string()?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(?path, frames = timeline.len(), "wrote timeline");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_inspect(
    config: &AppConfig,
    rhythm: &Path,
    loudness: Option<&Path>,
    clock: f64,
    threshold: Option<f64>,
) -> beatshow_core::Result<()> {
    let rhythm = RhythmDataset::from_json_str(&std::fs::read_to_string(rhythm)?)?;
    let index = RhythmIndex::with_threshold(&rhythm, config.rhythm.default_confidence)?;

    let beat = index.find_beat_at_clock(clock, threshold);
    let next = index.find_next_beat(clock, 1);
    let bar = index.find_bar_at_clock(clock);
    let next_bar = index.find_next_bar(clock);

    println!("clock        {clock:.3} s");
    println!("threshold    {:.2}", threshold.unwrap_or(index.min_confidence()));
    println!("beat         {}", describe_beat(beat.map(|b| b.start_ms)));
    println!("next beat    {}", describe_beat(next.map(|b| b.start_ms)));
    println!("bar          {}", describe_index(bar));
    println!("next bar     {}", describe_index(next_bar));

    if let Some(path) = loudness {
        let levels = LoudnessDataset::from_json_str(&std::fs::read_to_string(path)?)?;
        let envelope = LoudnessEnvelope::new(&levels)?;
        println!("level        {:.3}", envelope.get_level(clock));
    }
    Ok(())
}

fn run_play(
    config: &AppConfig,
    timeline: &Path,
    geometry: Option<&Path>,
    rhythm: Option<&Path>,
    output: &str,
    asset: Option<&str>,
    fps: f64,
) -> beatshow_core::Result<()> {
    if !(fps > 0.0) {
        return Err(format!("fps must be positive, got {fps}").into());
    }

    let geometry = resolve_geometry(config, geometry)?;
    let timeline = Timeline::from_json_str(&std::fs::read_to_string(timeline)?)?;
    let output = parse_extent(output)?;
    let asset = match asset {
        Some(text) => parse_extent(text)?,
        None => geometry.source_extent,
    };
    let end_ms = timeline.duration_ms();
    let background = PanZoomBackground::new(timeline, geometry.source_extent, output, asset)?;

    let rhythm = match rhythm {
        Some(path) => Some(RhythmDataset::from_json_str(&std::fs::read_to_string(path)?)?),
        None => None,
    };
    let index = match &rhythm {
        Some(data) => Some(RhythmIndex::with_threshold(data, config.rhythm.default_confidence)?),
        None => None,
    };
    let mut effects = EffectMatrix::new();

    tracing::info!(fps, end_ms, "starting playback");
    let mut clock = PlaybackClock::default();
    while clock.time_ms < end_ms {
        if let Some(rect) = background.source_rect_at(clock.time_ms) {
            let mut line = format!(
                "{:>10.1} ms  x={:.1} y={:.1} w={:.1} h={:.1}",
                clock.time_ms, rect.x, rect.y, rect.width, rect.height
            );
            if let Some(index) = &index {
                for update in effects.apply_at(clock.seconds(), index, None) {
                    line.push_str(&format!("  {}={:.2}", update.target, update.value));
                }
            }
            println!("{line}");
        }
        clock.advance(1000.0 / fps);
    }
    Ok(())
}

fn resolve_geometry(config: &AppConfig, path: Option<&Path>) -> beatshow_core::Result<GeometryConfig> {
    match path {
        Some(path) => GeometryConfig::from_json_str(&std::fs::read_to_string(path)?),
        None => config
            .geometry
            .clone()
            .ok_or_else(|| "no geometry given; pass --geometry or set it in --config".into()),
    }
}

fn parse_extent(text: &str) -> beatshow_core::Result<Extent> {
    let (width, height) = text
        .split_once('x')
        .ok_or_else(|| BeatshowError::from(format!("expected WIDTHxHEIGHT, got `{text}`")))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|err| BeatshowError::msg(format!("bad size `{text}`: {err}")))
    };
    Ok(Extent::new(parse(width)?, parse(height)?))
}

fn describe_beat(start_ms: Option<f64>) -> String {
    start_ms
        .map(|start| format!("{start:.0} ms"))
        .unwrap_or_else(|| "none".to_string())
}

fn describe_index(index: Option<usize>) -> String {
    index
        .map(|index| index.to_string())
        .unwrap_or_else(|| "none".to_string())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Music synchronized pan and zoom slideshow tools", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a pan/zoom keyframe timeline.
    Timeline {
        /// Length of the show in seconds.
        #[arg(short, long)]
        duration: f64,
        /// Geometry JSON file; falls back to the `geometry` config section.
        #[arg(short, long)]
        geometry: Option<PathBuf>,
        /// Seed for a reproducible timeline.
        #[arg(short, long)]
        seed: Option<u64>,
        /// Where to write the timeline JSON. Prints to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Query rhythm and loudness data at a song position.
    Inspect {
        /// Rhythm analysis JSON.
        rhythm: PathBuf,
        /// Loudness levels JSON.
        #[arg(short, long)]
        loudness: Option<PathBuf>,
        /// Song position in seconds.
        #[arg(long, default_value_t = 0.0)]
        clock: f64,
        /// Beat confidence threshold for this query only.
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Step through a timeline and print the source rectangles.
    Play {
        /// Timeline JSON produced by `timeline`.
        timeline: PathBuf,
        /// Geometry JSON file; falls back to the `geometry` config section.
        #[arg(short, long)]
        geometry: Option<PathBuf>,
        /// Rhythm analysis JSON used for beat effects.
        #[arg(short, long)]
        rhythm: Option<PathBuf>,
        /// Output canvas size, e.g. 1280x720.
        #[arg(short, long, default_value = "1280x720")]
        output: String,
        /// Natural size of the loaded image. Defaults to the source extent.
        #[arg(short, long)]
        asset: Option<String>,
        /// Frames per second to sample.
        #[arg(short, long, default_value_t = 25.0)]
        fps: f64,
    },
}
