//! Capreel CLI
//!
//! Headless caption rendering onto video. Parses a transcript, renders
//! styled caption overlays, and burns them into the source video through
//! FFmpeg. Also exposes the media prober and the per-word timing splitter
//! for inspection.

use anyhow::{anyhow, bail, Context, Result};
use capreel_core::captions::{
    parse_transcript, split_segments, CaptionStyle, TranscriptFormat, VerticalPosition,
};
use capreel_core::encode::{EncodeAdapter, EncodeSettings, FfmpegEncoder, QualityPreset};
use capreel_core::jobs::{
    CaptionJob, CaptionMode, JobEvent, JobProcessor, Priority, WorkerPool, WorkerPoolConfig,
};
use capreel_core::render::RenderPipeline;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Capreel main parser
#[derive(Parser, Debug)]
#[command(name = "capreel", version, about = "Burns styled, word-timed captions into video")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a transcript onto a video as burned-in captions
    Render(RenderArgs),

    /// Probe a media file and print its stream info
    Probe {
        /// Media file to inspect
        #[arg(long)]
        video: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        /// ffprobe binary to use
        #[arg(long, default_value = "ffprobe")]
        ffprobe: String,
    },

    /// Print the interpolated per-word timings for a transcript
    Words {
        /// Transcript file (.json, .srt, or .vtt)
        #[arg(long)]
        transcript: PathBuf,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Source video file
    #[arg(long)]
    video: PathBuf,

    /// Transcript file (.json, .srt, or .vtt)
    #[arg(long)]
    transcript: PathBuf,

    /// Destination for the captioned video
    #[arg(long)]
    output: PathBuf,

    /// Font family for caption text
    #[arg(long, default_value = "Arial")]
    font_family: String,

    /// Font size in pixels (8-72)
    #[arg(long, default_value_t = 24)]
    font_size: u32,

    /// Text fill color (hex)
    #[arg(long, default_value = "#FFFFFF")]
    font_color: String,

    /// Outline color (hex)
    #[arg(long, default_value = "#000000")]
    stroke_color: String,

    /// Outline thickness in pixels (0-10)
    #[arg(long, default_value_t = 2)]
    stroke_width: u32,

    /// Padding around the caption block in pixels (0-50)
    #[arg(long, default_value_t = 10)]
    padding: u32,

    /// Vertical placement: top, center, or bottom
    #[arg(long, default_value = "bottom")]
    position: String,

    /// Render one caption per word window with the active word highlighted
    #[arg(long)]
    word_highlight: bool,

    /// Highlight color (hex); defaults to yellow
    #[arg(long)]
    highlight_color: Option<String>,

    /// Output quality: low, medium, or high
    #[arg(long, default_value = "medium")]
    preset: String,

    /// ffmpeg binary to use
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: String,

    /// ffprobe binary to use
    #[arg(long, default_value = "ffprobe")]
    ffprobe: String,
}

fn init_logging() {
    use tracing_subscriber::prelude::*;

    // Logs go to stderr so stdout stays clean for command output.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => run_render(args).await,
        Commands::Probe {
            video,
            json,
            ffprobe,
        } => run_probe(&video, json, &ffprobe).await,
        Commands::Words { transcript, json } => run_words(&transcript, json),
    }
}

/// Reads and parses a transcript file, picking the format by extension
fn load_transcript(path: &Path) -> Result<Vec<capreel_core::captions::CaptionSegment>> {
    let format = TranscriptFormat::from_path(path).ok_or_else(|| {
        anyhow!(
            "Unrecognized transcript extension: {} (expected .json, .srt, or .vtt)",
            path.display()
        )
    })?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript {}", path.display()))?;
    let segments = parse_transcript(&content, format)?;
    Ok(segments)
}

async fn run_render(args: RenderArgs) -> Result<()> {
    let segments = load_transcript(&args.transcript)?;
    if segments.is_empty() {
        bail!("Transcript {} contains no segments", args.transcript.display());
    }
    info!(
        "Loaded {} segment(s) from {}",
        segments.len(),
        args.transcript.display()
    );

    let style = CaptionStyle::new(
        &args.font_family,
        args.font_size,
        &args.font_color,
        &args.stroke_color,
        args.stroke_width,
        args.padding,
        VerticalPosition::parse(&args.position),
    )?;
    let settings = EncodeSettings::from_quality(QualityPreset::parse(&args.preset));
    let mode = if args.word_highlight {
        CaptionMode::WordHighlighted {
            highlight_color: args.highlight_color.clone(),
        }
    } else {
        CaptionMode::Plain
    };

    let job = CaptionJob::new(&args.video, segments, style, &args.output)
        .with_mode(mode)
        .with_settings(settings)
        .with_priority(Priority::UserRequest);
    let job_id = job.id.clone();

    // One worker is enough for a one-shot render.
    let mut pool = WorkerPool::new(WorkerPoolConfig {
        num_workers: 1,
        ..WorkerPoolConfig::default()
    });
    let mut events = pool
        .take_event_receiver()
        .ok_or_else(|| anyhow!("event receiver already taken"))?;

    let adapter = Arc::new(FfmpegEncoder::with_paths(&args.ffmpeg, &args.ffprobe));
    let processor = Arc::new(JobProcessor::new(
        Arc::new(RenderPipeline::new()),
        adapter,
        JobProcessor::default_temp_root(),
        pool.event_sender(),
    ));
    let handles = pool.start_workers(processor);
    pool.submit(job).await?;

    let mut outcome = Err(anyhow!("job {} ended without a terminal event", job_id));
    while let Some(event) = events.recv().await {
        match event {
            JobEvent::Started { job_id: id } if id == job_id => {
                info!("Job {} started", id);
            }
            JobEvent::Progress {
                job_id: id,
                progress,
                message,
            } if id == job_id => {
                info!("[{:>3.0}%] {}", progress * 100.0, message);
            }
            JobEvent::Completed {
                job_id: id,
                output_path,
            } if id == job_id => {
                println!("{}", output_path.display());
                outcome = Ok(());
                break;
            }
            JobEvent::Failed { job_id: id, error } if id == job_id => {
                outcome = Err(anyhow!(error));
                break;
            }
            _ => {}
        }
    }

    pool.shutdown();
    for handle in handles {
        let _ = handle.await;
    }
    outcome
}

async fn run_probe(video: &Path, json: bool, ffprobe: &str) -> Result<()> {
    let encoder = FfmpegEncoder::with_paths("ffmpeg", ffprobe);
    let info = encoder.probe(video).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("resolution:   {}x{}", info.width, info.height);
        println!("duration:     {:.2}s", info.duration_sec);
        println!("fps:          {:.3}", info.fps);
        println!("video codec:  {}", info.video_codec);
        println!(
            "audio codec:  {}",
            info.audio_codec.as_deref().unwrap_or("none")
        );
        println!("pixel format: {}", info.pixel_format);
        println!("container:    {}", info.format);
        println!("size:         {} bytes", info.size_bytes);
    }
    Ok(())
}

fn run_words(transcript: &Path, json: bool) -> Result<()> {
    let segments = load_transcript(transcript)?;
    let words = split_segments(&segments);

    if json {
        println!("{}", serde_json::to_string_pretty(&words)?);
    } else {
        for word in &words {
            println!("{:9.3} {:9.3}  {}", word.start, word.end, word.word);
        }
    }
    Ok(())
}
