// SYNOID Shorts Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use synoid_shorts::agent::background_job::{BackgroundJob, BackgroundRunner, NarrationLine};
use synoid_shorts::agent::batch::{script_jobs, BatchRunner};
use synoid_shorts::agent::collaborators::{EdgeTts, PollinationsImages};
use synoid_shorts::agent::event_log::EventLogHandle;
use synoid_shorts::agent::health;
use synoid_shorts::agent::script::Script;
use synoid_shorts::agent::shorts::ShortsPipeline;
use synoid_shorts::config::ShortsConfig;
use synoid_shorts::engine::background::BackgroundComposer;
use synoid_shorts::engine::caption::{CaptionRenderer, CaptionStyle, FontChain};
use synoid_shorts::engine::probe::MediaProbe;
use synoid_shorts::engine::render_target::RenderTarget;
use synoid_shorts::engine::timeline::JoinMode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synoid-shorts")]
#[command(about = "SYNOID Shorts: vertical video assembly", long_about = None)]
struct Cli {
    /// Caption font file (overrides SHORTS_FONT)
    #[arg(long, global = true)]
    font: Option<PathBuf>,

    /// x264 preset (overrides SHORTS_PRESET)
    #[arg(long, global = true)]
    preset: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a short from a script JSON file
    Render {
        /// Script file ({title, script_segments, keywords})
        #[arg(short, long)]
        script: PathBuf,

        /// Root directory for run folders
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Generate only the first segment
        #[arg(long)]
        test: bool,

        /// Join segments with the concat demuxer instead of re-encoding
        #[arg(long)]
        stream_copy: bool,
    },

    /// Narration over a long background clip
    Background {
        /// Video title, also used for the output file name
        #[arg(short, long)]
        title: String,

        /// JSON list of {text, audio?} lines
        #[arg(short, long)]
        segments: Option<PathBuf>,

        /// Narration line (repeatable); voiced with edge-tts
        #[arg(long = "line")]
        lines: Vec<String>,

        /// Background clip; picked from --assets when omitted
        #[arg(short, long)]
        video: Option<PathBuf>,

        /// Folder of .mp4/.mkv background clips
        #[arg(short, long, default_value = "assets/gameplay")]
        assets: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "output_reddit")]
        output_dir: PathBuf,
    },

    /// Render every script JSON in a directory, skipping finished ones
    Batch {
        /// Directory of script JSON files
        #[arg(short, long)]
        scripts: PathBuf,

        /// Root directory for run folders
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// Seconds to rest between videos
        #[arg(long, default_value_t = 10)]
        cool_down: u64,
    },

    /// Check external tool dependencies
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Keep symphonia's probe chatter and reqwest's connection logs quiet
    // unless explicitly requested.
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,symphonia=error,reqwest=warn");
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("--- SYNOID SHORTS v{} ---", env!("CARGO_PKG_VERSION"));

    let args = Cli::parse();
    let mut config = ShortsConfig::from_env();
    if let Some(font) = args.font {
        config.font_path = Some(font);
    }
    if let Some(preset) = args.preset {
        config.preset = preset;
    }
    let log = EventLogHandle::new(config.log_capacity);

    match args.command {
        Commands::Render {
            script,
            output_dir,
            test,
            stream_copy,
        } => {
            let script = Script::load(&script).await?;
            let run_dir = output_dir.join(script.run_dir_name());
            let join = if stream_copy {
                JoinMode::StreamCopy
            } else {
                JoinMode::Compose
            };
            let pipeline = build_pipeline(&config, log.clone())
                .await
                .with_test_mode(test)
                .with_join_mode(join);

            let report = pipeline.run(&script, &run_dir).await?;
            info!(
                "✨ SUCCESS! {:?} ({:.2}s, cuts at {:?})",
                report.output, report.total_duration, report.cut_points
            );
            if !report.skipped.is_empty() {
                warn!("Skipped segments: {:?}", report.skipped);
            }
        }
        Commands::Background {
            title,
            segments,
            lines,
            video,
            assets,
            output_dir,
        } => {
            let mut narration = match segments {
                Some(path) => load_lines(&path).await?,
                None => Vec::new(),
            };
            narration.extend(lines.into_iter().map(|text| NarrationLine { text, audio: None }));
            if narration.is_empty() {
                bail!("give narration with --segments or at least one --line");
            }

            let renderer = caption_renderer(&config).await;
            let composer = BackgroundComposer::new(
                renderer,
                MediaProbe::new(config.ffprobe_bin.clone()),
                config.ffmpeg_bin.clone(),
                RenderTarget::new("background.mp4")
                    .with_preset("ultrafast")
                    .with_threads(config.threads),
            );
            let voice = Arc::new(EdgeTts::new(config.tts_bin.clone(), config.tts_voice.clone()));
            let runner = BackgroundRunner::new(composer, voice, log.clone());

            let job = BackgroundJob {
                title,
                lines: narration,
                video,
                assets_dir: assets,
                output_dir,
            };
            let report = runner.run(&job).await?;
            info!("✨ Video Created: {:?} ({:.2}s)", report.output, report.total_duration);
            if !report.skipped.is_empty() {
                warn!("Lines left out: {:?}", report.skipped);
            }
        }
        Commands::Batch {
            scripts,
            output_dir,
            cool_down,
        } => {
            let pipeline = Arc::new(build_pipeline(&config, log.clone()).await);
            let jobs = script_jobs(&scripts, &output_dir, pipeline)
                .await
                .with_context(|| format!("listing scripts in {:?}", scripts))?;
            if jobs.is_empty() {
                bail!("no script JSON files in {:?}", scripts);
            }

            let stats = BatchRunner::new(log.clone())
                .with_cool_down(Duration::from_secs(cool_down))
                .run(&jobs)
                .await;
            info!(
                "🚜 BATCH COMPLETE: {} rendered, {} skipped, {} failed",
                stats.succeeded, stats.skipped, stats.failed
            );
            if stats.failed > 0 && stats.succeeded + stats.skipped == 0 {
                bail!("every job in the batch failed");
            }
        }
        Commands::Check => {
            let missing = health::check_dependencies(&config).await;
            println!("{}", health::status_report(&missing));
            if !missing.is_empty() {
                error!("Missing dependencies: {:?}", missing);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn caption_renderer(config: &ShortsConfig) -> CaptionRenderer {
    CaptionRenderer::load(
        FontChain::with_preferred(config.font_path.clone()),
        CaptionStyle::default(),
    )
    .await
}

async fn build_pipeline(config: &ShortsConfig, log: EventLogHandle) -> ShortsPipeline {
    let images = Arc::new(PollinationsImages::new(
        config.image_api.clone(),
        config.hf_token.clone(),
    ));
    let voice = Arc::new(EdgeTts::new(config.tts_bin.clone(), config.tts_voice.clone()));
    let renderer = caption_renderer(config).await;
    ShortsPipeline::with_renderer(config, renderer, images, voice, log)
}

async fn load_lines(path: &Path) -> Result<Vec<NarrationLine>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing narration lines in {:?}", path))
}
