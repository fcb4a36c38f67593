// SYNOID Shorts Background-Video Variant
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// One long background clip, one pre-mixed narration track, captions
// scheduled across the whole mix. The narration is flushed to a temp
// file and re-probed before the video pass: mixing straight into the
// final encode is where the old pipeline hung.

use super::caption::{CaptionLayer, CaptionRenderer};
use super::chunking::CaptionSchedule;
use super::composer::{narration_duration, require_media};
use super::ffmpeg::{format_seconds, overlay_chain, FfmpegJob, TimedOverlay};
use super::fit::FitPolicy;
use super::probe::MediaProbe;
use super::render_target::RenderTarget;
use super::scratch::ScratchFiles;
use super::NarrationSegment;
use crate::error::{MediaKind, Result, ShortsError};
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MIX_FILE_NAME: &str = "temp_combined_audio.mp3";
const MIX_BITRATE: &str = "192k";

/// Which stretch of the background clip ends up on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundWindow {
    /// Clip shorter than the narration: loop it end to end.
    Loop,
    /// Clip long enough: play `[start, start + total)`.
    Trim { start: f64 },
}

impl BackgroundWindow {
    /// Uniformly random start in `[0, native - total]` when the clip is
    /// long enough, so repeated renders show different slices.
    pub fn choose<R: Rng + ?Sized>(native: f64, total: f64, rng: &mut R) -> Self {
        if native < total {
            return BackgroundWindow::Loop;
        }
        let max_start = native - total;
        let start = if max_start > 0.0 {
            rng.gen_range(0.0..=max_start)
        } else {
            0.0
        };
        BackgroundWindow::Trim { start }
    }

    /// Input options placed before the background's `-i`.
    pub fn input_args(&self) -> Vec<String> {
        match self {
            BackgroundWindow::Loop => vec!["-stream_loop".to_string(), "-1".to_string()],
            BackgroundWindow::Trim { start } => vec!["-ss".to_string(), format_seconds(*start)],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundReport {
    pub output: PathBuf,
    pub total_duration: f64,
    pub window: BackgroundWindow,
    pub caption_count: usize,
    /// Narration lines left out for missing or undecodable audio.
    pub skipped: Vec<usize>,
}

/// Narration lines whose audio decoded, with their durations, plus the
/// indices that were dropped.
#[derive(Debug, Default)]
pub struct UsableNarration {
    pub segments: Vec<NarrationSegment>,
    pub durations: Vec<f64>,
    pub skipped: Vec<usize>,
}

#[derive(Clone)]
pub struct BackgroundComposer {
    renderer: CaptionRenderer,
    probe: MediaProbe,
    ffmpeg_bin: String,
    target: RenderTarget,
}

impl BackgroundComposer {
    /// `target` supplies the encoder settings; its output path is
    /// replaced per render.
    pub fn new(
        renderer: CaptionRenderer,
        probe: MediaProbe,
        ffmpeg_bin: impl Into<String>,
        target: RenderTarget,
    ) -> Self {
        Self {
            renderer,
            probe,
            ffmpeg_bin: ffmpeg_bin.into(),
            target,
        }
    }

    pub fn premix_job(&self, audio: &[PathBuf], mix_path: &Path) -> FfmpegJob {
        let mut job = FfmpegJob::new(&self.ffmpeg_bin, "narration premix");
        let mut pads = String::new();
        for (i, path) in audio.iter().enumerate() {
            job = job.input(path);
            pads.push_str(&format!("[{i}:a]"));
        }
        let graph = vec![format!("{pads}concat=n={}:v=0:a=1[aout]", audio.len())];
        job.filter_complex(&graph)
            .map("[aout]")
            .args(["-c:a", "libmp3lame", "-b:a", MIX_BITRATE])
            .arg(mix_path)
    }

    /// Final pass. Inputs: 0 = background, 1 = mixed narration,
    /// 2.. = caption layers.
    #[allow(clippy::too_many_arguments)]
    pub fn composite_job(
        &self,
        video: &Path,
        window: BackgroundWindow,
        fit_filter: &str,
        mix_path: &Path,
        layers: &[CaptionLayer],
        total: f64,
        output: &Path,
    ) -> FfmpegJob {
        let fps = self.target.fps;
        let mut job = FfmpegJob::new(&self.ffmpeg_bin, "background composite")
            .args(window.input_args())
            .input(video)
            .input(mix_path);

        let mut overlays = Vec::with_capacity(layers.len());
        for layer in layers {
            let input_index = job.input_count();
            job = job.timed_image(&layer.path, layer.start_offset, layer.span, fps);
            overlays.push(TimedOverlay {
                input_index,
                start: layer.start_offset,
                end: layer.end(),
            });
        }

        let mut graph = vec![format!("[0:v]{}[base]", fit_filter)];
        graph.extend(overlay_chain("base", &overlays, "vcomp"));
        graph.push("[vcomp]format=yuv420p[vout]".to_string());

        job.filter_complex(&graph)
            .map("[vout]")
            .map("1:a")
            .encode_to(&self.target.retarget(output), Some(total))
    }

    /// Measures every line's audio. Missing or undecodable lines are
    /// dropped; any other failure aborts.
    pub async fn usable_narration(
        &self,
        segments: &[NarrationSegment],
    ) -> Result<UsableNarration> {
        let mut usable = UsableNarration::default();
        for (i, segment) in segments.iter().enumerate() {
            match narration_duration(&self.probe, i, &segment.audio).await {
                Ok(duration) => {
                    usable.segments.push(segment.clone());
                    usable.durations.push(duration);
                }
                Err(e) if e.is_segment_level() => {
                    warn!("[BACKGROUND] Skipping narration line {}: {}", i, e);
                    usable.skipped.push(i);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(usable)
    }

    pub async fn render(
        &self,
        video: &Path,
        segments: &[NarrationSegment],
        output: &Path,
    ) -> Result<BackgroundReport> {
        if segments.is_empty() {
            return Err(ShortsError::NoValidSegments);
        }
        require_media(0, MediaKind::Video, video)?;

        // Per-segment durations are captured before the mix replaces them.
        let UsableNarration {
            segments,
            durations,
            skipped,
        } = self.usable_narration(segments).await?;
        if segments.is_empty() {
            return Err(ShortsError::NoValidSegments);
        }

        let work_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&work_dir).await?;

        let audio: Vec<PathBuf> = segments.iter().map(|s| s.audio.clone()).collect();

        info!("[BACKGROUND] Mixing {} narration tracks...", audio.len());
        let mix_path = work_dir.join(MIX_FILE_NAME);
        let _mix_guard = ScratchFiles::single(&mix_path);
        self.premix_job(&audio, &mix_path).run().await?;
        let total = self.probe.audio_duration(&mix_path).await?;

        let info = self.probe.video_info(video).await?;
        let window = BackgroundWindow::choose(info.duration, total, &mut rand::thread_rng());
        let fit = FitPolicy::HeightFirst.geometry(info.width, info.height);
        info!(
            "[BACKGROUND] Narration {:.2}s over {:.2}s clip: {:?}",
            total, info.duration, window
        );

        let schedule = CaptionSchedule::accumulate(
            segments
                .iter()
                .zip(durations.iter())
                .map(|(s, d)| (s.text.as_str(), *d)),
        );

        let caption_dir = tempfile::Builder::new()
            .prefix("shorts_captions_")
            .tempdir_in(&work_dir)?;
        let renderer = self.renderer.clone();
        let chunks = schedule.chunks.clone();
        let dir = caption_dir.path().to_path_buf();
        let layers = tokio::task::spawn_blocking(move || {
            renderer.render_layers(&chunks, &dir, "background")
        })
        .await
        .map_err(|e| ShortsError::render("caption rasterisation", e.to_string()))??;

        info!("[BACKGROUND] Rendering {} captions -> {:?}", layers.len(), output);
        self.composite_job(video, window, &fit.to_filter(), &mix_path, &layers, total, output)
            .run()
            .await?;

        info!("[BACKGROUND] ✨ Video created: {:?}", output);
        Ok(BackgroundReport {
            output: output.to_path_buf(),
            total_duration: total,
            window,
            caption_count: layers.len(),
            skipped,
        })
    }
}
