// SYNOID Shorts Segment Composer
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Turns one (text, image, audio) triple into a timed unit: the still is
// fitted to 9:16 and held for the narration, captions burst on top, and
// the result is encoded to an intermediate file.

use super::caption::{CaptionLayer, CaptionRenderer};
use super::chunking::{schedule_segment, CaptionChunk};
use super::ffmpeg::{overlay_chain, FfmpegJob, TimedOverlay};
use super::fit::{FitGeometry, FitPolicy};
use super::probe::{image_dimensions, MediaProbe};
use super::render_target::RenderTarget;
use super::scratch::{remove_quietly, ScratchFiles};
use super::Segment;
use crate::error::{MediaKind, Result, ShortsError};
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything needed to render a segment, decided before any encode.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    pub index: usize,
    /// Decoded audio duration; authoritative for the whole segment.
    pub duration: f64,
    pub geometry: FitGeometry,
    pub chunks: Vec<CaptionChunk>,
}

/// A segment rendered to an intermediate file.
///
/// Owns that file: dropping the value deletes it.
#[derive(Debug)]
pub struct ComposedSegment {
    pub index: usize,
    pub duration: f64,
    pub chunks: Vec<CaptionChunk>,
    path: PathBuf,
}

impl ComposedSegment {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ComposedSegment {
    fn drop(&mut self) {
        remove_quietly(&self.path);
    }
}

/// Fails with `MissingMedia` when the file is absent or zero bytes.
pub fn require_media(segment: usize, kind: MediaKind, path: &Path) -> Result<()> {
    let present = std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if present {
        Ok(())
    } else {
        Err(ShortsError::MissingMedia {
            segment,
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// Decoded length of a segment's narration. A file that is present but
/// cannot be decoded is `CorruptMedia`, so callers drop just that segment.
pub async fn narration_duration(probe: &MediaProbe, segment: usize, path: &Path) -> Result<f64> {
    require_media(segment, MediaKind::Audio, path)?;
    match probe.audio_duration(path).await {
        Ok(duration) => Ok(duration),
        Err(ShortsError::Probe { reason, .. }) => Err(ShortsError::CorruptMedia {
            segment,
            kind: MediaKind::Audio,
            path: path.to_path_buf(),
            reason,
        }),
        Err(e) => Err(e),
    }
}

#[derive(Clone)]
pub struct SegmentComposer {
    renderer: CaptionRenderer,
    probe: MediaProbe,
    ffmpeg_bin: String,
    target: RenderTarget,
}

impl SegmentComposer {
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

    pub async fn plan(&self, segment: &Segment) -> Result<SegmentPlan> {
        require_media(segment.index, MediaKind::Image, &segment.visual_source)?;
        let duration =
            narration_duration(&self.probe, segment.index, &segment.audio_source).await?;
        let (width, height) = image_dimensions(&segment.visual_source)?;
        let geometry = FitPolicy::WidthFirst.geometry(width, height);
        let chunks = schedule_segment(&segment.text, duration, 0.0);

        Ok(SegmentPlan {
            index: segment.index,
            duration,
            geometry,
            chunks,
        })
    }

    /// ffmpeg invocation for a planned segment. Inputs: 0 = still,
    /// 1 = narration, 2.. = caption layers.
    pub fn build_job(
        &self,
        segment: &Segment,
        plan: &SegmentPlan,
        layers: &[CaptionLayer],
        output: &Path,
    ) -> FfmpegJob {
        let fps = self.target.fps;
        let mut job = FfmpegJob::new(&self.ffmpeg_bin, format!("segment {}", plan.index))
            .looped_image(&segment.visual_source, plan.duration, fps)
            .input(&segment.audio_source);

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

        let mut graph = vec![format!("[0:v]{}[base]", plan.geometry.to_filter())];
        graph.extend(overlay_chain("base", &overlays, "vcomp"));
        graph.push("[vcomp]format=yuv420p[vout]".to_string());

        job.filter_complex(&graph)
            .map("[vout]")
            .map("1:a")
            .encode_to(&self.target.retarget(output), Some(plan.duration))
    }

    /// Renders the segment into `scratch`. Caption layers are deleted as
    /// soon as the encode returns, whatever the outcome.
    pub async fn compose(&self, segment: &Segment, scratch: &Path) -> Result<ComposedSegment> {
        let plan = self.plan(segment).await?;
        info!(
            "[COMPOSER] Segment {}: {:.2}s, {} caption bursts",
            plan.index,
            plan.duration,
            plan.chunks.len()
        );

        let prefix = format!("segment_{:03}", plan.index);
        let renderer = self.renderer.clone();
        let chunks = plan.chunks.clone();
        let dir = scratch.to_path_buf();
        let layer_prefix = prefix.clone();
        let layers = tokio::task::spawn_blocking(move || {
            renderer.render_layers(&chunks, &dir, &layer_prefix)
        })
        .await
        .map_err(|e| ShortsError::render("caption rasterisation", e.to_string()))??;

        let mut layer_guard = ScratchFiles::new();
        for layer in &layers {
            layer_guard.track(&layer.path);
        }

        let output = scratch.join(format!("{}.mp4", prefix));
        let part_guard = ScratchFiles::single(&output);
        self.build_job(segment, &plan, &layers, &output).run().await?;
        drop(layer_guard);

        let path = part_guard.keep().remove(0);
        Ok(ComposedSegment {
            index: plan.index,
            duration: plan.duration,
            chunks: plan.chunks,
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::caption::{CaptionStyle, FontChain};

    fn composer() -> SegmentComposer {
        composer_with(CaptionRenderer::new(&FontChain::default(), CaptionStyle::default()))
    }

    async fn loaded_composer() -> SegmentComposer {
        composer_with(CaptionRenderer::load(FontChain::default(), CaptionStyle::default()).await)
    }

    fn composer_with(renderer: CaptionRenderer) -> SegmentComposer {
        SegmentComposer::new(
            renderer,
            MediaProbe::default(),
            "ffmpeg",
            RenderTarget::new("final.mp4"),
        )
    }

    #[tokio::test]
    async fn test_plan_rejects_missing_audio() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("segment_0.png");
        image::RgbaImage::new(16, 9).save(&image).unwrap();
        let segment = Segment::new(0, "hello there", &image, dir.path().join("segment_0.mp3"));

        let err = loaded_composer().await.plan(&segment).await.unwrap_err();
        match err {
            ShortsError::MissingMedia { segment, kind, .. } => {
                assert_eq!(segment, 0);
                assert_eq!(kind, MediaKind::Audio);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_plan_marks_undecodable_audio_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("segment_0.png");
        image::RgbaImage::new(16, 9).save(&image).unwrap();
        let audio = dir.path().join("segment_0.mp3");
        std::fs::write(&audio, b"<html>rate limited</html>").unwrap();
        let segment = Segment::new(0, "hello there", &image, &audio);

        let err = loaded_composer().await.plan(&segment).await.unwrap_err();
        assert!(err.is_segment_level());
        assert!(matches!(
            err,
            ShortsError::CorruptMedia { segment: 0, kind: MediaKind::Audio, .. }
        ));
    }

    #[test]
    fn test_zero_length_file_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.mp3");
        std::fs::write(&empty, b"").unwrap();
        assert!(require_media(1, MediaKind::Audio, &empty).is_err());
        std::fs::write(&empty, b"ID3").unwrap();
        assert!(require_media(1, MediaKind::Audio, &empty).is_ok());
    }

    #[test]
    fn test_job_layers_captions_over_fitted_still() {
        let segment = Segment::new(3, "dark forest theory", "img.png", "voice.mp3");
        let plan = SegmentPlan {
            index: 3,
            duration: 2.0,
            geometry: FitPolicy::WidthFirst.geometry(1920, 1080),
            chunks: schedule_segment(&segment.text, 2.0, 0.0),
        };
        let layers: Vec<CaptionLayer> = plan
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| CaptionLayer {
                path: PathBuf::from(format!("cap_{}.png", i)),
                start_offset: c.start_offset,
                span: c.span,
                font_size: 150.0,
            })
            .collect();

        let line = composer()
            .build_job(&segment, &plan, &layers, Path::new("/scratch/segment_003.mp4"))
            .command_line();
        let graph_at = line.iter().position(|a| a == "-filter_complex").unwrap();
        let graph = &line[graph_at + 1];

        assert!(graph.starts_with("[0:v]crop=607:1080:657:0,scale=1080:1920,setsar=1[base]"));
        assert!(graph.contains("[base][2:v]overlay"));
        assert!(graph.contains("[cap0][3:v]overlay"));
        assert!(graph.contains("gte(t,1.000000)*lt(t,2.000000)"));
        // The second burst is only decoded for its own second.
        assert!(line
            .windows(4)
            .any(|w| w == ["-t", "1.000000", "-itsoffset", "1.000000"]));
        assert!(line.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a"));
        assert_eq!(line.last().unwrap(), "/scratch/segment_003.mp4");
    }

    #[test]
    fn test_empty_text_job_has_no_overlays() {
        let segment = Segment::new(0, "", "img.png", "voice.mp3");
        let plan = SegmentPlan {
            index: 0,
            duration: 1.5,
            geometry: FitPolicy::WidthFirst.geometry(1080, 1920),
            chunks: Vec::new(),
        };
        let job = composer().build_job(&segment, &plan, &[], Path::new("part.mp4"));
        assert_eq!(job.input_count(), 2);
        let line = job.command_line();
        assert!(line.iter().any(|a| a.contains("[base]null[vcomp]")));
    }
}
