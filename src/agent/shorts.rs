// SYNOID Shorts Pipeline
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Script in, finished short out: fetch media, validate it, compose each
// surviving segment and join them on the timeline.

use super::collaborators::{ImageSource, VoiceSynth};
use super::event_log::EventLogHandle;
use super::fetch::{MediaFetcher, RunLayout};
use super::script::{sanitize_filename, Script};
use super::validation::ValidationGate;
use crate::config::ShortsConfig;
use crate::engine::caption::{CaptionRenderer, CaptionStyle, FontChain};
use crate::engine::composer::SegmentComposer;
use crate::engine::probe::MediaProbe;
use crate::engine::render_target::RenderTarget;
use crate::engine::timeline::{JoinMode, Timeline};
use crate::engine::Segment;
use crate::error::{Result as ShortsResult, ShortsError};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of joining segments into one file.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub output: PathBuf,
    pub total_duration: f64,
    /// Timestamps of the hard cuts.
    pub cut_points: Vec<f64>,
    pub used: Vec<usize>,
    pub skipped: Vec<usize>,
}

pub struct ShortsPipeline {
    config: ShortsConfig,
    fetcher: MediaFetcher,
    composer: SegmentComposer,
    gate: ValidationGate,
    join: JoinMode,
    test_mode: bool,
    log: EventLogHandle,
}

impl ShortsPipeline {
    /// Resolves the caption font from `config` and builds the pipeline.
    pub async fn load(
        config: &ShortsConfig,
        images: Arc<dyn ImageSource>,
        voice: Arc<dyn VoiceSynth>,
        log: EventLogHandle,
    ) -> Self {
        let renderer = CaptionRenderer::load(
            FontChain::with_preferred(config.font_path.clone()),
            CaptionStyle::default(),
        )
        .await;
        Self::with_renderer(config, renderer, images, voice, log)
    }

    /// Shares an already loaded caption renderer.
    pub fn with_renderer(
        config: &ShortsConfig,
        renderer: CaptionRenderer,
        images: Arc<dyn ImageSource>,
        voice: Arc<dyn VoiceSynth>,
        log: EventLogHandle,
    ) -> Self {
        let target = RenderTarget::new("segment.mp4")
            .with_preset(config.preset.clone())
            .with_threads(config.threads);
        let probe = MediaProbe::new(config.ffprobe_bin.clone());
        let composer =
            SegmentComposer::new(renderer, probe.clone(), config.ffmpeg_bin.clone(), target);
        Self {
            config: config.clone(),
            fetcher: MediaFetcher::new(images, voice, config.fetch_workers, log.clone()),
            composer,
            gate: ValidationGate::new(probe),
            join: JoinMode::default(),
            test_mode: false,
            log,
        }
    }

    /// Only the first segment is produced.
    pub fn with_test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }

    pub fn with_join_mode(mut self, join: JoinMode) -> Self {
        self.join = join;
        self
    }

    /// Where `run` writes the short for `script` under `run_dir`.
    pub fn output_path(script: &Script, run_dir: &Path) -> PathBuf {
        RunLayout::new(run_dir).final_output(&title_slug(script, run_dir))
    }

    /// Whatever the outcome, the event log is saved to `events.json` in
    /// the run directory.
    pub async fn run(&self, script: &Script, run_dir: &Path) -> Result<AssemblyReport> {
        let layout = RunLayout::new(run_dir);
        let result = self.run_stages(script, &layout).await;
        self.save_events(&layout).await;
        result
    }

    async fn save_events(&self, layout: &RunLayout) {
        let path = layout.events_path();
        let saved = match self.log.snapshot().to_json() {
            Ok(json) => tokio::fs::write(&path, json).await.map_err(anyhow::Error::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = saved {
            warn!("[PIPELINE] Could not save event log to {:?}: {:#}", path, e);
        }
    }

    async fn run_stages(&self, script: &Script, layout: &RunLayout) -> Result<AssemblyReport> {
        let run_dir = layout.root();
        layout
            .prepare()
            .await
            .with_context(|| format!("preparing run directory {:?}", run_dir))?;
        script.save(&layout.script_path()).await?;

        info!("[PIPELINE] Title: {}", script.title);
        let mut segments = script.script_segments.as_slice();
        if self.test_mode && !segments.is_empty() {
            info!("[PIPELINE] Test mode: processing only the first segment");
            segments = &segments[..1];
        }

        let fetched = self.fetcher.fetch_all(segments, layout).await;
        let report = self.gate.validate(segments, &fetched).await;
        for rejection in &report.rejected {
            self.log.warn(rejection.to_string());
        }
        if report.segments.is_empty() {
            self.log.error(format!("No valid segments for '{}'", script.title));
            return Err(ShortsError::NoValidSegments.into());
        }

        let output = Self::output_path(script, run_dir);
        let assembled = self.assemble(&report.segments, &output).await?;
        self.log.success(format!(
            "Video generated at {:?} ({:.2}s, {} segments)",
            assembled.output,
            assembled.total_duration,
            assembled.used.len()
        ));
        Ok(assembled)
    }

    /// Composes `segments` in order and renders the joined timeline to
    /// `output`. Segments with missing or corrupt media are skipped;
    /// any other failure aborts this video.
    pub async fn assemble(&self, segments: &[Segment], output: &Path) -> ShortsResult<AssemblyReport> {
        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&parent).await?;

        let scratch = tempfile::Builder::new()
            .prefix("shorts_segments_")
            .tempdir_in(&parent)?;
        let scratch_path = scratch.path().to_path_buf();
        let mut timeline = Timeline::with_scratch(scratch);
        let mut skipped = Vec::new();

        for segment in segments {
            match self.composer.compose(segment, &scratch_path).await {
                Ok(composed) => timeline.push(composed),
                Err(e) if e.is_segment_level() => {
                    warn!("[PIPELINE] Skipping segment {}: {}", segment.index, e);
                    self.log.warn(format!("Skipping segment {}: {}", segment.index, e));
                    skipped.push(segment.index);
                }
                Err(e) => return Err(e),
            }
        }

        let total_duration = timeline.total_duration();
        let cut_points = timeline.cut_points();
        let used: Vec<usize> = timeline.segments().iter().map(|s| s.index).collect();

        let target = RenderTarget::new(output)
            .with_preset(self.config.preset.clone())
            .with_threads(self.config.threads);
        let output = timeline
            .render(&self.config.ffmpeg_bin, &target, self.join)
            .await?;

        Ok(AssemblyReport {
            output,
            total_duration,
            cut_points,
            used,
            skipped,
        })
    }
}

fn title_slug(script: &Script, run_dir: &Path) -> String {
    let slug = script.safe_title();
    if !slug.is_empty() {
        return slug;
    }
    run_dir
        .file_name()
        .map(|n| sanitize_filename(&n.to_string_lossy()))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "short".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::script::ScriptSegment;
    use async_trait::async_trait;

    struct NoImages;

    #[async_trait]
    impl ImageSource for NoImages {
        async fn fetch_image(&self, _prompt: &str, _out: &Path) -> Result<()> {
            anyhow::bail!("offline")
        }
    }

    struct NoVoice;

    #[async_trait]
    impl VoiceSynth for NoVoice {
        async fn synthesize(&self, _text: &str, _out: &Path) -> Result<()> {
            anyhow::bail!("offline")
        }
    }

    async fn pipeline(log: EventLogHandle) -> ShortsPipeline {
        ShortsPipeline::load(
            &ShortsConfig::default(),
            Arc::new(NoImages),
            Arc::new(NoVoice),
            log,
        )
        .await
    }

    fn script() -> Script {
        Script {
            title: "Vacuum Decay: The End?".to_string(),
            script_segments: vec![
                ScriptSegment {
                    text: "The universe could end.".to_string(),
                    visual_prompt: "false vacuum bubble".to_string(),
                },
                ScriptSegment {
                    text: "In a second.".to_string(),
                    visual_prompt: "clock".to_string(),
                },
            ],
            keywords: vec![],
        }
    }

    #[test]
    fn test_output_path_uses_safe_title() {
        let path = ShortsPipeline::output_path(&script(), Path::new("output/vacuum_decay"));
        assert_eq!(
            path,
            PathBuf::from("output/vacuum_decay/final_vacuum_decay_the_end.mp4")
        );
    }

    #[test]
    fn test_empty_title_falls_back_to_run_dir() {
        let mut untitled = script();
        untitled.title = String::new();
        let path = ShortsPipeline::output_path(&untitled, Path::new("output/Deep Ocean"));
        assert_eq!(path, PathBuf::from("output/Deep Ocean/final_deep_ocean.mp4"));
    }

    #[tokio::test]
    async fn test_run_without_media_has_no_valid_segments() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLogHandle::new(50);
        let err = pipeline(log.clone())
            .await
            .with_test_mode(true)
            .run(&script(), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ShortsError>(),
            Some(ShortsError::NoValidSegments)
        ));
        assert!(dir.path().join("script.json").exists());
        assert!(dir.path().join("images").is_dir());
        // Test mode: one fetch (two failures), two rejections, one summary.
        assert_eq!(log.snapshot().len(), 5);

        let saved = std::fs::read_to_string(dir.path().join("events.json")).unwrap();
        let entries: Vec<crate::agent::event_log::LogEntry> = serde_json::from_str(&saved).unwrap();
        assert_eq!(entries.len(), 5);
        assert!(entries.last().unwrap().message.contains("No valid segments"));
    }

    #[tokio::test]
    async fn test_assemble_all_missing_is_no_valid_segments() {
        let dir = tempfile::tempdir().unwrap();
        let segments = vec![Segment::new(
            0,
            "gone",
            dir.path().join("a.png"),
            dir.path().join("a.mp3"),
        )];
        let err = pipeline(EventLogHandle::default())
            .await
            .assemble(&segments, &dir.path().join("final.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShortsError::NoValidSegments));
    }
}
