// SYNOID Shorts Timeline Assembler
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Joins composed segments into the final short with hard cuts. The
// default join runs ffmpeg's concat filter so each segment keeps the
// audio already attached to it; the stream-copy join reuses the
// stitcher's concat demuxer for identically encoded parts.

use super::composer::ComposedSegment;
use super::ffmpeg::FfmpegJob;
use super::render_target::RenderTarget;
use super::scratch::ScratchFiles;
use crate::error::{Result, ShortsError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    /// concat filter over video+audio pairs, re-encoded with the target.
    #[default]
    Compose,
    /// concat demuxer with `-c copy`.
    StreamCopy,
}

/// Ordered composed segments. Owns them (and optionally their scratch
/// directory) until the render finishes.
#[derive(Debug, Default)]
pub struct Timeline {
    segments: Vec<ComposedSegment>,
    scratch: Option<TempDir>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ties the scratch directory's lifetime to the timeline.
    pub fn with_scratch(scratch: TempDir) -> Self {
        Self {
            segments: Vec::new(),
            scratch: Some(scratch),
        }
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(|d| d.path())
    }

    pub fn push(&mut self, segment: ComposedSegment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[ComposedSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Timestamps of the hard cuts between consecutive segments.
    pub fn cut_points(&self) -> Vec<f64> {
        cut_points(self.segments.iter().map(|s| s.duration))
    }

    /// Builds the contents of an ffmpeg concat manifest.
    ///
    /// Each line is `file '<path>'`, single quotes escaped.
    pub fn concat_manifest(&self) -> String {
        create_concat_manifest(self.segments.iter().map(|s| s.path()))
    }

    pub fn compose_job(&self, ffmpeg_bin: &str, target: &RenderTarget) -> FfmpegJob {
        let mut job = FfmpegJob::new(ffmpeg_bin, "timeline join");
        let mut pads = String::new();
        for (i, segment) in self.segments.iter().enumerate() {
            job = job.input(segment.path());
            pads.push_str(&format!("[{i}:v][{i}:a]"));
        }
        let graph = vec![format!(
            "{pads}concat=n={}:v=1:a=1[vout][aout]",
            self.segments.len()
        )];
        job.filter_complex(&graph)
            .map("[vout]")
            .map("[aout]")
            .encode_to(target, None)
    }

    /// Concat list location: the scratch directory when the timeline owns
    /// one, otherwise beside the output.
    pub fn manifest_path(&self, output: &Path) -> PathBuf {
        match self.scratch_dir() {
            Some(dir) => dir.join("concat_manifest.txt"),
            None => output.with_extension("concat_manifest.txt"),
        }
    }

    pub fn stream_copy_job(&self, ffmpeg_bin: &str, manifest: &Path, output: &Path) -> FfmpegJob {
        FfmpegJob::new(ffmpeg_bin, "timeline stitch")
            .args(["-f", "concat", "-safe", "0"])
            .input(manifest)
            .args(["-c", "copy", "-movflags", "+faststart"])
            .arg(output)
    }

    /// Encodes the timeline to `target.output`. Consumes the timeline so
    /// every intermediate is released once ffmpeg has exited, on success
    /// and on failure alike.
    pub async fn render(self, ffmpeg_bin: &str, target: &RenderTarget, mode: JoinMode) -> Result<PathBuf> {
        if self.segments.is_empty() {
            return Err(ShortsError::NoValidSegments);
        }

        info!(
            "[TIMELINE] Joining {} segments ({:.2}s) -> {:?} [{:?}]",
            self.len(),
            self.total_duration(),
            target.output,
            mode
        );

        if let Some(parent) = target.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        match mode {
            JoinMode::Compose => {
                self.compose_job(ffmpeg_bin, target).run().await?;
            }
            JoinMode::StreamCopy => {
                let manifest_path = self.manifest_path(&target.output);
                let _manifest_guard = ScratchFiles::single(&manifest_path);
                tokio::fs::write(&manifest_path, self.concat_manifest()).await?;
                self.stream_copy_job(ffmpeg_bin, &manifest_path, &target.output)
                    .run()
                    .await?;
            }
        }

        info!("[TIMELINE] ✅ Final output: {:?}", target.output);
        Ok(target.output.clone())
    }
}

pub fn cut_points<I: IntoIterator<Item = f64>>(durations: I) -> Vec<f64> {
    let durations: Vec<f64> = durations.into_iter().collect();
    let mut cuts = Vec::with_capacity(durations.len().saturating_sub(1));
    let mut elapsed = 0.0;
    for d in durations.iter().take(durations.len().saturating_sub(1)) {
        elapsed += d;
        cuts.push(elapsed);
    }
    cuts
}

pub fn create_concat_manifest<'a, I: IntoIterator<Item = &'a Path>>(paths: I) -> String {
    paths
        .into_iter()
        .map(|p| format!("file '{}'", p.to_string_lossy().replace('\'', "'\\''")))
        .collect::<Vec<_>>()
        .join("\n")
}
