// SYNOID Shorts Background Job
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Commentary-style shorts: narration lines read over a long gameplay or
// b-roll clip. Lines without audio are voiced first; the clip is picked
// at random from an assets folder when none is given. A line that cannot
// be voiced or decoded is left out rather than sinking the video.

use super::collaborators::VoiceSynth;
use super::event_log::EventLogHandle;
use crate::engine::background::{BackgroundComposer, BackgroundReport};
use crate::engine::NarrationSegment;
use crate::error::ShortsError;
use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

const TITLE_LIMIT: usize = 50;

/// One narrated line; `audio` is synthesised when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationLine {
    pub text: String,
    #[serde(default)]
    pub audio: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct BackgroundJob {
    pub title: String,
    pub lines: Vec<NarrationLine>,
    /// Explicit background clip; otherwise one is drawn from `assets_dir`.
    pub video: Option<PathBuf>,
    pub assets_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl BackgroundJob {
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.mp4", output_stem(&self.title)))
    }
}

/// Keeps letters, digits, spaces, `-` and `_`; spaces become `_` and the
/// result is cut to 50 characters.
pub fn output_stem(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let stem: String = kept
        .trim()
        .replace(' ', "_")
        .chars()
        .take(TITLE_LIMIT)
        .collect();
    if stem.is_empty() {
        "background_short".to_string()
    } else {
        stem
    }
}

/// Every `.mp4`/`.mkv` under `dir`, sorted.
pub fn background_candidates(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_ascii_lowercase().as_str(), "mp4" | "mkv"))
                .unwrap_or(false)
        })
        .collect();
    found.sort();
    found
}

pub fn pick_background<R: Rng + ?Sized>(dir: &Path, rng: &mut R) -> Option<PathBuf> {
    background_candidates(dir).choose(rng).cloned()
}

pub struct BackgroundRunner {
    composer: BackgroundComposer,
    voice: Arc<dyn VoiceSynth>,
    log: EventLogHandle,
}

impl BackgroundRunner {
    pub fn new(composer: BackgroundComposer, voice: Arc<dyn VoiceSynth>, log: EventLogHandle) -> Self {
        Self {
            composer,
            voice,
            log,
        }
    }

    pub async fn run(&self, job: &BackgroundJob) -> Result<BackgroundReport> {
        if job.lines.is_empty() {
            bail!("background job '{}' has no narration lines", job.title);
        }
        let video = match &job.video {
            Some(video) => video.clone(),
            None => {
                let picked = pick_background(&job.assets_dir, &mut rand::thread_rng());
                picked.with_context(|| format!("no .mp4/.mkv background found in {:?}", job.assets_dir))?
            }
        };
        info!("[BACKGROUND] Using background clip {:?}", video);

        tokio::fs::create_dir_all(&job.output_dir)
            .await
            .with_context(|| format!("creating {:?}", job.output_dir))?;
        // Synthesised narration lives only as long as this job.
        let narration_dir = tempfile::Builder::new()
            .prefix("narration_")
            .tempdir_in(&job.output_dir)?;

        let voiced = self.voice_lines(&job.lines, narration_dir.path()).await;
        if voiced.segments.is_empty() {
            self.log.error(format!("No narration could be voiced for '{}'", job.title));
            return Err(ShortsError::NoValidSegments.into());
        }

        let output = job.output_path();
        let mut report = self
            .composer
            .render(&video, &voiced.segments, &output)
            .await?;

        // Map the composer's positions back to the job's line numbers.
        let mut skipped: Vec<usize> = report
            .skipped
            .iter()
            .filter_map(|&i| voiced.origin.get(i).copied())
            .chain(voiced.failed)
            .collect();
        skipped.sort_unstable();
        for &i in &skipped {
            self.log.warn(format!("Line {} of '{}' left out: no usable audio", i, job.title));
        }
        report.skipped = skipped;

        self.log.success(format!(
            "Background short '{}' rendered ({:.2}s, {:?})",
            job.title, report.total_duration, report.window
        ));
        Ok(report)
    }

    /// Resolves audio for every line, synthesising into `dir` where none
    /// is given. Lines whose synthesis fails are recorded and dropped.
    pub async fn voice_lines(&self, lines: &[NarrationLine], dir: &Path) -> VoicedLines {
        let mut voiced = VoicedLines::default();
        for (i, line) in lines.iter().enumerate() {
            let audio = match &line.audio {
                Some(path) => path.clone(),
                None => {
                    let path = dir.join(format!("line_{}.mp3", i));
                    if let Err(e) = self.voice.synthesize(&line.text, &path).await {
                        warn!("[BACKGROUND] Could not voice line {}: {:#}", i, e);
                        self.log.warn(format!("Voicing line {} failed: {:#}", i, e));
                        voiced.failed.push(i);
                        continue;
                    }
                    path
                }
            };
            voiced.segments.push(NarrationSegment {
                text: line.text.clone(),
                audio,
            });
            voiced.origin.push(i);
        }
        voiced
    }
}

/// Narration ready for the composer. `origin[k]` is the job line that
/// `segments[k]` came from.
#[derive(Debug, Default)]
pub struct VoicedLines {
    pub segments: Vec<NarrationSegment>,
    pub origin: Vec<usize>,
    pub failed: Vec<usize>,
}
