// SYNOID Shorts Media Fetcher
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Fetches every segment's still and narration with a small bounded pool.
// Each task owns its pre-assigned paths, so nothing needs locking, and
// results are read back by segment index rather than completion order.

use super::collaborators::{ImageSource, VoiceSynth};
use super::event_log::EventLogHandle;
use super::script::ScriptSegment;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Directory layout of one short's run.
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn image_path(&self, index: usize) -> PathBuf {
        self.images_dir().join(format!("segment_{}.png", index))
    }

    pub fn audio_path(&self, index: usize) -> PathBuf {
        self.audio_dir().join(format!("segment_{}.mp3", index))
    }

    pub fn script_path(&self) -> PathBuf {
        self.root.join("script.json")
    }

    /// Snapshot of the run's event log.
    pub fn events_path(&self) -> PathBuf {
        self.root.join("events.json")
    }

    pub fn final_output(&self, safe_title: &str) -> PathBuf {
        self.root.join(format!("final_{}.mp4", safe_title))
    }

    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.images_dir()).await?;
        tokio::fs::create_dir_all(self.audio_dir()).await?;
        Ok(())
    }
}

/// What one segment's fetch left on disk. The paths are always the
/// assigned ones, whether or not anything was written there.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub index: usize,
    pub image: PathBuf,
    pub audio: PathBuf,
    pub failures: Vec<String>,
}

impl FetchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct MediaFetcher {
    images: Arc<dyn ImageSource>,
    voice: Arc<dyn VoiceSynth>,
    workers: usize,
    log: EventLogHandle,
}

impl MediaFetcher {
    pub fn new(
        images: Arc<dyn ImageSource>,
        voice: Arc<dyn VoiceSynth>,
        workers: usize,
        log: EventLogHandle,
    ) -> Self {
        Self {
            images,
            voice,
            workers: workers.max(1),
            log,
        }
    }

    /// Waits for every task. Files that already exist are not fetched
    /// again, which lets an interrupted run resume.
    pub async fn fetch_all(&self, segments: &[ScriptSegment], layout: &RunLayout) -> Vec<FetchOutcome> {
        info!(
            "[FETCH] Generating media for {} segments ({} workers)",
            segments.len(),
            self.workers
        );
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = Vec::with_capacity(segments.len());

        for (index, segment) in segments.iter().enumerate() {
            let semaphore = semaphore.clone();
            let images = self.images.clone();
            let voice = self.voice.clone();
            let prompt = segment.visual_prompt.clone();
            let text = segment.text.clone();
            let image = layout.image_path(index);
            let audio = layout.audio_path(index);

            tasks.push(tokio::spawn(async move {
                let mut outcome = FetchOutcome {
                    index,
                    image,
                    audio,
                    failures: Vec::new(),
                };
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        outcome.failures.push(format!("fetch pool closed: {}", e));
                        return outcome;
                    }
                };

                if !outcome.image.exists() {
                    if let Err(e) = images.fetch_image(&prompt, &outcome.image).await {
                        warn!("[FETCH] Image {} failed: {:#}", index, e);
                        outcome.failures.push(format!("image: {:#}", e));
                    }
                }
                if !outcome.audio.exists() {
                    if let Err(e) = voice.synthesize(&text, &outcome.audio).await {
                        warn!("[FETCH] Audio {} failed: {:#}", index, e);
                        outcome.failures.push(format!("audio: {:#}", e));
                    }
                }
                info!("[FETCH] Completed media for segment {}", index + 1);
                outcome
            }));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        for (index, task) in tasks.into_iter().enumerate() {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => FetchOutcome {
                    index,
                    image: layout.image_path(index),
                    audio: layout.audio_path(index),
                    failures: vec![format!("fetch task aborted: {}", e)],
                },
            };
            for failure in &outcome.failures {
                self.log.warn(format!("Segment {} fetch failed: {}", index, failure));
            }
            outcomes.push(outcome);
        }
        let clean = outcomes.iter().filter(|o| o.is_clean()).count();
        info!("[FETCH] {}/{} segments fetched cleanly", clean, outcomes.len());
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct SlowImages {
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageSource for SlowImages {
        async fn fetch_image(&self, prompt: &str, out: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            // Later segments finish first.
            let delay = if prompt.ends_with('0') { 40 } else { 5 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            tokio::fs::write(out, prompt.as_bytes()).await?;
            Ok(())
        }
    }

    struct FailingVoice;

    #[async_trait]
    impl VoiceSynth for FailingVoice {
        async fn synthesize(&self, text: &str, out: &Path) -> Result<()> {
            if text == "bad" {
                anyhow::bail!("tts quota exceeded");
            }
            tokio::fs::write(out, b"ID3").await?;
            Ok(())
        }
    }

    fn segments(n: usize) -> Vec<ScriptSegment> {
        (0..n)
            .map(|i| ScriptSegment {
                text: if i == 2 { "bad".into() } else { format!("line {}", i) },
                visual_prompt: format!("prompt {}", i),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_pool_is_bounded_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path());
        layout.prepare().await.unwrap();
        let images = Arc::new(SlowImages::default());
        let fetcher = MediaFetcher::new(images.clone(), Arc::new(FailingVoice), 2, EventLogHandle::new(10));

        let outcomes = fetcher.fetch_all(&segments(5), &layout).await;

        assert!(images.peak.load(Ordering::SeqCst) <= 2);
        let indices: Vec<usize> = outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(outcomes[3].image, layout.image_path(3));
        assert_eq!(std::fs::read_to_string(&outcomes[4].image).unwrap(), "prompt 4");
    }

    #[tokio::test]
    async fn test_failures_are_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path());
        layout.prepare().await.unwrap();
        let log = EventLogHandle::new(10);
        let fetcher = MediaFetcher::new(
            Arc::new(SlowImages::default()),
            Arc::new(FailingVoice),
            2,
            log.clone(),
        );

        let outcomes = fetcher.fetch_all(&segments(3), &layout).await;

        assert!(outcomes[0].is_clean());
        assert!(!outcomes[2].is_clean());
        assert!(outcomes[2].failures[0].contains("tts quota exceeded"));
        assert!(!outcomes[2].audio.exists());
        assert_eq!(log.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_files_are_not_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path());
        layout.prepare().await.unwrap();
        std::fs::write(layout.image_path(0), b"cached").unwrap();
        let images = Arc::new(SlowImages::default());
        let fetcher = MediaFetcher::new(images.clone(), Arc::new(FailingVoice), 2, EventLogHandle::new(10));

        fetcher.fetch_all(&segments(2), &layout).await;

        assert_eq!(images.calls.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read(layout.image_path(0)).unwrap(), b"cached");
    }

    #[test]
    fn test_layout_paths() {
        let layout = RunLayout::new("output/dark_forest");
        assert_eq!(layout.image_path(3), PathBuf::from("output/dark_forest/images/segment_3.png"));
        assert_eq!(layout.audio_path(0), PathBuf::from("output/dark_forest/audio/segment_0.mp3"));
        assert_eq!(
            layout.final_output("dark_forest"),
            PathBuf::from("output/dark_forest/final_dark_forest.mp4")
        );
    }
}
