// SYNOID Shorts Batch Runner
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Works through a queue of shorts one at a time. Finished outputs are
// skipped so an interrupted batch resumes where it stopped; a failing
// job is logged and counted, and the batch moves on.

use super::event_log::EventLogHandle;
use super::script::Script;
use super::shorts::ShortsPipeline;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

#[async_trait]
pub trait BatchJob: Send + Sync {
    fn label(&self) -> String;

    /// When this file exists the job is considered done.
    fn expected_output(&self) -> Option<PathBuf>;

    async fn execute(&self) -> Result<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchStats {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

pub struct BatchRunner {
    log: EventLogHandle,
    cool_down: Duration,
}

impl BatchRunner {
    pub fn new(log: EventLogHandle) -> Self {
        Self {
            log,
            cool_down: Duration::ZERO,
        }
    }

    /// Pause after every executed job, to go easy on rate-limited APIs.
    pub fn with_cool_down(mut self, cool_down: Duration) -> Self {
        self.cool_down = cool_down;
        self
    }

    pub async fn run(&self, jobs: &[Box<dyn BatchJob>]) -> BatchStats {
        let mut stats = BatchStats::default();
        info!("[BATCH] Starting batch of {} shorts", jobs.len());

        for (i, job) in jobs.iter().enumerate() {
            let label = job.label();
            info!("[BATCH] [{}/{}] {}", i + 1, jobs.len(), label);

            if let Some(expected) = job.expected_output().filter(|p| p.exists()) {
                self.log.info(format!(
                    "⏭️ Skipping '{}': video already exists at {:?}",
                    label, expected
                ));
                stats.skipped += 1;
                continue;
            }

            self.log.info(format!("Starting: {}", label));
            let started = Instant::now();
            match job.execute().await {
                Ok(output) => {
                    self.log.success(format!(
                        "✅ Finished '{}' in {}s -> {:?}",
                        label,
                        started.elapsed().as_secs(),
                        output
                    ));
                    stats.succeeded += 1;
                }
                Err(e) => {
                    self.log.error(format!("❌ Failed '{}': {:#}", label, e));
                    stats.failed += 1;
                }
            }

            if !self.cool_down.is_zero() && i + 1 < jobs.len() {
                info!("[BATCH] Cooling down for {:?}", self.cool_down);
                tokio::time::sleep(self.cool_down).await;
            }
        }

        self.log.success(format!(
            "Batch complete: {} succeeded, {} skipped, {} failed",
            stats.succeeded, stats.skipped, stats.failed
        ));
        stats
    }
}

/// A script file rendered through the shorts pipeline into
/// `output_root/<safe title>/`.
pub struct ScriptJob {
    script: Script,
    run_dir: PathBuf,
    pipeline: Arc<ShortsPipeline>,
}

impl ScriptJob {
    pub fn new(script: Script, output_root: &Path, pipeline: Arc<ShortsPipeline>) -> Self {
        let run_dir = output_root.join(script.run_dir_name());
        Self {
            script,
            run_dir,
            pipeline,
        }
    }
}

#[async_trait]
impl BatchJob for ScriptJob {
    fn label(&self) -> String {
        self.script.title.clone()
    }

    fn expected_output(&self) -> Option<PathBuf> {
        Some(ShortsPipeline::output_path(&self.script, &self.run_dir))
    }

    async fn execute(&self) -> Result<PathBuf> {
        let report = self.pipeline.run(&self.script, &self.run_dir).await?;
        Ok(report.output)
    }
}

/// A queue entry that could not even be loaded. Always fails, so it is
/// counted with the rest.
pub struct UnreadableJob {
    pub source: PathBuf,
    pub reason: String,
}

#[async_trait]
impl BatchJob for UnreadableJob {
    fn label(&self) -> String {
        self.source.display().to_string()
    }

    fn expected_output(&self) -> Option<PathBuf> {
        None
    }

    async fn execute(&self) -> Result<PathBuf> {
        anyhow::bail!("could not load {:?}: {}", self.source, self.reason)
    }
}

/// `.json` files directly inside `dir`, sorted by name.
pub fn script_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// One job per script file in `dir`.
pub async fn script_jobs(
    dir: &Path,
    output_root: &Path,
    pipeline: Arc<ShortsPipeline>,
) -> Result<Vec<Box<dyn BatchJob>>> {
    let mut jobs: Vec<Box<dyn BatchJob>> = Vec::new();
    for path in script_files(dir)? {
        match Script::load(&path).await {
            Ok(script) => jobs.push(Box::new(ScriptJob::new(script, output_root, pipeline.clone()))),
            Err(e) => jobs.push(Box::new(UnreadableJob {
                source: path,
                reason: format!("{:#}", e),
            })),
        }
    }
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeJob {
        name: &'static str,
        output: PathBuf,
        fail: bool,
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BatchJob for FakeJob {
        fn label(&self) -> String {
            self.name.to_string()
        }

        fn expected_output(&self) -> Option<PathBuf> {
            Some(self.output.clone())
        }

        async fn execute(&self) -> Result<PathBuf> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("render failed during encode: disk full");
            }
            std::fs::write(&self.output, b"mp4")?;
            Ok(self.output.clone())
        }
    }

    #[tokio::test]
    async fn test_batch_resumes_and_survives_failures() {
        let dir = tempfile::tempdir().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        std::fs::write(dir.path().join("done.mp4"), b"mp4").unwrap();

        let job = |name: &'static str, fail: bool| -> Box<dyn BatchJob> {
            Box::new(FakeJob {
                name,
                output: dir.path().join(format!("{}.mp4", name)),
                fail,
                runs: runs.clone(),
            })
        };
        let jobs = vec![job("done", false), job("broken", true), job("fresh", false)];

        let log = EventLogHandle::new(50);
        let stats = BatchRunner::new(log.clone()).run(&jobs).await;

        assert_eq!(
            stats,
            BatchStats {
                succeeded: 1,
                skipped: 1,
                failed: 1
            }
        );
        assert_eq!(stats.total(), 3);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(dir.path().join("fresh.mp4").exists());
        assert!(log
            .snapshot()
            .entries()
            .any(|e| e.message.contains("Failed 'broken'")));
    }

    #[tokio::test]
    async fn test_unreadable_scripts_become_failing_jobs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "not a script").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"title": "Roko's Basilisk", "script_segments": []}"#,
        )
        .unwrap();

        let files = script_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.json"));

        let job = UnreadableJob {
            source: files[1].clone(),
            reason: "no JSON object found in script text".to_string(),
        };
        assert!(job.expected_output().is_none());
        assert!(job.execute().await.is_err());
    }
}
