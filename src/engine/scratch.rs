// SYNOID Shorts Scratch Files
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Drop guards for intermediate files. Whatever the render outcome, the
// files a stage created are gone once its guard goes out of scope.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ScratchFiles {
    paths: Vec<PathBuf>,
}

impl ScratchFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
        }
    }

    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Stop tracking the files; they survive the guard.
    pub fn keep(mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.paths)
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            remove_quietly(path);
        }
    }
}

pub fn remove_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("[SCRATCH] Released {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("[SCRATCH] Could not remove {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_removes_files_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"y").unwrap();
        {
            let mut guard = ScratchFiles::single(&a);
            guard.track(&b);
            guard.track(dir.path().join("never_written.png"));
        }
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn test_keep_disarms_guard() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("keep.mp4");
        std::fs::write(&a, b"x").unwrap();
        let kept = ScratchFiles::single(&a).keep();
        assert_eq!(kept, vec![a.clone()]);
        assert!(a.exists());
    }

    #[test]
    fn test_guard_runs_on_error_path() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("partial.mp3");
        std::fs::write(&a, b"x").unwrap();
        let failing = || -> Result<(), String> {
            let _guard = ScratchFiles::single(&a);
            Err("encode failed".to_string())
        };
        assert!(failing().is_err());
        assert!(!a.exists());
    }
}
