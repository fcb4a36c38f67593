// SYNOID Shorts Error Taxonomy
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Typed errors raised by the media core. Orchestration code wraps these
// in anyhow at the edges.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortsError>;

/// Which media slot of a segment a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShortsError {
    #[error("segment {segment}: {kind} missing or empty at {path:?}")]
    MissingMedia {
        segment: usize,
        kind: MediaKind,
        path: PathBuf,
    },

    /// Present but undecodable. The validation gate removes the file so a
    /// resumed run fetches it again.
    #[error("segment {segment}: corrupt {kind} {path:?} ({reason})")]
    CorruptMedia {
        segment: usize,
        kind: MediaKind,
        path: PathBuf,
        reason: String,
    },

    #[error("render failed during {stage}: {detail}")]
    Render { stage: String, detail: String },

    #[error("could not probe {path:?}: {reason}")]
    Probe { path: PathBuf, reason: String },

    #[error("no valid segments left to render")]
    NoValidSegments,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ShortsError {
    pub fn render(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        ShortsError::Render {
            stage: stage.into(),
            detail: detail.into(),
        }
    }

    pub fn probe(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ShortsError::Probe {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Segment-level errors downgrade to "segment missing" instead of
    /// aborting the whole video.
    pub fn is_segment_level(&self) -> bool {
        matches!(
            self,
            ShortsError::MissingMedia { .. } | ShortsError::CorruptMedia { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_media_message() {
        let err = ShortsError::MissingMedia {
            segment: 2,
            kind: MediaKind::Audio,
            path: PathBuf::from("audio/segment_2.mp3"),
        };
        let msg = err.to_string();
        assert!(msg.contains("segment 2"));
        assert!(msg.contains("audio"));
        assert!(err.is_segment_level());
    }

    #[test]
    fn test_render_is_not_segment_level() {
        let err = ShortsError::render("encode", "disk full");
        assert!(!err.is_segment_level());
        assert_eq!(err.to_string(), "render failed during encode: disk full");
    }

    #[test]
    fn test_corrupt_audio_is_segment_level() {
        let err = ShortsError::CorruptMedia {
            segment: 0,
            kind: MediaKind::Audio,
            path: PathBuf::from("audio/segment_0.mp3"),
            reason: "no audio track".to_string(),
        };
        assert!(err.is_segment_level());
        assert!(err.to_string().contains("corrupt audio"));
        assert!(!ShortsError::probe("bg.mp4", "no video stream").is_segment_level());
    }
}
