// SYNOID Shorts Engine Module
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The media assembly core: captions, fitting, per-segment composition,
// timeline assembly and the background-video variant.

pub mod background;
pub mod caption;
pub mod chunking;
pub mod composer;
pub mod ffmpeg;
pub mod fit;
pub mod probe;
pub mod render_target;
pub mod scratch;
pub mod timeline;

use std::path::PathBuf;

/// Output frame width in pixels.
pub const CANVAS_WIDTH: u32 = 1080;
/// Output frame height in pixels.
pub const CANVAS_HEIGHT: u32 = 1920;
/// Tolerance used when comparing derived durations.
pub const DURATION_EPSILON: f64 = 1e-6;

/// Width-over-height ratio of the 9:16 output frame.
pub fn target_ratio() -> f64 {
    CANVAS_WIDTH as f64 / CANVAS_HEIGHT as f64
}

/// One narrated unit whose media has been resolved on disk.
///
/// Duration is never stored here: it is read from `audio_source` when
/// the segment is composed.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Position in the original script, kept for logging.
    pub index: usize,
    pub text: String,
    pub visual_source: PathBuf,
    pub audio_source: PathBuf,
}

impl Segment {
    pub fn new(
        index: usize,
        text: impl Into<String>,
        visual_source: impl Into<PathBuf>,
        audio_source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            index,
            text: text.into(),
            visual_source: visual_source.into(),
            audio_source: audio_source.into(),
        }
    }
}

/// A (text, audio) pair for the background-video variant.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NarrationSegment {
    pub text: String,
    pub audio: PathBuf,
}
