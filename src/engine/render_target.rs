// SYNOID Shorts Render Target
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use super::{CANVAS_HEIGHT, CANVAS_WIDTH};
use std::path::{Path, PathBuf};

/// Encoder settings for a final or intermediate file. Resolution is
/// fixed at 1080x1920.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    pub output: PathBuf,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    /// x264 speed preset, e.g. "medium" or "ultrafast".
    pub preset: String,
    pub threads: usize,
    pub audio_bitrate: String,
    pub sample_rate: u32,
}

impl RenderTarget {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            fps: 24,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            preset: "medium".to_string(),
            threads: num_cpus::get(),
            audio_bitrate: "192k".to_string(),
            sample_rate: 44_100,
        }
    }

    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Same encoder settings, different file.
    pub fn retarget(&self, output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
            ..self.clone()
        }
    }

    pub fn resolution(&self) -> (u32, u32) {
        (CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    /// Encoder arguments placed before the output path.
    pub fn encoder_args(&self) -> Vec<String> {
        vec![
            "-r".to_string(),
            self.fps.to_string(),
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-threads".to_string(),
            self.threads.to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            "-ac".to_string(),
            "2".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shorts_format() {
        let target = RenderTarget::new("out.mp4");
        assert_eq!(target.fps, 24);
        assert_eq!(target.resolution(), (1080, 1920));
        let args = target.encoder_args();
        let codec = args.iter().position(|a| a == "-c:v").unwrap();
        assert_eq!(args[codec + 1], "libx264");
        let audio = args.iter().position(|a| a == "-c:a").unwrap();
        assert_eq!(args[audio + 1], "aac");
    }

    #[test]
    fn test_retarget_keeps_encoder_settings() {
        let target = RenderTarget::new("final.mp4").with_preset("ultrafast").with_threads(0);
        let part = target.retarget(Path::new("/tmp/part_000.mp4"));
        assert_eq!(part.preset, "ultrafast");
        assert_eq!(part.threads, 1);
        assert_eq!(part.output, PathBuf::from("/tmp/part_000.mp4"));
    }
}
