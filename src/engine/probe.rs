// SYNOID Shorts Media Probe
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Reads durations and dimensions from local media. Audio goes through
// symphonia first; ffprobe is the fallback and the only path for video.

use crate::error::{Result, ShortsError};
use serde::Deserialize;
use std::path::Path;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::process::Command;
use tracing::{debug, warn};

const PROBE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct MediaProbe {
    ffprobe_bin: String,
}

impl Default for MediaProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl MediaProbe {
    pub fn new(ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffprobe_bin: ffprobe_bin.into(),
        }
    }

    /// Decoded duration of an audio file in seconds.
    pub async fn audio_duration(&self, path: &Path) -> Result<f64> {
        let owned = path.to_path_buf();
        let decoded = tokio::task::spawn_blocking(move || symphonia_duration(&owned))
            .await
            .map_err(|e| ShortsError::probe(path, format!("probe task failed: {}", e)))?;

        let duration = match decoded {
            Ok(d) => d,
            Err(e) => {
                debug!("[PROBE] symphonia could not read {:?} ({}), trying ffprobe", path, e);
                self.format_duration(path).await?
            }
        };

        if !(duration.is_finite() && duration > 0.0) {
            return Err(ShortsError::probe(path, "audio has no playable length"));
        }
        Ok(duration)
    }

    /// Container duration reported by ffprobe.
    pub async fn format_duration(&self, path: &Path) -> Result<f64> {
        let stdout = self
            .run_ffprobe(
                path,
                &[
                    "-v",
                    "error",
                    "-show_entries",
                    "format=duration",
                    "-of",
                    "default=noprint_wrappers=1:nokey=1",
                ],
            )
            .await?;
        stdout
            .trim()
            .parse::<f64>()
            .map_err(|_| ShortsError::probe(path, format!("unparsable duration {:?}", stdout.trim())))
    }

    /// Duration and first video stream size.
    pub async fn video_info(&self, path: &Path) -> Result<VideoInfo> {
        let stdout = self
            .run_ffprobe(
                path,
                &[
                    "-v",
                    "error",
                    "-select_streams",
                    "v:0",
                    "-show_entries",
                    "stream=width,height:format=duration",
                    "-of",
                    "json",
                ],
            )
            .await?;
        parse_video_info(path, &stdout)
    }

    async fn run_ffprobe(&self, path: &Path, args: &[&str]) -> Result<String> {
        let output = tokio::time::timeout(
            tokio::time::Duration::from_secs(PROBE_TIMEOUT_SECS),
            Command::new(&self.ffprobe_bin)
                .kill_on_drop(true)
                .args(args)
                .arg(path)
                .output(),
        )
        .await
        .map_err(|_| ShortsError::probe(path, "ffprobe timed out"))?
        .map_err(|e| ShortsError::probe(path, format!("could not run {}: {}", self.ffprobe_bin, e)))?;

        if !output.status.success() {
            return Err(ShortsError::probe(
                path,
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[derive(Deserialize)]
struct FfprobeReport {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

fn parse_video_info(path: &Path, json: &str) -> Result<VideoInfo> {
    let report: FfprobeReport = serde_json::from_str(json)
        .map_err(|e| ShortsError::probe(path, format!("bad ffprobe json: {}", e)))?;
    let stream = report
        .streams
        .first()
        .ok_or_else(|| ShortsError::probe(path, "no video stream"))?;
    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(ShortsError::probe(path, "video stream has no size")),
    };
    let duration = report
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| ShortsError::probe(path, "video has no duration"))?;
    Ok(VideoInfo {
        duration,
        width,
        height,
    })
}

/// Walks the default audio track with symphonia. Uses the header frame
/// count when present, otherwise sums packet durations.
pub fn symphonia_duration(path: &Path) -> Result<f64> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ShortsError::probe(path, e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| ShortsError::probe(path, "no audio track"))?;
    let track_id = track.id;
    let time_base = track.codec_params.time_base;
    let sample_rate = track.codec_params.sample_rate;
    let n_frames = track.codec_params.n_frames;

    let ticks = match n_frames {
        Some(n) => n,
        None => {
            let mut total = 0u64;
            loop {
                match format.next_packet() {
                    Ok(packet) if packet.track_id() == track_id => total += packet.dur,
                    Ok(_) => {}
                    Err(SymphoniaError::IoError(e))
                        if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                    {
                        break
                    }
                    Err(e) => return Err(ShortsError::probe(path, e.to_string())),
                }
            }
            total
        }
    };

    if let Some(tb) = time_base {
        let t = tb.calc_time(ticks);
        return Ok(t.seconds as f64 + t.frac);
    }
    match sample_rate {
        Some(rate) if rate > 0 => Ok(ticks as f64 / rate as f64),
        _ => {
            warn!("[PROBE] {:?} has neither time base nor sample rate", path);
            Err(ShortsError::probe(path, "unknown audio time base"))
        }
    }
}

/// Pixel size of a still image without decoding the whole file.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
    Ok(image::image_dimensions(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_info() {
        let json = r#"{
            "programs": [],
            "streams": [{ "width": 1920, "height": 1080 }],
            "format": { "duration": "93.400000" }
        }"#;
        let info = parse_video_info(Path::new("bg.mp4"), json).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.duration - 93.4).abs() < 1e-9);
    }

    #[test]
    fn test_parse_video_info_without_stream() {
        let json = r#"{ "streams": [], "format": { "duration": "3.0" } }"#;
        assert!(parse_video_info(Path::new("audio_only.mp4"), json).is_err());
    }

    #[test]
    fn test_symphonia_rejects_missing_file() {
        assert!(symphonia_duration(Path::new("__missing_audio_xyz.mp3")).is_err());
    }

    #[test]
    fn test_symphonia_reads_wav_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_silent_wav(&path, 8000, 12000);
        let duration = symphonia_duration(&path).unwrap();
        assert!((duration - 1.5).abs() < 1e-6, "got {}", duration);
    }

    fn write_silent_wav(path: &Path, sample_rate: u32, samples: u32) {
        let data_len = samples * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(bytes.len() + data_len as usize, 0);
        std::fs::write(path, bytes).unwrap();
    }
}
