// SYNOID Shorts Configuration
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Runtime settings pulled from the environment (a `.env` file is loaded
// by the binary before this runs). Every field has a working default.

use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_IMAGE_API: &str = "https://image.pollinations.ai/prompt";
pub const DEFAULT_TTS_VOICE: &str = "en-US-ChristopherNeural";

#[derive(Debug, Clone)]
pub struct ShortsConfig {
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    /// Preferred caption font, tried before the built-in candidate list.
    pub font_path: Option<PathBuf>,
    pub preset: String,
    pub threads: usize,
    pub image_api: String,
    /// Enables the Hugging Face backup image provider.
    pub hf_token: Option<String>,
    pub tts_bin: String,
    pub tts_voice: String,
    pub fetch_workers: usize,
    pub log_capacity: usize,
}

impl Default for ShortsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            font_path: None,
            preset: "medium".to_string(),
            threads: num_cpus::get(),
            image_api: DEFAULT_IMAGE_API.to_string(),
            hf_token: None,
            tts_bin: "edge-tts".to_string(),
            tts_voice: DEFAULT_TTS_VOICE.to_string(),
            fetch_workers: 2,
            log_capacity: 50,
        }
    }
}

impl ShortsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_bin: env_or("SHORTS_FFMPEG", defaults.ffmpeg_bin),
            ffprobe_bin: env_or("SHORTS_FFPROBE", defaults.ffprobe_bin),
            font_path: non_empty_env("SHORTS_FONT").map(PathBuf::from),
            preset: env_or("SHORTS_PRESET", defaults.preset),
            threads: env_parse("SHORTS_THREADS", defaults.threads).max(1),
            image_api: env_or("SHORTS_IMAGE_API", defaults.image_api),
            hf_token: non_empty_env("HF_TOKEN"),
            tts_bin: env_or("SHORTS_TTS_BIN", defaults.tts_bin),
            tts_voice: env_or("SHORTS_TTS_VOICE", defaults.tts_voice),
            fetch_workers: env_parse("SHORTS_FETCH_WORKERS", defaults.fetch_workers).max(1),
            log_capacity: env_parse("SHORTS_LOG_CAPACITY", defaults.log_capacity).max(1),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: String) -> String {
    non_empty_env(key).unwrap_or(default)
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    match non_empty_env(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("[CONFIG] Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}
