// SYNOID Shorts Health Check
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Verifies the external tools the pipeline shells out to before a long
// batch starts, instead of failing on the first segment.

use crate::config::ShortsConfig;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTool {
    pub name: &'static str,
    pub bin: String,
    pub probe_arg: &'static str,
    /// What stops working without it.
    pub needed_for: &'static str,
}

pub fn required_tools(config: &ShortsConfig) -> Vec<ExternalTool> {
    vec![
        ExternalTool {
            name: "ffmpeg",
            bin: config.ffmpeg_bin.clone(),
            probe_arg: "-version",
            needed_for: "all rendering",
        },
        ExternalTool {
            name: "ffprobe",
            bin: config.ffprobe_bin.clone(),
            probe_arg: "-version",
            needed_for: "background clip probing",
        },
        ExternalTool {
            name: "fc-match",
            bin: "fc-match".to_string(),
            probe_arg: "--version",
            needed_for: "system caption font lookup",
        },
        ExternalTool {
            name: "edge-tts",
            bin: config.tts_bin.clone(),
            probe_arg: "--help",
            needed_for: "narration synthesis",
        },
    ]
}

/// True when `bin probe_arg` runs and exits cleanly.
pub async fn is_available(bin: &str, probe_arg: &str) -> bool {
    let run = Command::new(bin)
        .arg(probe_arg)
        .kill_on_drop(true)
        .output();
    match tokio::time::timeout(PROBE_TIMEOUT, run).await {
        Ok(Ok(output)) => output.status.success(),
        Ok(Err(_)) => false,
        Err(_) => {
            warn!("[HEALTH] '{}' did not answer within {:?}", bin, PROBE_TIMEOUT);
            false
        }
    }
}

/// Names of the tools that are missing.
pub async fn check_dependencies(config: &ShortsConfig) -> Vec<String> {
    let mut missing = Vec::new();
    for tool in required_tools(config) {
        if is_available(&tool.bin, tool.probe_arg).await {
            info!("[HEALTH] ✅ {} ({})", tool.name, tool.bin);
        } else {
            warn!("[HEALTH] ❌ {} not found ({} unavailable)", tool.name, tool.needed_for);
            missing.push(tool.name.to_string());
        }
    }
    missing
}

pub fn status_report(missing: &[String]) -> String {
    if missing.is_empty() {
        "SYNOID Shorts Health Report\n  Status: READY".to_string()
    } else {
        format!(
            "SYNOID Shorts Health Report\n  Status: DEGRADED\n  Missing: {}",
            missing.join(", ")
        )
    }
}
