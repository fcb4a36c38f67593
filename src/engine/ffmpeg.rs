// SYNOID Shorts FFmpeg Driver
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Thin builder over the ffmpeg CLI plus the overlay-graph helpers shared
// by the segment composer and the background variant.

use super::render_target::RenderTarget;
use crate::error::{Result, ShortsError};
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error};

/// Vertical position of caption layers on the 1080x1920 frame.
pub const CAPTION_TOP: u32 = 1100;

const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone)]
pub struct FfmpegJob {
    bin: String,
    stage: String,
    args: Vec<OsString>,
    inputs: usize,
}

impl FfmpegJob {
    pub fn new(bin: impl Into<String>, stage: impl Into<String>) -> Self {
        let args = ["-y", "-nostdin", "-hide_banner", "-loglevel", "error"]
            .iter()
            .map(OsString::from)
            .collect();
        Self {
            bin: bin.into(),
            stage: stage.into(),
            args,
            inputs: 0,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Number of `-i` inputs added so far; the next input gets this index.
    pub fn input_count(&self) -> usize {
        self.inputs
    }

    pub fn input(mut self, path: &Path) -> Self {
        self.inputs += 1;
        self.arg("-i").arg(path)
    }

    /// A still image repeated at `fps` for `duration` seconds.
    pub fn looped_image(self, path: &Path, duration: f64, fps: u32) -> Self {
        self.args(["-loop", "1", "-framerate"])
            .arg(fps.to_string())
            .arg("-t")
            .arg(format_seconds(duration))
            .input(path)
    }

    /// A still shown only for `span` seconds, its timestamps shifted to
    /// begin at `start` so ffmpeg never decodes it outside that window.
    pub fn timed_image(self, path: &Path, start: f64, span: f64, fps: u32) -> Self {
        self.args(["-loop", "1", "-framerate"])
            .arg(fps.to_string())
            .arg("-t")
            .arg(format_seconds(span))
            .arg("-itsoffset")
            .arg(format_seconds(start))
            .input(path)
    }

    pub fn filter_complex(self, graph: &[String]) -> Self {
        self.arg("-filter_complex").arg(graph.join(";"))
    }

    pub fn map(self, label: &str) -> Self {
        self.arg("-map").arg(label)
    }

    /// Encoder settings, a hard duration cap and the output path.
    pub fn encode_to(self, target: &RenderTarget, duration: Option<f64>) -> Self {
        let job = self.args(target.encoder_args());
        let job = match duration {
            Some(d) => job.arg("-t").arg(format_seconds(d)),
            None => job,
        };
        job.arg(&target.output)
    }

    pub fn command_line(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    pub async fn run(self) -> Result<()> {
        debug!("[FFMPEG] {} {}", self.bin, self.command_line().join(" "));

        let output = Command::new(&self.bin)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ShortsError::render(&self.stage, format!("could not spawn {}: {}", self.bin, e))
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail = stderr_tail(&stderr, STDERR_TAIL_LINES);
        error!("[FFMPEG] {} failed ({}): {}", self.stage, output.status, tail);
        Err(ShortsError::render(&self.stage, tail))
    }
}

/// Seconds formatted for ffmpeg arguments and filter expressions.
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.6}", seconds.max(0.0))
}

fn stderr_tail(stderr: &str, lines: usize) -> String {
    let collected: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = collected.len().saturating_sub(lines);
    let tail = collected[start..].join("\n");
    if tail.is_empty() {
        "ffmpeg exited without diagnostics".to_string()
    } else {
        tail
    }
}

/// A caption layer already fed to ffmpeg as input `input_index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedOverlay {
    pub input_index: usize,
    pub start: f64,
    pub end: f64,
}

/// Chains caption overlays on top of `base`, each enabled only inside
/// its own half-open window so neighbours never show together.
pub fn overlay_chain(base: &str, overlays: &[TimedOverlay], out: &str) -> Vec<String> {
    if overlays.is_empty() {
        return vec![format!("[{}]null[{}]", base, out)];
    }

    let mut filters = Vec::with_capacity(overlays.len());
    let mut current = base.to_string();
    for (i, overlay) in overlays.iter().enumerate() {
        let next = if i + 1 == overlays.len() {
            out.to_string()
        } else {
            format!("cap{}", i)
        };
        filters.push(format!(
            "[{}][{}:v]overlay=x=0:y={}:eof_action=pass:enable='gte(t,{})*lt(t,{})'[{}]",
            current,
            overlay.input_index,
            CAPTION_TOP,
            format_seconds(overlay.start),
            format_seconds(overlay.end),
            next
        ));
        current = next;
    }
    filters
}
