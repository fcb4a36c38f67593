// SYNOID Shorts Validation Gate
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Integrity pass between fetching and composing. Stills are decoded in
// full and narration must yield a duration; anything that fails is
// deleted so a resumed run fetches it again.
// Segments that fail are reported and left out of the timeline.

use super::fetch::FetchOutcome;
use super::script::ScriptSegment;
use crate::engine::composer::{narration_duration, require_media};
use crate::engine::probe::MediaProbe;
use crate::engine::scratch::remove_quietly;
use crate::engine::Segment;
use crate::error::{MediaKind, Result, ShortsError};
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Survivors, in script order.
    pub segments: Vec<Segment>,
    pub rejected: Vec<ShortsError>,
}

pub struct ValidationGate {
    probe: MediaProbe,
}

impl ValidationGate {
    pub fn new(probe: MediaProbe) -> Self {
        Self { probe }
    }

    /// Present, non-empty and fully decodable.
    pub fn verify_image(segment: usize, path: &Path) -> Result<()> {
        require_media(segment, MediaKind::Image, path)?;
        match image::open(path) {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("[VALIDATION] ❌ Corrupt image at segment {}: {}", segment, e);
                remove_quietly(path);
                Err(ShortsError::CorruptMedia {
                    segment,
                    kind: MediaKind::Image,
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Present, non-empty and decodable to a positive duration.
    pub async fn verify_audio(&self, segment: usize, path: &Path) -> Result<f64> {
        match narration_duration(&self.probe, segment, path).await {
            Err(e @ ShortsError::CorruptMedia { .. }) => {
                error!("[VALIDATION] ❌ Undecodable audio at segment {}: {}", segment, e);
                remove_quietly(path);
                Err(e)
            }
            other => other,
        }
    }

    pub async fn validate(
        &self,
        script: &[ScriptSegment],
        fetched: &[FetchOutcome],
    ) -> ValidationReport {
        let mut report = ValidationReport::default();

        for outcome in fetched {
            let Some(source) = script.get(outcome.index) else {
                continue;
            };
            let image = Self::verify_image(outcome.index, &outcome.image);
            let audio = self.verify_audio(outcome.index, &outcome.audio).await;

            match (image, audio) {
                (Ok(()), Ok(_)) => {
                    info!("[VALIDATION] ✅ Segment {} verified", outcome.index);
                    report.segments.push(Segment::new(
                        outcome.index,
                        source.text.clone(),
                        &outcome.image,
                        &outcome.audio,
                    ));
                }
                (image, audio) => {
                    for err in [image.err(), audio.err()].into_iter().flatten() {
                        error!("[VALIDATION] Skipping segment {}: {}", outcome.index, err);
                        report.rejected.push(err);
                    }
                }
            }
        }

        report.segments.sort_by_key(|s| s.index);
        report
    }
}
