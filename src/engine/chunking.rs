// SYNOID Shorts Caption Chunking
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Splits narration text into short caption bursts and schedules them
// over the audio that speaks them.

/// Words per caption burst. Two keeps the big font readable.
pub const WORDS_PER_CHUNK: usize = 2;

/// One caption burst on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionChunk {
    /// Upper-cased burst text (1 to 3 words).
    pub text: String,
    /// Seconds from the start of the owning timeline.
    pub start_offset: f64,
    /// Seconds the burst stays on screen.
    pub span: f64,
}

impl CaptionChunk {
    pub fn end(&self) -> f64 {
        self.start_offset + self.span
    }
}

/// Groups whitespace-separated words into bursts of `size`; the last
/// group may be shorter.
pub fn chunk_words(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(size).map(|group| group.join(" ")).collect()
}

/// Schedules the bursts of one segment back-to-back from `base_offset`.
///
/// Spans are equal; the final span absorbs the rounding remainder so the
/// spans sum to `duration` exactly.
pub fn schedule_segment(text: &str, duration: f64, base_offset: f64) -> Vec<CaptionChunk> {
    let chunks = chunk_words(text, WORDS_PER_CHUNK);
    if chunks.is_empty() || duration <= 0.0 {
        return Vec::new();
    }

    let count = chunks.len();
    let span = duration / count as f64;
    chunks
        .into_iter()
        .enumerate()
        .map(|(idx, chunk)| {
            let local_start = idx as f64 * span;
            let this_span = if idx + 1 == count {
                duration - local_start
            } else {
                span
            };
            CaptionChunk {
                text: chunk.to_uppercase(),
                start_offset: base_offset + local_start,
                span: this_span,
            }
        })
        .collect()
}

/// Caption plan spanning several consecutive segments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionSchedule {
    pub chunks: Vec<CaptionChunk>,
    /// Sum of every segment duration fed in, captioned or not.
    pub total_duration: f64,
}

impl CaptionSchedule {
    /// Accumulates offsets across segment boundaries. Segments with no
    /// words still advance the clock.
    pub fn accumulate<'a, I>(segments: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut schedule = CaptionSchedule::default();
        for (text, duration) in segments {
            let chunks = schedule_segment(text, duration, schedule.total_duration);
            schedule.chunks.extend(chunks);
            schedule.total_duration += duration;
        }
        schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DURATION_EPSILON;

    #[test]
    fn test_chunk_count_is_ceil_half() {
        for words in 0..9 {
            let text = (0..words)
                .map(|i| format!("w{}", i))
                .collect::<Vec<_>>()
                .join(" ");
            let chunks = chunk_words(&text, 2);
            assert_eq!(chunks.len(), (words + 1) / 2, "{} words", words);
            assert_eq!(chunks.join(" "), text);
        }
    }

    #[test]
    fn test_irregular_whitespace() {
        let chunks = chunk_words("  the\tdark   forest\n theory ", 2);
        assert_eq!(chunks, vec!["the dark", "forest theory"]);
    }

    #[test]
    fn test_spans_sum_to_duration() {
        let text = "one two three four five six seven";
        for duration in [0.1, 1.0, 2.7, 3.333, 59.9] {
            let chunks = schedule_segment(text, duration, 0.0);
            assert_eq!(chunks.len(), 4);
            let total: f64 = chunks.iter().map(|c| c.span).sum();
            assert!((total - duration).abs() < DURATION_EPSILON);
        }
    }

    #[test]
    fn test_chunks_are_contiguous_and_upper_cased() {
        let chunks = schedule_segment("vacuum decay could end everything", 3.0, 0.0);
        assert_eq!(chunks[0].text, "VACUUM DECAY");
        assert_eq!(chunks[2].text, "EVERYTHING");
        assert_eq!(chunks[0].start_offset, 0.0);
        for pair in chunks.windows(2) {
            assert!((pair[0].end() - pair[1].start_offset).abs() < DURATION_EPSILON);
        }
        assert!((chunks[2].end() - 3.0).abs() < DURATION_EPSILON);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(schedule_segment("", 2.0, 0.0).is_empty());
        assert!(schedule_segment("   ", 2.0, 0.0).is_empty());
    }

    #[test]
    fn test_accumulated_schedule_crosses_boundaries() {
        let schedule = CaptionSchedule::accumulate(vec![
            ("title of the post", 2.0),
            ("", 1.5),
            ("top comment here", 3.0),
        ]);
        assert!((schedule.total_duration - 6.5).abs() < DURATION_EPSILON);
        assert_eq!(schedule.chunks.len(), 4);
        // Third segment starts after the silent second one.
        assert!((schedule.chunks[2].start_offset - 3.5).abs() < DURATION_EPSILON);
        assert!((schedule.chunks[3].end() - 6.5).abs() < DURATION_EPSILON);
    }
}
