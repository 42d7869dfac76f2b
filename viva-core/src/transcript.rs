//! Transcript types and surface-level disfluency counts.
//!
//! The transcript is produced by an external STT collaborator; this module
//! only models its output and derives the raw counts (words, repeats,
//! fillers, pauses) that feed feature fusion as `*_cnt` inputs.

use serde::{Deserialize, Serialize};

/// Word-onset gap above this counts as a pause (seconds).
const PAUSE_GAP_SEC: f64 = 0.5;

/// Filler tokens counted as hesitation markers.
const FILLER_WORDS: &[&str] = &[
    "um", "uh", "er", "erm", "hmm", "like", "well", "so", "actually", "basically",
];

/// One recognized word with its timing, as reported by the STT service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordTiming {
    pub word: String,
    /// Onset in seconds from clip start.
    pub start: f64,
    /// Offset in seconds from clip start.
    pub end: f64,
}

/// A speech-to-text result for one spoken answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Transcript {
    pub text: String,
    /// Per-word timestamps; may be empty when the STT service omits them.
    #[serde(default)]
    pub words: Vec<WordTiming>,
    /// STT confidence in [0, 1], if reported.
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl Transcript {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            words: Vec::new(),
            confidence: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Raw disfluency counts derived from a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceCounts {
    pub word_cnt: usize,
    /// Immediately repeated words ("the the").
    pub repeat_cnt: usize,
    /// Hesitation fillers ("um", "uh", ...).
    pub filler_cnt: usize,
    /// Word-onset gaps above the pause threshold. 0 without timings.
    pub pause_cnt: usize,
}

/// Count words, immediate repeats, fillers, and timing pauses.
pub fn surface_counts(transcript: &Transcript) -> SurfaceCounts {
    let tokens: Vec<String> = transcript
        .text
        .split_whitespace()
        .map(normalize_token)
        .filter(|t| !t.is_empty())
        .collect();

    let word_cnt = tokens.len();
    let repeat_cnt = tokens.windows(2).filter(|w| w[0] == w[1]).count();
    let filler_cnt = tokens
        .iter()
        .filter(|t| FILLER_WORDS.contains(&t.as_str()))
        .count();

    let pause_cnt = transcript
        .words
        .windows(2)
        .filter(|w| w[1].start - w[0].end > PAUSE_GAP_SEC)
        .count();

    SurfaceCounts {
        word_cnt,
        repeat_cnt,
        filler_cnt,
        pause_cnt,
    }
}

fn normalize_token(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}
