//! Rhythm pattern domain model
//!
//! A rhythm template from the catalog carries a discrete hit/accent pattern
//! (`pattern_json` on the wire) that is independent of tempo. This module
//! owns the per-beat classification used by both the waveform renderer and
//! the metronome, plus BPM clamping and beat-interval derivation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lowest playable tempo in beats per minute
pub const MIN_BPM: u32 = 40;

/// Highest playable tempo in beats per minute
pub const MAX_BPM: u32 = 220;

/// Three-way classification of a beat slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatClass {
    /// Accented beat (strong click, tallest bar)
    Accent,
    /// Plain hit (soft click, medium bar)
    Hit,
    /// Rest (silence, short bar)
    Rest,
}

/// A rhythmic motif: ordered hit/accent slots, one per beat.
///
/// Wire format matches the catalog's `pattern_json`. The free-meter "mawal"
/// template ships empty `hits`, so both sequences may be empty; indices
/// outside either sequence always read as 0 (rest), never as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmPattern {
    /// Display-only label, e.g. "4/4" or "free" (not parsed)
    pub time_signature: String,

    /// Beats per phrase (informational)
    #[serde(default)]
    pub phrase_beats: u32,

    /// 0/1 per beat slot
    #[serde(default)]
    pub hits: Vec<u8>,

    /// 0/1 per beat slot; an accent implies (but does not require) a hit
    #[serde(default)]
    pub accent: Vec<u8>,
}

impl RhythmPattern {
    /// Number of beat slots in the pattern
    pub fn beats(&self) -> usize {
        self.hits.len()
    }

    /// True when the pattern has no beat slots (free-meter templates)
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Classify one beat slot. Accent wins over hit; out-of-range is a rest.
    pub fn class_at(&self, idx: usize) -> BeatClass {
        if self.accent.get(idx).copied().unwrap_or(0) == 1 {
            BeatClass::Accent
        } else if self.hits.get(idx).copied().unwrap_or(0) == 1 {
            BeatClass::Hit
        } else {
            BeatClass::Rest
        }
    }
}

/// Clamp a requested tempo into the playable range
pub fn clamp_bpm(bpm: u32) -> u32 {
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Interval between metronome ticks for a tempo.
///
/// The tempo is clamped before conversion; the millisecond count is rounded
/// to the nearest integer (96 BPM -> 625 ms).
pub fn beat_interval(bpm: u32) -> Duration {
    let clamped = clamp_bpm(bpm);
    let ms = (60_000.0 / clamped as f64).round() as u64;
    Duration::from_millis(ms)
}
