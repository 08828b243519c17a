//! Pattern waveform rendering
//!
//! Pure functions from a rhythm pattern to visual bar columns, and from
//! columns to terminal lines. Each beat expands to four sub-bars (cosmetic
//! smoothing only; the metronome never sees sub-bars). Classification is
//! encoded twice, in bar height and in color, so either channel alone tells
//! accents from hits from rests.

use inshad_common::rhythm::{BeatClass, RhythmPattern};

/// Visual sub-bars per beat
pub const SUB_BARS_PER_BEAT: usize = 4;

/// Bar amplitude for an accented beat
pub const ACCENT_AMPLITUDE: f32 = 0.95;
/// Bar amplitude for a plain hit
pub const HIT_AMPLITUDE: f32 = 0.65;
/// Bar amplitude for a rest
pub const REST_AMPLITUDE: f32 = 0.15;

/// Fraction of the canvas height the tallest bar may use
const BAR_HEIGHT_FACTOR: f32 = 0.85;

const COLOR_ACCENT: &str = "\x1b[33m"; // amber
const COLOR_HIT: &str = "\x1b[32m"; // green
const COLOR_REST: &str = "\x1b[90m"; // dim
const COLOR_RESET: &str = "\x1b[0m";

/// One visual column of the waveform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarColumn {
    pub amplitude: f32,
    pub class: BeatClass,
}

fn amplitude_for(class: BeatClass) -> f32 {
    match class {
        BeatClass::Accent => ACCENT_AMPLITUDE,
        BeatClass::Hit => HIT_AMPLITUDE,
        BeatClass::Rest => REST_AMPLITUDE,
    }
}

/// Render a pattern into `hits.len() * 4` bar columns.
///
/// Column `i` sources beat `floor(i/4) % beats`. An empty pattern renders
/// to zero columns.
pub fn render(pattern: &RhythmPattern) -> Vec<BarColumn> {
    let beats = pattern.beats();
    if beats == 0 {
        return Vec::new();
    }
    (0..beats * SUB_BARS_PER_BEAT)
        .map(|i| {
            let class = pattern.class_at((i / SUB_BARS_PER_BEAT) % beats);
            BarColumn {
                amplitude: amplitude_for(class),
                class,
            }
        })
        .collect()
}

/// Vertical extent of a bar: (first row, height in rows), centered
fn bar_extent(amplitude: f32, rows: usize) -> (usize, usize) {
    let height = ((amplitude * rows as f32 * BAR_HEIGHT_FACTOR).round() as usize)
        .clamp(1, rows);
    ((rows - height) / 2, height)
}

/// Rasterize columns into `rows` terminal lines with per-class ANSI color.
///
/// Bars are vertically centered; one character per column.
pub fn paint(columns: &[BarColumn], rows: usize) -> Vec<String> {
    if columns.is_empty() || rows == 0 {
        return Vec::new();
    }

    let extents: Vec<(usize, usize)> = columns
        .iter()
        .map(|c| bar_extent(c.amplitude, rows))
        .collect();

    (0..rows)
        .map(|row| {
            let mut line = String::new();
            let mut current_color: Option<&str> = None;
            for (column, &(start, height)) in columns.iter().zip(&extents) {
                let filled = row >= start && row < start + height;
                if filled {
                    let color = match column.class {
                        BeatClass::Accent => COLOR_ACCENT,
                        BeatClass::Hit => COLOR_HIT,
                        BeatClass::Rest => COLOR_REST,
                    };
                    if current_color != Some(color) {
                        line.push_str(color);
                        current_color = Some(color);
                    }
                    line.push('█');
                } else {
                    if current_color.is_some() {
                        line.push_str(COLOR_RESET);
                        current_color = None;
                    }
                    line.push(' ');
                }
            }
            if current_color.is_some() {
                line.push_str(COLOR_RESET);
            }
            line
        })
        .collect()
}
