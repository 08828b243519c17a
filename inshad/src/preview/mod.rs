//! Rhythm preview: waveform rendering and metronome playback
//!
//! Two halves with no timing coupling between them:
//! - [`waveform`] turns a pattern into visual bar columns (pure, no clock)
//! - [`metronome`] plays the pattern as audible clicks against the audio
//!   output device

pub mod click;
pub mod metronome;
pub mod waveform;

pub use click::{ClickSink, CpalClickSink};
pub use metronome::PreviewEngine;
pub use waveform::{paint, render, BarColumn};
