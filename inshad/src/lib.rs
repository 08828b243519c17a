//! Inshad: client and rhythm preview tool for a remote Arabic
//! poem-to-song conversion service.
//!
//! Two loosely coupled components, composed by the CLI host:
//! - [`job::JobController`] drives one conversion job from submission to a
//!   terminal state against the remote HTTP API.
//! - [`preview::PreviewEngine`] renders a rhythm pattern as a terminal
//!   waveform and plays it back as an audible metronome.

pub mod api;
pub mod error;
pub mod job;
pub mod preview;

pub use error::{Error, Result};
