//! Remote conversion service client
//!
//! HTTP access to the poem-to-song backend: submission, generation, job
//! status, result download, and the read-only catalog endpoints. All calls
//! carry the session token when one is present.

mod catalog;
mod client;

pub use catalog::VoiceQuery;
pub use client::{ApiClient, ApiError, Session};
