//! Remote API request/response types
//!
//! Typed bodies for the conversion service's HTTP contract. Responses model
//! only the fields this client consumes; serde ignores the rest (the
//! job-status body also carries music-task bookkeeping we never read).

use crate::rhythm::RhythmPattern;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Remote job state, mirrored verbatim. The client never invents
/// intermediate states of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// True for states after which polling is meaningless
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Body of `GET /job-status/{job_id}/`
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Body of `POST /submit-text/`
#[derive(Debug, Clone, Serialize)]
pub struct SubmitTextRequest {
    pub text: String,
    pub title: String,
}

/// Response of `POST /submit-text/`: submission id plus meter detection
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitTextResponse {
    pub id: String,
    pub meter_guess: String,
    pub meter_confidence: f64,
    #[serde(default)]
    pub meter_details: serde_json::Value,
    #[serde(default)]
    pub suggested_rhythms: Vec<SuggestedRhythm>,
}

/// One rhythm suggestion derived from the detected meter
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestedRhythm {
    pub rhythm_key: String,
    #[serde(default)]
    pub reason: String,
}

/// Body of `POST /generate/`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub submission_id: String,
    pub style_key: String,
    pub rhythm_key: String,
    pub voice_actor: String,
    pub voice_provider: String,
    pub vocal_mode: String,
    pub tempo: u32,
    pub add_percussion: bool,
    pub add_music: bool,
    pub music_provider: String,
    pub music_volume_db: f64,
}

/// Response of `POST /generate/`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub job_id: String,
}

/// Catalog entry from `GET /styles/`
#[derive(Debug, Clone, Deserialize)]
pub struct CulturalStyle {
    pub key: String,
    pub name_ar: String,
    #[serde(default)]
    pub description_ar: String,
    pub default_tempo: u32,
    #[serde(default)]
    pub default_reverb: f64,
}

/// Catalog entry from `GET /schools/`
#[derive(Debug, Clone, Deserialize)]
pub struct RhythmSchool {
    pub key: String,
    pub name_ar: String,
    #[serde(default)]
    pub description_ar: String,
}

/// Catalog entry from `GET /rhythms/`; carries the embedded rhythm pattern
#[derive(Debug, Clone, Deserialize)]
pub struct RhythmTemplate {
    pub rhythm_key: String,
    pub name_ar: String,
    #[serde(default)]
    pub school_key: Option<String>,
    #[serde(default)]
    pub school_name_ar: String,
    #[serde(default)]
    pub recommended_buhur: Vec<String>,
    pub pattern_json: RhythmPattern,
}

/// Catalog entry from `GET /voices/`
#[derive(Debug, Clone, Deserialize)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
}
