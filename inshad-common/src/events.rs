//! Event types and event bus
//!
//! Components emit status outward on a shared bus rather than calling into
//! the host; the CLI subscribes and renders. Hybrid communication matching
//! the rest of the workspace:
//! - **EventBus** (tokio::broadcast): one-to-many event broadcasting
//! - **Shared state** (Arc + lock): read-heavy access inside components

use crate::api::JobStatus;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Why a job is reported as failed to the user.
///
/// Retrieval failure is a deliberate local classification: the remote job
/// succeeded, but success without a retrievable artifact is user-visible
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// The backend reported `status: failed`
    Remote { message: String },
    /// The result fetch after remote success failed
    Retrieval { message: String },
}

impl JobFailure {
    pub fn message(&self) -> &str {
        match self {
            JobFailure::Remote { message } | JobFailure::Retrieval { message } => message,
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobFailure::Remote { message } => write!(f, "generation failed: {}", message),
            JobFailure::Retrieval { message } => {
                write!(f, "result retrieval failed: {}", message)
            }
        }
    }
}

/// Conversion flow events
#[derive(Debug, Clone)]
pub enum ConvertEvent {
    /// A new job was accepted by the remote and polling began
    JobQueued {
        job_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Polling observed a (non-terminal) status change
    JobStatusChanged {
        job_id: String,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },

    /// The job finished and its audio payload was retrieved
    JobSucceeded {
        job_id: String,
        /// Synthesized audio bytes, shared to keep the event cheap to clone
        audio: Arc<Vec<u8>>,
        timestamp: DateTime<Utc>,
    },

    /// The job is over without a usable result
    JobFailed {
        job_id: String,
        failure: JobFailure,
        timestamp: DateTime<Utc>,
    },
}

impl ConvertEvent {
    /// Job id the event belongs to
    pub fn job_id(&self) -> &str {
        match self {
            ConvertEvent::JobQueued { job_id, .. }
            | ConvertEvent::JobStatusChanged { job_id, .. }
            | ConvertEvent::JobSucceeded { job_id, .. }
            | ConvertEvent::JobFailed { job_id, .. } => job_id,
        }
    }

    /// True for events after which no more events follow for this job
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConvertEvent::JobSucceeded { .. } | ConvertEvent::JobFailed { .. }
        )
    }
}

/// Broadcast bus for [`ConvertEvent`].
///
/// Thin wrapper over tokio::broadcast: non-blocking publish, multiple
/// concurrent subscribers, automatic cleanup when subscribers drop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ConvertEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ConvertEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; errors when no subscriber is listening
    pub fn emit(
        &self,
        event: ConvertEvent,
    ) -> Result<usize, broadcast::error::SendError<ConvertEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: ConvertEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event emitted with no subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
