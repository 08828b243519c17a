//! Conversion job lifecycle controller
//!
//! Drives a single remote conversion job from submission to a terminal
//! state: submit, poll on a fixed cadence, detect terminal status, retrieve
//! the result. At most one polling loop is active per controller; a new
//! submission supersedes the previous loop by cancelling its token in the
//! same critical section that installs the new authoritative job id.
//!
//! Every in-flight poll is tagged with the job id it was issued for and the
//! loop re-checks that id (and its cancellation token) after each await
//! before applying an observation, so a stale response for a superseded job
//! can never overwrite state for a newer one.

use crate::api::{ApiClient, ApiError};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use inshad_common::api::{GenerateRequest, GenerateResponse, JobStatus, JobStatusResponse};
use inshad_common::events::{ConvertEvent, EventBus, JobFailure};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fixed cadence between status polls
pub const POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Surfaced when the remote reports failure without an error message
pub const FALLBACK_FAILURE_MESSAGE: &str = "generation failed (no detail from server)";

/// Remote operations the controller depends on.
///
/// The production implementation is [`ApiClient`]; tests substitute
/// scripted backends.
#[async_trait]
pub trait ConversionBackend: Send + Sync + 'static {
    async fn start_generation(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<GenerateResponse, ApiError>;

    async fn job_status(&self, job_id: &str)
        -> std::result::Result<JobStatusResponse, ApiError>;

    async fn download(&self, job_id: &str) -> std::result::Result<Vec<u8>, ApiError>;
}

#[async_trait]
impl ConversionBackend for ApiClient {
    async fn start_generation(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<GenerateResponse, ApiError> {
        ApiClient::start_generation(self, request).await
    }

    async fn job_status(
        &self,
        job_id: &str,
    ) -> std::result::Result<JobStatusResponse, ApiError> {
        ApiClient::job_status(self, job_id).await
    }

    async fn download(&self, job_id: &str) -> std::result::Result<Vec<u8>, ApiError> {
        ApiClient::download(self, job_id).await
    }
}

/// Handle to a submitted job
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub job_id: String,
}

/// Terminal outcome of the most recent job
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Succeeded {
        job_id: String,
        audio: Arc<Vec<u8>>,
    },
    Failed {
        job_id: String,
        failure: JobFailure,
    },
}

/// The single piece of mutable shared state: the authoritative job id and
/// the cancellation token of its polling loop. Updated atomically under one
/// lock when a submission supersedes the previous job.
#[derive(Default)]
struct ActiveJob {
    job_id: Option<String>,
    cancel: Option<CancellationToken>,
}

/// Drives one conversion job at a time against a [`ConversionBackend`]
pub struct JobController<B> {
    backend: Arc<B>,
    events: EventBus,
    poll_interval: Duration,
    active: Arc<Mutex<ActiveJob>>,
    outcome: Arc<Mutex<Option<JobOutcome>>>,
}

impl<B: ConversionBackend> JobController<B> {
    pub fn new(backend: Arc<B>, events: EventBus) -> Self {
        Self {
            backend,
            events,
            poll_interval: POLL_INTERVAL,
            active: Arc::new(Mutex::new(ActiveJob::default())),
            outcome: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe to job events
    pub fn subscribe(&self) -> broadcast::Receiver<ConvertEvent> {
        self.events.subscribe()
    }

    /// Job id currently being polled, if any
    pub fn current_job(&self) -> Option<String> {
        self.active.lock().unwrap().job_id.clone()
    }

    /// Terminal outcome of the most recent job, once one exists
    pub fn outcome(&self) -> Option<JobOutcome> {
        self.outcome.lock().unwrap().clone()
    }

    /// Submit a generation request and begin polling.
    ///
    /// A remote rejection surfaces as [`Error::Submission`] and is not
    /// retried; the caller must resubmit. On success any previously active
    /// polling loop is superseded and a new one starts immediately.
    pub async fn submit(&self, request: GenerateRequest) -> Result<JobHandle> {
        let response = self
            .backend
            .start_generation(&request)
            .await
            .map_err(|e| Error::Submission(e.to_string()))?;
        let job_id = response.job_id;
        info!(job_id = %job_id, "Generation job accepted");

        let token = CancellationToken::new();
        {
            let mut active = self.active.lock().unwrap();
            if let Some(prev) = active.cancel.take() {
                prev.cancel();
            }
            active.job_id = Some(job_id.clone());
            active.cancel = Some(token.clone());
            *self.outcome.lock().unwrap() = None;
        }

        let poller = PollLoop {
            backend: Arc::clone(&self.backend),
            events: self.events.clone(),
            active: Arc::clone(&self.active),
            outcome: Arc::clone(&self.outcome),
            interval: self.poll_interval,
        };
        tokio::spawn(poller.run(job_id.clone(), token));

        self.events.emit_lossy(ConvertEvent::JobQueued {
            job_id: job_id.clone(),
            timestamp: Utc::now(),
        });

        Ok(JobHandle { job_id })
    }

    /// Stop the active polling loop without affecting remote job state.
    ///
    /// Safe to call repeatedly and from any state, including before the
    /// first submission.
    pub fn cancel(&self) {
        let mut active = self.active.lock().unwrap();
        if let Some(token) = active.cancel.take() {
            token.cancel();
            debug!(job_id = ?active.job_id, "Polling cancelled");
        }
    }
}

impl<B> Drop for JobController<B> {
    fn drop(&mut self) {
        // Teardown stops the polling loop on every exit path
        let mut active = self.active.lock().unwrap();
        if let Some(token) = active.cancel.take() {
            token.cancel();
        }
    }
}

/// One polling loop, bound to one job id and its cancellation token
struct PollLoop<B> {
    backend: Arc<B>,
    events: EventBus,
    active: Arc<Mutex<ActiveJob>>,
    outcome: Arc<Mutex<Option<JobOutcome>>>,
    interval: Duration,
}

impl<B: ConversionBackend> PollLoop<B> {
    async fn run(self, job_id: String, token: CancellationToken) {
        // First poll fires one full interval after submission
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_status = JobStatus::Queued;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(job_id = %job_id, "Polling loop stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let response = match self.backend.job_status(&job_id).await {
                Ok(response) => response,
                Err(e) => {
                    // Transient transport blip: absorbed, next tick retries
                    debug!(job_id = %job_id, error = %e, "Status poll failed, retrying next tick");
                    continue;
                }
            };

            if !self.is_current(&job_id, &token) {
                debug!(job_id = %job_id, "Discarding stale status response");
                return;
            }

            if response.status != last_status {
                last_status = response.status;
                self.events.emit_lossy(ConvertEvent::JobStatusChanged {
                    job_id: job_id.clone(),
                    status: response.status,
                    timestamp: Utc::now(),
                });
            }

            match response.status {
                JobStatus::Queued | JobStatus::Running => {}
                JobStatus::Failed => {
                    let message = response
                        .error_message
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| FALLBACK_FAILURE_MESSAGE.to_string());
                    warn!(job_id = %job_id, message = %message, "Job failed");
                    self.finish(JobOutcome::Failed {
                        job_id: job_id.clone(),
                        failure: JobFailure::Remote { message },
                    });
                    return;
                }
                JobStatus::Succeeded => {
                    // Exactly one retrieval; polling ceases regardless of
                    // its outcome
                    self.retrieve(&job_id, &token).await;
                    return;
                }
            }
        }
    }

    async fn retrieve(&self, job_id: &str, token: &CancellationToken) {
        debug!(job_id = %job_id, "Job succeeded, retrieving result");
        match self.backend.download(job_id).await {
            Ok(audio) => {
                if !self.is_current(job_id, token) {
                    debug!(job_id = %job_id, "Discarding stale retrieval result");
                    return;
                }
                let audio = Arc::new(audio);
                info!(job_id = %job_id, size_bytes = audio.len(), "Result retrieved");
                self.finish(JobOutcome::Succeeded {
                    job_id: job_id.to_string(),
                    audio,
                });
            }
            Err(e) => {
                if !self.is_current(job_id, token) {
                    return;
                }
                // Remote success without a retrievable artifact is
                // user-visible failure
                warn!(job_id = %job_id, error = %e, "Result retrieval failed");
                self.finish(JobOutcome::Failed {
                    job_id: job_id.to_string(),
                    failure: JobFailure::Retrieval {
                        message: e.to_string(),
                    },
                });
            }
        }
    }

    /// A response may only be applied while its job is still the
    /// authoritative one and its loop has not been cancelled
    fn is_current(&self, job_id: &str, token: &CancellationToken) -> bool {
        if token.is_cancelled() {
            return false;
        }
        self.active.lock().unwrap().job_id.as_deref() == Some(job_id)
    }

    fn finish(&self, outcome: JobOutcome) {
        *self.outcome.lock().unwrap() = Some(outcome.clone());
        let timestamp = Utc::now();
        let event = match outcome {
            JobOutcome::Succeeded { job_id, audio } => ConvertEvent::JobSucceeded {
                job_id,
                audio,
                timestamp,
            },
            JobOutcome::Failed { job_id, failure } => ConvertEvent::JobFailed {
                job_id,
                failure,
                timestamp,
            },
        };
        self.events.emit_lossy(event);
    }
}
