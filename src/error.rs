use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::jobs::JobStatus;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Failure of the external synthesis engine for a single job.
///
/// Every variant is terminal for the job: the scheduler records the message
/// on the job and never retries.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("failed to start synthesis engine `{engine}`: {source}")]
    Spawn {
        engine: String,
        #[source]
        source: std::io::Error,
    },

    #[error("synthesis engine exited with {status}: {diagnostics}")]
    Exit { status: String, diagnostics: String },

    #[error("synthesis engine produced no audio at {}: {diagnostics}", .path.display())]
    MissingOutput { path: PathBuf, diagnostics: String },

    #[error("synthesis timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Callback delivery failure. Logged by the scheduler, never stored on a job.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("callback request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("callback returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Synthesis queue is full, try again later")]
    Busy,

    #[error("Scheduler is shutting down")]
    ShuttingDown,
}

#[derive(Debug, Error)]
pub enum AccentError {
    #[error("No input text provided")]
    EmptyInput,

    #[error("failed to start accent annotator `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("accent annotator failed: {0}")]
    Annotator(String),

    #[error("accent annotator produced invalid UTF-8")]
    InvalidOutput,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
