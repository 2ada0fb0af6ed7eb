use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tracks the lifecycle status of a synthesis job.
///
/// Each job flows through: queued → processing → completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested status change, carrying the fields that belong to the target state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// queued → processing
    Start,
    /// processing → completed
    Complete { output_path: PathBuf },
    /// processing → failed
    Fail { error: String },
}

impl Transition {
    /// The status this transition moves a job into.
    pub fn target(&self) -> JobStatus {
        match self {
            Transition::Start => JobStatus::Processing,
            Transition::Complete { .. } => JobStatus::Completed,
            Transition::Fail { .. } => JobStatus::Failed,
        }
    }

    /// The only status this transition may be applied from.
    pub fn source(&self) -> JobStatus {
        match self {
            Transition::Start => JobStatus::Queued,
            Transition::Complete { .. } | Transition::Fail { .. } => JobStatus::Processing,
        }
    }
}

/// A single unit of synthesis work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub input_text: String,
    pub status: JobStatus,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
    pub callback_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Blank callback URLs are normalized to `None`.
    pub fn new(input_text: String, callback_url: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_text,
            status: JobStatus::Queued,
            output_path: None,
            error: None,
            callback_url: callback_url.filter(|url| !url.trim().is_empty()),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Apply `transition` in place, or hand it back if it is illegal from the current status.
    pub(super) fn apply(&mut self, transition: Transition) -> Result<(), Transition> {
        if self.status != transition.source() {
            return Err(transition);
        }

        let now = Utc::now();
        self.status = transition.target();
        match transition {
            Transition::Start => self.started_at = Some(now),
            Transition::Complete { output_path } => {
                self.output_path = Some(output_path);
                self.finished_at = Some(now);
            }
            Transition::Fail { error } => {
                self.error = Some(error);
                self.finished_at = Some(now);
            }
        }
        Ok(())
    }

    /// Wall-clock time from creation to the terminal transition.
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.created_at).num_milliseconds())
    }
}
