use std::collections::BTreeMap;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::jobs::{Job, JobStatus};
use crate::notifier::download_url;

/// Synthesis request, accepted as a query string, a JSON body, or both.
#[derive(Debug, Default, Deserialize)]
pub struct SynthesizeParams {
    pub text: Option<String>,
    pub callback_url: Option<String>,
}

impl SynthesizeParams {
    /// Body fields take precedence over query fields.
    fn or(self, fallback: SynthesizeParams) -> Self {
        Self {
            text: self.text.or(fallback.text),
            callback_url: self.callback_url.or(fallback.callback_url),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub task_id: Uuid,
    pub status: JobStatus,
}

/// Public view of a job for `GET /status/{task_id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobView {
    pub task_id: Uuid,
    pub status: JobStatus,
    pub download_url: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobView {
    fn new(job: Job, public_base_url: Option<&str>) -> Self {
        Self {
            task_id: job.id,
            status: job.status,
            download_url: (job.status == JobStatus::Completed)
                .then(|| download_url(job.id, public_base_url)),
            error: job.error,
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub total_jobs: usize,
    pub jobs: BTreeMap<JobStatus, usize>,
}

// Malformed ids are reported exactly like unknown ones.
fn parse_task_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(raw.to_string()))
}

// ---------------------------------------------------------------------------
// POST /synthesize
// ---------------------------------------------------------------------------

/// Queue a synthesis job. Never waits for the engine.
pub async fn synthesize(
    State(state): State<AppState>,
    query: Result<Query<SynthesizeParams>, QueryRejection>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let Query(query) =
        query.map_err(|e| ApiError::Validation(format!("invalid query string: {e}")))?;
    let params = if body.is_empty() {
        query
    } else {
        serde_json::from_slice::<SynthesizeParams>(&body)
            .map_err(|e| ApiError::Validation(format!("invalid JSON body: {e}")))?
            .or(query)
    };

    let text = params
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("text must be a non-empty string".to_string()))?;

    let job = state.scheduler.submit(text, params.callback_url).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            task_id: job.id,
            status: job.status,
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /download/{task_id}
// ---------------------------------------------------------------------------

/// Serve the audio of a completed job, or explain why there is none.
pub async fn download(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_task_id(&task_id)?;
    let job = state.scheduler.store().get(id).await?;

    match job.status {
        JobStatus::Completed => {
            let path = job.output_path.ok_or_else(|| {
                ApiError::Internal(format!("completed job {id} has no output path"))
            })?;
            let file = tokio::fs::File::open(&path).await.map_err(|e| {
                ApiError::Internal(format!("failed to open {}: {e}", path.display()))
            })?;
            let size = file
                .metadata()
                .await
                .map_err(|e| ApiError::Internal(format!("failed to stat {}: {e}", path.display())))?
                .len();

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "audio/wav")
                .header(header::CONTENT_LENGTH, size.to_string())
                .header(
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{id}.wav\""),
                )
                .body(Body::from_stream(ReaderStream::new(file)))
                .map_err(|e| ApiError::Internal(format!("failed to build response: {e}")))
        }
        JobStatus::Failed => Err(ApiError::JobFailed {
            id,
            error: job
                .error
                .unwrap_or_else(|| "synthesis failed".to_string()),
        }),
        status @ (JobStatus::Queued | JobStatus::Processing) => {
            Err(ApiError::NotReady { id, status })
        }
    }
}

// ---------------------------------------------------------------------------
// GET /status/{task_id}
// ---------------------------------------------------------------------------

pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let id = parse_task_id(&task_id)?;
    let job = state.scheduler.store().get(id).await?;
    Ok(Json(JobView::new(job, state.public_base_url.as_deref())))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.scheduler.store();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        total_jobs: store.len().await,
        jobs: store.counts().await,
    })
}
