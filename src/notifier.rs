//! Best-effort delivery of terminal job events to caller-supplied callbacks.
//!
//! A [`Notifier`] only reports whether delivery worked. Deciding what to do
//! with a failure (log it, and nothing else) belongs to the scheduler.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NotifyError;
use crate::jobs::{Job, JobStatus};

/// Body POSTed to the callback URL once a job reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub task_id: Uuid,
    pub status: JobStatus,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

impl CallbackPayload {
    pub fn from_job(job: &Job, public_base_url: Option<&str>) -> Self {
        let download_url =
            (job.status == JobStatus::Completed).then(|| download_url(job.id, public_base_url));
        let error = match job.status {
            JobStatus::Failed => Some(
                job.error
                    .clone()
                    .unwrap_or_else(|| "synthesis failed".to_string()),
            ),
            _ => None,
        };

        Self {
            task_id: job.id,
            status: job.status,
            download_url,
            error,
        }
    }
}

/// Path of the download endpoint for `id`, optionally made absolute.
pub fn download_url(id: Uuid, public_base_url: Option<&str>) -> String {
    match public_base_url {
        Some(base) => format!("{}/download/{id}", base.trim_end_matches('/')),
        None => format!("/download/{id}"),
    }
}

pub trait Notifier: Send + Sync + 'static {
    fn notify(
        &self,
        callback_url: &str,
        job: &Job,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Sends callbacks as JSON over HTTP. One attempt per call.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: Client,
    public_base_url: Option<String>,
}

impl HttpNotifier {
    pub fn new(timeout: Duration, public_base_url: Option<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            public_base_url,
        })
    }
}

impl Notifier for HttpNotifier {
    async fn notify(&self, callback_url: &str, job: &Job) -> Result<(), NotifyError> {
        let payload = CallbackPayload::from_job(job, self.public_base_url.as_deref());

        let response = self.client.post(callback_url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobStore, Transition};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn finished_job(transition: Transition) -> Job {
        let store = JobStore::new();
        let job = store.create("Привет".into(), None).await;
        store.transition(job.id, Transition::Start).await.unwrap();
        store.transition(job.id, transition).await.unwrap()
    }

    fn notifier(base: Option<&str>) -> HttpNotifier {
        HttpNotifier::new(Duration::from_secs(2), base.map(String::from)).unwrap()
    }

    #[tokio::test]
    async fn completed_payload_has_download_url() {
        let job = finished_job(Transition::Complete {
            output_path: "shared/a.wav".into(),
        })
        .await;

        let payload = CallbackPayload::from_job(&job, None);
        assert_eq!(payload.status, JobStatus::Completed);
        assert_eq!(payload.download_url, Some(format!("/download/{}", job.id)));
        assert!(payload.error.is_none());

        let payload = CallbackPayload::from_job(&job, Some("http://tts.local:8000/"));
        assert_eq!(
            payload.download_url,
            Some(format!("http://tts.local:8000/download/{}", job.id))
        );
    }

    #[tokio::test]
    async fn failed_payload_has_error_and_no_url() {
        let job = finished_job(Transition::Fail {
            error: "engine crashed".into(),
        })
        .await;

        let payload = CallbackPayload::from_job(&job, Some("http://tts.local"));
        assert_eq!(payload.status, JobStatus::Failed);
        assert!(payload.download_url.is_none());
        assert_eq!(payload.error.as_deref(), Some("engine crashed"));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json["download_url"].is_null());
    }

    #[tokio::test]
    async fn posts_payload_to_callback() {
        let server = MockServer::start().await;
        let job = finished_job(Transition::Fail {
            error: "boom".into(),
        })
        .await;

        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(serde_json::json!({
                "task_id": job.id,
                "status": "failed",
                "download_url": null,
                "error": "boom",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        notifier(None)
            .notify(&format!("{}/hook", server.uri()), &job)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let job = finished_job(Transition::Complete {
            output_path: "a.wav".into(),
        })
        .await;
        let err = notifier(None).notify(&server.uri(), &job).await.unwrap_err();
        assert!(matches!(err, NotifyError::Status(503)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_error() {
        let job = finished_job(Transition::Complete {
            output_path: "a.wav".into(),
        })
        .await;

        // Port 9 (discard) on localhost is not expected to accept connections.
        let err = notifier(None)
            .notify("http://127.0.0.1:9/hook", &job)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Request(_)));
    }
}
