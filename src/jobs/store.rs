use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::job::{Job, JobStatus, Transition};
use crate::error::StoreError;

/// In-memory owner of every job record.
///
/// Cloning the store clones the handle, not the records. All mutation goes
/// through [`JobStore::transition`], which holds the write lock for the whole
/// check-and-update, so concurrent updates to one job are serialized and
/// readers only ever see whole records.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new job in the `queued` state and return a snapshot of it.
    pub async fn create(&self, input_text: String, callback_url: Option<String>) -> Job {
        let job = Job::new(input_text, callback_url);
        self.jobs.write().await.insert(job.id, job.clone());
        job
    }

    pub async fn get(&self, id: Uuid) -> Result<Job, StoreError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Atomically apply `transition` and return the updated snapshot.
    pub async fn transition(&self, id: Uuid, transition: Transition) -> Result<Job, StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        job.apply(transition)
            .map_err(|rejected| StoreError::InvalidTransition {
                id,
                from: job.status,
                to: rejected.target(),
            })?;

        tracing::debug!(job_id = %id, status = %job.status, "Job transitioned");
        Ok(job.clone())
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Number of jobs currently in each status.
    pub async fn counts(&self) -> BTreeMap<JobStatus, usize> {
        let jobs = self.jobs.read().await;
        let mut counts: BTreeMap<JobStatus, usize> =
            JobStatus::ALL.iter().map(|status| (*status, 0)).collect();
        for job in jobs.values() {
            *counts.entry(job.status).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_returns_snapshot() {
        let store = JobStore::new();
        let job = store
            .create("Привет".into(), Some("http://cb.local".into()))
            .await;

        let fetched = store.get(job.id).await.unwrap();
        assert_eq!(fetched.id, job.id);
        assert_eq!(fetched.input_text, "Привет");
        assert_eq!(fetched.status, JobStatus::Queued);
        assert_eq!(fetched.callback_url.as_deref(), Some("http://cb.local"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let store = JobStore::new();
        let a = store.create("a".into(), None).await;
        let b = store.create("a".into(), None).await;
        assert_ne!(a.id, b.id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = JobStore::new();
        let id = Uuid::new_v4();

        assert!(matches!(store.get(id).await, Err(StoreError::NotFound(x)) if x == id));
        assert!(matches!(
            store.transition(id, Transition::Start).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn transition_updates_stored_record() {
        let store = JobStore::new();
        let job = store.create("text".into(), None).await;

        store.transition(job.id, Transition::Start).await.unwrap();
        let done = store
            .transition(
                job.id,
                Transition::Complete {
                    output_path: "shared/out.wav".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(done.status, JobStatus::Completed);
        let stored = store.get(job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.output_path, done.output_path);
    }

    #[tokio::test]
    async fn invalid_transition_is_reported() {
        let store = JobStore::new();
        let job = store.create("text".into(), None).await;

        let err = store
            .transition(job.id, Transition::Fail { error: "x".into() })
            .await
            .unwrap_err();
        match err {
            StoreError::InvalidTransition { id, from, to } => {
                assert_eq!(id, job.id);
                assert_eq!(from, JobStatus::Queued);
                assert_eq!(to, JobStatus::Failed);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(store.get(job.id).await.unwrap().status, JobStatus::Queued);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_starts_succeed_exactly_once() {
        let store = JobStore::new();
        let job = store.create("race".into(), None).await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.transition(job.id, Transition::Start).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.get(job.id).await.unwrap().status, JobStatus::Processing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_terminal_transitions_pick_one_winner() {
        let store = JobStore::new();
        let job = store.create("race".into(), None).await;
        store.transition(job.id, Transition::Start).await.unwrap();

        let complete = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .transition(
                        job.id,
                        Transition::Complete {
                            output_path: "a.wav".into(),
                        },
                    )
                    .await
            })
        };
        let fail = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .transition(job.id, Transition::Fail { error: "boom".into() })
                    .await
            })
        };

        let results = [complete.await.unwrap().is_ok(), fail.await.unwrap().is_ok()];
        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);

        // output_path is set iff the job completed.
        let stored = store.get(job.id).await.unwrap();
        assert_eq!(
            stored.output_path.is_some(),
            stored.status == JobStatus::Completed
        );
        assert_eq!(stored.error.is_some(), stored.status == JobStatus::Failed);
    }

    #[tokio::test]
    async fn counts_cover_every_status() {
        let store = JobStore::new();
        let a = store.create("a".into(), None).await;
        store.create("b".into(), None).await;
        store.transition(a.id, Transition::Start).await.unwrap();

        let counts = store.counts().await;
        assert_eq!(counts[&JobStatus::Queued], 1);
        assert_eq!(counts[&JobStatus::Processing], 1);
        assert_eq!(counts[&JobStatus::Completed], 0);
        assert_eq!(counts[&JobStatus::Failed], 0);
        // Lifecycle order, stable across calls.
        assert_eq!(counts.keys().copied().collect::<Vec<_>>(), JobStatus::ALL);
    }
}
