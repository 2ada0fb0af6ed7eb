use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

use crate::error::SchedulerError;
use crate::jobs::{Job, JobStatus, JobStore, Transition};
use crate::notifier::Notifier;
use crate::synthesis::Synthesizer;

/// Sizing of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of jobs synthesized concurrently.
    pub workers: usize,
    /// Jobs waiting for a free worker before `submit` answers `Busy`.
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
        }
    }
}

/// Admits synthesis jobs and runs them on a fixed pool of background workers.
///
/// `submit` never waits for synthesis: it records the job, puts its id on a
/// bounded queue and returns. A full queue is reported as
/// [`SchedulerError::Busy`] before any job is created.
pub struct JobScheduler {
    store: JobStore,
    queue: RwLock<Option<mpsc::Sender<Uuid>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl JobScheduler {
    /// Spawn the worker pool. Must be called from within a tokio runtime.
    pub fn start<S, N>(store: JobStore, synthesizer: S, notifier: N, config: SchedulerConfig) -> Self
    where
        S: Synthesizer,
        N: Notifier,
    {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let synthesizer = Arc::new(synthesizer);
        let notifier = Arc::new(notifier);

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let store = store.clone();
                let synthesizer = Arc::clone(&synthesizer);
                let notifier = Arc::clone(&notifier);
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(id) = next else { break };
                        let job = tokio::spawn(run_job(
                            store.clone(),
                            Arc::clone(&synthesizer),
                            Arc::clone(&notifier),
                            id,
                        ));
                        if let Err(e) = job.await {
                            recover_panicked_job(&store, id, e).await;
                        }
                    }
                    tracing::debug!(worker, "Synthesis worker stopped");
                })
            })
            .collect();

        tracing::info!(
            workers = config.workers.max(1),
            queue_capacity = config.queue_capacity.max(1),
            "Job scheduler started"
        );

        Self {
            store,
            queue: RwLock::new(Some(tx)),
            workers: Mutex::new(workers),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Create a job and hand it to the worker pool. Returns the queued snapshot.
    pub async fn submit(
        &self,
        input_text: String,
        callback_url: Option<String>,
    ) -> Result<Job, SchedulerError> {
        let queue = self.queue.read().await;
        let sender = queue.as_ref().ok_or(SchedulerError::ShuttingDown)?;

        // Reserve the slot first so a busy pool never leaves an orphaned job behind.
        let permit = sender.try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => SchedulerError::Busy,
            TrySendError::Closed(()) => SchedulerError::ShuttingDown,
        })?;

        let job = self.store.create(input_text, callback_url).await;
        permit.send(job.id);

        tracing::info!(
            job_id = %job.id,
            chars = job.input_text.chars().count(),
            callback = job.callback_url.is_some(),
            "Synthesis job queued"
        );
        Ok(job)
    }

    /// Stop accepting jobs and wait for the workers to drain the queue.
    pub async fn shutdown(&self) {
        self.queue.write().await.take();

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Synthesis worker panicked");
            }
        }
        tracing::info!("Job scheduler stopped");
    }
}

/// Fail a job whose task died mid-flight so it never stays `processing`.
///
/// A panic after the outcome was recorded (in the notifier) leaves the job as is.
async fn recover_panicked_job(store: &JobStore, id: Uuid, e: JoinError) {
    tracing::error!(job_id = %id, error = %e, "Synthesis task panicked");
    let still_running = matches!(
        store.get(id).await,
        Ok(job) if job.status == JobStatus::Processing
    );
    if !still_running {
        return;
    }
    let fail = Transition::Fail {
        error: format!("synthesis task aborted: {e}"),
    };
    if let Err(e) = store.transition(id, fail).await {
        tracing::error!(job_id = %id, error = %e, "Could not record job failure");
    }
}

/// One unit of work: start, synthesize, record the outcome, then notify once.
async fn run_job<S, N>(store: JobStore, synthesizer: Arc<S>, notifier: Arc<N>, id: Uuid)
where
    S: Synthesizer,
    N: Notifier,
{
    let job = match store.transition(id, Transition::Start).await {
        Ok(job) => job,
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Could not start job");
            return;
        }
    };

    let outcome = match synthesizer.execute(&job).await {
        Ok(output_path) => Transition::Complete { output_path },
        Err(e) => {
            tracing::warn!(job_id = %id, error = %e, "Synthesis failed");
            Transition::Fail {
                error: e.to_string(),
            }
        }
    };

    let job = match store.transition(id, outcome).await {
        Ok(job) => job,
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Could not record job outcome");
            return;
        }
    };

    tracing::info!(
        job_id = %id,
        status = %job.status,
        duration_ms = job.duration_ms().unwrap_or_default(),
        "Synthesis job finished"
    );

    let Some(callback_url) = job.callback_url.as_deref() else {
        return;
    };
    match notifier.notify(callback_url, &job).await {
        Ok(()) => tracing::debug!(job_id = %id, url = callback_url, "Callback delivered"),
        Err(e) => {
            tracing::warn!(job_id = %id, url = callback_url, error = %e, "Callback delivery failed");
        }
    }
}
