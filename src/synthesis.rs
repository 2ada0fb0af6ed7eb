//! Invocation of the external speech-synthesis engine.
//!
//! The engine is any executable called as `engine [args...] <text> <output_path>`
//! that writes an audio file to `output_path` and exits with status 0.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::ServiceConfig;
use crate::error::SynthesisError;
use crate::jobs::Job;

/// Produces an audio artifact for one job.
pub trait Synthesizer: Send + Sync + 'static {
    fn execute(&self, job: &Job) -> impl Future<Output = Result<PathBuf, SynthesisError>> + Send;
}

/// Runs the configured engine executable as a child process.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    engine: PathBuf,
    args: Vec<String>,
    output_dir: PathBuf,
    timeout: Duration,
}

impl CommandSynthesizer {
    pub fn new(
        engine: impl Into<PathBuf>,
        args: Vec<String>,
        output_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            engine: engine.into(),
            args,
            output_dir: output_dir.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            &config.engine_path,
            config.engine_args.clone(),
            &config.output_dir,
            Duration::from_secs(config.synthesis_timeout_secs),
        )
    }

    /// Artifact location for a job. Keyed by job id, so never shared between jobs.
    pub fn output_path_for(&self, job: &Job) -> PathBuf {
        self.output_dir.join(format!("{}.wav", job.id))
    }

    async fn run(&self, text: &str, output_path: &Path) -> Result<(), SynthesisError> {
        let mut command = Command::new(&self.engine);
        command
            .args(&self.args)
            .arg(text)
            .arg(output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| SynthesisError::Spawn {
            engine: self.engine.display().to_string(),
            source,
        })?;

        // Dropping the wait future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SynthesisError::Timeout(self.timeout))??;

        let diagnostics = diagnostics(&output.stdout, &output.stderr);
        if !output.status.success() {
            return Err(SynthesisError::Exit {
                status: output.status.to_string(),
                diagnostics,
            });
        }

        match tokio::fs::metadata(output_path).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(SynthesisError::MissingOutput {
                path: output_path.to_path_buf(),
                diagnostics,
            }),
        }
    }
}

impl Synthesizer for CommandSynthesizer {
    async fn execute(&self, job: &Job) -> Result<PathBuf, SynthesisError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_path = self.output_path_for(job);

        tracing::debug!(
            job_id = %job.id,
            engine = %self.engine.display(),
            output = %output_path.display(),
            "Starting synthesis engine"
        );

        if let Err(e) = self.run(&job.input_text, &output_path).await {
            // Leave no half-written artifact behind for a failed job.
            let _ = tokio::fs::remove_file(&output_path).await;
            return Err(e);
        }

        Ok(output_path)
    }
}

// Prefer stderr; engines that log to stdout still get their message surfaced.
fn diagnostics(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = String::from_utf8_lossy(stdout).trim().to_string();
    if stdout.is_empty() {
        "no diagnostic output".to_string()
    } else {
        stdout
    }
}
