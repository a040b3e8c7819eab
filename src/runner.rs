//! Job runner: dispatches capture jobs through the pipeline
//!
//! Jobs execute concurrently up to the pool bound, but results are always
//! collected in input order. Every job yields exactly one result; per-job
//! failures never abort the batch. Only a dead engine halts dispatch, and
//! even then the remaining jobs are reported as failed rather than dropped.

use crate::browser_pool::BrowserPool;
use crate::capturer;
use crate::config::{CaptureJob, CaptureOptions, CaptureResult, JobStatus};
use crate::error::CaptureError;
use crate::preparer;
use crate::readiness;
use crate::stabilizer;
use crate::utils::{output_filename, validate_url};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Headroom on top of the readiness budget before a whole job is declared
/// stuck (covers prepare, stabilize, render, and the write).
const JOB_OVERHEAD: Duration = Duration::from_secs(90);

/// Pipeline position of a job, for logging and failure context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Queued,
    Preparing,
    Waiting,
    Stabilizing,
    Capturing,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStage::Queued => "queued",
            JobStage::Preparing => "preparing",
            JobStage::Waiting => "waiting",
            JobStage::Stabilizing => "stabilizing",
            JobStage::Capturing => "capturing",
        };
        f.write_str(name)
    }
}

/// Aggregated counts for the end-of-run report.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
}

impl RunSummary {
    pub fn from_results(results: &[CaptureResult]) -> Self {
        Self {
            total: results.len(),
            succeeded: results.iter().filter(|r| r.is_success()).count(),
            failed: results.iter().filter(|r| !r.is_success()).count(),
            timed_out: results.iter().filter(|r| r.timed_out).count(),
        }
    }
}

pub struct JobRunner {
    pool: Arc<BrowserPool>,
    options: Arc<CaptureOptions>,
    halted: Arc<AtomicBool>,
}

impl JobRunner {
    pub fn new(pool: Arc<BrowserPool>, options: Arc<CaptureOptions>) -> Self {
        Self {
            pool,
            options,
            halted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag shared with the signal handler; once set, no new job is
    /// dispatched while in-flight jobs settle on their own timeouts.
    pub fn halt_flag(&self) -> Arc<AtomicBool> {
        self.halted.clone()
    }

    /// Run all jobs and return one result per job, in input order.
    pub async fn run(&self, jobs: Vec<CaptureJob>) -> Vec<CaptureResult> {
        let total = jobs.len();
        info!("Dispatching {} jobs", total);

        if let Err(e) = tokio::fs::create_dir_all(&self.options.output_dir).await {
            let err = CaptureError::Io(format!(
                "output directory {}: {e}",
                self.options.output_dir.display()
            ));
            return jobs
                .into_iter()
                .map(|job| CaptureResult::failed(job, err.clone(), Duration::ZERO))
                .collect();
        }

        // Spawn everything up front; the pool semaphore bounds how many run
        // at once. Awaiting handles in spawn order preserves input order in
        // the collected results no matter when each job finishes.
        let handles: Vec<_> = jobs
            .into_iter()
            .map(|job| {
                let pool = self.pool.clone();
                let options = self.options.clone();
                let halted = self.halted.clone();
                let spawned_job = job.clone();
                let handle =
                    tokio::spawn(async move { run_one(pool, options, halted, spawned_job).await });
                (job, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(total);
        for (job, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    // A panicked worker still owes its job exactly one result.
                    warn!("Job {} task failed to join: {}", job.id, e);
                    results.push(CaptureResult::failed(
                        job,
                        CaptureError::LoadFailed(format!("job task aborted: {e}")),
                        Duration::ZERO,
                    ));
                }
            }
        }

        let summary = RunSummary::from_results(&results);
        info!(
            "Run complete: {}/{} succeeded, {} failed, {} timed out",
            summary.succeeded, summary.total, summary.failed, summary.timed_out
        );

        results
    }
}

/// Execute one job end to end, converting every pipeline error into a failed
/// result at this boundary.
async fn run_one(
    pool: Arc<BrowserPool>,
    options: Arc<CaptureOptions>,
    halted: Arc<AtomicBool>,
    job: CaptureJob,
) -> CaptureResult {
    let started = Instant::now();

    if halted.load(Ordering::Relaxed) {
        return CaptureResult::failed(
            job,
            CaptureError::EngineUnavailable("run halted before dispatch".to_string()),
            started.elapsed(),
        );
    }

    let ceiling = options.wait_timeout + JOB_OVERHEAD;
    let outcome = match timeout(ceiling, execute_pipeline(&pool, &options, &halted, &job)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(CaptureError::TimedOut(ceiling)),
    };

    let elapsed = started.elapsed();
    match outcome {
        Ok((output_path, timed_out)) => {
            info!(
                "Job {} succeeded: {} -> {}{}",
                job.id,
                job.url,
                output_path.display(),
                if timed_out { " (timed out, best effort)" } else { "" }
            );
            CaptureResult {
                job,
                status: JobStatus::Succeeded,
                output_path: Some(output_path),
                error: None,
                timed_out,
                elapsed,
            }
        }
        Err(e) => {
            if e.is_fatal() {
                warn!("Engine failure, halting dispatch: {}", e);
                halted.store(true, Ordering::Relaxed);
            } else {
                warn!("Job {} failed ({}): {}", job.id, e.kind(), e);
            }
            CaptureResult::failed(job, e, elapsed)
        }
    }
}

/// The capture pipeline: prepare, wait, stabilize, capture, write.
///
/// Stage transitions are strictly ordered; an error at any stage jumps
/// straight to a failed result with no later stage running.
async fn execute_pipeline(
    pool: &BrowserPool,
    options: &CaptureOptions,
    halted: &AtomicBool,
    job: &CaptureJob,
) -> Result<(PathBuf, bool), CaptureError> {
    debug!("Job {} [{}]: {}", job.id, JobStage::Queued, job.url);
    validate_url(&job.url)?;

    let handle = pool.acquire().await?;

    // The halt flag may have been set while this job was parked waiting for
    // a pool slot; a halted run must not start new pipeline work.
    if halted.load(Ordering::Relaxed) {
        return Err(CaptureError::EngineUnavailable(
            "run halted before capture".to_string(),
        ));
    }

    debug!("Job {} [{}]", job.id, JobStage::Preparing);
    preparer::prepare(&handle, options).await?;

    debug!("Job {} [{}]", job.id, JobStage::Waiting);
    let ready = readiness::navigate_and_wait(&handle, &job.url, options).await?;

    debug!("Job {} [{}]", job.id, JobStage::Stabilizing);
    stabilizer::freeze(&handle, options).await?;

    debug!("Job {} [{}]", job.id, JobStage::Capturing);
    let image = capturer::capture(&handle, options).await?;

    let output_path = options.output_dir.join(output_filename(job, options.format));
    tokio::fs::write(&output_path, &image.bytes)
        .await
        .map_err(|e| CaptureError::Io(format!("{}: {e}", output_path.display())))?;

    Ok((output_path, ready.timed_out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobStatus;

    fn result(url: &str, status: JobStatus, timed_out: bool) -> CaptureResult {
        CaptureResult {
            job: CaptureJob::new(url),
            status,
            output_path: None,
            error: None,
            timed_out,
            elapsed: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            result("https://a.example", JobStatus::Succeeded, false),
            result("https://b.example", JobStatus::Failed, false),
            result("https://c.example", JobStatus::Succeeded, true),
        ];
        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.timed_out, 1);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(JobStage::Queued.to_string(), "queued");
        assert_eq!(JobStage::Capturing.to_string(), "capturing");
    }

    #[test]
    fn test_failed_result_flags_timeout_errors() {
        let job = CaptureJob::new("https://a.example");
        let r = CaptureResult::failed(
            job,
            CaptureError::TimedOut(Duration::from_secs(30)),
            Duration::from_secs(30),
        );
        assert!(r.timed_out);
        assert_eq!(r.status, JobStatus::Failed);

        let job = CaptureJob::new("https://a.example");
        let r = CaptureResult::failed(
            job,
            CaptureError::InvalidInput("bad".into()),
            Duration::ZERO,
        );
        assert!(!r.timed_out);
    }
}
