//! Parallel test-execution engine.
//!
//! Runs a batch of jobs on a bounded worker pool: the submission loop
//! acquires an owned semaphore permit before spawning each job task, so at
//! most `workers` jobs execute at once. Completed results flow over a channel
//! into a single collector task that exclusively owns the result list and the
//! fail-fast cancellation decision; results are printed as they arrive and
//! appended in completion order.

use crate::job::{Job, JobResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineParams {
    /// Maximum number of concurrently executing jobs (min 1)
    pub workers: usize,
    /// Stop scheduling new jobs after the first non-success result
    pub fail_fast: bool,
    /// Suppress per-result output
    pub quiet: bool,
}

/// Aggregate outcome of one batch
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Results in completion order (not submission order)
    pub results: Vec<JobResult>,
    /// Wall time for the whole batch
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    /// Number of results whose encode and score both succeeded
    pub fn num_success(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }
}

/// Bounded-concurrency job scheduler with fail-fast cancellation
pub struct ExecutionEngine {
    params: EngineParams,
}

impl ExecutionEngine {
    pub fn new(params: EngineParams) -> Self {
        Self { params }
    }

    /// Run all jobs to completion (or until fail-fast stops scheduling).
    ///
    /// Jobs always yield a result, even when a step inside them failed; the
    /// pool never crashes on a failing job. Once the cancellation flag is
    /// set, no further job is scheduled; jobs already in flight drain before
    /// the call returns.
    pub async fn run(&self, jobs: Vec<Job>) -> BatchReport {
        let start = Instant::now();
        let workers = self.params.workers.max(1);
        let fail_fast = self.params.fail_fast;
        let quiet = self.params.quiet;

        let semaphore = Arc::new(Semaphore::new(workers));
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::channel::<JobResult>(jobs.len().max(1));

        let collector_cancel = cancelled.clone();
        let collector = tokio::spawn(async move {
            let mut results = Vec::new();
            while let Some(result) = rx.recv().await {
                if !quiet {
                    println!("{}", result);
                }
                if fail_fast && !result.is_success() {
                    collector_cancel.store(true, Ordering::SeqCst);
                }
                results.push(result);
            }
            results
        });

        for job in jobs {
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore should not be closed");
            // A failure may have been collected while waiting for a slot
            if cancelled.load(Ordering::SeqCst) {
                break;
            }
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = job.run().await;
                let _ = tx.send(result).await;
                drop(permit);
            });
        }
        drop(tx);

        let results = collector.await.unwrap_or_default();
        BatchReport {
            results,
            elapsed: start.elapsed(),
        }
    }
}
