use std::thread;

use crossbeam_channel::{bounded, unbounded};
use serde::Serialize;

use crate::domain::UrlPair;
use crate::mapping::JobMap;

const QUEUE_FACTOR: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub total: usize,
    pub attempted: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn succeeded(&self) -> bool {
        self.failed == 0 && self.attempted == self.total
    }
}

pub fn run_jobs<F>(workers: usize, jobs: &JobMap, job: F) -> DispatchReport
where
    F: Fn(&UrlPair) -> bool + Sync,
{
    if workers > 1 {
        concurrent_run(workers, jobs, job)
    } else {
        sequential_run(jobs, job)
    }
}

pub fn sequential_run<F>(jobs: &JobMap, job: F) -> DispatchReport
where
    F: Fn(&UrlPair) -> bool,
{
    let mut attempted = 0;
    for pair in jobs.values() {
        attempted += 1;
        if !job(pair) {
            return DispatchReport {
                total: jobs.len(),
                attempted,
                failed: 1,
            };
        }
    }
    DispatchReport {
        total: jobs.len(),
        attempted,
        failed: 0,
    }
}

pub fn concurrent_run<F>(workers: usize, jobs: &JobMap, job: F) -> DispatchReport
where
    F: Fn(&UrlPair) -> bool + Sync,
{
    let workers = workers.max(1);
    tracing::info!(workers, jobs = jobs.len(), "running jobs concurrently");

    let (job_tx, job_rx) = bounded::<&UrlPair>(workers * QUEUE_FACTOR);
    let (result_tx, result_rx) = unbounded::<bool>();
    let job = &job;

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                // recv fails once the queue is closed and drained
                while let Ok(pair) = job_rx.recv() {
                    if result_tx.send(job(pair)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        for pair in jobs.values() {
            if job_tx.send(pair).is_err() {
                break;
            }
        }
        drop(job_tx);
    });

    let mut attempted = 0;
    let mut failed = 0;
    for outcome in result_rx.iter() {
        attempted += 1;
        if !outcome {
            failed += 1;
        }
    }

    DispatchReport {
        total: jobs.len(),
        attempted,
        failed,
    }
}
