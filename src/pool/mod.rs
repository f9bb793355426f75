//! Bounded worker pool.
//!
//! Jobs go into a shared queue; a fixed number of runner threads pull from
//! it and push results into a channel, so results arrive in completion
//! order regardless of submission order. Each runner either processes jobs
//! on its own thread or drives a child process, depending on the backend.
//! A dead child produces a failed result for the job it was holding and is
//! replaced before the runner takes the next one.

pub mod protocol;

mod process;

use crate::common::{Diagnostics, ProcessingResult, Result};
use crate::config::InversionConfig;
use crate::pool::process::ProcessWorker;
use crate::pool::protocol::{encode_job, process_job, worker_main};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

/// Environment variable marking a process as a pool worker.
pub const WORKER_ENV: &str = "DAMSON_WORKER";

/// How jobs are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerBackend {
    /// One child process per runner; a crash cannot take the batch down.
    #[default]
    Process,
    /// Plain threads in this process.
    Thread,
}

/// One unit of work: a named document.
#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// If this process was started as a worker, serve jobs on stdio and exit;
/// otherwise return immediately. Binaries call this before anything else.
pub fn init_worker() {
    if std::env::var_os(WORKER_ENV).is_none() {
        return;
    }
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let code = match worker_main(stdin.lock(), stdout.lock()) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("worker error: {err}");
            1
        }
    };
    std::process::exit(code);
}

type JobQueue = Arc<Mutex<mpsc::Receiver<Job>>>;

/// A running pool draining a fixed job list.
pub struct WorkerPool {
    results: mpsc::Receiver<ProcessingResult>,
    handles: Vec<thread::JoinHandle<()>>,
    remaining: usize,
}

impl WorkerPool {
    /// Queue `jobs` and start at most `max_workers` runners.
    pub fn start(
        jobs: Vec<Job>,
        config: &InversionConfig,
        backend: WorkerBackend,
        max_workers: usize,
    ) -> Result<Self> {
        let total = jobs.len();
        let runner_count = if total == 0 {
            0
        } else {
            max_workers.min(total).max(1)
        };

        let (job_tx, job_rx) = mpsc::channel();
        for job in jobs {
            // The receiver is still alive here.
            let _ = job_tx.send(job);
        }
        drop(job_tx);
        let queue: JobQueue = Arc::new(Mutex::new(job_rx));

        let (result_tx, results) = mpsc::channel();
        let mut handles = Vec::with_capacity(runner_count);
        for i in 0..runner_count {
            let queue = Arc::clone(&queue);
            let tx = result_tx.clone();
            let config = *config;
            let builder = thread::Builder::new().name(format!("damson-worker-{i}"));
            let handle = match backend {
                WorkerBackend::Thread => {
                    builder.spawn(move || thread_runner(queue, tx, config))?
                }
                WorkerBackend::Process => {
                    builder.spawn(move || process_runner(queue, tx, config))?
                }
            };
            handles.push(handle);
        }
        drop(result_tx);
        tracing::debug!(workers = runner_count, backend = ?backend, jobs = total, "worker pool started");

        Ok(Self {
            results,
            handles,
            remaining: total,
        })
    }

    /// Number of runners actually started.
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Next finished result, in completion order. `None` once every queued
    /// job has been answered.
    pub fn next_result(&mut self) -> Option<ProcessingResult> {
        if self.remaining == 0 {
            return None;
        }
        match self.results.recv() {
            Ok(result) => {
                self.remaining -= 1;
                Some(result)
            }
            Err(_) => {
                // Every runner is gone; nothing more will arrive.
                self.remaining = 0;
                None
            }
        }
    }
}

impl Iterator for WorkerPool {
    type Item = ProcessingResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_result()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn next_job(queue: &JobQueue) -> Option<Job> {
    // The queue was fully loaded before the runners started, so recv never
    // blocks while the lock is held.
    queue.lock().recv().ok()
}

fn thread_runner(
    queue: JobQueue,
    results: mpsc::Sender<ProcessingResult>,
    config: InversionConfig,
) {
    while let Some(job) = next_job(&queue) {
        let result = process_job(&config, &job.name, &job.bytes);
        if results.send(result).is_err() {
            break;
        }
    }
}

fn process_runner(
    queue: JobQueue,
    results: mpsc::Sender<ProcessingResult>,
    config: InversionConfig,
) {
    let mut worker: Option<ProcessWorker> = None;
    while let Some(job) = next_job(&queue) {
        let payload = encode_job(&config, &job.name, &job.bytes);
        let result = match run_on_worker(&mut worker, &payload) {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(job = job.name.as_str(), error = %err, "worker failed, replacing it");
                ProcessingResult::failure(
                    &job.name,
                    Diagnostics::new(),
                    format!("worker failed: {err}"),
                )
            }
        };
        if results.send(result).is_err() {
            break;
        }
    }
}

/// Run a payload on the runner's child, spawning one on demand. A failed
/// child is dropped so the next job gets a fresh one.
fn run_on_worker(
    slot: &mut Option<ProcessWorker>,
    payload: &[u8],
) -> Result<ProcessingResult> {
    let worker = match slot {
        Some(worker) => worker,
        None => slot.insert(ProcessWorker::spawn()?),
    };
    match worker.run(payload) {
        Ok(result) => Ok(result),
        Err(err) => {
            *slot = None;
            Err(err)
        }
    }
}
