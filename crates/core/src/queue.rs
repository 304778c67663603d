//! Bounded work queue
//!
//! Runs submitted futures on the Tokio runtime with at most `limit` of them
//! executing at once. Work beyond the limit waits in FIFO submission order.
//!
//! The running count, the pending list and the in-flight counter live behind
//! a single mutex, so "may another task start now" has exactly one answer at
//! any moment. A worker that finishes a task pulls the next pending one
//! instead of releasing its slot, which keeps the running count at the limit
//! while there is backlog.

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tokio::sync::{oneshot, watch};

use crate::error::{Error, Result};

/// Default number of concurrently running tasks
pub const DEFAULT_CONCURRENCY: usize = 100;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Default)]
struct State {
    running: usize,
    pending: VecDeque<Job>,
}

struct Shared {
    limit: usize,
    state: Mutex<State>,
    /// Submitted but not yet settled; only modified while `state` is held
    in_flight: watch::Sender<usize>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scheduler running at most `limit` tasks concurrently
///
/// Cloning yields another handle to the same queue and the same limit.
#[derive(Clone)]
pub struct WorkQueue {
    shared: Arc<Shared>,
}

impl WorkQueue {
    /// Create a queue running at most `limit` tasks at once
    ///
    /// A limit of zero is rejected.
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidConfig(
                "concurrency limit must be a positive integer".into(),
            ));
        }
        Ok(Self::with_limit(limit))
    }

    fn with_limit(limit: usize) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                limit,
                state: Mutex::new(State::default()),
                in_flight,
            }),
        }
    }

    /// Configured concurrency limit
    pub fn limit(&self) -> usize {
        self.shared.limit
    }

    /// Number of tasks currently executing
    pub fn running(&self) -> usize {
        self.shared.lock().running
    }

    /// Number of tasks waiting for a free slot
    pub fn pending(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Submit a task
    ///
    /// The task starts right away when a slot is free and is queued
    /// otherwise. Must be called from within a Tokio runtime. The returned
    /// handle yields the task's output; dropping it does not cancel the task.
    pub fn submit<F, T>(&self, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(task)
                .catch_unwind()
                .await
                .map_err(|payload| panic_message(payload.as_ref()));
            // The receiver may be gone; the outcome is simply discarded then
            let _ = tx.send(outcome);
        });

        let start = {
            let mut state = self.shared.lock();
            self.shared.in_flight.send_modify(|n| *n += 1);
            if state.running < self.shared.limit {
                state.running += 1;
                Some(job)
            } else {
                state.pending.push_back(job);
                None
            }
        };

        if let Some(job) = start {
            tokio::spawn(run_worker(Arc::clone(&self.shared), job));
        }

        TaskHandle { rx }
    }

    /// Wait until every submitted task has settled
    ///
    /// Tasks submitted while draining are waited for as well.
    pub async fn drain(&self) {
        let mut rx = self.shared.in_flight.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::with_limit(DEFAULT_CONCURRENCY)
    }
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("WorkQueue")
            .field("limit", &self.shared.limit)
            .field("running", &state.running)
            .field("pending", &state.pending.len())
            .finish()
    }
}

/// Execute `job`, then keep pulling pending jobs until the backlog is empty
async fn run_worker(shared: Arc<Shared>, mut job: Job) {
    loop {
        job.await;

        let next = {
            let mut state = shared.lock();
            shared.in_flight.send_modify(|n| *n -= 1);
            let next = state.pending.pop_front();
            if next.is_none() {
                state.running -= 1;
            }
            next
        };

        match next {
            Some(next) => job = next,
            None => break,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Handle to the outcome of a submitted task
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<std::result::Result<T, String>>,
}

impl<T> TaskHandle<T> {
    /// Wait for the task and return its output
    ///
    /// A task that panicked yields [`Error::General`].
    pub async fn outcome(self) -> Result<T> {
        match self.rx.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(Error::General(format!("task panicked: {message}"))),
            Err(_) => Err(Error::General("task dropped before completion".into())),
        }
    }
}
