// src/exec/bounded.rs

//! Concurrency-bounded task execution with index-aligned results.

use std::fmt;
use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinError;
use tracing::{debug, warn};

use crate::types::Concurrency;

/// First failure observed while running a batch of tasks.
#[derive(Debug)]
pub struct TaskFailure<E> {
    /// Position of the failed task in the input.
    pub index: usize,
    pub error: E,
}

impl<E: fmt::Display> fmt::Display for TaskFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {} failed: {}", self.index, self.error)
    }
}

/// Run `tasks` with at most `limit` of them in flight, returning results in
/// input order regardless of completion order.
///
/// Tasks are futures and therefore do nothing until launched. Launching
/// spawns them on the Tokio runtime; as soon as one settles, the next queued
/// task (in input order) takes its slot, so a fast task never waits behind a
/// slow one from the same "batch".
///
/// On the first failure no further tasks are launched. Tasks already in
/// flight are awaited to completion; if they fail too, their errors are
/// dropped in favour of the first one. A panicking task counts as a failure
/// at its index.
pub async fn run_bounded<T, E, Fut>(
    tasks: Vec<Fut>,
    limit: Concurrency,
) -> Result<Vec<T>, TaskFailure<E>>
where
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<JoinError> + fmt::Display + Send + 'static,
{
    let total = tasks.len();
    let window = limit.window(total);

    let mut queued = tasks.into_iter().enumerate();
    let mut in_flight = FuturesUnordered::new();
    let mut results: Vec<Option<T>> = (0..total).map(|_| None).collect();
    let mut failure: Option<TaskFailure<E>> = None;

    let launch = |index: usize, task: Fut| {
        let handle = tokio::spawn(task);
        async move { (index, handle.await) }
    };

    for (index, task) in queued.by_ref().take(window) {
        debug!(task = index, "launching task");
        in_flight.push(launch(index, task));
    }

    debug!(total, window, %limit, "bounded executor started");

    while let Some((index, joined)) = in_flight.next().await {
        match joined.map_err(E::from).and_then(|outcome| outcome) {
            Ok(value) => {
                debug!(task = index, in_flight = in_flight.len(), "task finished");
                results[index] = Some(value);
            }
            Err(error) => {
                if let Some(first) = &failure {
                    warn!(
                        task = index,
                        first_failure = first.index,
                        error = %error,
                        "in-flight task also failed; keeping first failure"
                    );
                } else {
                    warn!(
                        task = index,
                        in_flight = in_flight.len(),
                        error = %error,
                        "task failed; launching no further tasks"
                    );
                    failure = Some(TaskFailure { index, error });
                }
            }
        }

        if failure.is_none() {
            if let Some((next, task)) = queued.next() {
                debug!(task = next, "launching task");
                in_flight.push(launch(next, task));
            }
        }
    }

    if let Some(failure) = failure {
        let skipped = queued.count();
        if skipped > 0 {
            debug!(skipped, "tasks never launched after failure");
        }
        return Err(failure);
    }

    Ok(results.into_iter().flatten().collect())
}
