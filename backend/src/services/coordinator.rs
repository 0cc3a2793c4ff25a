//! Fan-out/fan-in of per-location work under a wall-clock deadline
//!
//! Every item gets its own task and a cancellation token. The first error or
//! the deadline ends the aggregate; remaining tasks are then cancelled and
//! joined before the call returns, so nothing outlives the request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};

use crate::config::AggregationConfig;

/// Aggregate failure of a fan-out
#[derive(Error, Debug)]
pub enum AggregateError<E> {
    /// First error reported by any task
    #[error(transparent)]
    Task(E),

    #[error("aggregation deadline of {0:?} elapsed")]
    Timeout(Duration),

    /// A task panicked or was aborted before reporting
    #[error("worker task terminated abnormally: {0}")]
    Join(String),
}

/// Runs one task per item and folds the outcomes into one result
#[derive(Debug, Clone)]
pub struct Coordinator {
    deadline: Duration,
    cancel_grace: Duration,
    max_concurrency: Option<usize>,
}

impl Coordinator {
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            cancel_grace: Duration::from_millis(500),
            max_concurrency: None,
        }
    }

    pub fn from_config(config: &AggregationConfig) -> Self {
        Self {
            deadline: config.deadline(),
            cancel_grace: config.cancel_grace(),
            max_concurrency: config.max_concurrency,
        }
    }

    /// Time cancelled tasks get to finish before they are aborted
    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    /// Bound the number of tasks doing work at the same time
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit.max(1));
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `operation` for every item concurrently.
    ///
    /// Results come back in completion order. The first task error wins; if
    /// the deadline passes first the result is [`AggregateError::Timeout`].
    pub async fn aggregate_all<I, T, E, F, Fut>(
        &self,
        items: Vec<I>,
        operation: F,
    ) -> Result<Vec<T>, AggregateError<E>>
    where
        F: Fn(I, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let token = CancellationToken::new();
        // Cancels the tasks even if this future is dropped mid-flight
        let _cancel_on_drop = token.clone().drop_guard();
        let limiter = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));

        let mut tasks = JoinSet::new();
        for item in items {
            let work = operation(item, token.child_token());
            let token = token.clone();
            let limiter = limiter.clone();

            tasks.spawn(
                async move {
                    let _permit = match limiter {
                        Some(limiter) => tokio::select! {
                            biased;
                            _ = token.cancelled() => return None,
                            permit = limiter.acquire_owned() => permit.ok(),
                        },
                        None => None,
                    };
                    Some(work.await)
                }
                .in_current_span(),
            );
        }

        let total = tasks.len();
        debug!(tasks = total, deadline = ?self.deadline, "Spawned forecast workers");

        let mut results = Vec::with_capacity(total);
        let joined = tokio::time::timeout(self.deadline, async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Some(Ok(value))) => results.push(value),
                    Ok(Some(Err(err))) => return Err(AggregateError::Task(err)),
                    // Only produced after cancellation, which has not happened yet
                    Ok(None) => {}
                    Err(err) => return Err(AggregateError::Join(err.to_string())),
                }
            }
            Ok(())
        })
        .await;

        let outcome = match joined {
            Ok(Ok(())) => Ok(results),
            Ok(Err(err)) => Err(err),
            Err(_) => {
                warn!(
                    deadline = ?self.deadline,
                    finished = results.len(),
                    outstanding = tasks.len(),
                    "Forecast workers missed the deadline"
                );
                Err(AggregateError::Timeout(self.deadline))
            }
        };

        if !tasks.is_empty() {
            token.cancel();
            self.drain(&mut tasks).await;
        }

        outcome
    }

    /// Wait for cancelled tasks to stop, aborting any that ignore the token
    async fn drain<O: 'static>(&self, tasks: &mut JoinSet<O>) {
        let outstanding = tasks.len();
        let drained = tokio::time::timeout(self.cancel_grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                "Workers ignored cancellation, aborting them"
            );
            tasks.shutdown().await;
        } else {
            debug!(tasks = outstanding, "Cancelled workers stopped");
        }
    }
}

/// Race a future against cancellation; `None` means the token fired first
pub async fn until_cancelled<F: Future>(token: &CancellationToken, work: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = work => Some(output),
    }
}
