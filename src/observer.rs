//! Structured events emitted by every stage of a run.
//!
//! Stages never log directly. They report [`PoolEvent`]s to an injected
//! [`Observer`], which decides what to do with them. The default
//! [`TracingObserver`] turns them into `tracing` events.

use std::{fmt, time::Duration};

/// A single step of a pool run.
#[derive(Clone, Copy)]
pub enum PoolEvent<'a> {
    /// The controller accepted a run.
    Started { workers: usize },
    /// The allocator pushed a work item.
    Allocated { id: usize },
    /// The allocator closed the work queue.
    AllocationDone { count: usize },
    /// All workers of the worker set have been launched.
    WorkersSpawned { workers: usize },
    WorkerStarted { worker: usize },
    ItemStarted { worker: usize, id: usize },
    ItemFinished { worker: usize, id: usize, failed: bool },
    WorkerStopped { worker: usize, processed: usize },
    /// Every worker terminated; the result queue is closed right after.
    WorkersDone,
    /// The result handler returned for one outcome.
    Collected {
        id: usize,
        handler_error: Option<&'a dyn fmt::Display>,
    },
    CollectorDone { delivered: usize },
    /// The controller was released by the completion signal.
    Finished { elapsed: Duration, delivered: usize },
}

impl PoolEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Allocated { .. } => "allocated",
            Self::AllocationDone { .. } => "allocation_done",
            Self::WorkersSpawned { .. } => "workers_spawned",
            Self::WorkerStarted { .. } => "worker_started",
            Self::ItemStarted { .. } => "item_started",
            Self::ItemFinished { .. } => "item_finished",
            Self::WorkerStopped { .. } => "worker_stopped",
            Self::WorkersDone => "workers_done",
            Self::Collected { .. } => "collected",
            Self::CollectorDone { .. } => "collector_done",
            Self::Finished { .. } => "finished",
        }
    }
}

/// Sink for [`PoolEvent`]s.
///
/// Called concurrently from the allocator, every worker and the collector.
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &PoolEvent<'_>);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &PoolEvent<'_>) {
        match *event {
            PoolEvent::Started { workers } => {
                tracing::debug!(workers, "worker pool starting");
            }
            PoolEvent::Allocated { id } => {
                tracing::trace!(id, "allocated work item");
            }
            PoolEvent::AllocationDone { count } => {
                tracing::debug!(count, "done allocating");
            }
            PoolEvent::WorkersSpawned { workers } => {
                tracing::debug!(workers, "worker set spawned");
            }
            PoolEvent::WorkerStarted { worker } => {
                tracing::trace!(worker, "worker starting");
            }
            PoolEvent::ItemStarted { worker, id } => {
                tracing::trace!(worker, id, "working on item");
            }
            PoolEvent::ItemFinished { worker, id, failed } => {
                tracing::trace!(worker, id, failed, "done with item");
            }
            PoolEvent::WorkerStopped { worker, processed } => {
                tracing::trace!(worker, processed, "worker done");
            }
            PoolEvent::WorkersDone => {
                tracing::debug!("all workers done, result queue closed");
            }
            PoolEvent::Collected { id, handler_error } => match handler_error {
                Some(err) => tracing::trace!(id, error = %err, "outcome handled"),
                None => tracing::trace!(id, "outcome handled"),
            },
            PoolEvent::CollectorDone { delivered } => {
                tracing::debug!(delivered, "collector done");
            }
            PoolEvent::Finished { elapsed, delivered } => {
                tracing::debug!(
                    delivered,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "total time taken"
                );
            }
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Observer for Silent {
    #[inline]
    fn on_event(&self, _event: &PoolEvent<'_>) {}
}
