//! The same pipeline on tokio tasks.
//!
//! Processing calls are synchronous, so each one is moved onto the
//! blocking thread pool instead of stalling a runtime worker.

use super::{
    handle::CompletionSender,
    model::{Outcome, WorkItem},
    observer::{Observer, PoolEvent},
};
use std::{fmt, panic, sync::Arc};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinError,
};

type SharedJobs<R> = Arc<Mutex<mpsc::Receiver<WorkItem<R>>>>;

/// Re-raises a panic captured by a task, ignoring cancellation.
pub(crate) fn propagate(res: Result<(), JoinError>) {
    if let Err(err) = res {
        if err.is_panic() {
            panic::resume_unwind(err.into_panic());
        }
    }
}

pub(crate) async fn allocate<R, I>(
    resources: I,
    jobs: mpsc::Sender<WorkItem<R>>,
    observer: Arc<dyn Observer>,
) where
    I: Iterator<Item = R>,
{
    let mut count = 0;
    for (id, resource) in resources.enumerate() {
        if jobs.send(WorkItem::new(id, resource)).await.is_err() {
            return;
        }
        observer.on_event(&PoolEvent::Allocated { id });
        count += 1;
    }
    observer.on_event(&PoolEvent::AllocationDone { count });
}

async fn work<R, E, P>(
    worker: usize,
    jobs: SharedJobs<R>,
    results: mpsc::Sender<Outcome<R, E>>,
    process: Arc<P>,
    observer: Arc<dyn Observer>,
) where
    R: Send + 'static,
    E: Send + 'static,
    P: Fn(&R) -> Result<(), E> + Send + Sync + 'static,
{
    observer.on_event(&PoolEvent::WorkerStarted { worker });

    let mut processed = 0;
    loop {
        let next = jobs.lock().await.recv().await;
        let Some(item) = next else { break };

        let id = item.id();
        observer.on_event(&PoolEvent::ItemStarted { worker, id });

        let process = Arc::clone(&process);
        let outcome = match tokio::task::spawn_blocking(move || {
            let result = process(item.resource());
            Outcome::new(item, result)
        })
        .await
        {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            // The runtime is shutting down.
            Err(_) => break,
        };

        let failed = !outcome.is_ok();
        if results.send(outcome).await.is_err() {
            break;
        }

        processed += 1;
        observer.on_event(&PoolEvent::ItemFinished { worker, id, failed });
    }

    observer.on_event(&PoolEvent::WorkerStopped { worker, processed });
}

/// Runs `workers` worker tasks to completion, then closes the result queue.
pub(crate) async fn worker_set<R, E, P>(
    workers: usize,
    jobs: mpsc::Receiver<WorkItem<R>>,
    results: mpsc::Sender<Outcome<R, E>>,
    process: Arc<P>,
    observer: Arc<dyn Observer>,
) where
    R: Send + 'static,
    E: Send + 'static,
    P: Fn(&R) -> Result<(), E> + Send + Sync + 'static,
{
    let jobs: SharedJobs<R> = Arc::new(Mutex::new(jobs));
    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            tokio::spawn(work(
                worker,
                Arc::clone(&jobs),
                results.clone(),
                Arc::clone(&process),
                Arc::clone(&observer),
            ))
        })
        .collect();
    // Only the workers may keep the work queue alive.
    drop(jobs);
    observer.on_event(&PoolEvent::WorkersSpawned { workers });

    let joined = futures::future::join_all(handles).await;

    observer.on_event(&PoolEvent::WorkersDone);
    drop(results);

    joined.into_iter().for_each(propagate);
}

pub(crate) async fn collect<R, E, C>(
    mut results: mpsc::Receiver<Outcome<R, E>>,
    mut on_result: C,
    done: CompletionSender,
    observer: Arc<dyn Observer>,
) where
    E: fmt::Display,
    C: FnMut(Outcome<R, E>) -> Result<(), E>,
{
    let mut delivered = 0;
    while let Some(outcome) = results.recv().await {
        let id = outcome.id();
        let handled = on_result(outcome);
        delivered += 1;
        observer.on_event(&PoolEvent::Collected {
            id,
            handler_error: handled.as_ref().err().map(|err| err as &dyn fmt::Display),
        });
    }

    observer.on_event(&PoolEvent::CollectorDone { delivered });
    done.fire(delivered);
}
