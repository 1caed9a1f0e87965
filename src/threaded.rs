//! Allocator, worker set and collector running on scoped OS threads.
//!
//! Every stage owns exactly the queue ends it uses. Dropping the last
//! sender closes a queue; dropping the last receiver makes blocked
//! senders fail, so a faulting stage never leaves a peer blocked.

use super::{
    handle::CompletionSender,
    model::{Outcome, WorkItem},
    observer::{Observer, PoolEvent},
    pool::Config,
};
use crossbeam::channel::{Receiver, Sender};
use std::{
    fmt, io, panic,
    thread::{self, Scope, ScopedJoinHandle},
};

fn builder(config: &Config, role: &str) -> thread::Builder {
    let builder = thread::Builder::new().name(format!("{}-{role}", config.thread_name));
    match config.stack_size {
        Some(size) => builder.stack_size(size),
        None => builder,
    }
}

/// Spawns one named pool thread inside `scope`.
pub(crate) fn spawn<'scope, 'env, F>(
    scope: &'scope Scope<'scope, 'env>,
    config: &Config,
    role: &str,
    f: F,
) -> io::Result<ScopedJoinHandle<'scope, ()>>
where
    F: FnOnce() + Send + 'scope,
{
    builder(config, role).spawn_scoped(scope, f)
}

/// Pushes every resource into the work queue in input order, then closes it.
///
/// Blocks whenever the queue is full.
pub(crate) fn allocate<R, I>(resources: I, jobs: Sender<WorkItem<R>>, observer: &dyn Observer)
where
    I: Iterator<Item = R>,
{
    let mut count = 0;
    for (id, resource) in resources.enumerate() {
        if jobs.send(WorkItem::new(id, resource)).is_err() {
            // No worker is left to receive; the run is unwinding.
            return;
        }
        observer.on_event(&PoolEvent::Allocated { id });
        count += 1;
    }
    observer.on_event(&PoolEvent::AllocationDone { count });
}

fn work<R, E, P>(
    worker: usize,
    jobs: Receiver<WorkItem<R>>,
    results: Sender<Outcome<R, E>>,
    process: &P,
    observer: &dyn Observer,
) where
    P: Fn(&R) -> Result<(), E>,
{
    observer.on_event(&PoolEvent::WorkerStarted { worker });

    let mut processed = 0;
    for item in jobs.iter() {
        let id = item.id();
        observer.on_event(&PoolEvent::ItemStarted { worker, id });

        let result = process(item.resource());
        let failed = result.is_err();
        if results.send(Outcome::new(item, result)).is_err() {
            break;
        }

        processed += 1;
        observer.on_event(&PoolEvent::ItemFinished { worker, id, failed });
    }

    observer.on_event(&PoolEvent::WorkerStopped { worker, processed });
}

/// A fixed set of worker threads sharing one work queue.
///
/// Holds the original result sender so that the result queue stays open
/// until [`WorkerSet::join`] has seen every worker terminate.
pub(crate) struct WorkerSet<'scope, R, E> {
    handles: Vec<ScopedJoinHandle<'scope, ()>>,
    results: Sender<Outcome<R, E>>,
    observer: &'scope dyn Observer,
}

impl<'scope, R, E> WorkerSet<'scope, R, E>
where
    R: Send + 'scope,
    E: Send + 'scope,
{
    pub(crate) fn spawn<'env, P>(
        scope: &'scope Scope<'scope, 'env>,
        config: &Config,
        jobs: Receiver<WorkItem<R>>,
        results: Sender<Outcome<R, E>>,
        process: &'scope P,
        observer: &'scope dyn Observer,
    ) -> io::Result<Self>
    where
        P: Fn(&R) -> Result<(), E> + Sync,
    {
        let mut handles = Vec::with_capacity(config.workers);
        for worker in 0..config.workers {
            let jobs = jobs.clone();
            let results = results.clone();
            let handle = spawn(scope, config, &format!("worker-{worker}"), move || {
                work(worker, jobs, results, process, observer)
            })?;
            handles.push(handle);
        }
        observer.on_event(&PoolEvent::WorkersSpawned {
            workers: handles.len(),
        });

        Ok(Self {
            handles,
            results,
            observer,
        })
    }

    /// Waits for all workers, then closes the result queue exactly once.
    ///
    /// A worker panic is re-raised after the queue has been closed.
    pub(crate) fn join(self) {
        let Self {
            handles,
            results,
            observer,
        } = self;

        let mut fault = None;
        for handle in handles {
            if let Err(payload) = handle.join() {
                fault.get_or_insert(payload);
            }
        }

        observer.on_event(&PoolEvent::WorkersDone);
        drop(results);

        if let Some(payload) = fault {
            panic::resume_unwind(payload);
        }
    }
}

/// Hands every outcome to `on_result` in arrival order until the result
/// queue is closed and drained, then fires the completion signal.
pub(crate) fn collect<R, E, C>(
    results: Receiver<Outcome<R, E>>,
    mut on_result: C,
    done: CompletionSender,
    observer: &dyn Observer,
) where
    E: fmt::Display,
    C: FnMut(Outcome<R, E>) -> Result<(), E>,
{
    let mut delivered = 0;
    for outcome in results.iter() {
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
