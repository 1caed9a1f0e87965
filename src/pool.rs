use super::{
    errors::PoolError,
    handle,
    model::{Outcome, PoolState},
    observer::{Observer, PoolEvent, TracingObserver},
    tasks,
    threaded::{self, WorkerSet},
};
use crossbeam::channel;
use std::{
    env, fmt,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    thread,
    time::Instant,
};
use tokio::{runtime::Handle, sync::mpsc};

/// Environment variable overriding the number of workers.
pub const WORKERS_ENV: &str = "WORKPOOL_WORKERS";

const DEFAULT_THREAD_NAME: &str = "workpool";

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of concurrent workers, also the capacity of both queues.
    pub workers: usize,
    /// Prefix for the names of the pool's OS threads.
    pub thread_name: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            thread_name: DEFAULT_THREAD_NAME.into(),
            stack_size: None,
        }
    }
}

impl Config {
    /// Reads the worker count from `WORKPOOL_WORKERS`, falling back to the
    /// number of CPUs when it is not set.
    pub fn from_env() -> Result<Self, PoolError> {
        let raw = env::var(WORKERS_ENV).ok();
        let config = match parse_workers(raw.as_deref())? {
            Some(workers) => Self::default().with_workers(workers),
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }
}

fn parse_workers(raw: Option<&str>) -> Result<Option<usize>, PoolError> {
    let Some(raw) = raw else { return Ok(None) };
    match raw.trim().parse::<usize>() {
        Ok(workers) if workers > 0 => Ok(Some(workers)),
        _ => Err(PoolError::BadConfiguration { value: raw.into() }),
    }
}

/// Marks a run as aborted unless it finished delivering every outcome.
///
/// Covers early returns, panics unwinding out of `start` and dropped
/// `start_async` futures.
struct RunGuard<'a> {
    state: &'a AtomicU8,
    started: Instant,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.store(PoolState::Aborted as u8, Ordering::Release);
        }
    }
}

/// A bounded worker pool for a single run over a fixed set of resources.
///
/// The allocator feeds the resources into a work queue, `workers` workers
/// apply the processing function to them, and a single collector hands
/// every [`Outcome`] to the result handler. Both queues hold at most
/// `workers` entries, so a slow stage applies backpressure to the ones
/// before it.
pub struct Pool {
    config: Config,
    state: AtomicU8,
    observer: Arc<dyn Observer>,
}

impl Pool {
    /// Creates a pool with `workers` workers.
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        Self::with_config(Config::default().with_workers(workers))
    }

    pub fn with_config(config: Config) -> Result<Self, PoolError> {
        if config.workers == 0 {
            return Err(PoolError::InvalidWorkerCount);
        }

        Ok(Self {
            config,
            state: AtomicU8::new(PoolState::NotStarted as u8),
            observer: Arc::new(TracingObserver),
        })
    }

    /// Replaces the event sink, which defaults to [`TracingObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.config.workers
    }

    /// Capacity of the work queue and of the result queue.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.workers
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> PoolState {
        PoolState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == PoolState::Running
    }

    /// Whether a run has finished delivering every outcome.
    ///
    /// This is a snapshot; it never blocks.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.state() == PoolState::Completed
    }

    fn begin(&self) -> Result<RunGuard<'_>, PoolError> {
        self.state
            .compare_exchange(
                PoolState::NotStarted as u8,
                PoolState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| PoolError::AlreadyStarted)?;

        self.observer.on_event(&PoolEvent::Started {
            workers: self.config.workers,
        });
        Ok(RunGuard {
            state: &self.state,
            started: Instant::now(),
            armed: true,
        })
    }

    fn finish(&self, mut guard: RunGuard<'_>, run: Result<usize, PoolError>) -> Result<(), PoolError> {
        let delivered = run?;

        guard.armed = false;
        self.state
            .store(PoolState::Completed as u8, Ordering::Release);
        self.observer.on_event(&PoolEvent::Finished {
            elapsed: guard.started.elapsed(),
            delivered,
        });
        Ok(())
    }

    /// Processes every resource and blocks until each outcome has been
    /// handed to `on_result`.
    ///
    /// `process` runs concurrently on the worker threads; `on_result` runs
    /// on the single collector thread. Both may borrow from the caller.
    /// A panic in either is propagated to the caller once the pipeline has
    /// wound down.
    ///
    /// Must not be called from within a tokio runtime; use
    /// [`Pool::start_async`] there.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InsideRuntime`] if called from a tokio runtime thread.
    ///   The pool stays unstarted.
    /// - [`PoolError::AlreadyStarted`] if this pool was started before.
    /// - [`PoolError::Spawn`] if a pool thread could not be created. Threads
    ///   that did start still run to the end: when only some workers could
    ///   be spawned, they process every resource and `on_result` still sees
    ///   every outcome before this error is returned.
    ///
    /// Every failed run, including one left by a panic, ends in
    /// [`PoolState::Aborted`].
    pub fn start<R, E, I, P, C>(&self, resources: I, process: P, on_result: C) -> Result<(), PoolError>
    where
        I: IntoIterator<Item = R>,
        I::IntoIter: Send,
        R: Send,
        E: fmt::Display + Send,
        P: Fn(&R) -> Result<(), E> + Sync,
        C: FnMut(Outcome<R, E>) -> Result<(), E> + Send,
    {
        if Handle::try_current().is_ok() {
            return Err(PoolError::InsideRuntime);
        }
        let guard = self.begin()?;

        let config = &self.config;
        let observer = &*self.observer;
        let process = &process;
        let resources = resources.into_iter();
        let (jobs_tx, jobs_rx) = channel::bounded(self.capacity());
        let (results_tx, results_rx) = channel::bounded(self.capacity());

        let run = thread::scope(|scope| -> Result<usize, PoolError> {
            threaded::spawn(scope, config, "allocator", move || {
                threaded::allocate(resources, jobs_tx, observer)
            })?;

            let (done, completion) = handle::completion();
            threaded::spawn(scope, config, "collector", move || {
                threaded::collect(results_rx, on_result, done, observer)
            })?;

            let workers = WorkerSet::spawn(scope, config, jobs_rx, results_tx, process, observer)?;
            threaded::spawn(scope, config, "worker-set", move || workers.join())?;

            completion.wait_blocking()
        });

        self.finish(guard, run)
    }

    /// Async counterpart of [`Pool::start`] for callers inside a tokio
    /// runtime.
    ///
    /// Stages run as tokio tasks and every `process` call is moved onto
    /// the blocking thread pool. The returned future resolves once each
    /// outcome has been handed to `on_result`.
    pub async fn start_async<R, E, I, P, C>(
        &self,
        resources: I,
        process: P,
        on_result: C,
    ) -> Result<(), PoolError>
    where
        I: IntoIterator<Item = R>,
        I::IntoIter: Send + 'static,
        R: Send + 'static,
        E: fmt::Display + Send + 'static,
        P: Fn(&R) -> Result<(), E> + Send + Sync + 'static,
        C: FnMut(Outcome<R, E>) -> Result<(), E> + Send + 'static,
    {
        let guard = self.begin()?;

        let (jobs_tx, jobs_rx) = mpsc::channel(self.capacity());
        let (results_tx, results_rx) = mpsc::channel(self.capacity());

        let allocator = tokio::spawn(tasks::allocate(
            resources.into_iter(),
            jobs_tx,
            Arc::clone(&self.observer),
        ));

        let (done, completion) = handle::completion();
        let collector = tokio::spawn(tasks::collect(
            results_rx,
            on_result,
            done,
            Arc::clone(&self.observer),
        ));

        let workers = tokio::spawn(tasks::worker_set(
            self.config.workers,
            jobs_rx,
            results_tx,
            Arc::new(process),
            Arc::clone(&self.observer),
        ));

        let run = completion.await;

        // Surface faults from any stage before reporting the run.
        tasks::propagate(collector.await);
        tasks::propagate(workers.await);
        tasks::propagate(allocator.await);

        self.finish(guard, run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_falls_back_to_default() {
        assert!(parse_workers(None).unwrap().is_none());
    }

    #[test]
    fn natural_numbers_are_accepted() {
        assert_eq!(parse_workers(Some("12")).unwrap(), Some(12));
        assert_eq!(parse_workers(Some(" 3 ")).unwrap(), Some(3));
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        for raw in ["0", "-2", "many", ""] {
            match parse_workers(Some(raw)) {
                Err(PoolError::BadConfiguration { value }) => assert_eq!(value, raw),
                other => panic!("expected BadConfiguration for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn default_config_uses_every_cpu() {
        let config = Config::default();
        assert_eq!(config.workers, num_cpus::get());
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
        assert!(config.stack_size.is_none());
    }

    #[test]
    fn queues_are_sized_to_the_worker_count() {
        let pool = Pool::new(5).unwrap();
        assert_eq!(pool.workers(), 5);
        assert_eq!(pool.capacity(), 5);
    }
}
