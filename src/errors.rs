use std::io;

use thiserror::Error;

use crate::pool::WORKERS_ENV;

/// Failures of the pool itself.
///
/// Errors returned by the processing function never show up here; they
/// are delivered as data inside each [`Outcome`](crate::model::Outcome).
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("a pool needs at least one worker")]
    InvalidWorkerCount,

    #[error("invalid value {value:?} in {}; must be a natural number", WORKERS_ENV)]
    BadConfiguration { value: String },

    #[error("blocking start called from inside a tokio runtime; use start_async")]
    InsideRuntime,

    #[error("pool has already been started")]
    AlreadyStarted,

    #[error("failed to spawn pool thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("collector stopped without signalling completion")]
    Abandoned,
}
