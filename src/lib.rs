//! Bounded worker pool for a fixed batch of resources
//!
//! # Features
//! - Fan-out over a fixed number of workers through a bounded work queue
//! - Fan-in of every outcome to a single collector through a bounded result queue
//! - One blocking call (or one future) that returns after every outcome was handled
//! - Per-item failures delivered as data, never as a pool error
//! - Structured events for every stage through a pluggable [`Observer`]
//! - Blocking flavor on scoped OS threads and async flavor on tokio

pub mod errors;
mod handle;
pub mod model;
pub mod observer;
pub mod pool;
mod tasks;
mod threaded;

pub use errors::PoolError;
pub use model::{Outcome, PoolState, WorkItem};
pub use observer::{Observer, PoolEvent, Silent, TracingObserver};
pub use pool::{Config, Pool, WORKERS_ENV};
