//! Crewboard background worker.
//!
//! - [`config`]: environment-driven [`WorkerConfig`](config::WorkerConfig).
//! - [`lifecycle`]: the daily [`LifecycleScheduler`](lifecycle::LifecycleScheduler)
//!   and its four project sweeps.

pub mod config;
pub mod lifecycle;
