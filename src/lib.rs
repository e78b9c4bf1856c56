//! Bounded parallel CPU load generation.
//!
//! A run clamps its parameters with [`LoadLimits`], fans out one busy OS
//! thread per requested worker, keeps every thread doing floating point work
//! until a shared deadline and joins them all before reporting a
//! [`LoadResult`].
//!
//! [`workloads`] holds fixed-size CPU kernels whose cost is bounded by a
//! clamped input instead of a deadline.

pub mod cpu_stress;
pub mod error;
pub mod limits;
pub mod worker;
pub mod workloads;

pub use cpu_stress::{LoadGenerator, LoadHandle, LoadMonitor, LoadResult};
pub use error::LoadError;
pub use limits::{LoadLimits, LoadRequest};
pub use worker::{StopSignal, WorkerGauge};
