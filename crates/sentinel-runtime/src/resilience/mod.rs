//! Resilience patterns for sentinel-runtime.
//!
//! This module provides:
//! - The fault taxonomy shared by every attempt
//! - Bounded exponential retry policy
//! - The pause seam used for backoff waits

mod pause;
mod policy;

pub use pause::{Pause, RecordingPause, TokioPause};
pub use policy::{Fault, FaultKind, RetryPolicy};
