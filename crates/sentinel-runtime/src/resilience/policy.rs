//! Retry policy and fault taxonomy.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Category of a retryable fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Connection error, timeout, or non-2xx status
    Transport,
    /// 2xx response without the expected envelope
    Content,
    /// Envelope text is not valid JSON
    Parse,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Transport => write!(f, "transport"),
            FaultKind::Content => write!(f, "content"),
            FaultKind::Parse => write!(f, "parse"),
        }
    }
}

/// A failed attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    #[error("transport fault: {0}")]
    Transport(String),

    #[error("HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("content fault: {0}")]
    Content(String),

    #[error("parse fault: {0}")]
    Parse(String),
}

impl Fault {
    /// The retry category of this fault.
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::Transport(_) | Fault::Status { .. } => FaultKind::Transport,
            Fault::Content(_) => FaultKind::Content,
            Fault::Parse(_) => FaultKind::Parse,
        }
    }
}

/// Bounded exponential retry.
///
/// The wait before retry `i` (1-indexed) is `unit * 2^(i-1)`: 1, 2, 4, 8, 16
/// units for the default budget of five retries. No jitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_RETRIES, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(max_retries: u32, unit: Duration) -> Self {
        Self { max_retries, unit }
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Backoff time unit.
    pub fn unit(&self) -> Duration {
        self.unit
    }

    /// Upper bound on network attempts per call.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether a fault of this kind may be retried.
    ///
    /// Every kind currently shares one budget.
    pub fn is_retryable(&self, kind: FaultKind) -> bool {
        match kind {
            FaultKind::Transport | FaultKind::Content | FaultKind::Parse => true,
        }
    }

    /// Wait after the failed attempt with zero-based index `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.unit.saturating_mul(factor)
    }

    /// Every wait a fully failing call goes through, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_retries).map(|a| self.delay_after(a)).collect()
    }
}
