//! Waiting between attempts.
//!
//! The client never sleeps directly; it asks a [`Pause`]. Production code
//! uses [`TokioPause`]. Tests use [`RecordingPause`], a fake clock that
//! returns immediately and remembers every requested wait.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// Source of backoff waits.
#[async_trait]
pub trait Pause: Send + Sync {
    /// Wait for `duration`.
    async fn pause(&self, duration: Duration);
}

/// Real waits on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fake clock: records waits, never sleeps.
#[derive(Debug, Default)]
pub struct RecordingPause {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().clone()
    }

    /// Total simulated time.
    pub fn elapsed(&self) -> Duration {
        self.waits.lock().iter().sum()
    }
}

#[async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration) {
        self.waits.lock().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_pause_accumulates() {
        let pause = RecordingPause::new();
        pause.pause(Duration::from_secs(1)).await;
        pause.pause(Duration::from_secs(2)).await;

        assert_eq!(pause.waits(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
        assert_eq!(pause.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pause_advances_clock() {
        let start = tokio::time::Instant::now();
        TokioPause.pause(Duration::from_secs(4)).await;
        assert!(start.elapsed() >= Duration::from_secs(4));
    }
}
