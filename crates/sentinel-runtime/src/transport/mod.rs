//! Transport abstraction for the generative API.
//!
//! A [`Transport`] performs exactly one HTTP exchange and hands back the raw
//! envelope. It never retries and never interprets the body; status and
//! envelope handling belong to [`ResilientClient`](crate::ResilientClient).
//!
//! ## Security
//!
//! Credentials go through the [`secrets`] module. See [`ApiCredential`].

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod gemini;
pub mod secrets;

pub use gemini::{GeminiTransport, GenerateContentRequest};
pub use secrets::{ApiCredential, CredentialSource};

/// Failures below the HTTP status line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Transport not configured: {0}")]
    NotConfigured(String),
}

/// Unparsed response of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnvelope {
    /// HTTP status code
    pub status: u16,

    /// Response body, `None` when empty
    pub body: Option<String>,
}

impl RawEnvelope {
    /// Envelope with a body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            status,
            body: if body.is_empty() { None } else { Some(body) },
        }
    }

    /// Envelope without a body.
    pub fn status_only(status: u16) -> Self {
        Self { status, body: None }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One network exchange with the generative API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the raw envelope.
    async fn send(&self, request: &GenerateContentRequest) -> Result<RawEnvelope, TransportError>;

    /// Transport name for diagnostics.
    fn name(&self) -> &str;
}
