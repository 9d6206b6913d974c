//! Resilient structured-extraction client.
//!
//! One `call` is a bounded loop of network attempts:
//!
//! ```text
//! INIT -> CALLING -> SUCCESS
//!            |  ^
//!            v  |
//!           RETRY -> FAILURE (sentinel)
//! ```
//!
//! Transport, content and parse faults all draw on the same retry budget.
//! Exhaustion never raises; the caller gets [`StructuredResult::Empty`].

use std::sync::Arc;
use std::time::Duration;

use sentinel_core::{AuditRequest, StructuredResult};
use serde_json::Value;

use crate::config::{ClientConfig, ConfigError, API_KEY_ENV};
use crate::resilience::{Fault, Pause, RetryPolicy, TokioPause};
use crate::transport::{
    gemini::extract_text, ApiCredential, GeminiTransport, GenerateContentRequest, RawEnvelope,
    Transport, TransportError,
};

/// Maximum characters of an error body kept in a fault message.
const BODY_EXCERPT: usize = 200;

/// Outcome of one call with its attempt history.
#[derive(Debug, Clone)]
pub struct CallReport {
    /// Parsed result or the sentinel
    pub result: StructuredResult,

    /// Network attempts made
    pub attempts: u32,

    /// Fault of each failed attempt, in order
    pub faults: Vec<Fault>,

    /// Waits inserted between attempts, in order
    pub waits: Vec<Duration>,
}

impl CallReport {
    /// One line per failed attempt, for stage diagnostics.
    pub fn diagnostics(&self) -> Vec<String> {
        self.faults
            .iter()
            .enumerate()
            .map(|(i, fault)| format!("attempt {} failed ({}): {}", i + 1, fault.kind(), fault))
            .collect()
    }

    /// Sum of all waits.
    pub fn total_wait(&self) -> Duration {
        self.waits.iter().sum()
    }
}

/// Client that retries faulted attempts with exponential backoff.
#[derive(Clone)]
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    pause: Arc<dyn Pause>,
}

impl std::fmt::Debug for ResilientClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientClient")
            .field("transport", &self.transport.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl ResilientClient {
    /// Create a client over any transport, waiting on the tokio timer.
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            pause: Arc::new(TokioPause),
        }
    }

    /// Create a Gemini-backed client from configuration.
    pub fn from_config(
        config: &ClientConfig,
        credential: ApiCredential,
    ) -> Result<Self, TransportError> {
        let transport = GeminiTransport::new(credential, config)?;
        Ok(Self::new(Arc::new(transport), config.retry_policy()))
    }

    /// Load configuration and credential from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration and credential through an arbitrary lookup.
    ///
    /// The credential is checked before any other setting.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credential = ApiCredential::from_lookup(API_KEY_ENV, "Gemini API key", &lookup)?;
        let config = ClientConfig::from_lookup(&lookup)?;
        Self::from_config(&config, credential).map_err(|e| ConfigError::ClientSetup(e.to_string()))
    }

    /// Replace the pause source.
    pub fn with_pause(mut self, pause: Arc<dyn Pause>) -> Self {
        self.pause = pause;
        self
    }

    /// The retry policy in effect.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call the service and return the structured result or the sentinel.
    pub async fn call(&self, request: &AuditRequest) -> StructuredResult {
        self.call_with_report(request).await.result
    }

    /// Like [`call`](Self::call), also returning the attempt history.
    pub async fn call_with_report(&self, request: &AuditRequest) -> CallReport {
        let wire = GenerateContentRequest::from(request);
        let mut faults = Vec::new();
        let mut waits = Vec::new();
        let mut attempt: u32 = 0;

        loop {
            match self.attempt(&wire).await {
                Ok(value) => {
                    tracing::info!(
                        transport = self.transport.name(),
                        attempts = attempt + 1,
                        "structured result received"
                    );
                    return CallReport {
                        result: StructuredResult::Populated(value),
                        attempts: attempt + 1,
                        faults,
                        waits,
                    };
                }
                Err(fault) => {
                    let kind = fault.kind();
                    if attempt >= self.policy.max_retries() || !self.policy.is_retryable(kind) {
                        tracing::error!(
                            attempts = attempt + 1,
                            fault = %kind,
                            error = %fault,
                            "retry budget exhausted, returning empty result"
                        );
                        faults.push(fault);
                        return CallReport {
                            result: StructuredResult::Empty,
                            attempts: attempt + 1,
                            faults,
                            waits,
                        };
                    }

                    let wait = self.policy.delay_after(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        fault = %kind,
                        error = %fault,
                        wait_ms = wait.as_millis() as u64,
                        "attempt failed, backing off"
                    );
                    faults.push(fault);
                    self.pause.pause(wait).await;
                    waits.push(wait);
                    attempt += 1;
                }
            }
        }
    }

    /// One network attempt, classified.
    async fn attempt(&self, wire: &GenerateContentRequest) -> Result<Value, Fault> {
        let envelope = self
            .transport
            .send(wire)
            .await
            .map_err(|e| Fault::Transport(e.to_string()))?;
        interpret(envelope)
    }
}

/// Map a raw envelope to a JSON value or a fault.
fn interpret(envelope: RawEnvelope) -> Result<Value, Fault> {
    if !envelope.is_success() {
        return Err(Fault::Status {
            status: envelope.status,
            message: envelope
                .body
                .as_deref()
                .map(excerpt)
                .unwrap_or_else(|| "empty body".to_string()),
        });
    }

    let body = envelope
        .body
        .ok_or_else(|| Fault::Content("empty response body".to_string()))?;
    let text = extract_text(&body).map_err(Fault::Content)?;

    serde_json::from_str(&text).map_err(|e| Fault::Parse(e.to_string()))
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{FaultKind, RecordingPause};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use sentinel_core::{Instructions, PayloadBuilder, SchemaSpec};
    use serde_json::json;
    use std::collections::VecDeque;

    /// Replays a fixed script of outcomes, then repeats the last one.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<RawEnvelope, TransportError>>>,
        last: Result<RawEnvelope, TransportError>,
        calls: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<RawEnvelope, TransportError>>) -> Self {
            let last = script
                .last()
                .cloned()
                .unwrap_or_else(|| Err(TransportError::Http("empty script".into())));
            Self {
                script: Mutex::new(script.into()),
                last,
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            _request: &GenerateContentRequest,
        ) -> Result<RawEnvelope, TransportError> {
            *self.calls.lock() += 1;
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| self.last.clone())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn envelope(text: &str) -> RawEnvelope {
        let body = json!({"candidates": [{"content": {"parts": [{"text": text}]}}]});
        RawEnvelope::new(200, body.to_string())
    }

    fn request() -> AuditRequest {
        let schema = SchemaSpec::object()
            .field("summary", SchemaSpec::string("s"))
            .field("findings", SchemaSpec::array(SchemaSpec::string("f")));
        PayloadBuilder::new()
            .build("plan text", &Instructions::new("sys", "{input}"), &schema)
            .unwrap()
    }

    fn client(
        transport: Arc<ScriptedTransport>,
        max_retries: u32,
    ) -> (ResilientClient, Arc<RecordingPause>) {
        let pause = Arc::new(RecordingPause::new());
        let client = ResilientClient::new(
            transport,
            RetryPolicy::new(max_retries, Duration::from_secs(1)),
        )
        .with_pause(pause.clone());
        (client, pause)
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(envelope(
            r#"{"summary":"clean","findings":[]}"#,
        ))]));
        let (client, pause) = client(transport.clone(), 5);

        let report = client.call_with_report(&request()).await;

        assert_eq!(
            report.result,
            StructuredResult::Populated(json!({"summary": "clean", "findings": []}))
        );
        assert_eq!(report.attempts, 1);
        assert!(report.faults.is_empty());
        assert!(pause.waits().is_empty());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_attempts_fail_returns_sentinel() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(RawEnvelope::new(
            500,
            "internal",
        ))]));
        let (client, pause) = client(transport.clone(), 5);

        let report = client.call_with_report(&request()).await;

        assert!(report.result.is_empty());
        assert_eq!(report.attempts, 6);
        assert_eq!(transport.calls(), 6);
        assert_eq!(report.faults.len(), 6);
        let secs: Vec<u64> = pause.waits().iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16]);
        assert_eq!(report.waits, pause.waits());
    }

    #[tokio::test]
    async fn test_two_unavailable_then_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(RawEnvelope::new(503, "unavailable")),
            Ok(RawEnvelope::new(503, "unavailable")),
            Ok(envelope(r#"{"summary":"ok","findings":["a"]}"#)),
        ]));
        let (client, pause) = client(transport.clone(), 5);

        let report = client.call_with_report(&request()).await;

        assert_eq!(report.result.str_field("summary"), Some("ok"));
        assert_eq!(report.attempts, 3);
        assert_eq!(pause.elapsed(), Duration::from_secs(3));
        assert_eq!(report.total_wait(), Duration::from_secs(3));
        assert!(matches!(
            report.faults[0],
            Fault::Status { status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn test_content_and_parse_faults_are_retried() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(RawEnvelope::new(200, r#"{"candidates": []}"#)),
            Ok(envelope("not json at all")),
            Err(TransportError::Timeout(Duration::from_secs(30))),
            Ok(envelope(r#"{"summary":"late"}"#)),
        ]));
        let (client, _pause) = client(transport, 5);

        let report = client.call_with_report(&request()).await;

        let kinds: Vec<FaultKind> = report.faults.iter().map(Fault::kind).collect();
        assert_eq!(
            kinds,
            vec![FaultKind::Content, FaultKind::Parse, FaultKind::Transport]
        );
        assert_eq!(report.result.str_field("summary"), Some("late"));
        assert_eq!(report.diagnostics().len(), 3);
        assert!(report.diagnostics()[1].starts_with("attempt 2 failed (parse)"));
    }

    #[tokio::test]
    async fn test_zero_retries_single_attempt() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(RawEnvelope::status_only(
            200,
        ))]));
        let (client, pause) = client(transport.clone(), 0);

        let result = client.call(&request()).await;

        assert_eq!(result, StructuredResult::Empty);
        assert_eq!(transport.calls(), 1);
        assert!(pause.waits().is_empty());
    }

    #[tokio::test]
    async fn test_result_is_not_schema_validated() {
        // Valid JSON that ignores the schema is still accepted.
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(envelope("[1, 2, 3]"))]));
        let (client, _pause) = client(transport, 5);

        let result = client.call(&request()).await;
        assert_eq!(result, StructuredResult::Populated(json!([1, 2, 3])));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn attempts_never_exceed_budget(max_retries in 0u32..10) {
            let transport = Arc::new(ScriptedTransport::new(vec![Ok(RawEnvelope::new(
                503,
                "unavailable",
            ))]));
            let (client, pause) = client(transport.clone(), max_retries);
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

            let report = runtime.block_on(client.call_with_report(&request()));

            prop_assert!(report.result.is_empty());
            prop_assert_eq!(transport.calls(), max_retries + 1);
            prop_assert_eq!(report.attempts, max_retries + 1);
            prop_assert_eq!(pause.waits(), client.policy().schedule());
        }
    }

    #[test]
    fn test_status_fault_excerpt_is_bounded() {
        let fault = interpret(RawEnvelope::new(502, "x".repeat(1000))).unwrap_err();
        match fault {
            Fault::Status { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), BODY_EXCERPT + 3);
            }
            other => panic!("unexpected fault {:?}", other),
        }
    }

    #[test]
    fn test_from_lookup_requires_credential() {
        let err = ResilientClient::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { ref var, .. } if var == API_KEY_ENV));
    }

    #[test]
    fn test_from_lookup_applies_settings() {
        let client = ResilientClient::from_lookup(|var| match var {
            "GEMINI_API_KEY" => Some("key".to_string()),
            "SENTINEL_MAX_RETRIES" => Some("2".to_string()),
            "SENTINEL_BACKOFF_UNIT" => Some("10ms".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(client.policy().max_retries(), 2);
        assert_eq!(client.policy().unit(), Duration::from_millis(10));
    }

    #[test]
    fn test_unusable_credential_is_config_error() {
        let err = ResilientClient::from_lookup(|var| match var {
            "GEMINI_API_KEY" => Some("ab\u{1}cd".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::ClientSetup(_)));
    }

    #[test]
    fn test_debug_names_transport() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let (client, _pause) = client(transport, 2);
        let debug = format!("{:?}", client);
        assert!(debug.contains("scripted"));
    }
}
