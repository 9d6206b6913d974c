//! # sentinel-runtime
//!
//! Network and filesystem side of Sentinel.
//!
//! This crate turns the deterministic stage definitions of `sentinel-core`
//! into files on disk:
//!
//! - [`ResilientClient`] calls the Gemini `generateContent` API with bounded
//!   exponential retry and degrades to an empty result instead of failing
//! - [`ReportWriter`] persists canonical JSON reports and derived artifacts
//! - [`StageOrchestrator`] runs stages in order with per-stage isolation and
//!   summarizes the run in a [`RunManifest`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use sentinel_core::catalog;
//! use sentinel_runtime::{ResilientClient, RunManifest, StageOrchestrator};
//!
//! # async fn run() {
//! let orchestrator = StageOrchestrator::new(ResilientClient::from_env(), ".");
//! let results = orchestrator.run(&catalog::default_stages()).await;
//! println!("{}", RunManifest::from_results(&results).render());
//! # }
//! ```

pub mod client;
pub mod config;
pub mod orchestrator;
pub mod resilience;
pub mod transport;
pub mod writer;

pub use client::{CallReport, ResilientClient};
pub use config::{ClientConfig, ConfigError};
pub use orchestrator::{
    InputError, ManifestEntry, RunManifest, StageOrchestrator, StageResult, StageStatus,
};
pub use resilience::{Fault, FaultKind, Pause, RecordingPause, RetryPolicy, TokioPause};
pub use transport::{ApiCredential, CredentialSource, GeminiTransport, Transport, TransportError};
pub use writer::{ReportWriter, WriteError, WrittenReport};
