//! # sentinel-core
//!
//! Deterministic building blocks for Sentinel audit stages.
//!
//! This crate answers, without any I/O:
//! - What exactly is sent to the model for a stage?
//! - What shape must the answer have?
//! - How is an answer (or its absence) written down?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: the same input always produces the same request and report
//! 2. **No network calls**: the runtime crate owns transport and retries
//! 3. **Statically typed schemas**: [`SchemaSpec`] is a closed enum
//!
//! ## Example
//!
//! ```rust
//! use sentinel_core::{catalog, PayloadBuilder};
//!
//! let stage = catalog::k8s_harden();
//! let request = PayloadBuilder::new()
//!     .build("All containers must run as non-root", &stage.instructions, &stage.schema)
//!     .unwrap();
//!
//! assert!(request.user_query().contains("SECURITY REQUIREMENT: All containers"));
//! ```

pub mod catalog;
pub mod report;
pub mod request;
pub mod result;
pub mod schema;
pub mod stage;

pub use request::{AuditRequest, BuildError, Instructions, PayloadBuilder};
pub use result::StructuredResult;
pub use schema::{SchemaError, SchemaSpec};
pub use stage::{ArtifactSource, ArtifactSpec, ForecastLine, ItemList, ReportLayout, StageSpec};
