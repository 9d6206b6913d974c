//! Sequential stage orchestrator.
//!
//! Runs each stage in declaration order:
//! - Config check (no client means no stage can call out)
//! - Input read and request build
//! - Resilient call, degrading to the sentinel
//! - Report write
//!
//! Every stage yields a [`StageResult`]. No failure crosses a stage
//! boundary, and the run ends with a [`RunManifest`] of every expected file.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sentinel_core::{BuildError, PayloadBuilder, StageSpec};
use thiserror::Error;
use tracing::Instrument;

use crate::client::ResilientClient;
use crate::config::ConfigError;
use crate::writer::ReportWriter;

/// Problems with a stage's input. Never retried.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Cannot read input file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input file {path} is empty")]
    Empty { path: PathBuf },

    #[error("Stage definition is invalid: {0}")]
    InvalidStage(BuildError),
}

/// Final status of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    /// Populated result written
    Written,

    /// Retries exhausted; default structure written
    SentinelEmpty,

    /// Input missing, unreadable or empty
    SkippedInputError(String),

    /// Client could not be configured
    SkippedConfigError(String),

    /// Report or one of its artifacts could not be written
    WriteFailed(String),
}

impl StageStatus {
    /// Short label used in the manifest.
    pub fn label(&self) -> &'static str {
        match self {
            StageStatus::Written => "written",
            StageStatus::SentinelEmpty => "sentinel-empty",
            StageStatus::SkippedInputError(_) => "skipped-input-error",
            StageStatus::SkippedConfigError(_) => "skipped-config-error",
            StageStatus::WriteFailed(_) => "write-failed",
        }
    }

    /// The error message, for statuses that carry one.
    pub fn error(&self) -> Option<&str> {
        match self {
            StageStatus::SkippedInputError(e)
            | StageStatus::SkippedConfigError(e)
            | StageStatus::WriteFailed(e) => Some(e),
            StageStatus::Written | StageStatus::SentinelEmpty => None,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error() {
            Some(error) => write!(f, "{} ({})", self.label(), error),
            None => write!(f, "{}", self.label()),
        }
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Stage identifier
    pub stage_id: String,

    /// Stage title
    pub title: String,

    /// Final status
    pub status: StageStatus,

    /// Files actually written
    pub output: Vec<PathBuf>,

    /// Every file the stage is expected to produce
    pub expected_files: Vec<PathBuf>,

    /// Human-readable rendering, present once a result was written
    pub rendered: Option<String>,

    /// Retry faults, artifact problems and notices
    pub diagnostics: Vec<String>,

    /// Network attempts made
    pub attempts: u32,
}

impl StageResult {
    fn skipped(stage: &StageSpec, status: StageStatus) -> Self {
        Self {
            stage_id: stage.id.clone(),
            title: stage.title.clone(),
            status,
            output: Vec::new(),
            expected_files: stage.expected_files(),
            rendered: None,
            diagnostics: Vec::new(),
            attempts: 0,
        }
    }
}

/// Runs stages in order with per-stage isolation.
#[derive(Debug)]
pub struct StageOrchestrator {
    client: Result<ResilientClient, ConfigError>,
    builder: PayloadBuilder,
    writer: ReportWriter,
    work_dir: PathBuf,
}

impl StageOrchestrator {
    /// Create an orchestrator reading inputs from and writing reports to
    /// `work_dir`.
    ///
    /// A configuration error is accepted here and reported per stage.
    pub fn new(client: Result<ResilientClient, ConfigError>, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            client,
            builder: PayloadBuilder::new(),
            writer: ReportWriter::new(work_dir.clone()),
            work_dir,
        }
    }

    /// Run every stage in order.
    pub async fn run(&self, stages: &[StageSpec]) -> Vec<StageResult> {
        let mut results = Vec::with_capacity(stages.len());
        for stage in stages {
            let span = tracing::info_span!("stage", stage = %stage.id);
            results.push(self.run_stage(stage).instrument(span).await);
        }
        results
    }

    /// Run one stage. Never fails; problems become the stage's status.
    pub async fn run_stage(&self, stage: &StageSpec) -> StageResult {
        let client = match &self.client {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "configuration error, stage skipped");
                return StageResult::skipped(stage, StageStatus::SkippedConfigError(e.to_string()));
            }
        };

        let request = match self.read_input(stage).and_then(|text| {
            self.builder
                .build(&text, &stage.instructions, &stage.schema)
                .map_err(|e| match e {
                    BuildError::EmptyInput => InputError::Empty {
                        path: self.input_path(stage),
                    },
                    other => InputError::InvalidStage(other),
                })
        }) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(error = %e, "input error, stage skipped");
                return StageResult::skipped(stage, StageStatus::SkippedInputError(e.to_string()));
            }
        };

        let report = client.call_with_report(&request).await;
        tracing::debug!(
            attempts = report.attempts,
            waited_ms = report.total_wait().as_millis() as u64,
            "call finished"
        );
        let mut result = StageResult::skipped(stage, StageStatus::SentinelEmpty);
        result.attempts = report.attempts;
        result.diagnostics = report.diagnostics();

        match self.writer.write(&report.result, stage) {
            Ok(written) => {
                result.status = if !written.failed.is_empty() {
                    let files: Vec<String> =
                        written.failed.iter().map(|f| f.display().to_string()).collect();
                    StageStatus::WriteFailed(format!("could not write {}", files.join(", ")))
                } else if report.result.is_empty() {
                    StageStatus::SentinelEmpty
                } else {
                    StageStatus::Written
                };
                result.output = written.files;
                result.rendered = Some(written.rendered);
                result.diagnostics.extend(written.diagnostics);
                result.diagnostics.extend(written.notice);
            }
            Err(e) => {
                tracing::error!(error = %e, "report write failed");
                result.status = StageStatus::WriteFailed(e.to_string());
            }
        }

        result
    }

    fn input_path(&self, stage: &StageSpec) -> PathBuf {
        self.work_dir.join(&stage.input_file)
    }

    fn read_input(&self, stage: &StageSpec) -> Result<String, InputError> {
        let path = self.input_path(stage);
        std::fs::read_to_string(&path).map_err(|source| InputError::Unreadable { path, source })
    }
}

/// One expected output file and how it fared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub stage: String,
    pub file: PathBuf,
    pub status: String,
}

/// Every expected output file of a run with its generation status.
#[derive(Debug, Clone)]
pub struct RunManifest {
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<ManifestEntry>,
}

impl RunManifest {
    /// Build the manifest from stage results, in stage order.
    ///
    /// Each file gets its own status: a file on disk is `written` (or
    /// `sentinel-empty` for a default report), a missing file carries the
    /// stage's failure, and an artifact skipped for a sentinel result is
    /// `not-written`.
    pub fn from_results(results: &[StageResult]) -> Self {
        let entries = results
            .iter()
            .flat_map(|result| {
                result.expected_files.iter().map(move |file| {
                    let produced = result.output.iter().any(|out| out.ends_with(file));
                    let status = match (&result.status, produced) {
                        (StageStatus::SentinelEmpty, true) => "sentinel-empty",
                        (_, true) => "written",
                        (StageStatus::Written | StageStatus::SentinelEmpty, false) => {
                            "not-written"
                        }
                        (status, false) => status.label(),
                    };
                    ManifestEntry {
                        stage: result.stage_id.clone(),
                        file: file.clone(),
                        status: status.to_string(),
                    }
                })
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            entries,
        }
    }

    /// Number of entries carrying the given status label.
    pub fn entries_with_status(&self, status: &str) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Plain-text rendering for the console.
    pub fn render(&self) -> String {
        let mut lines = vec![format!(
            "Output manifest ({})",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )];
        let width = self
            .entries
            .iter()
            .map(|e| e.file.display().to_string().len())
            .max()
            .unwrap_or(0);
        for entry in &self.entries {
            lines.push(format!(
                "  {:<width$}  {:<15}  {}",
                entry.file.display().to_string(),
                entry.stage,
                entry.status,
                width = width
            ));
        }
        lines.push(format!(
            "{} of {} files written",
            self.entries_with_status("written"),
            self.entries.len()
        ));
        lines.join("\n")
    }
}
