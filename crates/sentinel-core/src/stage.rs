//! Stage definitions.
//!
//! A stage is one independent audit task: where its input lives, how the
//! request is phrased, what shape the answer must have, and which files the
//! report is written to.

use std::path::PathBuf;

use crate::request::Instructions;
use crate::schema::SchemaSpec;

/// One audit stage.
#[derive(Debug, Clone)]
pub struct StageSpec {
    /// Short identifier, also used as the CLI subcommand name
    pub id: String,

    /// Human-readable title printed in the stage banner
    pub title: String,

    /// Plain-text input, read whole
    pub input_file: PathBuf,

    /// Prompt text for this stage
    pub instructions: Instructions,

    /// Required response shape
    pub schema: SchemaSpec,

    /// Where and how the result is written
    pub layout: ReportLayout,
}

impl StageSpec {
    /// Every file this stage is expected to produce, report first.
    pub fn expected_files(&self) -> Vec<PathBuf> {
        self.layout.expected_files()
    }
}

/// Output layout of a stage.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    /// Canonical JSON report
    pub report_file: PathBuf,

    /// Field rendered on the summary line
    pub summary_field: String,

    /// Optional labeled forecast line
    pub forecast: Option<ForecastLine>,

    /// Optional enumerated list of flagged items
    pub items: Option<ItemList>,

    /// Secondary files derived from the result
    pub artifacts: Vec<ArtifactSpec>,
}

impl ReportLayout {
    /// Report file followed by artifact files, in declaration order.
    pub fn expected_files(&self) -> Vec<PathBuf> {
        std::iter::once(self.report_file.clone())
            .chain(self.artifacts.iter().map(|a| a.file.clone()))
            .collect()
    }
}

/// A labeled single-value line, e.g. `Monthly Cost Forecast: +$120/month`.
#[derive(Debug, Clone)]
pub struct ForecastLine {
    pub label: String,
    pub field: String,
}

/// An array field rendered as a numbered list.
#[derive(Debug, Clone)]
pub struct ItemList {
    /// Array field holding the items
    pub field: String,

    /// Heading printed above the list
    pub heading: String,

    /// Template for object items, with `{field}` placeholders
    pub item_template: String,
}

/// A secondary file extracted from a populated result.
#[derive(Debug, Clone)]
pub struct ArtifactSpec {
    pub file: PathBuf,
    pub source: ArtifactSource,
}

/// How an artifact's contents are produced.
#[derive(Debug, Clone)]
pub enum ArtifactSource {
    /// A string field written verbatim
    Field(String),

    /// A template with `{field}` placeholders
    Template(String),
}
