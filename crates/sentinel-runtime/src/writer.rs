//! Report persistence.
//!
//! The canonical JSON report is always written, even for the empty sentinel,
//! so downstream tooling finds a stable file. Secondary artifacts are only
//! derived from populated results.

use std::fs;
use std::path::{Path, PathBuf};

use sentinel_core::report::{canonical_json, render_artifact, render_summary, report_document};
use sentinel_core::{StageSpec, StructuredResult};
use thiserror::Error;

/// Errors writing report files.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What a write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReport {
    /// Files written, report first
    pub files: Vec<PathBuf>,

    /// Human-readable rendering of the result
    pub rendered: String,

    /// Failure notice, present for the sentinel
    pub notice: Option<String>,

    /// Artifacts that could not be written
    pub failed: Vec<PathBuf>,

    /// Non-fatal problems, e.g. a missing artifact field
    pub diagnostics: Vec<String>,
}

/// Writes stage reports under one output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    out_dir: PathBuf,
}

impl ReportWriter {
    /// Create a writer rooted at `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Persist `result` according to the stage's layout.
    ///
    /// Only a failure to write the report itself is an error. An artifact
    /// that cannot be written is listed in [`WrittenReport::failed`] and the
    /// remaining artifacts are still attempted.
    pub fn write(
        &self,
        result: &StructuredResult,
        stage: &StageSpec,
    ) -> Result<WrittenReport, WriteError> {
        let layout = &stage.layout;
        fs::create_dir_all(&self.out_dir).map_err(|source| WriteError::Io {
            path: self.out_dir.clone(),
            source,
        })?;

        let document = report_document(result, &stage.schema);
        let report_path = self.out_dir.join(&layout.report_file);
        self.write_file(&report_path, &canonical_json(&document)?)?;

        let mut written = WrittenReport {
            files: vec![report_path.clone()],
            rendered: render_summary(result, layout),
            notice: None,
            failed: Vec::new(),
            diagnostics: Vec::new(),
        };

        match result.value() {
            None => {
                let notice = format!(
                    "{} failed: no data after retries; wrote default structure to {}",
                    stage.title,
                    report_path.display()
                );
                tracing::warn!(stage = %stage.id, path = %report_path.display(), "{}", notice);
                written.notice = Some(notice);
            }
            Some(value) => {
                for artifact in &layout.artifacts {
                    let path = self.out_dir.join(&artifact.file);
                    let (body, problem) = render_artifact(artifact, value);
                    if let Some(problem) = problem {
                        tracing::warn!(stage = %stage.id, path = %path.display(), "{}", problem);
                        written
                            .diagnostics
                            .push(format!("{}: {}", artifact.file.display(), problem));
                    }
                    match self.write_file(&path, &body) {
                        Ok(()) => written.files.push(path),
                        Err(e) => {
                            tracing::error!(stage = %stage.id, error = %e, "artifact write failed");
                            written.diagnostics.push(e.to_string());
                            written.failed.push(path);
                        }
                    }
                }
                tracing::info!(
                    stage = %stage.id,
                    files = written.files.len(),
                    failed = written.failed.len(),
                    "report written"
                );
            }
        }

        Ok(written)
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<(), WriteError> {
        fs::write(path, contents).map_err(|source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::catalog;
    use serde_json::{json, Value};

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_sentinel_writes_default_structure() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let stage = catalog::infra_audit();

        let written = writer.write(&StructuredResult::Empty, &stage).unwrap();

        assert_eq!(written.files, vec![dir.path().join("infrastructure_audit_report.json")]);
        assert_eq!(
            read_json(&written.files[0]),
            json!({"summary": "", "monthly_cost_forecast": "", "findings": []})
        );
        assert!(written.notice.as_deref().unwrap().contains("no data"));
        assert!(written.rendered.starts_with("Summary: N/A"));
    }

    #[test]
    fn test_sentinel_skips_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let written = writer.write(&StructuredResult::Empty, &catalog::k8s_harden()).unwrap();

        assert_eq!(written.files.len(), 1);
        assert!(!dir.path().join("hardened_deployment.yaml").exists());
        assert!(!dir.path().join("enforcement_policy_summary.txt").exists());
    }

    #[test]
    fn test_populated_report_is_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let result = StructuredResult::from(json!({
            "summary": "Two issues",
            "monthly_cost_forecast": "+$40/month",
            "findings": [
                {"resource": "aws_s3_bucket.logs", "category": "Security", "severity": "HIGH",
                 "issue": "public", "recommendation": "block"},
                {"resource": "aws_instance.web", "category": "FinOps", "severity": "LOW",
                 "issue": "oversized", "recommendation": "downsize"}
            ]
        }));

        let written = writer.write(&result, &catalog::infra_audit()).unwrap();
        let text = fs::read_to_string(&written.files[0]).unwrap();

        assert!(text.starts_with("{\n  \"findings\": [\n    {\n      \"category\""));
        assert!(text.ends_with("}\n"));
        assert!(written.notice.is_none());
        let lines: Vec<&str> = written.rendered.lines().collect();
        assert_eq!(lines[0], "Summary: Two issues");
        assert_eq!(lines[1], "Monthly Cost Forecast: +$40/month");
        assert_eq!(lines[2], "Flagged Resources:");
        assert!(lines[3].contains("aws_s3_bucket.logs"));
        assert!(lines[4].contains("aws_instance.web"));
    }

    #[test]
    fn test_k8s_artifacts_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let yaml = "apiVersion: apps/v1\nkind: Deployment\n";
        let result = StructuredResult::from(json!({
            "policy_summary": "runAsNonRoot enforced",
            "hardened_kubernetes_yaml": yaml
        }));

        let written = writer.write(&result, &catalog::k8s_harden()).unwrap();

        assert_eq!(written.files.len(), 3);
        assert_eq!(
            fs::read_to_string(dir.path().join("hardened_deployment.yaml")).unwrap(),
            yaml
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("enforcement_policy_summary.txt")).unwrap(),
            "Policy Enforced: runAsNonRoot enforced\n\nGenerated for: Nginx-Deployment"
        );
        assert!(written.diagnostics.is_empty());
    }

    #[test]
    fn test_missing_artifact_field_is_diagnosed() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let result = StructuredResult::from(json!({"policy_summary": "partial"}));

        let written = writer.write(&result, &catalog::k8s_harden()).unwrap();

        assert_eq!(written.diagnostics.len(), 1);
        assert!(written.diagnostics[0].contains("hardened_kubernetes_yaml"));
        assert_eq!(
            fs::read_to_string(dir.path().join("hardened_deployment.yaml")).unwrap(),
            ""
        );
    }

    #[test]
    fn test_failed_artifact_keeps_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("hardened_deployment.yaml");
        fs::create_dir(&blocked).unwrap();
        let writer = ReportWriter::new(dir.path());
        let result = StructuredResult::from(json!({
            "policy_summary": "non-root",
            "hardened_kubernetes_yaml": "kind: Deployment\n"
        }));

        let written = writer.write(&result, &catalog::k8s_harden()).unwrap();

        assert_eq!(written.failed, vec![blocked]);
        assert_eq!(
            written.files,
            vec![
                dir.path().join("k8s_policy_report.json"),
                dir.path().join("enforcement_policy_summary.txt"),
            ]
        );
        assert_eq!(written.rendered, "Summary: non-root");
        assert!(written.diagnostics[0].contains("hardened_deployment.yaml"));
    }

    #[test]
    fn test_unwritable_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();
        let writer = ReportWriter::new(&blocker);

        let err = writer
            .write(&StructuredResult::Empty, &catalog::patch_analysis())
            .unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
    }
}
