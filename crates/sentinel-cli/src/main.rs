//! Sentinel CLI
//!
//! Runs structured audit stages against the Gemini API.
//!
//! # Usage
//!
//! ```bash
//! # Infrastructure FinOps & security audit of test_plan.txt
//! sentinel infra-audit
//!
//! # Memory-safety review of kernel_patch.diff
//! sentinel patch-analysis
//!
//! # Hardened deployment for security_request.txt
//! sentinel k8s-harden
//!
//! # All three, in order, followed by the output manifest
//! sentinel run-all
//! ```
//!
//! Inputs are read from and reports written to the current directory.
//! The credential comes from `GEMINI_API_KEY`.
//!
//! # Exit Codes
//!
//! - 0: Always, once arguments parse. Stage failures are reported as text.
//! - 2: Invalid arguments

use anyhow::Context;
use clap::{Parser, Subcommand};
use sentinel_core::{catalog, StageSpec};
use sentinel_runtime::{ResilientClient, RunManifest, StageOrchestrator, StageResult, StageStatus};

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Resilient structured audits for infrastructure, kernel patches and Kubernetes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Audit a Terraform plan diff (test_plan.txt)
    InfraAudit,

    /// Analyze a kernel patch for memory-safety defects (kernel_patch.diff)
    PatchAnalysis,

    /// Generate a hardened Kubernetes deployment (security_request.txt)
    K8sHarden,

    /// Run every stage in order and print the output manifest
    RunAll,
}

impl Command {
    /// Identifier of the single stage this command runs.
    fn stage_id(self) -> Option<&'static str> {
        match self {
            Command::InfraAudit => Some(catalog::INFRA_AUDIT),
            Command::PatchAnalysis => Some(catalog::PATCH_ANALYSIS),
            Command::K8sHarden => Some(catalog::K8S_HARDEN),
            Command::RunAll => None,
        }
    }

    fn stages(self) -> Vec<StageSpec> {
        match self.stage_id() {
            Some(id) => catalog::stage_by_id(id).into_iter().collect(),
            None => catalog::default_stages(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only report text
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let work_dir = std::env::current_dir().context("cannot determine working directory")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let orchestrator = StageOrchestrator::new(ResilientClient::from_env(), work_dir);
    let stages = cli.command.stages();
    tracing::debug!(command = ?cli.command, stages = stages.len(), "starting run");

    let results = runtime.block_on(async {
        let mut results = Vec::with_capacity(stages.len());
        for stage in &stages {
            println!("{}", banner(&stage.title));
            let mut outcome = orchestrator.run(std::slice::from_ref(stage)).await;
            for result in &outcome {
                println!("{}\n", render_stage(result));
            }
            results.append(&mut outcome);
        }
        results
    });

    if cli.command == Command::RunAll {
        println!("{}", RunManifest::from_results(&results).render());
    }

    Ok(())
}

fn banner(title: &str) -> String {
    let rule = "=".repeat(title.len() + 8);
    format!("{}\n    {}\n{}", rule, title, rule)
}

fn render_stage(result: &StageResult) -> String {
    let mut lines = Vec::new();

    match &result.status {
        StageStatus::SkippedConfigError(e) => lines.push(format!("CONFIGURATION ERROR: {}", e)),
        StageStatus::SkippedInputError(e) => lines.push(format!("INPUT ERROR: {}", e)),
        StageStatus::WriteFailed(e) => lines.push(format!("WRITE ERROR: {}", e)),
        StageStatus::Written | StageStatus::SentinelEmpty => {}
    }
    if let Some(rendered) = &result.rendered {
        lines.push(rendered.clone());
    }

    for diagnostic in &result.diagnostics {
        lines.push(format!("note: {}", diagnostic));
    }
    for file in &result.output {
        lines.push(format!("wrote {}", file.display()));
    }
    lines.push(format!("status: {}", result.status.label()));

    lines.join("\n")
}
