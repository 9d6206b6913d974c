//! Built-in audit stages.
//!
//! Three stages ship with Sentinel, run in this order:
//! 1. Infrastructure FinOps & security audit of a Terraform plan
//! 2. Memory-safety analysis of a Linux kernel patch
//! 3. Kubernetes hardening policy generation from a security requirement
//!
//! Each stage owns its system instruction and schema. New audit types are
//! added here without touching the client.

use std::path::PathBuf;

use crate::request::Instructions;
use crate::schema::SchemaSpec;
use crate::stage::{ArtifactSource, ArtifactSpec, ForecastLine, ItemList, ReportLayout, StageSpec};

/// Identifier of the infrastructure audit stage.
pub const INFRA_AUDIT: &str = "infra-audit";

/// Identifier of the kernel patch analysis stage.
pub const PATCH_ANALYSIS: &str = "patch-analysis";

/// Identifier of the Kubernetes hardening stage.
pub const K8S_HARDEN: &str = "k8s-harden";

const SEVERITY_DESCRIPTION: &str = "One of LOW, MEDIUM, HIGH, CRITICAL.";

/// System instruction for the infrastructure audit.
pub const INFRA_SYSTEM_PROMPT: &str = r#"
You are a FinOps and cloud security reviewer auditing a Terraform plan.

Review every resource change in the plan for:
- Cost impact: new or resized compute, storage, managed services, data transfer
- Security exposure: open ingress, public buckets, missing encryption, broad IAM

Only report what the plan shows. Do not invent resources.
Report findings in the order the resources appear in the plan.
Return the findings in the exact JSON format specified in the schema.
"#;

/// User template for the infrastructure audit.
pub const INFRA_USER_TEMPLATE: &str =
    "Analyze this Terraform plan for cost and security risks:\n\n{input}";

/// System instruction for the kernel patch analysis.
pub const PATCH_SYSTEM_PROMPT: &str = r#"
You are a Linux kernel reviewer specializing in memory safety.

Inspect the patch for:
- Use-after-free, double free, and leaked allocations on error paths
- Out-of-bounds reads or writes and unchecked user-supplied lengths
- Missing locking, reference counting mistakes, and races on shared state

Cite the file and function for every issue.
If the patch is clean, say so and return an empty vulnerability list.
Return the analysis in the exact JSON format specified in the schema.
"#;

/// User template for the kernel patch analysis.
pub const PATCH_USER_TEMPLATE: &str =
    "Analyze the following kernel patch for memory-safety defects:\n\n{input}";

/// System instruction for the Kubernetes hardening stage.
pub const K8S_SYSTEM_PROMPT: &str = r#"
You are a Kubernetes Security Architect specializing in hardening deployments.

The user provides a high-level security requirement. Produce two outputs:
1. A complete, hardened Kubernetes Deployment YAML that satisfies the requirement.
2. A single-sentence summary of the enforced rule, suitable for a policy engine
   such as OPA or kube-bench.

Return both in the exact JSON format specified in the schema.
"#;

/// User template for the Kubernetes hardening stage.
pub const K8S_USER_TEMPLATE: &str = "Based on the following security requirement, generate a \
hardened Kubernetes Deployment YAML for a basic Nginx container, and summarize the \
enforcement rule:\n\nSECURITY REQUIREMENT: {input}";

/// Text written to the enforced-policy file.
pub const K8S_POLICY_TEMPLATE: &str =
    "Policy Enforced: {policy_summary}\n\nGenerated for: Nginx-Deployment";

fn finding_schema() -> SchemaSpec {
    SchemaSpec::object()
        .field("resource", SchemaSpec::string("Terraform resource address."))
        .field("category", SchemaSpec::string("Either COST or SECURITY."))
        .field("severity", SchemaSpec::string(SEVERITY_DESCRIPTION))
        .field("issue", SchemaSpec::string("What is wrong with this change."))
        .field("recommendation", SchemaSpec::string("How to fix or mitigate it."))
}

/// Response schema of the infrastructure audit.
pub fn infra_audit_schema() -> SchemaSpec {
    SchemaSpec::object()
        .field("summary", SchemaSpec::string("One-paragraph overview of the plan's risk."))
        .field(
            "monthly_cost_forecast",
            SchemaSpec::string("Estimated monthly cost change, e.g. '+$412.50/month'."),
        )
        .field(
            "findings",
            SchemaSpec::array(finding_schema()).with_description("Flagged resources in plan order."),
        )
}

fn vulnerability_schema() -> SchemaSpec {
    SchemaSpec::object()
        .field("location", SchemaSpec::string("File and function, e.g. 'net/core/sock.c:sk_free'."))
        .field(
            "vulnerability_class",
            SchemaSpec::string("e.g. use-after-free, out-of-bounds write, race."),
        )
        .field("severity", SchemaSpec::string(SEVERITY_DESCRIPTION))
        .field("explanation", SchemaSpec::string("How the defect can be triggered."))
        .optional_field("suggested_fix", SchemaSpec::string("Minimal change that removes it."))
}

/// Response schema of the kernel patch analysis.
pub fn patch_analysis_schema() -> SchemaSpec {
    SchemaSpec::object()
        .field("summary", SchemaSpec::string("One-paragraph verdict on the patch."))
        .field(
            "regression_risk",
            SchemaSpec::string("Likelihood the patch regresses memory safety: LOW, MEDIUM or HIGH."),
        )
        .field(
            "vulnerabilities",
            SchemaSpec::array(vulnerability_schema()).with_description("Defects in patch order."),
        )
}

/// Response schema of the Kubernetes hardening stage.
pub fn k8s_policy_schema() -> SchemaSpec {
    SchemaSpec::object()
        .field(
            "policy_summary",
            SchemaSpec::string(
                "A concise, single-sentence summary of the security rule that was enforced.",
            ),
        )
        .field(
            "hardened_kubernetes_yaml",
            SchemaSpec::string(
                "The complete, hardened Kubernetes Deployment YAML, including securityContext \
                 fields that meet the requirement. MUST be a valid YAML string.",
            ),
        )
}

/// The infrastructure audit stage.
pub fn infra_audit() -> StageSpec {
    StageSpec {
        id: INFRA_AUDIT.to_string(),
        title: "Infrastructure FinOps & Security Audit".to_string(),
        input_file: PathBuf::from("test_plan.txt"),
        instructions: Instructions::new(INFRA_SYSTEM_PROMPT.trim(), INFRA_USER_TEMPLATE),
        schema: infra_audit_schema(),
        layout: ReportLayout {
            report_file: PathBuf::from("infrastructure_audit_report.json"),
            summary_field: "summary".to_string(),
            forecast: Some(ForecastLine {
                label: "Monthly Cost Forecast".to_string(),
                field: "monthly_cost_forecast".to_string(),
            }),
            items: Some(ItemList {
                field: "findings".to_string(),
                heading: "Flagged Resources".to_string(),
                item_template: "[{severity}] {resource} ({category}): {issue}".to_string(),
            }),
            artifacts: Vec::new(),
        },
    }
}

/// The kernel patch analysis stage.
pub fn patch_analysis() -> StageSpec {
    StageSpec {
        id: PATCH_ANALYSIS.to_string(),
        title: "Linux Kernel Memory Safety Analysis".to_string(),
        input_file: PathBuf::from("kernel_patch.diff"),
        instructions: Instructions::new(PATCH_SYSTEM_PROMPT.trim(), PATCH_USER_TEMPLATE),
        schema: patch_analysis_schema(),
        layout: ReportLayout {
            report_file: PathBuf::from("analysis_results.json"),
            summary_field: "summary".to_string(),
            forecast: Some(ForecastLine {
                label: "Regression Risk".to_string(),
                field: "regression_risk".to_string(),
            }),
            items: Some(ItemList {
                field: "vulnerabilities".to_string(),
                heading: "Flagged Defects".to_string(),
                item_template: "[{severity}] {location}: {vulnerability_class} - {explanation}"
                    .to_string(),
            }),
            artifacts: Vec::new(),
        },
    }
}

/// The Kubernetes hardening stage.
pub fn k8s_harden() -> StageSpec {
    StageSpec {
        id: K8S_HARDEN.to_string(),
        title: "Kubernetes Security Policy Generation".to_string(),
        input_file: PathBuf::from("security_request.txt"),
        instructions: Instructions::new(K8S_SYSTEM_PROMPT.trim(), K8S_USER_TEMPLATE),
        schema: k8s_policy_schema(),
        layout: ReportLayout {
            report_file: PathBuf::from("k8s_policy_report.json"),
            summary_field: "policy_summary".to_string(),
            forecast: None,
            items: None,
            artifacts: vec![
                ArtifactSpec {
                    file: PathBuf::from("hardened_deployment.yaml"),
                    source: ArtifactSource::Field("hardened_kubernetes_yaml".to_string()),
                },
                ArtifactSpec {
                    file: PathBuf::from("enforcement_policy_summary.txt"),
                    source: ArtifactSource::Template(K8S_POLICY_TEMPLATE.to_string()),
                },
            ],
        },
    }
}

/// All built-in stages in run order.
pub fn default_stages() -> Vec<StageSpec> {
    vec![infra_audit(), patch_analysis(), k8s_harden()]
}

/// Look up a built-in stage by identifier.
pub fn stage_by_id(id: &str) -> Option<StageSpec> {
    default_stages().into_iter().find(|s| s.id == id)
}
