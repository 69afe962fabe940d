use super::Plan;

const RULE_WIDTH: usize = 40;

/// Render a plan for a human reviewer.
///
/// The line layout is stable and consumed by display surfaces as-is. Expiry
/// is rendered in UTC so output does not depend on the host timezone.
pub fn format_plan(plan: &Plan) -> String {
    let short = plan.id.short();
    let analysis = &plan.analysis;

    let mut lines = vec![
        format!("Plan #{short}"),
        "─".repeat(RULE_WIDTH),
        format!("Request: {}", plan.original_request),
        format!("Command: {}", plan.command),
        format!("Impact: {}", analysis.estimated_impact.label()),
        format!("Operation: {}", analysis.operation),
    ];

    if !analysis.resources.is_empty() {
        lines.push("Resources:".into());
        for r in &analysis.resources {
            match &r.namespace {
                Some(ns) => lines.push(format!("  - {}/{} (ns: {ns})", r.resource_type, r.name)),
                None => lines.push(format!("  - {}/{}", r.resource_type, r.name)),
            }
        }
    }

    if !analysis.warnings.is_empty() {
        lines.push("Warnings:".into());
        for w in &analysis.warnings {
            lines.push(format!("  ⚠ {w}"));
        }
    }

    if let Some(output) = &analysis.dry_run_output {
        lines.push("Dry-run output:".into());
        lines.push(output.clone());
    }

    lines.push(String::new());
    lines.push(format!("Reply: /approve {short} or /reject {short} [reason]"));
    lines.push(format!("Expires: {}", plan.expires_at.format("%H:%M:%S UTC")));

    lines.join("\n")
}
