//! Approval policy: decides at submission time whether a plan is approved
//! or rejected automatically, or waits for a human.
//!
//! Branches are evaluated in a fixed order and the first one that applies
//! wins:
//!
//! 1. `read-only` mode rejects anything that did not match a read rule.
//! 2. `full-access` mode approves anything not dangerous and not on the
//!    always-require list.
//! 3. A context override for the plan's context either rejects (operation
//!    not allowed), holds for approval, or approves.
//! 4. `auto_approve_low_impact` approves `none`/`low` impact plans that are
//!    neither dangerous nor on the always-require list.
//! 5. Everything else waits for a decision.
//!
//! Dangerous plans are never approved by any branch.

use serde::Serialize;

use crate::classify::{self, ImpactLevel, OperationType};
use crate::config::{ContextOverride, ForwardChannel, SafetyConfig, SafetyMode};
use crate::error::{WorkflowError, WorkflowResult};
use crate::plan::{Plan, Verdict};

/// A decision the policy takes without a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoDecision {
    Approve,
    Reject,
}

impl AutoDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            AutoDecision::Approve => "approve",
            AutoDecision::Reject => "reject",
        }
    }
}

/// Result of evaluating a plan against the safety configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_decision: Option<AutoDecision>,
    pub requires_approval: bool,
    /// Human-readable explanation of the branch taken.
    pub reason: String,
}

impl PolicyOutcome {
    fn approve(reason: impl Into<String>) -> Self {
        Self {
            auto_decision: Some(AutoDecision::Approve),
            requires_approval: false,
            reason: reason.into(),
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            auto_decision: Some(AutoDecision::Reject),
            requires_approval: false,
            reason: reason.into(),
        }
    }

    fn pending(reason: impl Into<String>) -> Self {
        Self {
            auto_decision: None,
            requires_approval: true,
            reason: reason.into(),
        }
    }

    /// Label used in logs: approve, reject or pending.
    pub fn label(&self) -> &'static str {
        self.auto_decision.map_or("pending", AutoDecision::as_str)
    }
}

/// Evaluate a plan against the safety configuration.
///
/// `context` selects a `context_overrides` entry; `None` skips that branch.
pub fn evaluate_policy(plan: &Plan, safety: &SafetyConfig, context: Option<&str>) -> PolicyOutcome {
    let operation = plan.analysis.operation;
    let impact = plan.analysis.estimated_impact;
    let dangerous = plan.analysis.is_dangerous();
    let always = classify::requires_approval(&plan.command, &safety.always_require_approval);

    // Dangerous and mutating rules can still infer `read`; only a read-rule
    // match (impact none) is purely read.
    let purely_read = operation == OperationType::Read && impact == ImpactLevel::None && !dangerous;
    if safety.mode == SafetyMode::ReadOnly && !purely_read {
        return PolicyOutcome::reject(format!(
            "read-only mode allows only read operations, not {operation} with {impact} impact"
        ));
    }

    if safety.mode == SafetyMode::FullAccess && !always && !dangerous {
        return PolicyOutcome::approve("full-access mode");
    }

    if let Some((key, rule)) = context.and_then(|k| safety.context_overrides.get_key_value(k)) {
        if !operation_allowed(rule, operation) {
            return PolicyOutcome::reject(format!(
                "{operation} operations are not allowed in context '{key}'"
            ));
        }
        let over_max = rule.max_impact_level.is_some_and(|max| impact > max);
        if dangerous || always || over_max || rule.require_approval {
            let why = if over_max {
                format!(
                    "impact {impact} exceeds the {} limit for context '{key}'",
                    rule.max_impact_level.unwrap_or_default()
                )
            } else {
                hold_reason(dangerous, always)
                    .map(String::from)
                    .unwrap_or_else(|| format!("context '{key}' requires approval"))
            };
            return PolicyOutcome::pending(why);
        }
        return PolicyOutcome::approve(format!("allowed by context '{key}'"));
    }

    if safety.auto_approve_low_impact && impact <= ImpactLevel::Low && !dangerous && !always {
        return PolicyOutcome::approve(format!("{impact} impact auto-approved"));
    }

    PolicyOutcome::pending(hold_reason(dangerous, always).unwrap_or("approval required"))
}

fn hold_reason(dangerous: bool, always: bool) -> Option<&'static str> {
    if dangerous {
        Some("dangerous command always requires approval")
    } else if always {
        Some("command matches the always-require-approval list")
    } else {
        None
    }
}

fn operation_allowed(rule: &ContextOverride, operation: OperationType) -> bool {
    rule.allowed_operations
        .as_ref()
        .is_none_or(|ops| ops.contains(&operation))
}

/// Check that a human decision does not approve an operation the plan's
/// context override forbids.
pub fn check_decision(plan: &Plan, safety: &SafetyConfig, verdict: &Verdict) -> WorkflowResult<()> {
    if !verdict.is_approving() {
        return Ok(());
    }
    let Some(context) = plan.context.as_deref() else {
        return Ok(());
    };
    match safety.context_overrides.get(context) {
        Some(rule) if !operation_allowed(rule, plan.analysis.operation) => {
            Err(WorkflowError::PolicyViolation {
                plan_id: plan.id.to_string(),
                operation: plan.analysis.operation,
                context: context.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Where to forward an approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ForwardChannel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Users to mention. Only populated for critical plans.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentions: Vec<String>,
}

/// Forwarding hint for a plan, when forwarding is enabled.
pub fn forwarding_for(plan: &Plan, safety: &SafetyConfig) -> Option<ForwardTarget> {
    let forward = safety.forward_approvals.as_ref().filter(|f| f.enabled)?;
    let mentions = if plan.analysis.is_dangerous() {
        forward.mention_on_critical.clone()
    } else {
        Vec::new()
    };
    Some(ForwardTarget {
        channel: forward.channel,
        target: forward.target.clone(),
        mentions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForwardApprovals;
    use crate::plan::{CreatePlanOptions, create_plan};

    fn plan(cmd: &str) -> Plan {
        create_plan(CreatePlanOptions::new(cmd, "test"))
    }

    fn safety(mode: SafetyMode) -> SafetyConfig {
        SafetyConfig {
            mode,
            ..SafetyConfig::default()
        }
    }

    fn with_override(rule: ContextOverride) -> SafetyConfig {
        let mut s = SafetyConfig::default();
        s.context_overrides.insert("prod-eu".into(), rule);
        s
    }

    #[test]
    fn read_only_rejects_mutation() {
        let out = evaluate_policy(&plan("docker restart api"), &safety(SafetyMode::ReadOnly), None);
        assert_eq!(out.auto_decision, Some(AutoDecision::Reject));
        assert!(!out.requires_approval);
    }

    #[test]
    fn read_only_never_rejects_reads() {
        let out = evaluate_policy(&plan("kubectl get pods"), &safety(SafetyMode::ReadOnly), None);
        assert_ne!(out.auto_decision, Some(AutoDecision::Reject));
        assert!(out.requires_approval);
    }

    #[test]
    fn read_only_rejects_read_inferred_mutations() {
        // Dangerous rule, keyword fallback gives `read`
        let drain = plan("kubectl drain node-1");
        assert_eq!(drain.analysis.operation, OperationType::Read);
        assert!(drain.analysis.is_dangerous());
        let out = evaluate_policy(&drain, &safety(SafetyMode::ReadOnly), None);
        assert_eq!(out.auto_decision, Some(AutoDecision::Reject));

        // Mutating rule, keyword fallback gives `read`
        let cordon = plan("kubectl cordon node-1");
        assert_eq!(cordon.analysis.operation, OperationType::Read);
        let out = evaluate_policy(&cordon, &safety(SafetyMode::ReadOnly), None);
        assert_eq!(out.auto_decision, Some(AutoDecision::Reject));
    }

    #[test]
    fn plan_mode_holds_by_default() {
        let out = evaluate_policy(&plan("docker restart api"), &safety(SafetyMode::PlanMode), None);
        assert_eq!(out.auto_decision, None);
        assert!(out.requires_approval);
        assert_eq!(out.label(), "pending");
    }

    #[test]
    fn full_access_approves_safe_commands() {
        let out = evaluate_policy(&plan("docker restart api"), &safety(SafetyMode::FullAccess), None);
        assert_eq!(out.auto_decision, Some(AutoDecision::Approve));
    }

    #[test]
    fn full_access_respects_always_require() {
        let out = evaluate_policy(
            &plan("kubectl delete pod web"),
            &safety(SafetyMode::FullAccess),
            None,
        );
        assert!(out.requires_approval);
        assert!(out.reason.contains("always-require"));
    }

    #[test]
    fn dangerous_never_auto_approved() {
        let mut configs = vec![
            safety(SafetyMode::PlanMode),
            safety(SafetyMode::FullAccess),
            SafetyConfig {
                mode: SafetyMode::FullAccess,
                always_require_approval: vec![],
                auto_approve_low_impact: true,
                ..SafetyConfig::default()
            },
        ];
        let mut lenient = with_override(ContextOverride {
            require_approval: false,
            allowed_operations: None,
            max_impact_level: Some(ImpactLevel::Critical),
        });
        lenient.always_require_approval.clear();
        configs.push(lenient);

        let p = plan("docker system prune -af");
        assert!(p.analysis.is_dangerous());
        for s in &configs {
            for ctx in [None, Some("prod-eu")] {
                let out = evaluate_policy(&p, s, ctx);
                assert_ne!(out.auto_decision, Some(AutoDecision::Approve), "{s:?} {ctx:?}");
            }
        }
    }

    #[test]
    fn override_rejects_disallowed_operation() {
        let s = with_override(ContextOverride {
            allowed_operations: Some(vec![OperationType::Read, OperationType::Update]),
            ..ContextOverride::default()
        });
        let out = evaluate_policy(&plan("docker run nginx"), &s, Some("prod-eu"));
        assert_eq!(out.auto_decision, Some(AutoDecision::Reject));
        assert!(out.reason.contains("prod-eu"));
        // Other contexts fall through to plan mode
        let out = evaluate_policy(&plan("docker run nginx"), &s, Some("dev"));
        assert!(out.requires_approval);
    }

    #[test]
    fn override_can_approve() {
        let s = with_override(ContextOverride {
            require_approval: false,
            allowed_operations: None,
            max_impact_level: Some(ImpactLevel::Medium),
        });
        let out = evaluate_policy(&plan("docker restart api"), &s, Some("prod-eu"));
        assert_eq!(out.auto_decision, Some(AutoDecision::Approve));
    }

    #[test]
    fn override_max_impact_forces_approval() {
        let s = with_override(ContextOverride {
            require_approval: false,
            allowed_operations: None,
            max_impact_level: Some(ImpactLevel::Low),
        });
        let out = evaluate_policy(&plan("docker restart api"), &s, Some("prod-eu"));
        assert!(out.requires_approval);
        assert!(out.reason.contains("exceeds"));
    }

    #[test]
    fn auto_approve_low_impact() {
        let s = SafetyConfig {
            auto_approve_low_impact: true,
            ..SafetyConfig::default()
        };
        let out = evaluate_policy(&plan("kubectl get pods"), &s, None);
        assert_eq!(out.auto_decision, Some(AutoDecision::Approve));
        let out = evaluate_policy(&plan("docker restart api"), &s, None);
        assert!(out.requires_approval);
    }

    #[test]
    fn decision_check_blocks_forbidden_approval() {
        let s = with_override(ContextOverride {
            allowed_operations: Some(vec![OperationType::Read]),
            ..ContextOverride::default()
        });
        let mut p = plan("docker run nginx");
        p.context = Some("prod-eu".into());
        let err = check_decision(&p, &s, &Verdict::Approve).unwrap_err();
        assert!(matches!(err, WorkflowError::PolicyViolation { .. }));
        assert!(check_decision(&p, &s, &Verdict::Reject).is_ok());
        p.context = None;
        assert!(check_decision(&p, &s, &Verdict::Approve).is_ok());
    }

    #[test]
    fn forwarding() {
        let mut s = SafetyConfig::default();
        assert!(forwarding_for(&plan("docker restart api"), &s).is_none());

        s.forward_approvals = Some(ForwardApprovals {
            enabled: true,
            channel: Some(ForwardChannel::Slack),
            target: Some("#ops-approvals".into()),
            mention_on_critical: vec!["U123".into()],
        });
        let f = forwarding_for(&plan("docker restart api"), &s).unwrap();
        assert_eq!(f.channel, Some(ForwardChannel::Slack));
        assert!(f.mentions.is_empty());
        let f = forwarding_for(&plan("kubectl delete ns staging"), &s).unwrap();
        assert_eq!(f.mentions, vec!["U123".to_string()]);
    }
}
