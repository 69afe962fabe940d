use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::{ImpactLevel, OperationType};
use crate::error::{WorkflowError, WorkflowResult};
use crate::extract::AffectedResource;

/// Length of the id prefix shown in plan text and accepted in replies.
pub const SHORT_ID_LEN: usize = 8;

/// Unique, unguessable plan identifier (UUID v4).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    /// Create a new random plan id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing id string (e.g. one read back from a decision).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The id prefix used in reply instructions.
    pub fn short(&self) -> &str {
        self.0.get(..SHORT_ID_LEN).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PlanId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle state of a plan.
///
/// ```text
/// pending ──┬─> approved ──> executed
///           ├─> rejected
///           └─> expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Executed,
}

impl PlanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanStatus::Pending => "pending",
            PlanStatus::Approved => "approved",
            PlanStatus::Rejected => "rejected",
            PlanStatus::Expired => "expired",
            PlanStatus::Executed => "executed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PlanStatus::Rejected | PlanStatus::Expired | PlanStatus::Executed
        )
    }

    pub fn can_transition_to(self, next: PlanStatus) -> bool {
        matches!(
            (self, next),
            (
                PlanStatus::Pending,
                PlanStatus::Approved | PlanStatus::Rejected | PlanStatus::Expired
            ) | (PlanStatus::Approved, PlanStatus::Executed)
        )
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk analysis of a command. Pure function of the command text and the rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAnalysis {
    pub operation: OperationType,
    pub resources: Vec<AffectedResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run_output: Option<String>,
    pub estimated_impact: ImpactLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CommandAnalysis {
    /// Only dangerous rules produce critical impact.
    pub fn is_dangerous(&self) -> bool {
        self.estimated_impact == ImpactLevel::Critical
    }
}

/// A proposed command plus its analysis, awaiting or having received a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: PlanId,
    pub command: String,
    pub original_request: String,
    pub analysis: CommandAnalysis,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: PlanStatus,
    /// Where the request came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<String>,
    /// Execution-context key the plan was evaluated against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Plan {
    /// Whether a pending plan has run out of time at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PlanStatus::Pending && now >= self.expires_at
    }

    /// Move to `to`, or fail with `InvalidTransition` and leave the plan untouched.
    pub fn transition(&mut self, to: PlanStatus) -> WorkflowResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(WorkflowError::InvalidTransition {
                plan_id: self.id.to_string(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// What the approver decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Verdict {
    Approve,
    Reject,
    /// Approve a replacement command. The analysis is not recomputed.
    Modify {
        #[serde(rename = "modifiedCommand")]
        modified_command: String,
    },
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Approve => "approve",
            Verdict::Reject => "reject",
            Verdict::Modify { .. } => "modify",
        }
    }

    /// Whether applying the verdict lets the command run.
    pub fn is_approving(&self) -> bool {
        !matches!(self, Verdict::Reject)
    }

    /// Status a pending plan moves to under this verdict.
    pub fn target_status(&self) -> PlanStatus {
        if self.is_approving() {
            PlanStatus::Approved
        } else {
            PlanStatus::Rejected
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecision {
    pub plan_id: PlanId,
    #[serde(flatten)]
    pub verdict: Verdict,
    pub approver: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ApprovalDecision {
    pub fn new(
        plan_id: PlanId,
        verdict: Verdict,
        approver: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            plan_id,
            verdict,
            approver: approver.into(),
            approver_id: None,
            comment: None,
            timestamp,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_approver_id(mut self, approver_id: impl Into<String>) -> Self {
        self.approver_id = Some(approver_id.into());
        self
    }
}

/// Outcome reported back by whoever ran an approved command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub plan_id: PlanId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ExecutionResult {
    pub fn new(plan_id: PlanId, success: bool, executed_at: DateTime<Utc>) -> Self {
        Self {
            plan_id,
            success,
            output: None,
            error: None,
            executed_at,
            duration_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_id_is_uuid_v4() {
        let id = PlanId::new();
        let parsed = Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
        assert_eq!(id.short().len(), SHORT_ID_LEN);
        assert!(id.as_str().starts_with(id.short()));
        assert_ne!(PlanId::new(), id);
    }

    #[test]
    fn short_id_of_short_string() {
        assert_eq!(PlanId::from_string("abc").short(), "abc");
    }

    #[test]
    fn transition_table() {
        use PlanStatus::*;
        let all = [Pending, Approved, Rejected, Expired, Executed];
        let allowed = [
            (Pending, Approved),
            (Pending, Rejected),
            (Pending, Expired),
            (Approved, Executed),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
        assert!(Rejected.is_terminal() && Expired.is_terminal() && Executed.is_terminal());
        assert!(!Pending.is_terminal() && !Approved.is_terminal());
    }

    #[test]
    fn verdict_wire_shape() {
        let now = Utc::now();
        let d = ApprovalDecision::new(
            PlanId::from_string("p-1"),
            Verdict::Modify {
                modified_command: "kubectl delete pod web --dry-run=server".into(),
            },
            "alice",
            now,
        );
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["decision"], "modify");
        assert_eq!(json["modifiedCommand"], "kubectl delete pod web --dry-run=server");
        assert_eq!(json["planId"], "p-1");

        let back: ApprovalDecision = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn verdict_from_flat_wire_form() {
        let d: ApprovalDecision = serde_json::from_str(
            r#"{"planId":"p-2","decision":"reject","approver":"bob",
                "comment":"not during freeze","timestamp":"2026-03-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(d.verdict, Verdict::Reject);
        assert_eq!(d.comment.as_deref(), Some("not during freeze"));
        assert!(!d.verdict.is_approving());
        assert_eq!(d.verdict.target_status(), PlanStatus::Rejected);
    }

    #[test]
    fn modify_without_command_is_rejected() {
        let r: Result<ApprovalDecision, _> = serde_json::from_str(
            r#"{"planId":"p-3","decision":"modify","approver":"bob","timestamp":"2026-03-01T12:00:00Z"}"#,
        );
        assert!(r.is_err());
    }
}
