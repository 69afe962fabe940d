//! Plan lifecycle management.
//!
//! A [`Workflow`] owns every submitted plan, the active safety configuration
//! and the aggregate counters. All operations take a single lock, so:
//!
//! - two decisions racing on one plan resolve to exactly one winner;
//! - counters move together with the transition they count;
//! - a decision arriving after a plan's deadline sees it expired, because
//!   expiry is checked under the same lock before the decision is applied.
//!
//! There is no background timer. Expiry is lazy: any operation that looks
//! at a plan expires it first if its deadline has passed, and
//! [`Workflow::sweep_expired`] expires everything due at once.

pub mod policy;
pub mod state;

pub use policy::{
    AutoDecision, ForwardTarget, PolicyOutcome, check_decision, evaluate_policy, forwarding_for,
};
pub use state::{WorkflowState, WorkflowStats, apply_verdict};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{Config, SafetyConfig};
use crate::error::WorkflowResult;
use crate::logging;
use crate::plan::{ApprovalDecision, ExecutionResult, Plan, PlanId};

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// What happened to a submitted plan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// The plan as stored: pending, or already approved/rejected by policy.
    pub plan: Plan,
    pub outcome: PolicyOutcome,
    /// Where to send the approval request, if the plan waits for one and
    /// forwarding is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward: Option<ForwardTarget>,
}

struct Inner {
    safety: SafetyConfig,
    state: WorkflowState,
}

/// Thread-safe plan workflow. Share it behind an `Arc`.
pub struct Workflow {
    inner: Mutex<Inner>,
    clock: Clock,
}

impl Workflow {
    /// Create a workflow reading the system clock.
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(Utc::now))
    }

    /// Create a workflow with a custom clock.
    pub fn with_clock(config: &Config, clock: Clock) -> Self {
        Self {
            inner: Mutex::new(Inner {
                safety: config.safety.clone(),
                state: WorkflowState::new(config.workflow.history_limit),
            }),
            clock,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    // Every mutation leaves the state consistent, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Evaluate policy for a new plan and start tracking it.
    ///
    /// The plan's own `context` selects the context override. Approved plans
    /// stay active until [`mark_executed`](Self::mark_executed); they never
    /// expire. Callers that run plans must acknowledge each one, and can use
    /// [`awaiting_execution`](Self::awaiting_execution) to find any they
    /// dropped.
    pub fn submit(&self, plan: Plan) -> WorkflowResult<Submission> {
        let mut inner = self.lock();
        let outcome = evaluate_policy(&plan, &inner.safety, plan.context.as_deref());
        let forward = if outcome.requires_approval {
            forwarding_for(&plan, &inner.safety)
        } else {
            None
        };

        let plan = inner.state.submit(plan, &outcome)?;
        log::info!(
            "plan {} submitted: {} ({})",
            plan.id.short(),
            outcome.label(),
            outcome.reason
        );
        logging::log_outcome(&plan, &outcome);

        Ok(Submission {
            plan,
            outcome,
            forward,
        })
    }

    /// Apply a human decision to a pending plan.
    ///
    /// # Errors
    ///
    /// - `UnknownPlan` if the id is not tracked.
    /// - `InvalidTransition` if the plan is no longer pending (including when
    ///   it expired before the decision arrived).
    /// - `PolicyViolation` if the decision approves an operation the plan's
    ///   context override forbids. The plan stays pending.
    pub fn apply_decision(&self, decision: ApprovalDecision) -> WorkflowResult<Plan> {
        let now = self.now();
        let mut inner = self.lock();
        let Inner { safety, state } = &mut *inner;

        let short = decision.plan_id.short().to_string();
        let verdict = decision.verdict.as_str();
        let approver = decision.approver.clone();
        match state.apply_decision(decision, safety, now) {
            Ok(plan) => {
                log::info!("plan {short}: {verdict} by {approver} -> {}", plan.status);
                Ok(plan)
            }
            Err(e) => {
                log::warn!("plan {short}: {verdict} by {approver} refused: {e}");
                Err(e)
            }
        }
    }

    /// Expire every pending plan past its deadline. Idempotent.
    pub fn sweep_expired(&self) -> Vec<PlanId> {
        let now = self.now();
        self.lock().state.sweep_expired(now)
    }

    /// Record that an approved plan was executed.
    pub fn mark_executed(&self, plan_id: &PlanId, result: &ExecutionResult) -> WorkflowResult<Plan> {
        let now = self.now();
        let plan = self.lock().state.mark_executed(plan_id, result, now)?;
        log::info!(
            "plan {} executed ({})",
            plan.id.short(),
            if result.success { "success" } else { "failure" }
        );
        Ok(plan)
    }

    pub fn get(&self, plan_id: &PlanId) -> Option<Plan> {
        let now = self.now();
        self.lock().state.get(plan_id, now)
    }

    /// Plans awaiting a decision, oldest first.
    pub fn pending(&self) -> Vec<Plan> {
        let now = self.now();
        self.lock().state.pending(now)
    }

    /// Approved plans not yet marked executed, oldest first.
    pub fn awaiting_execution(&self) -> Vec<Plan> {
        self.lock().state.awaiting_execution()
    }

    pub fn recent_decisions(&self) -> Vec<ApprovalDecision> {
        self.lock().state.recent_decisions()
    }

    pub fn stats(&self) -> WorkflowStats {
        self.lock().state.stats()
    }

    /// Resolve a full plan id or a unique prefix, such as the 8-character
    /// reference shown in plan text.
    pub fn resolve(&self, reference: &str) -> WorkflowResult<PlanId> {
        self.lock().state.resolve(reference)
    }

    /// Current safety configuration.
    pub fn safety(&self) -> SafetyConfig {
        self.lock().safety.clone()
    }

    /// Swap the safety configuration. Applies to later submissions and
    /// decisions; plans already decided are unaffected.
    pub fn reload_config(&self, safety: SafetyConfig) {
        log::info!("safety configuration reloaded (mode: {})", safety.mode);
        self.lock().safety = safety;
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
