use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::policy::{self, AutoDecision, PolicyOutcome};
use crate::config::SafetyConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::plan::{ApprovalDecision, ExecutionResult, Plan, PlanId, PlanStatus, Verdict};

/// Aggregate counters. Never decrease.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStats {
    pub total_plans_created: u64,
    pub total_approved: u64,
    pub total_rejected: u64,
    pub total_expired: u64,
    pub total_executed: u64,
}

/// Plan bookkeeping for one workflow.
///
/// Non-terminal plans (pending, approved) live in the active map; terminal
/// plans move to a bounded history buffer. Every method that can observe a
/// plan takes `now` and expires it first if its deadline has passed.
#[derive(Debug)]
pub struct WorkflowState {
    active: HashMap<PlanId, Plan>,
    history: VecDeque<Plan>,
    recent_decisions: VecDeque<ApprovalDecision>,
    history_limit: usize,
    stats: WorkflowStats,
}

impl WorkflowState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            active: HashMap::new(),
            history: VecDeque::new(),
            recent_decisions: VecDeque::new(),
            history_limit: history_limit.max(1),
            stats: WorkflowStats::default(),
        }
    }

    /// Track a freshly created plan, applying the policy's automatic decision.
    pub fn submit(&mut self, mut plan: Plan, outcome: &PolicyOutcome) -> WorkflowResult<Plan> {
        if plan.status != PlanStatus::Pending || self.find(&plan.id).is_some() {
            let from = self.find(&plan.id).map_or(plan.status, |p| p.status);
            return Err(WorkflowError::InvalidTransition {
                plan_id: plan.id.to_string(),
                from,
                to: PlanStatus::Pending,
            });
        }

        self.stats.total_plans_created += 1;
        match outcome.auto_decision {
            Some(AutoDecision::Approve) => {
                plan.transition(PlanStatus::Approved)?;
                self.stats.total_approved += 1;
                self.active.insert(plan.id.clone(), plan.clone());
            }
            Some(AutoDecision::Reject) => {
                plan.transition(PlanStatus::Rejected)?;
                self.stats.total_rejected += 1;
                self.retire(plan.clone());
            }
            None => {
                self.active.insert(plan.id.clone(), plan.clone());
            }
        }
        Ok(plan)
    }

    /// Apply a human decision to a pending plan.
    pub fn apply_decision(
        &mut self,
        decision: ApprovalDecision,
        safety: &SafetyConfig,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Plan> {
        self.observe_expiry(&decision.plan_id, now);

        let Some(current) = self.active.get(&decision.plan_id) else {
            return Err(self.missing(&decision.plan_id, decision.verdict.target_status()));
        };
        policy::check_decision(current, safety, &decision.verdict)?;
        let updated = apply_verdict(current, &decision)?;

        match updated.status {
            PlanStatus::Approved => {
                self.stats.total_approved += 1;
                self.active.insert(updated.id.clone(), updated.clone());
            }
            _ => {
                self.stats.total_rejected += 1;
                self.active.remove(&updated.id);
                self.retire(updated.clone());
            }
        }
        self.record_decision(decision);
        Ok(updated)
    }

    /// Record that an approved plan ran.
    pub fn mark_executed(
        &mut self,
        plan_id: &PlanId,
        result: &ExecutionResult,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Plan> {
        if result.plan_id != *plan_id {
            return Err(WorkflowError::PlanMismatch {
                expected: plan_id.to_string(),
                actual: result.plan_id.to_string(),
            });
        }
        self.observe_expiry(plan_id, now);

        let Some(plan) = self.active.get_mut(plan_id) else {
            return Err(self.missing(plan_id, PlanStatus::Executed));
        };
        plan.transition(PlanStatus::Executed)?;
        self.stats.total_executed += 1;

        let plan = self
            .active
            .remove(plan_id)
            .ok_or_else(|| WorkflowError::UnknownPlan(plan_id.to_string()))?;
        self.retire(plan.clone());
        Ok(plan)
    }

    /// Expire every pending plan whose deadline has passed. Returns the newly
    /// expired ids, earliest deadline first.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<PlanId> {
        let mut due: Vec<(DateTime<Utc>, PlanId)> = self
            .active
            .values()
            .filter(|p| p.is_expired_at(now))
            .map(|p| (p.expires_at, p.id.clone()))
            .collect();
        due.sort();

        due.into_iter()
            .filter_map(|(_, id)| self.observe_expiry(&id, now).then_some(id))
            .collect()
    }

    /// Look up a plan, active or in history.
    pub fn get(&mut self, plan_id: &PlanId, now: DateTime<Utc>) -> Option<Plan> {
        self.observe_expiry(plan_id, now);
        self.find(plan_id).cloned()
    }

    /// Plans still awaiting a decision, oldest first.
    pub fn pending(&mut self, now: DateTime<Utc>) -> Vec<Plan> {
        self.sweep_expired(now);
        let mut plans: Vec<Plan> = self
            .active
            .values()
            .filter(|p| p.status == PlanStatus::Pending)
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        plans
    }

    /// Approved plans not yet marked executed, oldest first.
    pub fn awaiting_execution(&self) -> Vec<Plan> {
        let mut plans: Vec<Plan> = self
            .active
            .values()
            .filter(|p| p.status == PlanStatus::Approved)
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        plans
    }

    /// Resolve a full id or a unique id prefix (case-insensitive).
    pub fn resolve(&self, reference: &str) -> WorkflowResult<PlanId> {
        let reference = reference.trim().to_ascii_lowercase();
        if reference.is_empty() {
            return Err(WorkflowError::UnknownPlan(reference));
        }

        let ids = self
            .active
            .keys()
            .chain(self.history.iter().map(|p| &p.id));
        let mut matches: Vec<&PlanId> = Vec::new();
        for id in ids {
            if id.as_str() == reference {
                return Ok(id.clone());
            }
            if id.as_str().starts_with(&reference) && !matches.contains(&id) {
                matches.push(id);
            }
        }

        match matches.as_slice() {
            [] => Err(WorkflowError::UnknownPlan(reference)),
            [id] => Ok((*id).clone()),
            _ => Err(WorkflowError::AmbiguousPlan {
                reference,
                matches: matches.len(),
            }),
        }
    }

    /// Most recent decisions, oldest first.
    pub fn recent_decisions(&self) -> Vec<ApprovalDecision> {
        self.recent_decisions.iter().cloned().collect()
    }

    pub fn stats(&self) -> WorkflowStats {
        self.stats
    }

    /// Expire the plan if it is pending and past its deadline.
    fn observe_expiry(&mut self, plan_id: &PlanId, now: DateTime<Utc>) -> bool {
        let due = self
            .active
            .get(plan_id)
            .is_some_and(|p| p.is_expired_at(now));
        if !due {
            return false;
        }
        let Some(mut plan) = self.active.remove(plan_id) else {
            return false;
        };
        if plan.transition(PlanStatus::Expired).is_err() {
            self.active.insert(plan.id.clone(), plan);
            return false;
        }
        self.stats.total_expired += 1;
        log::info!("plan {} expired", plan.id.short());
        self.retire(plan);
        true
    }

    fn find(&self, plan_id: &PlanId) -> Option<&Plan> {
        self.active
            .get(plan_id)
            .or_else(|| self.history.iter().rev().find(|p| p.id == *plan_id))
    }

    /// Error for a transition on a plan that is not active.
    fn missing(&self, plan_id: &PlanId, to: PlanStatus) -> WorkflowError {
        match self.find(plan_id) {
            Some(plan) => WorkflowError::InvalidTransition {
                plan_id: plan_id.to_string(),
                from: plan.status,
                to,
            },
            None => WorkflowError::UnknownPlan(plan_id.to_string()),
        }
    }

    fn retire(&mut self, plan: Plan) {
        self.history.push_back(plan);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    fn record_decision(&mut self, decision: ApprovalDecision) {
        self.recent_decisions.push_back(decision);
        while self.recent_decisions.len() > self.history_limit {
            self.recent_decisions.pop_front();
        }
    }
}

/// Apply a decision to a pending plan, returning the updated plan.
///
/// `modify` replaces the command but keeps the original analysis; callers
/// wanting a fresh risk assessment must create a new plan.
pub fn apply_verdict(plan: &Plan, decision: &ApprovalDecision) -> WorkflowResult<Plan> {
    if decision.plan_id != plan.id {
        return Err(WorkflowError::PlanMismatch {
            expected: plan.id.to_string(),
            actual: decision.plan_id.to_string(),
        });
    }
    let mut updated = plan.clone();
    updated.transition(decision.verdict.target_status())?;
    if let Verdict::Modify { modified_command } = &decision.verdict {
        updated.command = modified_command.clone();
    }
    Ok(updated)
}
