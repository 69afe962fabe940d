//! Error types for configuration loading and workflow transitions.
//!
//! Classification and resource extraction never fail: unrecognized input
//! degrades to a conservative default instead of an error.

use thiserror::Error;

use crate::classify::OperationType;
use crate::plan::PlanStatus;

/// Errors raised by the plan workflow state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The plan is not in the state the requested transition starts from.
    #[error("plan {plan_id} cannot move from {from} to {to}")]
    InvalidTransition {
        plan_id: String,
        from: PlanStatus,
        to: PlanStatus,
    },

    /// No plan with this identifier is tracked (never existed or pruned from history).
    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    /// An approving decision targets an operation the context override forbids.
    #[error("{operation} operations are not allowed in context '{context}' (plan {plan_id})")]
    PolicyViolation {
        plan_id: String,
        operation: OperationType,
        context: String,
    },

    /// A decision or execution result names a different plan than the one it was applied to.
    #[error("decision for plan {actual} applied to plan {expected}")]
    PlanMismatch { expected: String, actual: String },

    /// A short plan reference matched more than one tracked plan.
    #[error("plan reference '{reference}' is ambiguous ({matches} matches)")]
    AmbiguousPlan { reference: String, matches: usize },
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid pattern for tool '{tool}': {source}")]
    InvalidPattern {
        tool: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result type for workflow operations.
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
