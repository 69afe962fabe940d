//! opsgate: risk classification and approval workflow for infrastructure commands.
//!
//! Commands aimed at container runtimes, orchestrators, provisioning tools,
//! VCS hosts and cloud CLIs are classified by operation type and impact.
//! Mutating or dangerous commands become time-boxed [`Plan`]s that a human
//! approves, rejects, or lets expire. The crate decides *whether* something
//! may run; it never runs anything itself.
//!
//! # Architecture
//!
//! - **[`classify`]**: Rule tables (read / mutate / dangerous regexes per tool) and keyword heuristics.
//! - **[`extract`]**: Per-tool resource parsers (kubectl, docker, terraform).
//! - **[`plan`]**: Command analysis, plan creation, plan text and reply parsing.
//! - **[`workflow`]**: Approval policy and the plan lifecycle state machine.
//! - **[`parse`]**: shlex tokenizing, flag lookup, execution-context inference.
//! - **[`config`]**: Configuration loading: embedded defaults + user overlay merge.
//! - **[`logging`]**: File logger setup and per-plan decision records.
//!
//! # Example
//!
//! ```
//! use opsgate::{CreatePlanOptions, Workflow, config::Config, create_plan};
//!
//! let workflow = Workflow::new(&Config::default_config());
//! let plan = create_plan(CreatePlanOptions::new("kubectl delete ns staging", "drop staging"));
//! let submission = workflow.submit(plan).unwrap();
//! assert!(submission.outcome.requires_approval);
//! ```

/// Command classification: operation type, impact level, danger flag.
pub mod classify;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Error types.
pub mod error;
/// Resource extraction per tool family.
pub mod extract;
/// Logger setup and decision records.
pub mod logging;
/// Command tokenizing helpers and execution-context inference.
pub mod parse;
/// Plan analysis, creation, rendering and reply parsing.
pub mod plan;
/// Approval policy and plan lifecycle.
pub mod workflow;

pub use classify::{ClassificationResult, ImpactLevel, OperationType, classify};
pub use error::{ConfigError, WorkflowError, WorkflowResult};
pub use extract::{AffectedResource, extract_resources};
pub use plan::{
    Analyzer, ApprovalDecision, CommandAnalysis, CreatePlanOptions, ExecutionResult, Plan, PlanId,
    PlanStatus, Verdict, analyze, create_plan, format_plan, parse_reply,
};
pub use workflow::{PolicyOutcome, Submission, Workflow, evaluate_policy};
