//! Plan building: command analysis, time-boxed plan creation, plan text and
//! reply parsing.
//!
//! Everything here is pure apart from id generation and the wall clock read
//! by [`create_plan`]. Nothing touches workflow state; submitting a plan is a
//! separate step on [`Workflow`](crate::workflow::Workflow).

mod format;
mod reply;
mod types;

pub use format::format_plan;
pub use reply::{Reply, ReplyAction, parse_reply};
pub use types::{
    ApprovalDecision, CommandAnalysis, ExecutionResult, Plan, PlanId, PlanStatus, SHORT_ID_LEN,
    Verdict,
};

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::classify::{self, ClassificationResult, RuleSet};
use crate::config::{Config, DEFAULT_PLAN_TIMEOUT_SEC, MAX_PLAN_TIMEOUT_SEC, MIN_PLAN_TIMEOUT_SEC};
use crate::error::ConfigResult;
use crate::extract::{self, AffectedResource, ExtractorRegistry};

pub const DANGEROUS_WARNING: &str =
    "This command is classified as dangerous and always requires approval";
pub const MULTI_RESOURCE_WARNING: &str = "This command affects multiple resources";
pub const PRODUCTION_WARNING: &str = "This command appears to target production";
pub const DRY_RUN_WARNING: &str = "Consider using --dry-run or plan first";

static MULTI_RESOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)--all|\bprune\b").expect("invalid regex"));
static PRODUCTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)prod").expect("invalid regex"));
static DRY_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)--dry-run|\bplan\b").expect("invalid regex"));
static APPLY_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(apply|delete|destroy)\b").expect("invalid regex"));

/// Inputs for [`create_plan`].
#[derive(Debug, Clone)]
pub struct CreatePlanOptions {
    pub command: String,
    pub original_request: String,
    pub channel: Option<String>,
    pub requester_id: Option<String>,
    /// Clamped into the configured bounds at creation.
    pub timeout_sec: u64,
    pub dry_run_output: Option<String>,
    pub context: Option<String>,
}

impl CreatePlanOptions {
    pub fn new(command: impl Into<String>, original_request: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            original_request: original_request.into(),
            channel: None,
            requester_id: None,
            timeout_sec: DEFAULT_PLAN_TIMEOUT_SEC,
            dry_run_output: None,
            context: None,
        }
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn requester_id(mut self, requester_id: impl Into<String>) -> Self {
        self.requester_id = Some(requester_id.into());
        self
    }

    pub fn timeout_sec(mut self, timeout_sec: u64) -> Self {
        self.timeout_sec = timeout_sec;
        self
    }

    pub fn dry_run_output(mut self, output: impl Into<String>) -> Self {
        self.dry_run_output = Some(output.into());
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Classifier rules and resource parsers built from one configuration.
pub struct Analyzer {
    rules: RuleSet,
    extractors: ExtractorRegistry,
}

impl Analyzer {
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        Ok(Self {
            rules: RuleSet::from_config(&config.tools)?,
            extractors: ExtractorRegistry::from_config(config),
        })
    }

    pub fn classify(&self, command: &str) -> ClassificationResult {
        classify::classify_with(&self.rules, command)
    }

    pub fn extract(&self, command: &str) -> Vec<AffectedResource> {
        self.extractors.extract(command)
    }

    pub fn analyze(&self, command: &str) -> CommandAnalysis {
        build_analysis(command, self.classify(command), self.extract(command))
    }

    pub fn create_plan(&self, options: CreatePlanOptions) -> Plan {
        self.create_plan_at(options, Utc::now())
    }

    pub fn create_plan_at(&self, options: CreatePlanOptions, now: DateTime<Utc>) -> Plan {
        let analysis = self.analyze(&options.command);
        assemble_plan(options, analysis, now)
    }
}

/// Analyze a command against the default rules and parsers.
pub fn analyze(command: &str) -> CommandAnalysis {
    build_analysis(
        command,
        classify::classify(command),
        extract::extract_resources(command),
    )
}

/// Create a pending plan, timed from the current wall clock.
pub fn create_plan(options: CreatePlanOptions) -> Plan {
    create_plan_at(options, Utc::now())
}

/// Create a pending plan as of `now`.
pub fn create_plan_at(options: CreatePlanOptions, now: DateTime<Utc>) -> Plan {
    let analysis = analyze(&options.command);
    assemble_plan(options, analysis, now)
}

fn build_analysis(
    command: &str,
    classification: ClassificationResult,
    resources: Vec<AffectedResource>,
) -> CommandAnalysis {
    let mut warnings = Vec::new();
    if classification.is_dangerous {
        warnings.push(DANGEROUS_WARNING.to_string());
    }
    if MULTI_RESOURCE.is_match(command) {
        warnings.push(MULTI_RESOURCE_WARNING.to_string());
    }
    if PRODUCTION.is_match(command) {
        warnings.push(PRODUCTION_WARNING.to_string());
    }
    if APPLY_LIKE.is_match(command) && !DRY_RUN.is_match(command) {
        warnings.push(DRY_RUN_WARNING.to_string());
    }

    CommandAnalysis {
        operation: classification.operation,
        resources,
        dry_run_output: None,
        estimated_impact: classification.impact,
        warnings,
    }
}

fn assemble_plan(
    options: CreatePlanOptions,
    mut analysis: CommandAnalysis,
    now: DateTime<Utc>,
) -> Plan {
    analysis.dry_run_output = options.dry_run_output.filter(|o| !o.is_empty());

    let timeout = options
        .timeout_sec
        .clamp(MIN_PLAN_TIMEOUT_SEC, MAX_PLAN_TIMEOUT_SEC);
    if timeout != options.timeout_sec {
        log::debug!(
            "plan timeout {}s clamped to {timeout}s",
            options.timeout_sec
        );
    }

    Plan {
        id: PlanId::new(),
        command: options.command,
        original_request: options.original_request,
        analysis,
        created_at: now,
        expires_at: now + Duration::seconds(timeout as i64),
        status: PlanStatus::Pending,
        channel: options.channel,
        requester_id: options.requester_id,
        context: options.context,
    }
}
