//! Command classification: operation type, impact level, danger flag.
//!
//! Classification is a pure function of the command string and the compiled
//! [`RuleSet`]. Unknown commands are never trusted as read-only; they come back
//! as `exec` with `medium` impact.

pub mod heuristics;
pub mod rules;

pub use rules::{Rule, RuleClass, RuleHit, RuleSet};

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::parse;

/// Coarse category of what a command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Read,
    Create,
    Update,
    Delete,
    Exec,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Read => "read",
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
            OperationType::Exec => "exec",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered blast-radius estimate: `None < Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ImpactLevel::None => "none",
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
            ImpactLevel::Critical => "critical",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImpactLevel::None => "NONE",
            ImpactLevel::Low => "LOW",
            ImpactLevel::Medium => "MEDIUM",
            ImpactLevel::High => "HIGH",
            ImpactLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub operation: OperationType,
    pub impact: ImpactLevel,
    pub is_dangerous: bool,
    /// Source text of the rule that matched, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    /// Rule table the match came from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

/// Rule tables from the embedded defaults, compiled once.
static DEFAULT_RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    RuleSet::from_config(&Config::default_config().tools)
        .expect("embedded default rules must compile")
});

/// The compiled default rule set.
pub fn default_rules() -> &'static RuleSet {
    &DEFAULT_RULES
}

/// Classify a command against the default rule tables.
pub fn classify(command: &str) -> ClassificationResult {
    classify_with(&DEFAULT_RULES, command)
}

/// Classify a command against a specific rule set.
///
/// Precedence: dangerous → mutating → read → unknown, first match wins.
/// Rules see the [`canonical_form`](crate::parse::canonical_form) of the
/// command; the keyword heuristics see the full lower-cased text, env
/// prefixes included.
pub fn classify_with(rules: &RuleSet, command: &str) -> ClassificationResult {
    let normalized = command.trim().to_lowercase();
    let canonical = parse::canonical_form(command);

    let Some(hit) = rules.first_match(&canonical) else {
        log::debug!("no rule matched, treating as exec: {canonical}");
        return ClassificationResult {
            operation: OperationType::Exec,
            impact: ImpactLevel::Medium,
            is_dangerous: false,
            matched_pattern: None,
            tool: None,
        };
    };

    let (operation, impact, is_dangerous) = match hit.class {
        RuleClass::Dangerous => (
            heuristics::infer_operation(&normalized),
            ImpactLevel::Critical,
            true,
        ),
        RuleClass::Mutate => (
            heuristics::infer_operation(&normalized),
            heuristics::infer_impact(&normalized),
            false,
        ),
        RuleClass::Read => (OperationType::Read, ImpactLevel::None, false),
    };
    log::debug!(
        "{} rule from '{}' matched: {operation}/{impact}",
        hit.class.as_str(),
        hit.rule.tool
    );

    ClassificationResult {
        operation,
        impact,
        is_dangerous,
        matched_pattern: Some(hit.rule.pattern.as_str().to_string()),
        tool: Some(hit.rule.tool.clone()),
    }
}

/// Whether the command contains any always-require-approval trigger
/// (case-insensitive substring match).
pub fn requires_approval(command: &str, always_require_approval: &[String]) -> bool {
    let normalized = command.trim().to_lowercase();
    always_require_approval
        .iter()
        .filter(|p| !p.trim().is_empty())
        .any(|p| normalized.contains(&p.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_levels_are_ordered() {
        assert!(ImpactLevel::None < ImpactLevel::Low);
        assert!(ImpactLevel::Low < ImpactLevel::Medium);
        assert!(ImpactLevel::Medium < ImpactLevel::High);
        assert!(ImpactLevel::High < ImpactLevel::Critical);
    }

    #[test]
    fn read_rule() {
        let r = classify("kubectl get pods -n prod");
        assert_eq!(r.operation, OperationType::Read);
        assert_eq!(r.impact, ImpactLevel::None);
        assert!(!r.is_dangerous);
        assert_eq!(r.tool.as_deref(), Some("kubectl"));
    }

    #[test]
    fn dangerous_rule() {
        let r = classify("kubectl delete namespace staging");
        assert_eq!(r.operation, OperationType::Delete);
        assert_eq!(r.impact, ImpactLevel::Critical);
        assert!(r.is_dangerous);
        assert!(r.matched_pattern.is_some());
    }

    #[test]
    fn case_insensitive() {
        let r = classify("  KUBECTL DELETE NAMESPACE staging  ");
        assert!(r.is_dangerous);
    }

    #[test]
    fn unknown_is_conservative() {
        let r = classify("./deploy.sh --everything");
        assert_eq!(r.operation, OperationType::Exec);
        assert_eq!(r.impact, ImpactLevel::Medium);
        assert!(!r.is_dangerous);
        assert!(r.matched_pattern.is_none());
    }

    #[test]
    fn empty_command_is_unknown() {
        assert_eq!(classify("").operation, OperationType::Exec);
    }

    #[test]
    fn deterministic() {
        let cmd = "docker rm -f web";
        assert_eq!(classify(cmd), classify(cmd));
    }

    #[test]
    fn custom_rules() {
        let rules = RuleSet::from_config(&[crate::config::ToolRules {
            name: "helm".into(),
            read: vec![r"^helm\s+list".into()],
            mutate: vec![],
            dangerous: vec![r"^helm\s+uninstall".into()],
        }])
        .unwrap();
        assert!(classify_with(&rules, "helm uninstall web").is_dangerous);
        assert_eq!(
            classify_with(&rules, "helm list").operation,
            OperationType::Read
        );
        // Default tables are not consulted
        assert_eq!(
            classify_with(&rules, "kubectl get pods").operation,
            OperationType::Exec
        );
    }

    #[test]
    fn always_require_substring() {
        let list = vec!["delete".to_string(), "rm -rf".to_string()];
        assert!(requires_approval("kubectl DELETE pod web", &list));
        assert!(requires_approval("sudo rm -rf /tmp/x", &list));
        assert!(!requires_approval("kubectl get pods", &list));
        assert!(!requires_approval("kubectl get pods", &["".to_string()]));
    }
}
