//! Compiled rule tables and the single generic matching routine.

use regex::Regex;

use crate::config::ToolRules;
use crate::error::{ConfigError, ConfigResult};

/// Which table a rule came from. Determines precedence: every dangerous rule
/// is consulted before any mutating rule, and every mutating rule before any
/// read rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleClass {
    Dangerous,
    Mutate,
    Read,
}

impl RuleClass {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleClass::Dangerous => "dangerous",
            RuleClass::Mutate => "mutate",
            RuleClass::Read => "read",
        }
    }
}

/// A single compiled pattern and the tool table it belongs to.
#[derive(Debug, Clone)]
pub struct Rule {
    pub tool: String,
    pub pattern: Regex,
}

/// A rule that matched, as reported by [`RuleSet::first_match`].
#[derive(Debug, Clone, Copy)]
pub struct RuleHit<'a> {
    pub class: RuleClass,
    pub rule: &'a Rule,
}

/// Ordered, compiled rule tables for all configured tools.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    dangerous: Vec<Rule>,
    mutate: Vec<Rule>,
    read: Vec<Rule>,
}

impl RuleSet {
    /// Compile rule tables from configuration, preserving table order.
    pub fn from_config(tools: &[ToolRules]) -> ConfigResult<Self> {
        let mut set = Self::default();
        for tool in tools {
            set.dangerous.extend(compile(&tool.name, &tool.dangerous)?);
            set.mutate.extend(compile(&tool.name, &tool.mutate)?);
            set.read.extend(compile(&tool.name, &tool.read)?);
        }
        Ok(set)
    }

    /// Find the first matching rule for an already-normalized command.
    pub fn first_match(&self, normalized: &str) -> Option<RuleHit<'_>> {
        [
            (RuleClass::Dangerous, &self.dangerous),
            (RuleClass::Mutate, &self.mutate),
            (RuleClass::Read, &self.read),
        ]
        .into_iter()
        .find_map(|(class, rules)| {
            rules
                .iter()
                .find(|rule| rule.pattern.is_match(normalized))
                .map(|rule| RuleHit { class, rule })
        })
    }

    /// Total number of compiled rules.
    pub fn len(&self) -> usize {
        self.dangerous.len() + self.mutate.len() + self.read.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compile(tool: &str, patterns: &[String]) -> ConfigResult<Vec<Rule>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p)
                .map(|pattern| Rule {
                    tool: tool.to_string(),
                    pattern,
                })
                .map_err(|source| ConfigError::InvalidPattern {
                    tool: tool.to_string(),
                    source,
                })
        })
        .collect()
}
