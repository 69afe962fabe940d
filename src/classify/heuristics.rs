//! Keyword heuristics for operation type and impact.
//!
//! These are best-effort guesses over the normalized command text, not a
//! parse of any tool's grammar. Operation keywords match on word boundaries.
//! Impact-raising triggers are looser: `prod`, `--all` and `--force` match
//! anywhere (`gke_acme_us_prod`, `prod2`, `--all-tags`), `-f` as a token.

use std::sync::LazyLock;

use regex::Regex;

use super::{ImpactLevel, OperationType};

static DELETE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(delete|rm|remove|destroy|drop|prune|terminate)\b").expect("invalid regex")
});
static CREATE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(create|new|init|run|launch|start)\b").expect("invalid regex")
});
static UPDATE_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(update|edit|patch|scale|modify|apply|restart)\b").expect("invalid regex")
});
static EXEC_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(exec|shell|sh|bash)\b").expect("invalid regex"));

static HIGH_TRIGGERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"prod|--all|--force|(^|\s)-f(\s|=|$)").expect("invalid regex")
});
static MEDIUM_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(staging|delete|rm|stop|restart)\b").expect("invalid regex")
});
static LOW_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(dev|local|test)\b").expect("invalid regex"));

const LOW_FLAGS: &[&str] = &["--dry-run"];

fn has_flag(command: &str, flags: &[&str]) -> bool {
    command.split_whitespace().any(|w| {
        let flag = w.split_once('=').map_or(w, |(f, _)| f);
        flags.contains(&flag)
    })
}

/// Infer the operation type from keywords in the command.
///
/// Checked in order delete → create → update → exec; anything else is a read.
pub fn infer_operation(command: &str) -> OperationType {
    if DELETE_WORDS.is_match(command) {
        OperationType::Delete
    } else if CREATE_WORDS.is_match(command) {
        OperationType::Create
    } else if UPDATE_WORDS.is_match(command) {
        OperationType::Update
    } else if EXEC_WORDS.is_match(command) {
        OperationType::Exec
    } else {
        OperationType::Read
    }
}

/// Infer the impact of a mutating (non-dangerous) command.
pub fn infer_impact(command: &str) -> ImpactLevel {
    if HIGH_TRIGGERS.is_match(command) {
        return ImpactLevel::High;
    }
    if MEDIUM_WORDS.is_match(command) {
        return ImpactLevel::Medium;
    }
    if LOW_WORDS.is_match(command) || has_flag(command, LOW_FLAGS) {
        return ImpactLevel::Low;
    }
    ImpactLevel::Medium
}
