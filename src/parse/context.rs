//! Execution-context inference: which cluster, account or project a command
//! is aimed at. The key selects a `[safety.context_overrides.<key>]` entry.

use super::tokenize::{env_vars, flag_value, tokenize};

/// Flags naming the target context, per tool family.
const CONTEXT_FLAGS: &[&str] = &["--context", "--profile", "--project"];

/// Env var assignments naming the target context.
const CONTEXT_ENV: &[&str] = &["KUBE_CONTEXT", "AWS_PROFILE", "CLOUDSDK_CORE_PROJECT"];

/// Infer the execution-context key for a command, if it names one.
///
/// Explicit flags win over env var prefixes.
pub fn context_key(command: &str) -> Option<String> {
    let words = tokenize(command);
    if let Some(value) = flag_value(&words, CONTEXT_FLAGS) {
        return Some(value.to_string());
    }
    env_vars(command)
        .into_iter()
        .find(|(key, _)| CONTEXT_ENV.contains(&key.as_str()))
        .map(|(_, value)| value)
}
