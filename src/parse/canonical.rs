//! Canonical text form used for rule matching.
//!
//! Rule tables are written against `tool verb args...`. Real commands often
//! arrive as `KUBECONFIG=x /usr/local/bin/kubectl --context prod drain n1`,
//! so the matcher sees a rewritten form: env prefixes dropped, the leading
//! word reduced to its basename, and global flags that precede the verb moved
//! to the end. Moved flags stay in the text so impact heuristics still see them.

use super::tokenize::tokenize;

/// Global flags that consume the next word, per tool (lower-case). Flags
/// given as `--flag=value` are a single word and need no entry. Tools not
/// listed here keep their word order.
const GLOBAL_VALUE_FLAGS: &[(&str, &[&str])] = &[
    (
        "kubectl",
        &[
            "-n",
            "--namespace",
            "--context",
            "--cluster",
            "--kubeconfig",
            "--user",
            "-s",
            "--server",
            "--as",
            "--token",
        ],
    ),
    (
        "docker",
        &["--context", "-c", "-h", "--host", "--config", "-l", "--log-level"],
    ),
    ("aws", &["--profile", "--region", "--output", "--endpoint-url"]),
    (
        "gcloud",
        &["--project", "--account", "--configuration", "--format"],
    ),
    ("gh", &["-r", "--repo"]),
];

fn global_value_flags(tool: &str) -> Option<&'static [&'static str]> {
    GLOBAL_VALUE_FLAGS
        .iter()
        .find(|(name, _)| *name == tool)
        .map(|(_, flags)| *flags)
}

/// Rewrite a command into the lower-cased `tool verb args... [global flags]`
/// form the rule tables match against.
pub fn canonical_form(command: &str) -> String {
    let mut words = tokenize(&command.trim().to_lowercase());
    let Some(first) = words.first_mut() else {
        return String::new();
    };
    // /usr/local/bin/terraform → terraform
    if let Some((_, name)) = first.rsplit_once('/')
        && !name.is_empty()
    {
        *first = name.to_string();
    }

    let Some(value_flags) = global_value_flags(&words[0]) else {
        return words.join(" ");
    };
    let mut verb_at = 1;
    while verb_at < words.len() && words[verb_at].starts_with('-') {
        verb_at += if value_flags.contains(&words[verb_at].as_str()) { 2 } else { 1 };
    }
    let verb_at = verb_at.min(words.len());

    let mut out = Vec::with_capacity(words.len());
    out.push(words[0].as_str());
    out.extend(words[verb_at..].iter().map(String::as_str));
    out.extend(words[1..verb_at].iter().map(String::as_str));
    out.join(" ")
}
