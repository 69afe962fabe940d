use std::fs::{self, OpenOptions};

use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

use crate::config::Config;
use crate::plan::Plan;
use crate::workflow::PolicyOutcome;

/// Log target for per-plan decision records.
pub const DECISION_TARGET: &str = "opsgate::decision";

const MAX_LOGGED_COMMAND: usize = 200;

/// Install the file logger configured in `[settings]`.
/// Best-effort: any failure leaves logging disabled rather than erroring.
pub fn init(config: &Config) {
    let Some(path) = config.log_file_path() else {
        return;
    };
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let _ = WriteLogger::init(parse_level(&config.settings.log_level), log_config, file);
}

fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}

/// Emit one decision record for a submitted plan.
pub fn log_outcome(plan: &Plan, outcome: &PolicyOutcome) {
    log::info!(target: DECISION_TARGET, "{}", decision_line(plan, outcome));
}

/// Tab-separated record: decision, plan id prefix, impact, command, reason.
pub fn decision_line(plan: &Plan, outcome: &PolicyOutcome) -> String {
    // Compact single-line fields
    let command: String = plan
        .command
        .replace('\n', " ")
        .chars()
        .take(MAX_LOGGED_COMMAND)
        .collect();
    let reason = outcome.reason.replace('\n', "; ");
    format!(
        "{decision}\t{id}\t{impact}\t{command}\t{reason}",
        decision = outcome.label(),
        id = plan.id.short(),
        impact = plan.analysis.estimated_impact,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{CreatePlanOptions, create_plan};
    use crate::workflow::evaluate_policy;

    #[test]
    fn record_fields() {
        let plan = create_plan(CreatePlanOptions::new("kubectl delete ns staging", "clean up"));
        let outcome = evaluate_policy(&plan, &Config::default_config().safety, None);
        let line = decision_line(&plan, &outcome);
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0], "pending");
        assert_eq!(fields[1], plan.id.short());
        assert_eq!(fields[2], "critical");
        assert_eq!(fields[3], "kubectl delete ns staging");
    }

    #[test]
    fn long_commands_truncated() {
        let cmd = format!("docker run {}", "x".repeat(500));
        let plan = create_plan(CreatePlanOptions::new(cmd, "r"));
        let outcome = evaluate_policy(&plan, &Config::default_config().safety, None);
        let line = decision_line(&plan, &outcome);
        assert_eq!(line.split('\t').nth(3).unwrap().chars().count(), MAX_LOGGED_COMMAND);
    }

    #[test]
    fn levels() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN "), LevelFilter::Warn);
        assert_eq!(parse_level("loud"), LevelFilter::Info);
    }
}
