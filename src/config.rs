use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::{ImpactLevel, OperationType, RuleSet};
use crate::error::{ConfigError, ConfigResult};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Lower bound for `safety.plan_timeout_sec`.
pub const MIN_PLAN_TIMEOUT_SEC: u64 = 60;
/// Upper bound for `safety.plan_timeout_sec`.
pub const MAX_PLAN_TIMEOUT_SEC: u64 = 3600;
/// Plan timeout used when none is configured.
pub const DEFAULT_PLAN_TIMEOUT_SEC: u64 = 300;

/// Env var naming an alternative overlay file.
const CONFIG_PATH_ENV: &str = "OPSGATE_CONFIG";
const DEFAULT_OVERLAY_PATH: &str = "~/.config/opsgate/config.toml";

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub workflow: WorkflowSettings,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub tools: Vec<ToolRules>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path; `~` and `$VARS` are expanded. Empty disables file logging.
    #[serde(default)]
    pub log_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

/// How much the engine may do without a human in the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyMode {
    /// Only read operations; everything else is rejected outright.
    ReadOnly,
    /// Mutations go through plan → review → approve.
    #[default]
    PlanMode,
    /// Everything runs unless dangerous or on the always-require list.
    FullAccess,
}

impl SafetyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SafetyMode::ReadOnly => "read-only",
            SafetyMode::PlanMode => "plan-mode",
            SafetyMode::FullAccess => "full-access",
        }
    }
}

impl fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SafetyConfig {
    #[serde(default)]
    pub mode: SafetyMode,
    /// Seconds a plan stays pending before it expires.
    #[serde(default = "default_plan_timeout")]
    pub plan_timeout_sec: u64,
    /// Case-insensitive substrings that force human approval regardless of mode.
    #[serde(default)]
    pub always_require_approval: Vec<String>,
    /// Auto-approve non-dangerous plans with impact `none` or `low`.
    #[serde(default)]
    pub auto_approve_low_impact: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_approvals: Option<ForwardApprovals>,
    /// Per-context exceptions, keyed by cluster / account / project name.
    #[serde(default)]
    pub context_overrides: BTreeMap<String, ContextOverride>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            mode: SafetyMode::default(),
            plan_timeout_sec: DEFAULT_PLAN_TIMEOUT_SEC,
            always_require_approval: ["delete", "destroy", "terminate", "drop", "rm -rf"]
                .into_iter()
                .map(String::from)
                .collect(),
            auto_approve_low_impact: false,
            forward_approvals: None,
            context_overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContextOverride {
    #[serde(default = "default_true")]
    pub require_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_operations: Option<Vec<OperationType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_impact_level: Option<ImpactLevel>,
}

impl Default for ContextOverride {
    fn default() -> Self {
        Self {
            require_approval: true,
            allowed_operations: None,
            max_impact_level: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardChannel {
    Slack,
    Telegram,
    Teams,
}

/// Where approval requests should be forwarded. Delivery itself is the
/// channel adapter's job.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ForwardApprovals {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ForwardChannel>,
    /// Channel-specific destination, e.g. "#ops-approvals" or a chat id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// User ids to mention when a plan is critical.
    #[serde(default)]
    pub mention_on_critical: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowSettings {
    /// Terminal plans (and decisions) retained for lookup.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub kubectl: KubectlExtractConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KubectlExtractConfig {
    /// Resource-type keywords recognized in `<type>/<name>` and `<type> <name>`.
    #[serde(default)]
    pub resource_types: Vec<String>,
}

/// One tool family's rule table. Patterns are regexes over the lower-cased command.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ToolRules {
    pub name: String,
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub mutate: Vec<String>,
    #[serde(default)]
    pub dangerous: Vec<String>,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_plan_timeout() -> u64 {
    DEFAULT_PLAN_TIMEOUT_SEC
}

fn default_history_limit() -> usize {
    100
}

fn default_true() -> bool {
    true
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    /// Tool tables to drop entirely, by name.
    #[serde(default)]
    remove_tools: Vec<String>,
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    safety: SafetyOverlay,
    #[serde(default)]
    workflow: WorkflowOverlay,
    #[serde(default)]
    extract: ExtractOverlay,
    #[serde(default)]
    tools: Vec<ToolRulesOverlay>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    log_level: Option<String>,
    log_file: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SafetyOverlay {
    mode: Option<SafetyMode>,
    plan_timeout_sec: Option<u64>,
    auto_approve_low_impact: Option<bool>,
    forward_approvals: Option<ForwardApprovals>,
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    always_require_approval: Vec<String>,
    #[serde(default)]
    remove_always_require_approval: Vec<String>,
    #[serde(default)]
    context_overrides: BTreeMap<String, ContextOverride>,
    #[serde(default)]
    remove_context_overrides: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WorkflowOverlay {
    history_limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ExtractOverlay {
    #[serde(default)]
    kubectl: KubectlExtractOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct KubectlExtractOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    resource_types: Vec<String>,
    #[serde(default)]
    remove_resource_types: Vec<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ToolRulesOverlay {
    name: String,
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    read: Vec<String>,
    #[serde(default)]
    mutate: Vec<String>,
    #[serde(default)]
    dangerous: Vec<String>,
    #[serde(default)]
    remove_read: Vec<String>,
    #[serde(default)]
    remove_mutate: Vec<String>,
    #[serde(default)]
    remove_dangerous: Vec<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the user overlay from `$OPSGATE_CONFIG` or
    ///    `~/.config/opsgate/config.toml` (if it exists)
    ///
    /// The merged result is validated before it is returned.
    pub fn load() -> ConfigResult<Self> {
        match Self::overlay_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default_config()),
        }
    }

    /// Defaults merged with the overlay file at `path`.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_overlay_str(&content)?;
        log::debug!("loaded config overlay from {}", path.display());
        Ok(config)
    }

    /// Defaults merged with an overlay given as TOML text.
    pub fn from_overlay_str(toml_str: &str) -> ConfigResult<Self> {
        let overlay: ConfigOverlay = toml::from_str(toml_str)?;
        let mut config = Self::default_config();
        config.apply_overlay(overlay);
        config.validate()?;
        Ok(config)
    }

    /// Resolve the overlay path, expanding `~` and env vars.
    fn overlay_path() -> Option<PathBuf> {
        let raw = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_OVERLAY_PATH.into());
        expand_path(&raw)
    }

    /// Resolved log file path, if file logging is configured.
    pub fn log_file_path(&self) -> Option<PathBuf> {
        if self.settings.log_file.trim().is_empty() {
            return None;
        }
        expand_path(&self.settings.log_file)
    }

    /// Check bounds and compile every rule pattern.
    pub fn validate(&self) -> ConfigResult<()> {
        let timeout = self.safety.plan_timeout_sec;
        if !(MIN_PLAN_TIMEOUT_SEC..=MAX_PLAN_TIMEOUT_SEC).contains(&timeout) {
            return Err(ConfigError::InvalidValue(format!(
                "safety.plan_timeout_sec must be within {MIN_PLAN_TIMEOUT_SEC}..={MAX_PLAN_TIMEOUT_SEC}, got {timeout}"
            )));
        }
        if self.workflow.history_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "workflow.history_limit must be at least 1".into(),
            ));
        }
        if let Some(tool) = self.tools.iter().find(|t| t.name.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(format!(
                "tool rule table without a name ({} patterns)",
                tool.read.len() + tool.mutate.len() + tool.dangerous.len()
            )));
        }
        RuleSet::from_config(&self.tools)?;
        Ok(())
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        // Settings: scalar overrides
        if let Some(v) = overlay.settings.log_level {
            self.settings.log_level = v;
        }
        if let Some(v) = overlay.settings.log_file {
            self.settings.log_file = v;
        }

        // Safety
        let s = overlay.safety;
        if let Some(v) = s.mode {
            self.safety.mode = v;
        }
        if let Some(v) = s.plan_timeout_sec {
            self.safety.plan_timeout_sec = v;
        }
        if let Some(v) = s.auto_approve_low_impact {
            self.safety.auto_approve_low_impact = v;
        }
        if let Some(v) = s.forward_approvals {
            self.safety.forward_approvals = Some(v);
        }
        merge_list(
            &mut self.safety.always_require_approval,
            s.always_require_approval,
            &s.remove_always_require_approval,
            s.replace,
        );
        if s.replace {
            self.safety.context_overrides.clear();
        }
        for key in &s.remove_context_overrides {
            self.safety.context_overrides.remove(key);
        }
        self.safety.context_overrides.extend(s.context_overrides);

        // Workflow
        if let Some(v) = overlay.workflow.history_limit {
            self.workflow.history_limit = v;
        }

        // Extract
        let k = overlay.extract.kubectl;
        merge_list(
            &mut self.extract.kubectl.resource_types,
            k.resource_types,
            &k.remove_resource_types,
            k.replace,
        );

        // Tools: merge by name, append unknown names
        self.tools
            .retain(|tool| !overlay.remove_tools.contains(&tool.name));
        for t in overlay.tools {
            match self.tools.iter_mut().find(|tool| tool.name == t.name) {
                Some(tool) => {
                    merge_list(&mut tool.read, t.read, &t.remove_read, t.replace);
                    merge_list(&mut tool.mutate, t.mutate, &t.remove_mutate, t.replace);
                    merge_list(
                        &mut tool.dangerous,
                        t.dangerous,
                        &t.remove_dangerous,
                        t.replace,
                    );
                }
                None => self.tools.push(ToolRules {
                    name: t.name,
                    read: t.read,
                    mutate: t.mutate,
                    dangerous: t.dangerous,
                }),
            }
        }
    }

    /// Apply an overlay from a TOML string without validation. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

/// Expand `~` and `$VARS` in a configured path.
fn expand_path(raw: &str) -> Option<PathBuf> {
    match shellexpand::full(raw) {
        Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
        Err(e) => {
            log::warn!("cannot expand path {raw}: {e}");
            None
        }
    }
}
