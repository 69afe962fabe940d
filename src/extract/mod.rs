//! Resource extraction: which concrete resources a command touches.
//!
//! Each tool family (kubectl, docker, terraform) has its own
//! [`ResourceParser`] implementation. Parsers never fail; a command they
//! cannot make sense of simply yields no resources.

pub mod context;
/// Container and image extraction for the docker CLI.
pub mod docker;
/// Namespace and `<type>/<name>` extraction for kubectl.
pub mod kubectl;
/// `-target` extraction for terraform.
pub mod terraform;

pub use context::CommandContext;

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// A resource a command is expected to touch. Descriptive only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AffectedResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl AffectedResource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            namespace: None,
            provider: None,
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

/// Trait for per-tool resource parsers.
pub trait ResourceParser: Send + Sync {
    /// Extract the resources named by the command. Empty when nothing is recognized.
    fn extract(&self, ctx: &CommandContext) -> Vec<AffectedResource>;
}

/// Registry of resource parsers, keyed by tool name.
pub struct ExtractorRegistry {
    parsers: HashMap<String, Box<dyn ResourceParser>>,
}

impl ExtractorRegistry {
    /// Build the registry from configuration.
    pub fn from_config(config: &Config) -> Self {
        use docker::DockerParser;
        use kubectl::KubectlParser;
        use terraform::TerraformParser;

        let mut parsers: HashMap<String, Box<dyn ResourceParser>> = HashMap::new();
        parsers.insert(
            "kubectl".into(),
            Box::new(KubectlParser::from_config(&config.extract.kubectl)),
        );
        parsers.insert("docker".into(), Box::new(DockerParser));
        parsers.insert("terraform".into(), Box::new(TerraformParser));
        Self { parsers }
    }

    /// Register (or replace) the parser for a tool.
    pub fn register(&mut self, tool: impl Into<String>, parser: Box<dyn ResourceParser>) {
        self.parsers.insert(tool.into(), parser);
    }

    /// Extract resources, dispatching on the command's tool name.
    pub fn extract(&self, command: &str) -> Vec<AffectedResource> {
        let ctx = CommandContext::from_command(command);
        match self.parsers.get(&ctx.tool) {
            Some(parser) => parser.extract(&ctx),
            None => Vec::new(),
        }
    }
}

static DEFAULT_REGISTRY: LazyLock<ExtractorRegistry> =
    LazyLock::new(|| ExtractorRegistry::from_config(&Config::default_config()));

/// Extract resources using the default parsers.
pub fn extract_resources(command: &str) -> Vec<AffectedResource> {
    DEFAULT_REGISTRY.extract(command)
}
