//! kubectl resource extraction.
//!
//! Pulls the namespace (`-n`, `--namespace`, default "default") and a single
//! `<type>/<name>` or `<type> <name>` pair from the first positional after the
//! verb. Only resource types on the configured allow-list are recognized.

use super::{AffectedResource, CommandContext, ResourceParser};
use crate::config::KubectlExtractConfig;
use crate::parse;

/// Flags whose next word is a value, not a positional.
const VALUE_FLAGS: &[&str] = &[
    "-n",
    "--namespace",
    "--context",
    "--cluster",
    "--kubeconfig",
    "--user",
    "-l",
    "--selector",
    "--field-selector",
    "-o",
    "--output",
    "-f",
    "--filename",
    "-c",
    "--container",
    "--grace-period",
    "--timeout",
];

/// Verbs that take a second verb before the resource (`rollout restart deploy/web`).
const COMPOUND_VERBS: &[&str] = &["rollout", "set"];

const NAMESPACE_FLAGS: &[&str] = &["-n", "--namespace"];
const DEFAULT_NAMESPACE: &str = "default";

pub struct KubectlParser {
    /// Recognized resource-type keywords (lower-case).
    resource_types: Vec<String>,
}

impl KubectlParser {
    pub fn from_config(config: &KubectlExtractConfig) -> Self {
        Self {
            resource_types: config
                .resource_types
                .iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
        }
    }

    fn known_type(&self, word: &str) -> Option<String> {
        let lower = word.to_ascii_lowercase();
        self.resource_types.contains(&lower).then_some(lower)
    }
}

impl ResourceParser for KubectlParser {
    fn extract(&self, ctx: &CommandContext) -> Vec<AffectedResource> {
        let namespace = parse::flag_value(&ctx.words, NAMESPACE_FLAGS).unwrap_or(DEFAULT_NAMESPACE);

        let Some((verb, rest)) = parse::split_subcommand(ctx.args(), VALUE_FLAGS) else {
            return Vec::new();
        };
        let rest = if COMPOUND_VERBS.contains(&verb) {
            match parse::split_subcommand(rest, VALUE_FLAGS) {
                Some((_, rest)) => rest,
                None => return Vec::new(),
            }
        } else {
            rest
        };

        let positionals = parse::positionals(rest, VALUE_FLAGS);
        let Some(target) = positionals.first() else {
            return Vec::new();
        };

        let pair = match target.split_once('/') {
            Some((ty, name)) if !name.is_empty() => {
                self.known_type(ty).map(|ty| (ty, name.to_string()))
            }
            Some(_) => None,
            None => self
                .known_type(target)
                .zip(positionals.get(1).map(|n| n.to_string())),
        };

        match pair {
            Some((resource_type, name)) => vec![
                AffectedResource::new(resource_type, name)
                    .in_namespace(namespace)
                    .with_provider("kubernetes"),
            ],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn extract(cmd: &str) -> Vec<AffectedResource> {
        let parser = KubectlParser::from_config(&Config::default_config().extract.kubectl);
        parser.extract(&CommandContext::from_command(cmd))
    }

    fn single(cmd: &str) -> AffectedResource {
        let mut r = extract(cmd);
        assert_eq!(r.len(), 1, "command: {cmd}");
        r.remove(0)
    }

    #[test]
    fn type_slash_name() {
        let r = single("kubectl delete pod/web-7f9c -n shop");
        assert_eq!(r.resource_type, "pod");
        assert_eq!(r.name, "web-7f9c");
        assert_eq!(r.namespace.as_deref(), Some("shop"));
        assert_eq!(r.provider.as_deref(), Some("kubernetes"));
    }

    #[test]
    fn type_space_name() {
        let r = single("kubectl scale deployment api --replicas=3");
        assert_eq!(r.resource_type, "deployment");
        assert_eq!(r.name, "api");
        assert_eq!(r.namespace.as_deref(), Some("default"));
    }

    #[test]
    fn namespace_long_forms() {
        assert_eq!(
            single("kubectl delete --namespace=ops service gateway")
                .namespace
                .as_deref(),
            Some("ops")
        );
        assert_eq!(
            single("kubectl describe configmap settings --namespace infra")
                .namespace
                .as_deref(),
            Some("infra")
        );
    }

    #[test]
    fn flags_before_verb() {
        let r = single("kubectl -n prod delete secret db-creds");
        assert_eq!(r.resource_type, "secret");
        assert_eq!(r.name, "db-creds");
        assert_eq!(r.namespace.as_deref(), Some("prod"));
    }

    #[test]
    fn type_is_lowercased() {
        assert_eq!(single("kubectl get Pod web").resource_type, "pod");
    }

    #[test]
    fn rollout_restart() {
        let r = single("kubectl rollout restart deployment/web");
        assert_eq!(r.resource_type, "deployment");
        assert_eq!(r.name, "web");
    }

    #[test]
    fn namespace_resource() {
        let r = single("kubectl delete namespace staging");
        assert_eq!(r.resource_type, "namespace");
        assert_eq!(r.name, "staging");
    }

    #[test]
    fn unknown_type_ignored() {
        assert!(extract("kubectl get widgets foo").is_empty());
        assert!(extract("kubectl get crd/foo").is_empty());
    }

    #[test]
    fn type_without_name() {
        assert!(extract("kubectl get pods").is_empty());
        assert!(extract("kubectl get pod").is_empty());
        assert!(extract("kubectl get pod/").is_empty());
    }

    #[test]
    fn apply_file_yields_nothing() {
        assert!(extract("kubectl apply -f deploy.yaml").is_empty());
    }

    #[test]
    fn custom_allow_list() {
        let parser = KubectlParser::from_config(&KubectlExtractConfig {
            resource_types: vec!["Certificate".into()],
        });
        let r = parser.extract(&CommandContext::from_command(
            "kubectl delete certificate tls-web",
        ));
        assert_eq!(r[0].resource_type, "certificate");
        assert!(
            parser
                .extract(&CommandContext::from_command("kubectl delete pod web"))
                .is_empty()
        );
    }
}
