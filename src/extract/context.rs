use crate::parse;

/// A command prepared for resource extraction.
#[derive(Debug)]
pub struct CommandContext<'a> {
    /// The full command text, as submitted (original case).
    pub raw: &'a str,
    /// The tool name (e.g. "kubectl", "docker"), lower-cased.
    pub tool: String,
    /// All words in the command (tokenized via shlex), env prefixes removed.
    pub words: Vec<String>,
}

impl<'a> CommandContext<'a> {
    /// Build a CommandContext from a raw command string.
    pub fn from_command(raw: &'a str) -> Self {
        Self {
            raw,
            tool: parse::base_command(raw),
            words: parse::tokenize(raw),
        }
    }

    /// Words after the tool name.
    pub fn args(&self) -> &[String] {
        self.words.get(1..).unwrap_or(&[])
    }

    /// Check if any word matches a flag exactly.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.words.iter().any(|w| w == flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_from_env_prefixed_command() {
        let ctx = CommandContext::from_command("KUBECONFIG=/tmp/k kubectl get pods");
        assert_eq!(ctx.tool, "kubectl");
        assert_eq!(ctx.args(), ["get", "pods"]);
    }

    #[test]
    fn args_empty_for_bare_tool() {
        let ctx = CommandContext::from_command("docker");
        assert!(ctx.args().is_empty());
        assert!(!ctx.has_flag("-f"));
    }
}
