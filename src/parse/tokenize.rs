/// Split leading `VAR=value` assignments off a command.
///
/// Returns the assignments and the remainder starting at the first real word.
fn split_env_prefix(command: &str) -> (Vec<(String, String)>, &str) {
    let mut vars = Vec::new();
    let mut rest = command.trim();
    while let Some(eq_pos) = rest.find('=') {
        let key = &rest[..eq_pos];
        let is_name = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && key
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !is_name {
            break;
        }
        let after_eq = &rest[eq_pos + 1..];
        let Some(sp) = after_eq.find(char::is_whitespace) else {
            break;
        };
        vars.push((key.to_string(), after_eq[..sp].to_string()));
        rest = after_eq[sp..].trim_start();
    }
    (vars, rest)
}

/// Extract the tool name: the first real word, skipping leading VAR=value
/// assignments, reduced to its basename and lower-cased.
pub fn base_command(command: &str) -> String {
    let (_, rest) = split_env_prefix(command);
    let word = rest.split_whitespace().next().unwrap_or("");
    // /usr/local/bin/kubectl → kubectl
    let name = match word.rsplit_once('/') {
        Some((_, name)) if !name.is_empty() => name,
        _ => word,
    };
    name.to_ascii_lowercase()
}

/// Extract leading KEY=VALUE pairs from a command string.
// TODO: quoted values like FOO="bar baz" are cut at the first whitespace.
pub fn env_vars(command: &str) -> Vec<(String, String)> {
    split_env_prefix(command).0
}

/// Tokenize a command into words using shlex (POSIX word splitting),
/// dropping any leading VAR=value assignments.
pub fn tokenize(command: &str) -> Vec<String> {
    let (_, rest) = split_env_prefix(command);
    shlex::split(rest).unwrap_or_else(|| {
        // Unbalanced quotes: fall back to whitespace splitting
        rest.split_whitespace().map(String::from).collect()
    })
}

/// Value of a flag given as `--flag value`, `--flag=value` or `-f value`.
///
/// Returns the first occurrence.
pub fn flag_value<'a>(words: &'a [String], names: &[&str]) -> Option<&'a str> {
    flag_values(words, names).into_iter().next()
}

/// Every value of a repeatable flag, in order of appearance.
pub fn flag_values<'a>(words: &'a [String], names: &[&str]) -> Vec<&'a str> {
    let mut values = Vec::new();
    let mut iter = words.iter();
    while let Some(word) = iter.next() {
        if names.contains(&word.as_str()) {
            if let Some(value) = iter.next() {
                values.push(value.as_str());
            }
            continue;
        }
        if let Some((flag, value)) = word.split_once('=')
            && names.contains(&flag)
            && !value.is_empty()
        {
            values.push(value);
        }
    }
    values
}

/// Non-flag words, skipping the value that follows any flag in `value_flags`.
pub fn positionals<'a>(words: &'a [String], value_flags: &[&str]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut iter = words.iter();
    while let Some(word) = iter.next() {
        if word.starts_with('-') {
            if value_flags.contains(&word.as_str()) {
                iter.next();
            }
            continue;
        }
        out.push(word.as_str());
    }
    out
}

/// Split off the first non-flag word (a subcommand), skipping the value that
/// follows any flag in `value_flags`. Returns the subcommand and the words after it.
pub fn split_subcommand<'a>(
    words: &'a [String],
    value_flags: &[&str],
) -> Option<(&'a str, &'a [String])> {
    let mut i = 0;
    while i < words.len() {
        let word = &words[i];
        if word.starts_with('-') {
            i += if value_flags.contains(&word.as_str()) { 2 } else { 1 };
            continue;
        }
        return Some((word.as_str(), &words[i + 1..]));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(cmd: &str) -> Vec<String> {
        tokenize(cmd)
    }

    #[test]
    fn base_command_simple() {
        assert_eq!(base_command("kubectl get pods"), "kubectl");
    }

    #[test]
    fn base_command_with_env() {
        assert_eq!(
            base_command("KUBECONFIG=~/.kube/staging kubectl apply -f x.yaml"),
            "kubectl"
        );
    }

    #[test]
    fn base_command_absolute_path() {
        assert_eq!(base_command("/usr/local/bin/terraform plan"), "terraform");
    }

    #[test]
    fn base_command_lowercases() {
        assert_eq!(base_command("Docker ps"), "docker");
    }

    #[test]
    fn base_command_empty() {
        assert_eq!(base_command(""), "");
    }

    #[test]
    fn env_vars_multiple() {
        let vars = env_vars("AWS_PROFILE=prod AWS_REGION=eu-west-1 aws s3 ls");
        assert_eq!(
            vars,
            vec![
                ("AWS_PROFILE".into(), "prod".into()),
                ("AWS_REGION".into(), "eu-west-1".into())
            ]
        );
    }

    #[test]
    fn env_vars_none() {
        assert!(env_vars("docker ps --all").is_empty());
    }

    #[test]
    fn tokenize_drops_env_prefix() {
        assert_eq!(
            tokenize("FOO=bar docker logs 'my app'"),
            vec!["docker", "logs", "my app"]
        );
    }

    #[test]
    fn flag_value_forms() {
        let w = words("kubectl get pods -n kube-system");
        assert_eq!(flag_value(&w, &["-n", "--namespace"]), Some("kube-system"));
        let w = words("kubectl get pods --namespace=monitoring");
        assert_eq!(flag_value(&w, &["-n", "--namespace"]), Some("monitoring"));
        let w = words("kubectl get pods");
        assert_eq!(flag_value(&w, &["-n", "--namespace"]), None);
    }

    #[test]
    fn flag_values_repeatable() {
        let w = words("terraform apply -target=a.b -target c.d");
        assert_eq!(flag_values(&w, &["-target"]), vec!["a.b", "c.d"]);
    }

    #[test]
    fn split_subcommand_skips_global_flags() {
        let w = words("--context prod rm -f web");
        let (verb, rest) = split_subcommand(&w, &["--context"]).unwrap();
        assert_eq!(verb, "rm");
        assert_eq!(rest, ["-f", "web"]);
        assert!(split_subcommand(&words("--help"), &[]).is_none());
    }

    #[test]
    fn positionals_skip_flag_values() {
        let w = words("kubectl -n prod delete pod web-1 --grace-period=0");
        assert_eq!(
            positionals(&w, &["-n"]),
            vec!["kubectl", "delete", "pod", "web-1"]
        );
    }
}
