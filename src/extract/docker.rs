use super::{AffectedResource, CommandContext, ResourceParser};
use crate::parse;

/// Global flags taking a value (before the subcommand).
const GLOBAL_VALUE_FLAGS: &[&str] = &["--context", "-c", "-H", "--host", "--config", "-l", "--log-level"];

/// Verbs that act on a container identifier.
const CONTAINER_VERBS: &[&str] = &["stop", "start", "restart", "kill", "rm", "exec", "logs", "inspect"];

/// Verbs that act on an image reference.
const IMAGE_VERBS: &[&str] = &["rmi", "push", "pull"];

/// Per-verb flags that consume the next word.
fn verb_value_flags(verb: &str) -> &'static [&'static str] {
    match verb {
        "stop" | "restart" => &["-t", "--time", "-s", "--signal"],
        "kill" => &["-s", "--signal"],
        "exec" => &["-e", "--env", "--env-file", "-u", "--user", "-w", "--workdir"],
        "logs" => &["--since", "--until", "-n", "--tail"],
        "inspect" => &["-f", "--format", "--type"],
        "push" | "pull" => &["--platform"],
        "build" => &[
            "-t",
            "--tag",
            "-f",
            "--file",
            "--build-arg",
            "--target",
            "--platform",
            "--network",
            "--label",
        ],
        _ => &[],
    }
}

/// Management-syntax translation: `docker container rm` → `rm`, `docker image push` → `push`.
fn normalize_verb<'a>(group: &str, verb: &'a str) -> &'a str {
    match (group, verb) {
        ("image", "rm") => "rmi",
        _ => verb,
    }
}

pub struct DockerParser;

impl ResourceParser for DockerParser {
    fn extract(&self, ctx: &CommandContext) -> Vec<AffectedResource> {
        let Some((first, rest)) = parse::split_subcommand(ctx.args(), GLOBAL_VALUE_FLAGS) else {
            return Vec::new();
        };
        let (verb, rest) = match first {
            "container" | "image" => match parse::split_subcommand(rest, &[]) {
                Some((sub, rest)) => (normalize_verb(first, sub), rest),
                None => return Vec::new(),
            },
            _ => (first, rest),
        };

        let mut resources = Vec::new();

        if CONTAINER_VERBS.contains(&verb)
            && let Some(name) = parse::positionals(rest, verb_value_flags(verb)).first()
        {
            resources.push(AffectedResource::new("container", *name).with_provider("docker"));
        }

        let image = if IMAGE_VERBS.contains(&verb) {
            parse::positionals(rest, verb_value_flags(verb))
                .first()
                .copied()
        } else if verb == "build" {
            parse::flag_value(rest, &["-t", "--tag"])
        } else {
            None
        };
        if let Some(name) = image {
            resources.push(AffectedResource::new("image", name).with_provider("docker"));
        }

        resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(cmd: &str) -> Vec<AffectedResource> {
        DockerParser.extract(&CommandContext::from_command(cmd))
    }

    fn names(cmd: &str) -> Vec<(String, String)> {
        extract(cmd)
            .into_iter()
            .map(|r| (r.resource_type, r.name))
            .collect()
    }

    fn pair(ty: &str, name: &str) -> (String, String) {
        (ty.to_string(), name.to_string())
    }

    #[test]
    fn container_verbs() {
        for verb in CONTAINER_VERBS {
            assert_eq!(
                names(&format!("docker {verb} web")),
                vec![pair("container", "web")],
                "verb: {verb}"
            );
        }
    }

    #[test]
    fn skips_flags_before_container() {
        assert_eq!(names("docker rm -f web"), vec![pair("container", "web")]);
        assert_eq!(names("docker stop -t 30 api"), vec![pair("container", "api")]);
        assert_eq!(names("docker logs --tail 100 -f api"), vec![pair("container", "api")]);
        assert_eq!(
            names("docker exec -it -e FOO=1 api sh"),
            vec![pair("container", "api")]
        );
    }

    #[test]
    fn image_verbs() {
        assert_eq!(names("docker pull nginx:1.27"), vec![pair("image", "nginx:1.27")]);
        assert_eq!(
            names("docker push registry.local/app:v2"),
            vec![pair("image", "registry.local/app:v2")]
        );
        assert_eq!(names("docker rmi old:latest"), vec![pair("image", "old:latest")]);
    }

    #[test]
    fn build_tag() {
        assert_eq!(names("docker build -t app:dev ."), vec![pair("image", "app:dev")]);
        assert_eq!(
            names("docker build --tag=app:ci -f Dockerfile.ci ."),
            vec![pair("image", "app:ci")]
        );
        assert!(extract("docker build .").is_empty());
    }

    #[test]
    fn management_syntax() {
        assert_eq!(names("docker container stop web"), vec![pair("container", "web")]);
        assert_eq!(names("docker image rm old:1"), vec![pair("image", "old:1")]);
        assert_eq!(names("docker image push app:2"), vec![pair("image", "app:2")]);
    }

    #[test]
    fn global_flags() {
        assert_eq!(
            names("docker --context prod restart gateway"),
            vec![pair("container", "gateway")]
        );
        assert_eq!(
            names("docker -H tcp://10.0.0.5:2375 kill worker"),
            vec![pair("container", "worker")]
        );
    }

    #[test]
    fn provider_is_docker() {
        let r = extract("docker stop web");
        assert_eq!(r[0].provider.as_deref(), Some("docker"));
        assert!(r[0].namespace.is_none());
    }

    #[test]
    fn nothing_recognized() {
        assert!(extract("docker ps -a").is_empty());
        assert!(extract("docker images").is_empty());
        assert!(extract("docker stop").is_empty());
        assert!(extract("docker").is_empty());
    }
}
