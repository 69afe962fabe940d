//! opsgate CLI: evaluates one infrastructure command.
//!
//! Reads a JSON request from stdin, writes the classification, the plan,
//! the policy outcome and the rendered plan text to stdout as JSON.
//!
//! ```text
//! echo '{"command":"kubectl delete pod web -n shop"}' | opsgate
//! opsgate --classify kubectl get pods
//! opsgate --dump-config
//! ```

use std::fmt::Display;
use std::io::Read;

use serde::{Deserialize, Serialize};

use opsgate::config::Config;
use opsgate::workflow::ForwardTarget;
use opsgate::{
    Analyzer, ClassificationResult, CreatePlanOptions, Plan, PolicyOutcome, Workflow, format_plan,
    logging, parse,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Request {
    command: String,
    #[serde(default)]
    request: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    requester_id: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    dry_run_output: Option<String>,
}

#[derive(Debug, Serialize)]
struct Response {
    classification: ClassificationResult,
    plan: Plan,
    policy: PolicyOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    forward: Option<ForwardTarget>,
    text: String,
}

fn fail(msg: impl Display) -> ! {
    eprintln!("opsgate: {msg}");
    std::process::exit(1);
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => fail(format_args!("cannot serialize output: {e}")),
    }
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = Config::load().unwrap_or_else(|e| fail(e));
    logging::init(&config);
    let analyzer = Analyzer::from_config(&config).unwrap_or_else(|e| fail(e));

    match args.first().map(String::as_str) {
        Some("--dump-config") => match toml::to_string_pretty(&config) {
            Ok(s) => print!("{s}"),
            Err(e) => fail(format_args!("cannot serialize config: {e}")),
        },
        Some("--classify") => {
            let command = args[1..].join(" ");
            if command.trim().is_empty() {
                fail("--classify needs a command");
            }
            print_json(&analyzer.classify(&command));
        }
        Some(other) => fail(format_args!(
            "unknown argument '{other}' (expected --classify or --dump-config)"
        )),
        None => evaluate_stdin(&config, &analyzer),
    }
}

fn evaluate_stdin(config: &Config, analyzer: &Analyzer) {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        fail(format_args!("failed to read stdin: {e}"));
    }
    let req: Request =
        serde_json::from_str(&input).unwrap_or_else(|e| fail(format_args!("JSON parse error: {e}")));

    let command = req.command.trim().to_string();
    if command.is_empty() {
        fail("request has an empty command");
    }

    let mut options = CreatePlanOptions::new(
        command.clone(),
        req.request.unwrap_or_else(|| command.clone()),
    )
    .timeout_sec(config.safety.plan_timeout_sec);
    options.channel = req.channel;
    options.requester_id = req.requester_id;
    options.dry_run_output = req.dry_run_output;
    options.context = req.context.or_else(|| parse::context_key(&command));

    let classification = analyzer.classify(&command);
    let plan = analyzer.create_plan(options);

    let workflow = Workflow::new(config);
    let submission = workflow.submit(plan).unwrap_or_else(|e| fail(e));

    print_json(&Response {
        classification,
        text: format_plan(&submission.plan),
        plan: submission.plan,
        policy: submission.outcome,
        forward: submission.forward,
    });
}
