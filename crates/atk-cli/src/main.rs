//! `atk` command line
//!
//! Validates and runs scenario and feature files against the bundled demo
//! pipelines.

use anyhow::Context;
use atk_discovery::discover;
use atk_scenario::{
    FeatureLoader, Harness, HarnessConfig, LoadedScenario, LogFormat, PipelineEntry,
    PipelineTable, RunReport, ScenarioSource, SuiteRunner,
};
use atk_test_utils::{DemoPipelines, BATCH_NAMESPACE, PROMPT_ASYNC_NAMESPACE, PROMPT_NAMESPACE};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configured log filter
const LOG_ENV: &str = "ATK_LOG";

fn cli() -> Command {
    let files = Arg::new("files")
        .required(true)
        .num_args(1..)
        .value_parser(value_parser!(PathBuf))
        .help("Scenario (.json) and feature (.feature) files");

    Command::new("atk")
        .version(atk_scenario::VERSION)
        .about("Agent Test Kit: mock and verify multi-agent pipelines")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Harness config (TOML)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("validate")
                .about("Parse scenario files without running them")
                .arg(files.clone()),
        )
        .subcommand(
            Command::new("targets")
                .about("List targets discovered in a demo namespace")
                .arg(
                    Arg::new("namespace")
                        .required(true)
                        .help("Dotted namespace, e.g. demo.prompt"),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Run scenario files against the demo pipelines")
                .arg(files)
                .arg(
                    Arg::new("root-path")
                        .long("root-path")
                        .help("Namespace overriding every scenario's own"),
                )
                .arg(
                    Arg::new("async")
                        .long("async")
                        .action(ArgAction::SetTrue)
                        .help("Await pipeline runs (required for async pipelines)"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output report as JSON"),
                ),
        )
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    let code = match execute(&matches).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            2
        }
    };
    std::process::exit(code);
}

async fn execute(matches: &ArgMatches) -> anyhow::Result<i32> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => HarnessConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    init_logging(&config, matches.get_flag("json-logs"));
    tracing::debug!("Harness config: {:?}", config);

    match matches.subcommand() {
        Some(("validate", args)) => Ok(validate(&files(args))),
        Some(("targets", args)) => {
            let namespace = args
                .get_one::<String>("namespace")
                .context("namespace is required")?;
            Ok(targets(namespace))
        }
        Some(("run", args)) => {
            let mut loader = FeatureLoader::new();
            if let Some(root) = args.get_one::<String>("root-path") {
                loader = loader.with_root_path(root.clone());
            }
            let scenarios = loader.load_all(files(args))?;
            let report = run(config, &scenarios, args.get_flag("async")).await;
            if args.get_flag("json") {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report.generate_text());
            }
            Ok(i32::from(!report.passed()))
        }
        _ => Ok(0),
    }
}

fn files(args: &ArgMatches) -> Vec<PathBuf> {
    args.get_many::<PathBuf>("files")
        .map(|files| files.cloned().collect())
        .unwrap_or_default()
}

/// Logs go to stderr so reports on stdout stay machine-readable
fn init_logging(config: &HarnessConfig, json_flag: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_flag || config.log.format == LogFormat::Json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn validate(paths: &[PathBuf]) -> i32 {
    let loader = FeatureLoader::new();
    let mut failed = 0;
    for path in paths {
        match loader.load_file(path) {
            Ok(scenarios) => {
                let steps: usize = scenarios
                    .iter()
                    .map(|s| match &s.source {
                        ScenarioSource::Definition(_) => 0,
                        ScenarioSource::Feature(feature) => feature.steps.len(),
                    })
                    .sum();
                println!(
                    "OK   {} ({} scenario(s), {} step(s))",
                    path.display(),
                    scenarios.len(),
                    steps
                );
            }
            Err(err) => {
                failed += 1;
                println!("FAIL {}: {}", path.display(), err);
            }
        }
    }
    println!();
    println!("Validated {} file(s), {} failed", paths.len(), failed);
    i32::from(failed > 0)
}

fn targets(namespace: &str) -> i32 {
    let demo = DemoPipelines::install();
    let report = discover(&demo.catalog, namespace);

    println!("Namespace: {namespace}");
    println!("Modules scanned: {}", report.modules_scanned);
    println!("Modules skipped: {}", report.modules_skipped);
    println!();
    for target in report.registry.iter() {
        println!("  {:<10} {:<14} {}", target.name, target.kind, target.address);
    }
    for failure in &report.failures {
        println!("  skipped: {failure}");
    }
    i32::from(report.registry.is_empty())
}

/// Entry points of every bundled demo pipeline, keyed by namespace
fn demo_pipelines(demo: &DemoPipelines) -> PipelineTable {
    let prompt = demo.prompt.clone();
    let prompt_async = demo.prompt_async.clone();
    let batch = demo.batch.clone();
    PipelineTable::new()
        .with_pipeline(
            PROMPT_NAMESPACE,
            PipelineEntry::blocking(move |state| prompt.run(state)),
        )
        .with_pipeline(
            PROMPT_ASYNC_NAMESPACE,
            PipelineEntry::from_async(move |state| {
                let pipeline = prompt_async.clone();
                async move { pipeline.run(state).await }
            }),
        )
        .with_pipeline(
            BATCH_NAMESPACE,
            PipelineEntry::blocking(move |state| batch.run(state)),
        )
}

async fn run(config: HarnessConfig, scenarios: &[LoadedScenario], awaited: bool) -> RunReport {
    let demo = DemoPipelines::install();
    let harness = Harness::new(demo.catalog.clone(), demo.switchboard.clone()).with_config(config);
    let runner = SuiteRunner::new(harness, demo_pipelines(&demo));
    if awaited {
        runner.run_async(scenarios).await
    } else {
        runner.run(scenarios)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn run_accepts_global_flags_after_subcommand() {
        let matches = cli()
            .try_get_matches_from(["atk", "run", "a.json", "b.feature", "--async", "--json-logs"])
            .unwrap();
        assert!(matches.get_flag("json-logs"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert!(args.get_flag("async"));
        assert_eq!(files(args).len(), 2);
    }

    #[test]
    fn every_demo_namespace_has_a_pipeline() {
        let demo = DemoPipelines::install();
        let table = demo_pipelines(&demo);
        assert_eq!(
            table.names(),
            vec![BATCH_NAMESPACE, PROMPT_NAMESPACE, PROMPT_ASYNC_NAMESPACE]
        );
        assert!(table.resolve(Some(PROMPT_ASYNC_NAMESPACE)).unwrap().1.is_async());
    }
}
