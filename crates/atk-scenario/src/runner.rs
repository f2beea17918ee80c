//! Suite runner over loaded scenario files

use crate::builder::{Harness, ScenarioBuilder};
use crate::error::HarnessError;
use crate::loader::{LoadedScenario, ScenarioSource};
use crate::pipeline::PipelineTable;
use crate::report::{RunReport, ScenarioReport, ScenarioStatus};
use crate::steps::{StepParser, StepRunner};
use atk_runtime::TeardownError;
use std::time::Instant;

/// Runs [`LoadedScenario`]s one after another against a [`Harness`]
///
/// Each scenario gets a fresh builder over the targets discovered under its
/// namespace. The pipeline registered under that namespace (or the table's
/// default) is the one run.
#[derive(Debug, Clone)]
pub struct SuiteRunner {
    harness: Harness,
    pipelines: PipelineTable,
    parser: StepParser,
}

impl SuiteRunner {
    /// Create runner
    #[must_use]
    pub fn new(harness: Harness, pipelines: PipelineTable) -> Self {
        Self {
            harness,
            pipelines,
            parser: StepParser::default(),
        }
    }

    /// With step parser for feature scenarios
    #[inline]
    #[must_use]
    pub fn with_parser(mut self, parser: StepParser) -> Self {
        self.parser = parser;
        self
    }

    /// Harness scenarios run against
    #[inline]
    #[must_use]
    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    /// Run every scenario, blocking on pipeline runs
    #[must_use]
    pub fn run(&self, scenarios: &[LoadedScenario]) -> RunReport {
        RunReport {
            scenarios: scenarios.iter().map(|s| self.run_one(s)).collect(),
        }
    }

    /// Run every scenario, awaiting pipeline runs
    pub async fn run_async(&self, scenarios: &[LoadedScenario]) -> RunReport {
        let mut report = RunReport::default();
        for scenario in scenarios {
            report.scenarios.push(self.run_one_async(scenario).await);
        }
        report
    }

    /// Run one scenario, blocking
    #[must_use]
    pub fn run_one(&self, scenario: &LoadedScenario) -> ScenarioReport {
        let started = Instant::now();
        let (namespace, mut builder, pipelines) = self.prepare(scenario);
        let outcome = match &scenario.source {
            ScenarioSource::Definition(definition) => pipelines
                .resolve(None)
                .map_err(HarnessError::from)
                .and_then(|(name, entry)| definition.execute(&mut builder, name, entry)),
            ScenarioSource::Feature(feature) => StepRunner::new(pipelines)
                .with_parser(self.parser)
                .run_scenario(&mut builder, feature),
        };
        conclude(scenario, namespace, &mut builder, outcome, started)
    }

    /// Run one scenario, awaiting
    pub async fn run_one_async(&self, scenario: &LoadedScenario) -> ScenarioReport {
        let started = Instant::now();
        let (namespace, mut builder, pipelines) = self.prepare(scenario);
        let outcome = match &scenario.source {
            ScenarioSource::Definition(definition) => match pipelines.resolve(None) {
                Ok((_, entry)) => definition.execute_async(&mut builder, entry).await,
                Err(err) => Err(err.into()),
            },
            ScenarioSource::Feature(feature) => {
                StepRunner::new(pipelines)
                    .with_parser(self.parser)
                    .run_scenario_async(&mut builder, feature)
                    .await
            }
        };
        conclude(scenario, namespace, &mut builder, outcome, started)
    }

    fn prepare(&self, scenario: &LoadedScenario) -> (String, ScenarioBuilder, PipelineTable) {
        let namespace = scenario
            .root_path
            .clone()
            .unwrap_or_else(|| self.harness.config().default_namespace.clone());
        tracing::info!("Running scenario '{}' in namespace {}", scenario.name, namespace);

        let builder = self.harness.scenario(&namespace);
        let pipelines = if self.pipelines.contains(&namespace) {
            self.pipelines.clone().with_default(namespace.clone())
        } else {
            self.pipelines.clone()
        };
        (namespace, builder, pipelines)
    }
}

fn conclude(
    scenario: &LoadedScenario,
    namespace: String,
    builder: &mut ScenarioBuilder,
    outcome: Result<Vec<TeardownError>, HarnessError>,
    started: Instant,
) -> ScenarioReport {
    let (calls, rejections) = builder
        .ledger()
        .map_or((0, 0), |ledger| (ledger.len(), ledger.rejections().count()));
    let (status, error, warnings) = match outcome {
        Ok(teardown) => (
            ScenarioStatus::Passed,
            None,
            teardown.iter().map(ToString::to_string).collect(),
        ),
        Err(err) => (
            ScenarioStatus::Failed,
            Some(err.to_string()),
            err.teardown().map(ToString::to_string).into_iter().collect(),
        ),
    };
    match &error {
        None => tracing::info!("Scenario '{}' passed", scenario.name),
        Some(err) => tracing::warn!("Scenario '{}' failed: {}", scenario.name, err),
    }

    let declared = builder.teardown();
    ScenarioReport {
        name: scenario.name.clone(),
        origin: scenario.origin.clone(),
        namespace,
        status,
        error,
        warnings,
        mocks: declared.mocks().len(),
        expectations: declared.expectations().len(),
        calls,
        rejections,
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}
