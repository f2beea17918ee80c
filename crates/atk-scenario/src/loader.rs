//! Declarative scenario files
//!
//! JSON scenario files describe the same builder chain as code: external
//! mocks, input state, agent responses, one pipeline run, expectations.
//! They are applied in exactly that order. A file holds one scenario object
//! or an array of them.
//!
//! ```json
//! {
//!   "root_path": "demo.prompt",
//!   "input_state": {"messages": [{"role": "user", "content": "hello"}]},
//!   "mock_api_calls": [{"api_path": "demo.prompt.requests.post",
//!                       "payload": {"url": "http://127.0.0.1:8004/api1/getdata1",
//!                                   "params": {"input": "hello"}},
//!                       "return_value": {"content": "hello"},
//!                       "api_type": "REQUESTS"}],
//!   "agent_responses": [{"agent_name": "agent1", "response_state": {"messages": []}}],
//!   "expect_agent_invocations": [{"agent_name": "agent1", "state": {"messages": []},
//!                                 "agent_type": "invoke", "ntimes": 1}]
//! }
//! ```

use crate::builder::ScenarioBuilder;
use crate::error::{HarnessError, LoadError};
use crate::pipeline::PipelineEntry;
use crate::steps::{FeatureDocument, FeatureScenario, StepParser};
use atk_core::{MethodTag, ParseTagError, ProtocolKind, Value};
use atk_runtime::TeardownError;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_API_TYPE: &str = "REQUESTS";
const DEFAULT_AGENT_TYPE: &str = "invoke";

/// One `mock_api_calls` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMock {
    /// Literal call address
    pub api_path: String,

    /// Payload the call must match; absent or `null` intercepts unconditionally
    #[serde(default)]
    pub payload: Option<Value>,

    /// Response
    #[serde(default)]
    pub return_value: Value,

    /// Protocol tag or library alias, `REQUESTS` when absent
    #[serde(default)]
    pub api_type: Option<String>,
}

impl ApiMock {
    /// Resolved protocol
    ///
    /// # Errors
    /// `ParseTagError` for an unknown tag.
    pub fn protocol(&self) -> Result<ProtocolKind, ParseTagError> {
        self.api_type.as_deref().unwrap_or(DEFAULT_API_TYPE).parse()
    }
}

/// One `agent_responses` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Agent name
    pub agent_name: String,

    /// Response
    #[serde(default)]
    pub response_state: Value,
}

/// One `tool_responses` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Tool name
    pub tool_name: String,

    /// Response
    #[serde(default)]
    pub response_state: Value,
}

/// One `expect_agent_invocations` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentExpectation {
    /// Target name
    pub agent_name: String,

    /// Expected sole argument; absent or `null` counts every call
    #[serde(default)]
    pub state: Option<Value>,

    /// Method variant, `invoke` when absent
    #[serde(default)]
    pub agent_type: Option<String>,

    /// Exact count, 1 when absent
    #[serde(default)]
    pub ntimes: Option<usize>,
}

impl AgentExpectation {
    /// Resolved method variant
    ///
    /// # Errors
    /// `ParseTagError` for an unknown tag.
    pub fn method(&self) -> Result<MethodTag, ParseTagError> {
        self.agent_type.as_deref().unwrap_or(DEFAULT_AGENT_TYPE).parse()
    }

    /// Resolved count
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.ntimes.unwrap_or(1)
    }
}

/// One declarative scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Namespace to discover targets in, also the pipeline to run
    #[serde(default)]
    pub root_path: Option<String>,

    /// Input state
    #[serde(default)]
    pub input_state: Value,

    /// External call mocks
    #[serde(default)]
    pub mock_api_calls: Vec<ApiMock>,

    /// Agent mocks
    #[serde(default)]
    pub agent_responses: Vec<AgentResponse>,

    /// Tool mocks
    #[serde(default)]
    pub tool_responses: Vec<ToolResponse>,

    /// Expectations checked after the run
    #[serde(default)]
    pub expect_agent_invocations: Vec<AgentExpectation>,
}

impl ScenarioDefinition {
    /// Check every protocol and method tag
    ///
    /// # Errors
    /// `LoadError::Tag` naming `origin`.
    pub fn validate(&self, origin: &str) -> Result<(), LoadError> {
        let tag_error = |source| LoadError::Tag {
            origin: origin.to_string(),
            source,
        };
        for mock in &self.mock_api_calls {
            mock.protocol().map_err(tag_error)?;
        }
        for expectation in &self.expect_agent_invocations {
            expectation.method().map_err(tag_error)?;
        }
        Ok(())
    }

    /// Apply the scenario, blocking on the pipeline run
    ///
    /// Teardown failures do not stop verification; they are returned for reporting.
    ///
    /// # Errors
    /// First declaration, run or expectation failure.
    pub fn execute(
        &self,
        builder: &mut ScenarioBuilder,
        pipeline: &str,
        entry: &PipelineEntry,
    ) -> Result<Vec<TeardownError>, HarnessError> {
        self.declare(builder)?;
        let teardown = settle(entry.run(pipeline, builder))?;
        self.verify(builder)?;
        Ok(teardown)
    }

    /// Apply the scenario, awaiting the pipeline run
    ///
    /// # Errors
    /// Same as [`ScenarioDefinition::execute`].
    pub async fn execute_async(
        &self,
        builder: &mut ScenarioBuilder,
        entry: &PipelineEntry,
    ) -> Result<Vec<TeardownError>, HarnessError> {
        self.declare(builder)?;
        let teardown = settle(entry.run_async(builder).await)?;
        self.verify(builder)?;
        Ok(teardown)
    }

    fn origin(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<scenario>".to_string())
    }

    fn declare(&self, builder: &mut ScenarioBuilder) -> Result<(), HarnessError> {
        for mock in &self.mock_api_calls {
            let protocol = mock.protocol().map_err(|source| LoadError::Tag {
                origin: self.origin(),
                source,
            })?;
            builder.mock_external_call(
                &mock.api_path,
                protocol,
                mock.payload.clone(),
                mock.return_value.clone(),
            )?;
        }
        builder.set_input(self.input_state.clone());
        for response in &self.agent_responses {
            builder.mock_agent_response(&response.agent_name, response.response_state.clone())?;
        }
        for response in &self.tool_responses {
            builder.mock_tool_response(&response.tool_name, response.response_state.clone())?;
        }
        Ok(())
    }

    fn verify(&self, builder: &mut ScenarioBuilder) -> Result<(), HarnessError> {
        for expectation in &self.expect_agent_invocations {
            let method = expectation.method().map_err(|source| LoadError::Tag {
                origin: self.origin(),
                source,
            })?;
            match &expectation.state {
                Some(state) => builder.expect_invocation(
                    &expectation.agent_name,
                    state.clone(),
                    method,
                    expectation.count(),
                )?,
                None => builder.expect_call_count(&expectation.agent_name, method, expectation.count())?,
            };
        }
        Ok(())
    }
}

/// Keep teardown failures aside, propagate everything else
pub(crate) fn settle(run: Result<(), HarnessError>) -> Result<Vec<TeardownError>, HarnessError> {
    match run {
        Ok(()) => Ok(Vec::new()),
        Err(HarnessError::Teardown(err)) => {
            tracing::error!("Teardown failed: {}", err);
            Ok(vec![err])
        }
        Err(err) => Err(err),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<ScenarioDefinition>),
    One(Box<ScenarioDefinition>),
}

/// Parsed JSON scenario file
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioFile {
    /// File path or `<inline>`
    pub origin: String,

    /// Scenarios in file order
    pub scenarios: Vec<ScenarioDefinition>,
}

impl ScenarioFile {
    /// Parse JSON text
    ///
    /// # Errors
    /// `LoadError::Json` when malformed, `LoadError::Tag` for unknown tags.
    pub fn from_str(text: &str, origin: impl Into<String>) -> Result<Self, LoadError> {
        let origin = origin.into();
        let parsed: OneOrMany = serde_json::from_str(text).map_err(|source| LoadError::Json {
            origin: origin.clone(),
            source,
        })?;
        let scenarios = match parsed {
            OneOrMany::Many(scenarios) => scenarios,
            OneOrMany::One(scenario) => vec![*scenario],
        };
        for scenario in &scenarios {
            scenario.validate(&origin)?;
        }
        Ok(Self { origin, scenarios })
    }

    /// Read and parse a JSON file
    ///
    /// # Errors
    /// `LoadError::Io` if unreadable, otherwise as [`ScenarioFile::from_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = read(path)?;
        Self::from_str(&text, path.display().to_string())
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Scenario body, by file format
#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioSource {
    /// From a JSON scenario file
    Definition(ScenarioDefinition),

    /// From a feature file
    Feature(FeatureScenario),
}

/// Scenario ready to run
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedScenario {
    /// Display name
    pub name: String,

    /// File path or `<inline>`
    pub origin: String,

    /// Namespace, configured default when `None`
    pub root_path: Option<String>,

    /// Scenario body
    pub source: ScenarioSource,
}

/// Loads scenario and feature files
#[derive(Debug, Clone, Default)]
pub struct FeatureLoader {
    root_path: Option<String>,
    parser: StepParser,
}

impl FeatureLoader {
    /// Create loader
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With namespace overriding every loaded scenario's own
    #[inline]
    #[must_use]
    pub fn with_root_path(mut self, root_path: impl Into<String>) -> Self {
        self.root_path = Some(root_path.into());
        self
    }

    /// With step parser for feature files
    #[inline]
    #[must_use]
    pub fn with_parser(mut self, parser: StepParser) -> Self {
        self.parser = parser;
        self
    }

    /// Load every file in order
    ///
    /// # Errors
    /// First file that fails to load.
    pub fn load_all<I, P>(&self, files: I) -> Result<Vec<LoadedScenario>, LoadError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut loaded = Vec::new();
        for file in files {
            loaded.extend(self.load_file(file.as_ref())?);
        }
        tracing::info!("Loaded {} scenario(s)", loaded.len());
        Ok(loaded)
    }

    /// Load one `.json` or `.feature` file
    ///
    /// # Errors
    /// `LoadError::UnsupportedFile` for other extensions, otherwise parse errors.
    pub fn load_file(&self, path: &Path) -> Result<Vec<LoadedScenario>, LoadError> {
        let origin = path.display().to_string();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => self.load_json_str(&read(path)?, &origin),
            Some("feature") => self.load_feature_str(&read(path)?, &origin),
            _ => Err(LoadError::UnsupportedFile {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Load scenarios from JSON text
    ///
    /// # Errors
    /// As [`ScenarioFile::from_str`].
    pub fn load_json_str(&self, text: &str, origin: &str) -> Result<Vec<LoadedScenario>, LoadError> {
        let file = ScenarioFile::from_str(text, origin)?;
        let stem = file_stem(origin);
        Ok(file
            .scenarios
            .into_iter()
            .enumerate()
            .map(|(index, mut definition)| {
                if let Some(root) = &self.root_path {
                    definition.root_path = Some(root.clone());
                }
                LoadedScenario {
                    name: definition
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("{stem}#{}", index + 1)),
                    origin: origin.to_string(),
                    root_path: definition.root_path.clone(),
                    source: ScenarioSource::Definition(definition),
                }
            })
            .collect())
    }

    /// Load scenarios from feature text
    ///
    /// # Errors
    /// `LoadError::Feature` on the first malformed line.
    pub fn load_feature_str(
        &self,
        text: &str,
        origin: &str,
    ) -> Result<Vec<LoadedScenario>, LoadError> {
        let doc = FeatureDocument::parse(text, &self.parser).map_err(|source| LoadError::Feature {
            origin: origin.to_string(),
            source,
        })?;
        Ok(doc
            .scenarios
            .iter()
            .map(|scenario| {
                let root_path = self
                    .root_path
                    .clone()
                    .or_else(|| scenario.root_path.clone())
                    .or_else(|| doc.root_path.clone())
                    .or_else(|| scenario.invoked_pipeline().map(str::to_string));
                let name = if doc.name.is_empty() {
                    scenario.name.clone()
                } else {
                    format!("{}: {}", doc.name, scenario.name)
                };
                LoadedScenario {
                    name,
                    origin: origin.to_string(),
                    root_path,
                    source: ScenarioSource::Feature(scenario.clone()),
                }
            })
            .collect())
    }
}

fn file_stem(origin: &str) -> &str {
    Path::new(origin)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const SINGLE: &str = r#"{
        "root_path": "demo.prompt",
        "input_state": {"messages": []},
        "mock_api_calls": [{"api_path": "svc.post", "payload": null, "return_value": 1}],
        "agent_responses": [{"agent_name": "agent1", "response_state": {"ok": true}}],
        "expect_agent_invocations": [{"agent_name": "agent1", "state": {"messages": []}}]
    }"#;

    #[test]
    fn single_object_with_defaults() {
        let file = ScenarioFile::from_str(SINGLE, "<inline>").unwrap();
        assert_eq!(file.scenarios.len(), 1);
        let scenario = &file.scenarios[0];
        assert_eq!(scenario.root_path.as_deref(), Some("demo.prompt"));
        assert_eq!(scenario.mock_api_calls[0].payload, None);
        assert_eq!(scenario.mock_api_calls[0].protocol().unwrap(), ProtocolKind::SyncHttp);

        let expectation = &scenario.expect_agent_invocations[0];
        assert_eq!(expectation.method().unwrap(), MethodTag::Invoke);
        assert_eq!(expectation.count(), 1);
    }

    #[test]
    fn array_of_scenarios() {
        let text = format!("[{SINGLE}, {{\"name\": \"second\"}}]");
        let file = ScenarioFile::from_str(&text, "<inline>").unwrap();
        assert_eq!(file.scenarios.len(), 2);
        assert_eq!(file.scenarios[1].name.as_deref(), Some("second"));
        assert_eq!(file.scenarios[1].input_state, Value::Null);
    }

    #[test]
    fn unknown_api_type_is_rejected_at_load() {
        let text = r#"{"mock_api_calls": [{"api_path": "a.b", "return_value": 1, "api_type": "WEBSOCKETS"}]}"#;
        let err = ScenarioFile::from_str(text, "bad.json").unwrap_err();
        assert!(matches!(err, LoadError::Tag { ref origin, .. } if origin == "bad.json"));
    }

    #[test]
    fn unknown_agent_type_is_rejected_at_load() {
        let text = r#"{"expect_agent_invocations": [{"agent_name": "a", "agent_type": "stream"}]}"#;
        assert!(matches!(
            ScenarioFile::from_str(text, "<inline>"),
            Err(LoadError::Tag { .. })
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            ScenarioFile::from_str("{", "<inline>"),
            Err(LoadError::Json { .. })
        ));
    }

    #[test]
    fn loader_overrides_root_path_and_names_scenarios() {
        let loaded = FeatureLoader::new()
            .with_root_path("demo.batch")
            .load_json_str(&format!("[{SINGLE}, {SINGLE}]"), "suite/chain.json")
            .unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].name, "chain#2");
        assert_eq!(loaded[0].root_path.as_deref(), Some("demo.batch"));
        let ScenarioSource::Definition(definition) = &loaded[0].source else {
            panic!("expected json scenario");
        };
        assert_eq!(definition.root_path.as_deref(), Some("demo.batch"));
    }

    #[test]
    fn feature_root_path_falls_back_to_invoked_pipeline() {
        let text = "Feature: f\nScenario: s\n  When the user sends '{}' and invokes the 'demo.prompt' orchestrator\n";
        let loaded = FeatureLoader::new().load_feature_str(text, "<inline>").unwrap();
        assert_eq!(loaded[0].name, "f: s");
        assert_eq!(loaded[0].root_path.as_deref(), Some("demo.prompt"));
    }

    #[test]
    fn load_files_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("one.json");
        std::fs::File::create(&json_path)
            .unwrap()
            .write_all(SINGLE.as_bytes())
            .unwrap();
        let feature_path = dir.path().join("two.feature");
        std::fs::write(&feature_path, "Feature: f\nScenario: a\nScenario: b\n").unwrap();
        let yaml_path = dir.path().join("three.yaml");
        std::fs::write(&yaml_path, "x: 1").unwrap();

        let loader = FeatureLoader::new();
        let loaded = loader.load_all([&json_path, &feature_path]).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(matches!(loaded[0].source, ScenarioSource::Definition(_)));
        assert!(matches!(loaded[2].source, ScenarioSource::Feature(_)));

        assert!(matches!(
            loader.load_file(&yaml_path),
            Err(LoadError::UnsupportedFile { .. })
        ));
        assert!(matches!(
            loader.load_file(&dir.path().join("missing.json")),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn feature_errors_name_the_file() {
        let err = FeatureLoader::new()
            .load_feature_str("Given agent a will respond with '1'", "x.feature")
            .unwrap_err();
        assert!(err.to_string().contains("x.feature"));
        assert!(matches!(
            err,
            LoadError::Feature {
                source: crate::error::StepError::OutsideScenario { line: 1 },
                ..
            }
        ));
    }
}
