//! Behavior-style step vocabulary
//!
//! Maps plain-language steps onto the same builder operations a test author
//! would chain by hand. Step arguments are data literals (see
//! [`crate::parse_literal`]).
//!
//! # Vocabulary
//!
//! ```text
//! the api_path "<address>" with payload '<literal>' is mocked to return_value '<literal>' [via <protocol>]
//! the api_path "<address>" is mocked to return_value '<literal>' [via <protocol>]
//! agent <name> will respond with '<literal>'
//! tool <name> will respond with '<literal>'
//! the user sends '<literal>' [and invokes the '<pipeline>' orchestrator]
//! agent <name> should be invoked with messages containing '<literal>'
//! agent <name> should be invoked <n> time(s) [via <method>] with '<literal>'
//! agent|tool <name> should be called <n> time(s) [via <method>]
//! the api_path "<address>" should be called <n> time(s)
//! ```
//!
//! Feature text groups steps under `Scenario:` headers; `Background:` steps
//! are prepended to every scenario, `And`/`But` repeat the previous keyword,
//! `#` starts a comment and `@root_path=<namespace>` tags pick the namespace.

use crate::builder::ScenarioBuilder;
use crate::error::{HarnessError, StepError};
use crate::literal::parse_literal;
use crate::loader::settle;
use crate::pipeline::PipelineTable;
use atk_core::{MethodTag, ProtocolKind, Value};
use atk_runtime::TeardownError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

static MOCK_API: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^the api_path "(?P<address>[^"]+)"(?: with payload '(?P<payload>.*)')? is mocked to return_value '(?P<value>.*)'(?: via (?P<protocol>[\w-]+))?$"#,
    )
    .expect("valid step pattern")
});

static MOCK_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<role>agent|tool) (?P<name>[\w.-]+) will respond with '(?P<value>.*)'$")
        .expect("valid step pattern")
});

static SEND_AND_INVOKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^the user sends '(?P<message>.*)' and invokes the '(?P<pipeline>[^']+)' orchestrator$")
        .expect("valid step pattern")
});

static SEND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^the user sends '(?P<message>.*)'$")
        .expect("valid step pattern")
});

static EXPECT_MESSAGES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^agent (?P<name>[\w.-]+) should be invoked with messages containing '(?P<expected>.*)'$")
        .expect("valid step pattern")
});

static EXPECT_INVOKED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:agent|tool) (?P<name>[\w.-]+) should be invoked (?P<count>\d+) times?(?: via (?P<method>\w+))? with '(?P<expected>.*)'$",
    )
    .expect("valid step pattern")
});

static EXPECT_CALLED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:agent|tool) (?P<name>[\w.-]+) should be called (?P<count>\d+) times?(?: via (?P<method>\w+))?$")
        .expect("valid step pattern")
});

static EXPECT_EXTERNAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^the api_path "(?P<address>[^"]+)" should be called (?P<count>\d+) times?$"#)
        .expect("valid step pattern")
});

/// Step keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepKeyword {
    /// Precondition
    Given,
    /// Action
    When,
    /// Outcome
    Then,
    /// Repeats the previous keyword
    And,
    /// Repeats the previous keyword
    But,
}

impl StepKeyword {
    /// Check if the keyword continues the previous step
    #[inline]
    #[must_use]
    pub fn is_continuation(&self) -> bool {
        matches!(self, Self::And | Self::But)
    }

    /// Split `Keyword rest` into keyword and rest
    #[must_use]
    pub fn split(line: &str) -> Option<(Self, &str)> {
        let (word, rest) = line.split_once(char::is_whitespace)?;
        let keyword = word.parse().ok()?;
        Some((keyword, rest.trim()))
    }
}

impl FromStr for StepKeyword {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Given" => Ok(Self::Given),
            "When" => Ok(Self::When),
            "Then" => Ok(Self::Then),
            "And" => Ok(Self::And),
            "But" => Ok(Self::But),
            _ => Err(()),
        }
    }
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One parsed step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Intercept an external call
    MockExternal {
        /// Literal call address
        address: String,
        /// Payload the call must match, `None` for unconditional
        payload: Option<Value>,
        /// Response
        return_value: Value,
        /// Protocol of the call site
        protocol: ProtocolKind,
    },

    /// Answer an agent
    MockAgent {
        /// Agent name
        name: String,
        /// Response
        response: Value,
    },

    /// Answer a tool
    MockTool {
        /// Tool name
        name: String,
        /// Response
        response: Value,
    },

    /// Set input and run a pipeline
    SendInput {
        /// Input state
        input: Value,
        /// Pipeline name, default pipeline when `None`
        pipeline: Option<String>,
    },

    /// Expect calls with an exact sole argument
    ExpectInvocation {
        /// Target name
        name: String,
        /// Expected argument
        expected: Value,
        /// Method variant, configured default when `None`
        method: Option<MethodTag>,
        /// Exact count
        count: usize,
    },

    /// Expect a number of calls regardless of arguments
    ExpectCount {
        /// Target name
        name: String,
        /// Method variant, configured default when `None`
        method: Option<MethodTag>,
        /// Exact count
        count: usize,
    },

    /// Expect a number of calls at an external address
    ExpectExternal {
        /// Literal call address
        address: String,
        /// Exact count
        count: usize,
    },
}

impl Step {
    /// Pipeline named by a [`Step::SendInput`]
    #[must_use]
    pub fn pipeline(&self) -> Option<&str> {
        match self {
            Self::SendInput { pipeline, .. } => pipeline.as_deref(),
            _ => None,
        }
    }
}

/// Parses step text into [`Step`]s
#[derive(Debug, Clone, Copy)]
pub struct StepParser {
    default_protocol: ProtocolKind,
}

impl Default for StepParser {
    fn default() -> Self {
        Self {
            default_protocol: ProtocolKind::SyncHttp,
        }
    }
}

impl StepParser {
    /// Create parser; external mocks default to synchronous HTTP
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With protocol used when an external mock step names none
    #[inline]
    #[must_use]
    pub fn with_default_protocol(mut self, protocol: ProtocolKind) -> Self {
        self.default_protocol = protocol;
        self
    }

    /// Parse step text without its keyword
    ///
    /// # Errors
    /// - `StepError::Unrecognized` if no pattern matches
    /// - `StepError::Literal` for malformed literals
    /// - `StepError::Tag` for unknown protocol or method names
    pub fn parse(&self, text: &str) -> Result<Step, StepError> {
        let text = text.trim();

        if let Some(caps) = MOCK_API.captures(text) {
            let protocol = match caps.name("protocol") {
                Some(tag) => tag
                    .as_str()
                    .parse()
                    .map_err(|source| StepError::Tag { line: 0, source })?,
                None => self.default_protocol,
            };
            return Ok(Step::MockExternal {
                address: caps["address"].to_string(),
                payload: caps.name("payload").map(|m| parse_literal(m.as_str())).transpose()?,
                return_value: parse_literal(&caps["value"])?,
                protocol,
            });
        }

        if let Some(caps) = MOCK_TARGET.captures(text) {
            let name = caps["name"].to_string();
            let response = parse_literal(&caps["value"])?;
            return Ok(if &caps["role"] == "tool" {
                Step::MockTool { name, response }
            } else {
                Step::MockAgent { name, response }
            });
        }

        if let Some(caps) = SEND_AND_INVOKE.captures(text) {
            return Ok(Step::SendInput {
                input: parse_literal(&caps["message"])?,
                pipeline: Some(caps["pipeline"].to_string()),
            });
        }

        if let Some(caps) = SEND.captures(text) {
            return Ok(Step::SendInput {
                input: parse_literal(&caps["message"])?,
                pipeline: None,
            });
        }

        if let Some(caps) = EXPECT_MESSAGES.captures(text) {
            return Ok(Step::ExpectInvocation {
                name: caps["name"].to_string(),
                expected: parse_literal(&caps["expected"])?,
                method: Some(MethodTag::Invoke),
                count: 1,
            });
        }

        if let Some(caps) = EXPECT_INVOKED.captures(text) {
            return Ok(Step::ExpectInvocation {
                name: caps["name"].to_string(),
                expected: parse_literal(&caps["expected"])?,
                method: method_of(&caps)?,
                count: count_of(&caps, text)?,
            });
        }

        if let Some(caps) = EXPECT_CALLED.captures(text) {
            return Ok(Step::ExpectCount {
                name: caps["name"].to_string(),
                method: method_of(&caps)?,
                count: count_of(&caps, text)?,
            });
        }

        if let Some(caps) = EXPECT_EXTERNAL.captures(text) {
            return Ok(Step::ExpectExternal {
                address: caps["address"].to_string(),
                count: count_of(&caps, text)?,
            });
        }

        Err(StepError::Unrecognized {
            line: 0,
            text: text.to_string(),
        })
    }

    /// Parse a full `Keyword text` line
    ///
    /// # Errors
    /// `StepError::Unrecognized` if the line has no keyword, otherwise as [`StepParser::parse`].
    pub fn parse_line(&self, line: &str) -> Result<(StepKeyword, Step), StepError> {
        let line = line.trim();
        let (keyword, text) = StepKeyword::split(line).ok_or_else(|| StepError::Unrecognized {
            line: 0,
            text: line.to_string(),
        })?;
        Ok((keyword, self.parse(text)?))
    }
}

fn method_of(caps: &Captures<'_>) -> Result<Option<MethodTag>, StepError> {
    caps.name("method")
        .map(|m| m.as_str().parse::<MethodTag>())
        .transpose()
        .map_err(|source| StepError::Tag { line: 0, source })
}

fn count_of(caps: &Captures<'_>, text: &str) -> Result<usize, StepError> {
    caps["count"].parse().map_err(|_| StepError::Unrecognized {
        line: 0,
        text: text.to_string(),
    })
}

/// Step with its position in the feature text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedStep {
    /// 1-based line number
    pub line: usize,

    /// Effective keyword (continuations resolved)
    pub keyword: StepKeyword,

    /// Parsed step
    pub step: Step,
}

/// One `Scenario:` block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureScenario {
    /// Scenario title
    pub name: String,

    /// Namespace from a `@root_path=` tag
    pub root_path: Option<String>,

    /// Steps, background first
    pub steps: Vec<ParsedStep>,
}

impl FeatureScenario {
    /// First pipeline named by a step
    #[must_use]
    pub fn invoked_pipeline(&self) -> Option<&str> {
        self.steps.iter().find_map(|s| s.step.pipeline())
    }
}

/// Parsed feature text
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureDocument {
    /// Feature title
    pub name: String,

    /// Namespace from a `@root_path=` tag on the feature
    pub root_path: Option<String>,

    /// Scenarios in file order
    pub scenarios: Vec<FeatureScenario>,
}

enum Block {
    None,
    Background,
    Scenario,
}

impl FeatureDocument {
    /// Parse feature text
    ///
    /// # Errors
    /// First malformed line, with its line number.
    pub fn parse(text: &str, parser: &StepParser) -> Result<Self, StepError> {
        let mut doc = Self::default();
        let mut background: Vec<ParsedStep> = Vec::new();
        let mut block = Block::None;
        let mut pending_root: Option<String> = None;
        let mut previous: Option<StepKeyword> = None;

        for (index, raw) in text.lines().enumerate() {
            let number = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('@') {
                for tag in line.split_whitespace() {
                    if let Some(ns) = tag
                        .strip_prefix("@root_path=")
                        .or_else(|| tag.strip_prefix("@root_path:"))
                    {
                        pending_root = Some(ns.to_string());
                    }
                }
                continue;
            }

            if let Some(title) = line.strip_prefix("Feature:") {
                doc.name = title.trim().to_string();
                doc.root_path = pending_root.take();
                block = Block::None;
                continue;
            }

            if line.starts_with("Background:") {
                block = Block::Background;
                previous = None;
                continue;
            }

            if let Some(title) = line
                .strip_prefix("Scenario:")
                .or_else(|| line.strip_prefix("Example:"))
            {
                doc.scenarios.push(FeatureScenario {
                    name: title.trim().to_string(),
                    root_path: pending_root.take(),
                    steps: background.clone(),
                });
                block = Block::Scenario;
                previous = None;
                continue;
            }

            let Some((keyword, step_text)) = StepKeyword::split(line) else {
                // Description text is only allowed before a block's first step
                if previous.is_some() {
                    return Err(StepError::Unrecognized {
                        line: number,
                        text: line.to_string(),
                    });
                }
                continue;
            };

            let keyword = if keyword.is_continuation() {
                previous.ok_or(StepError::DanglingContinuation { line: number })?
            } else {
                keyword
            };
            let step = parser.parse(step_text).map_err(|e| e.at_line(number))?;
            let parsed = ParsedStep {
                line: number,
                keyword,
                step,
            };

            match block {
                Block::None => return Err(StepError::OutsideScenario { line: number }),
                Block::Background => background.push(parsed),
                Block::Scenario => {
                    if let Some(scenario) = doc.scenarios.last_mut() {
                        scenario.steps.push(parsed);
                    }
                }
            }
            previous = Some(keyword);
        }

        tracing::debug!(
            "Parsed feature '{}' with {} scenario(s)",
            doc.name,
            doc.scenarios.len()
        );
        Ok(doc)
    }
}

/// Applies steps to a [`ScenarioBuilder`]
#[derive(Debug, Clone, Default)]
pub struct StepRunner {
    parser: StepParser,
    pipelines: PipelineTable,
}

impl StepRunner {
    /// Create runner over `pipelines`
    #[inline]
    #[must_use]
    pub fn new(pipelines: PipelineTable) -> Self {
        Self {
            parser: StepParser::default(),
            pipelines,
        }
    }

    /// With step parser
    #[inline]
    #[must_use]
    pub fn with_parser(mut self, parser: StepParser) -> Self {
        self.parser = parser;
        self
    }

    /// Step parser
    #[inline]
    #[must_use]
    pub fn parser(&self) -> &StepParser {
        &self.parser
    }

    /// Pipelines steps can invoke
    #[inline]
    #[must_use]
    pub fn pipelines(&self) -> &PipelineTable {
        &self.pipelines
    }

    /// Parse and apply one step line, blocking on pipeline runs
    ///
    /// # Errors
    /// Parse errors as `HarnessError::Step`, otherwise whatever the builder returns.
    pub fn run_line(&self, builder: &mut ScenarioBuilder, line: &str) -> Result<(), HarnessError> {
        let (_, step) = self.parser.parse_line(line)?;
        self.apply(builder, &step)
    }

    /// Apply one step, blocking on pipeline runs
    ///
    /// # Errors
    /// Whatever the builder returns; `StepError::AsyncPipeline` for async pipelines.
    pub fn apply(&self, builder: &mut ScenarioBuilder, step: &Step) -> Result<(), HarnessError> {
        if let Step::SendInput { input, pipeline } = step {
            let (name, entry) = self.pipelines.resolve(pipeline.as_deref())?;
            builder.set_input(input.clone());
            return entry.run(name, builder);
        }
        declare(builder, step)
    }

    /// Apply one step, awaiting pipeline runs
    ///
    /// # Errors
    /// Whatever the builder returns.
    pub async fn apply_async(
        &self,
        builder: &mut ScenarioBuilder,
        step: &Step,
    ) -> Result<(), HarnessError> {
        if let Step::SendInput { input, pipeline } = step {
            let (_, entry) = self.pipelines.resolve(pipeline.as_deref())?;
            builder.set_input(input.clone());
            return entry.run_async(builder).await;
        }
        declare(builder, step)
    }

    /// Apply every step of a scenario in order, blocking
    ///
    /// Teardown failures do not stop the scenario; they are returned for reporting.
    ///
    /// # Errors
    /// First failing step.
    pub fn run_scenario(
        &self,
        builder: &mut ScenarioBuilder,
        scenario: &FeatureScenario,
    ) -> Result<Vec<TeardownError>, HarnessError> {
        let mut teardown = Vec::new();
        for parsed in &scenario.steps {
            tracing::debug!("Step line {}: {} {:?}", parsed.line, parsed.keyword, parsed.step);
            teardown.extend(settle(self.apply(builder, &parsed.step))?);
        }
        Ok(teardown)
    }

    /// Apply every step of a scenario in order, awaiting
    ///
    /// # Errors
    /// First failing step.
    pub async fn run_scenario_async(
        &self,
        builder: &mut ScenarioBuilder,
        scenario: &FeatureScenario,
    ) -> Result<Vec<TeardownError>, HarnessError> {
        let mut teardown = Vec::new();
        for parsed in &scenario.steps {
            tracing::debug!("Step line {}: {} {:?}", parsed.line, parsed.keyword, parsed.step);
            teardown.extend(settle(self.apply_async(builder, &parsed.step).await)?);
        }
        Ok(teardown)
    }
}

/// Apply a non-run step
fn declare(builder: &mut ScenarioBuilder, step: &Step) -> Result<(), HarnessError> {
    let default_method = builder.config().default_method;
    match step {
        Step::MockExternal {
            address,
            payload,
            return_value,
            protocol,
        } => {
            builder.mock_external_call(address, *protocol, payload.clone(), return_value.clone())?;
        }
        Step::MockAgent { name, response } => {
            builder.mock_agent_response(name, response.clone())?;
        }
        Step::MockTool { name, response } => {
            builder.mock_tool_response(name, response.clone())?;
        }
        Step::ExpectInvocation {
            name,
            expected,
            method,
            count,
        } => {
            builder.expect_invocation(
                name,
                expected.clone(),
                method.unwrap_or(default_method),
                *count,
            )?;
        }
        Step::ExpectCount {
            name,
            method,
            count,
        } => {
            builder.expect_call_count(name, method.unwrap_or(default_method), *count)?;
        }
        Step::ExpectExternal { address, count } => {
            builder.expect_external_call(address, *count)?;
        }
        Step::SendInput { input, .. } => {
            builder.set_input(input.clone());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn mock_api_step_with_payload() {
        let step = StepParser::new()
            .parse(
                r#"the api_path "demo.prompt.requests.post" with payload '{"url": "http://x", "params": {"input": "hello"}}' is mocked to return_value '{"content": "hello"}'"#,
            )
            .unwrap();
        assert_eq!(
            step,
            Step::MockExternal {
                address: "demo.prompt.requests.post".to_string(),
                payload: Some(json!({"url": "http://x", "params": {"input": "hello"}})),
                return_value: json!({"content": "hello"}),
                protocol: ProtocolKind::SyncHttp,
            }
        );
    }

    #[test]
    fn mock_api_step_without_payload_and_protocol() {
        let step = StepParser::new()
            .parse(r#"the api_path "svc.query" is mocked to return_value '{"data": None}' via GRAPHQL"#)
            .unwrap();
        assert_eq!(
            step,
            Step::MockExternal {
                address: "svc.query".to_string(),
                payload: None,
                return_value: json!({"data": null}),
                protocol: ProtocolKind::QueryLanguage,
            }
        );
    }

    #[test]
    fn unknown_protocol_is_a_tag_error() {
        let err = StepParser::new()
            .parse(r#"the api_path "svc.ws" is mocked to return_value '1' via WEBSOCKETS"#)
            .unwrap_err();
        assert!(matches!(err, StepError::Tag { .. }));
    }

    #[test]
    fn agent_and_tool_responses() {
        let parser = StepParser::new();
        assert_eq!(
            parser
                .parse("agent agent1 will respond with '{'messages': []}'")
                .unwrap(),
            Step::MockAgent {
                name: "agent1".to_string(),
                response: json!({"messages": []}),
            }
        );
        assert!(matches!(
            parser.parse("tool lookup will respond with 'True'").unwrap(),
            Step::MockTool { .. }
        ));
    }

    #[test]
    fn send_with_and_without_pipeline() {
        let parser = StepParser::new();
        let step = parser
            .parse("the user sends '{'messages': [{'role': 'user', 'content': 'hello'}]}' and invokes the 'demo.prompt' orchestrator")
            .unwrap();
        assert_eq!(step.pipeline(), Some("demo.prompt"));
        let Step::SendInput { input, .. } = step else {
            panic!("expected send step");
        };
        assert_eq!(input, json!({"messages": [{"role": "user", "content": "hello"}]}));

        let step = parser.parse("the user sends '{}'").unwrap();
        assert_eq!(step.pipeline(), None);
    }

    #[test]
    fn expectation_steps() {
        let parser = StepParser::new();
        assert_eq!(
            parser
                .parse("agent agent2 should be invoked with messages containing '{'messages': []}'")
                .unwrap(),
            Step::ExpectInvocation {
                name: "agent2".to_string(),
                expected: json!({"messages": []}),
                method: Some(MethodTag::Invoke),
                count: 1,
            }
        );
        assert_eq!(
            parser
                .parse("agent agent2 should be invoked 2 times via ainvoke with '{}'")
                .unwrap(),
            Step::ExpectInvocation {
                name: "agent2".to_string(),
                expected: json!({}),
                method: Some(MethodTag::AInvoke),
                count: 2,
            }
        );
        assert_eq!(
            parser.parse("tool lookup should be called 0 times").unwrap(),
            Step::ExpectCount {
                name: "lookup".to_string(),
                method: None,
                count: 0,
            }
        );
        assert_eq!(
            parser
                .parse(r#"the api_path "svc.get" should be called 1 time"#)
                .unwrap(),
            Step::ExpectExternal {
                address: "svc.get".to_string(),
                count: 1,
            }
        );
    }

    #[test]
    fn unrecognized_step() {
        let err = StepParser::new().parse("the moon is full").unwrap_err();
        assert!(matches!(err, StepError::Unrecognized { .. }));
    }

    #[test]
    fn feature_document_structure() {
        let text = r#"
@root_path=demo.prompt
Feature: Prompt chain
  Routes a prompt through three agents

  Background:
    Given agent agent1 will respond with '{'messages': []}'

  # happy path
  @root_path=demo.other
  Scenario: first
    Given agent agent2 will respond with '{}'
    And agent agent3 will respond with '{}'
    When the user sends '{}' and invokes the 'demo.prompt' orchestrator
    Then agent agent1 should be called 1 time

  Scenario: second
    When the user sends '{}'
"#;
        let doc = FeatureDocument::parse(text, &StepParser::new()).unwrap();
        assert_eq!(doc.name, "Prompt chain");
        assert_eq!(doc.root_path.as_deref(), Some("demo.prompt"));
        assert_eq!(doc.scenarios.len(), 2);

        let first = &doc.scenarios[0];
        assert_eq!(first.root_path.as_deref(), Some("demo.other"));
        assert_eq!(first.steps.len(), 5);
        assert_eq!(first.steps[2].keyword, StepKeyword::Given);
        assert_eq!(first.steps[2].line, 13);
        assert_eq!(first.invoked_pipeline(), Some("demo.prompt"));

        let second = &doc.scenarios[1];
        assert_eq!(second.root_path, None);
        assert_eq!(second.steps.len(), 2);
        assert_eq!(second.invoked_pipeline(), None);
    }

    #[test]
    fn misspelled_keyword_after_a_step_is_an_error() {
        let text = "Feature: x\nScenario: s\n  Checks agent1 only\n  Given agent agent1 will respond with '{}'\n  Thne agent agent1 should be called 1 time\n";
        let err = FeatureDocument::parse(text, &StepParser::new()).unwrap_err();
        assert_eq!(
            err,
            StepError::Unrecognized {
                line: 5,
                text: "Thne agent agent1 should be called 1 time".to_string(),
            }
        );
    }

    #[test]
    fn feature_errors_carry_line_numbers() {
        let parser = StepParser::new();
        let err = FeatureDocument::parse("Feature: x\nGiven agent a will respond with '1'", &parser)
            .unwrap_err();
        assert_eq!(err, StepError::OutsideScenario { line: 2 });

        let err = FeatureDocument::parse("Feature: x\nScenario: s\n  And the user sends '{}'", &parser)
            .unwrap_err();
        assert_eq!(err, StepError::DanglingContinuation { line: 3 });

        let err = FeatureDocument::parse("Scenario: s\n\n  Then nonsense here", &parser).unwrap_err();
        assert!(matches!(err, StepError::Unrecognized { line: 3, .. }));

        let err = FeatureDocument::parse("Scenario: s\n  Given agent a will respond with '{'", &parser)
            .unwrap_err();
        assert!(matches!(err, StepError::Literal { line: 2, .. }));
    }
}
