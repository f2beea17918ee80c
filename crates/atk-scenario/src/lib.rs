//! ATK Scenario
//!
//! Declare what a pipeline run should look like, run it, and verify it.
//!
//! # Core Concepts
//!
//! - [`Harness`]: Catalog, switchboard, strategies and config of one pipeline
//! - [`ScenarioBuilder`]: Fluent chain of input, mocks, runs and expectations
//! - [`Verifier`]: Counts ledger records against an [`ExpectationSpec`]
//! - [`ScenarioFile`] / [`FeatureLoader`]: JSON and feature-file scenarios
//! - [`StepParser`] / [`StepRunner`]: Behavior-style step vocabulary
//! - [`SuiteRunner`]: Runs loaded scenarios and produces a [`RunReport`]
//!
//! # Example
//!
//! ```rust
//! use atk_core::{MethodTag, ProtocolKind};
//! use atk_discovery::{ExposedSymbol, PipelineCatalog};
//! use atk_runtime::{ExternalClient, RemoteAgent, Switchboard};
//! use atk_scenario::Harness;
//! use serde_json::json;
//!
//! let catalog = PipelineCatalog::new();
//! catalog.register_symbols("demo.agents", vec![ExposedSymbol::remote_proxy("agent1")]);
//! let switchboard = Switchboard::new();
//!
//! let http = ExternalClient::new(&switchboard, "demo.requests");
//! let agent = RemoteAgent::new(&switchboard, "demo.agents.agent1");
//! let pipeline = |state: serde_json::Value| {
//!     let body = http.post("http://svc/data", json!({"q": 1}))?;
//!     agent.invoke(json!({"state": state, "data": body.json().clone()}))
//! };
//!
//! let mut scenario = Harness::new(catalog, switchboard.clone()).scenario("demo");
//! scenario
//!     .set_input(json!("hi"))
//!     .mock_external_call(
//!         "demo.requests.post",
//!         ProtocolKind::SyncHttp,
//!         Some(json!({"url": "http://svc/data", "params": {"q": 1}})),
//!         json!({"n": 7}),
//!     )
//!     .unwrap()
//!     .mock_agent_response("agent1", json!("done"))
//!     .unwrap()
//!     .run_pipeline(pipeline)
//!     .unwrap()
//!     .expect_invocation("agent1", json!({"state": "hi", "data": {"n": 7}}), MethodTag::Invoke, 1)
//!     .unwrap();
//!
//! assert_eq!(scenario.last_result(), Some(&json!("done")));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod builder;
mod config;
mod error;
mod literal;
mod loader;
mod pipeline;
mod report;
mod runner;
mod scenario;
mod steps;
mod verify;

// Re-exports
pub use builder::{Harness, ScenarioBuilder};
pub use config::{HarnessConfig, LogConfig, LogFormat};
pub use error::{HarnessError, LoadError, StepError};
pub use literal::parse_literal;
pub use loader::{
    AgentExpectation, AgentResponse, ApiMock, FeatureLoader, LoadedScenario, ScenarioDefinition,
    ScenarioFile, ScenarioSource, ToolResponse,
};
pub use pipeline::{AsyncEntry, BlockingEntry, PipelineEntry, PipelineFuture, PipelineTable};
pub use report::{RunReport, ScenarioReport, ScenarioStatus};
pub use runner::SuiteRunner;
pub use scenario::{ArgumentMatch, ExpectationSpec, Scenario};
pub use steps::{
    FeatureDocument, FeatureScenario, ParsedStep, Step, StepKeyword, StepParser, StepRunner,
};
pub use verify::{Verified, Verifier};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
