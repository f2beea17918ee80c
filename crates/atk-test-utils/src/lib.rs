//! Testing utilities for ATK workspace
//!
//! Demo pipelines, state fixtures, and scenario texts shared by tests and
//! the command-line runner.

#![allow(missing_docs)]

mod pipelines;

pub use pipelines::{
    agent_address, http_address, AsyncPromptPipeline, BatchPipeline, DemoPipelines,
    PromptPipeline, AGENT3_MARKER, AGENT4_MARKER, API1_URL, BATCH_NAMESPACE,
    PROMPT_ASYNC_NAMESPACE, PROMPT_NAMESPACE,
};

use atk_core::Value;
use atk_discovery::{DiscoveryError, ExposedSymbol, PipelineCatalog};
use serde_json::json;

/// State holding a single user message
pub fn user_message(content: &str) -> Value {
    json!({"messages": [{"role": "user", "content": content}]})
}

/// Agent reply carrying one message
pub fn agent_reply(role: &str, content: &str) -> Value {
    json!({"messages": [{"role": role, "content": content}]})
}

/// Arguments `api1` posts with, as reduced by the sync HTTP strategy
pub fn api1_payload() -> Value {
    json!({"url": API1_URL, "params": {"input": "hello"}})
}

/// State agent1 receives after `api1` answered `{"content": "hello"}`
pub fn agent1_expected_state() -> Value {
    json!({"messages": [
        {"role": "user", "content": "hello"},
        {"content": "hello"}
    ]})
}

/// Catalog with one healthy agent module and one module that fails to load
pub fn catalog_with_broken_module(namespace: &str) -> PipelineCatalog {
    let catalog = PipelineCatalog::new();
    catalog.register_symbols(
        format!("{namespace}.agents"),
        vec![
            ExposedSymbol::remote_proxy("agent1"),
            ExposedSymbol::tool("search"),
        ],
    );
    let broken = format!("{namespace}.broken");
    let module = broken.clone();
    catalog.register_module(broken, move || {
        Err(DiscoveryError::module_load(module.clone(), "import failed"))
    });
    catalog
}

/// JSON scenario exercising the whole prompt chain
pub fn prompt_scenario_json() -> String {
    json!({
        "name": "prompt chain",
        "root_path": PROMPT_NAMESPACE,
        "input_state": user_message("hello"),
        "mock_api_calls": [{
            "api_path": http_address(PROMPT_NAMESPACE, "post"),
            "payload": api1_payload(),
            "return_value": {"content": "hello"}
        }],
        "agent_responses": [
            {"agent_name": "agent1", "response_state": agent_reply("agent1", "response1")},
            {"agent_name": "agent2", "response_state": agent_reply("agent2", "response2")},
            {"agent_name": "agent3", "response_state": agent_reply("agent3", "response3")}
        ],
        "expect_agent_invocations": [
            {"agent_name": "agent1", "state": agent1_expected_state()},
            {"agent_name": "agent2", "state": agent_reply("agent1", "response1")},
            {"agent_name": "agent3", "ntimes": 1}
        ]
    })
    .to_string()
}

/// Feature text driving the prompt chain through the step vocabulary
pub fn prompt_feature() -> String {
    format!(
        r#"@root_path={PROMPT_NAMESPACE}
Feature: Prompt chain

  Background:
    Given the api_path "{post}" is mocked to return_value '{{"content": "hello"}}'

  Scenario: agents are called in order
    Given agent agent1 will respond with '{{"messages": [{{"role": "agent1", "content": "response1"}}]}}'
    And agent agent2 will respond with '{{"messages": [{{"role": "agent2", "content": "response2"}}]}}'
    And agent agent3 will respond with '{{"messages": [{{"role": "agent3", "content": "response3"}}]}}'
    When the user sends '{{'messages': [{{'role': 'user', 'content': 'hello'}}]}}'
    Then agent agent1 should be invoked with messages containing '{{"messages": [{{"role": "user", "content": "hello"}}, {{"content": "hello"}}]}}'
    And agent agent3 should be called 1 time
    And the api_path "{post}" should be called 1 time
"#,
        post = http_address(PROMPT_NAMESPACE, "post"),
    )
}
