//! Demo pipelines
//!
//! Deterministic multi-agent chains that make every external and agent call
//! through a [`Switchboard`]. Routing follows a fixed table instead of a
//! model-driven router. Original bindings fail the way an unreachable
//! service would, so an unmocked call never succeeds silently.

use atk_core::{CallError, MethodTag, Value};
use atk_discovery::{ExposedSymbol, PipelineCatalog};
use atk_runtime::{ExternalClient, FnEndpoint, RemoteAgent, Switchboard};
use serde_json::{json, Map};

/// Namespace of [`PromptPipeline`]
pub const PROMPT_NAMESPACE: &str = "demo.prompt";

/// Namespace of [`AsyncPromptPipeline`]
pub const PROMPT_ASYNC_NAMESPACE: &str = "demo.prompt_async";

/// Namespace of [`BatchPipeline`]
pub const BATCH_NAMESPACE: &str = "demo.batch";

/// URL the `api1` node posts to
pub const API1_URL: &str = "http://127.0.0.1:8004/api1/getdata1";

/// Marker message appended after agent3
pub const AGENT3_MARKER: &str = "Processed by agent3";

/// Marker message appended after agent4
pub const AGENT4_MARKER: &str = "Processed by agent4";

const PROMPT_ROUTE: [&str; 4] = ["api1", "a1", "a2", "a3"];
const BATCH_ROUTE: [&str; 2] = ["a4", "a5"];

/// Address of an agent exposed under `namespace`
#[must_use]
pub fn agent_address(namespace: &str, agent: &str) -> String {
    format!("{namespace}.agents.{agent}")
}

/// Address of the HTTP client operation used by `namespace`
#[must_use]
pub fn http_address(namespace: &str, verb: &str) -> String {
    format!("{namespace}.requests.{verb}")
}

/// Register agents as remote proxies under `{namespace}.agents`
fn register_agents(catalog: &PipelineCatalog, namespace: &str, agents: &[&str]) {
    catalog.register_symbols(
        format!("{namespace}.agents"),
        agents.iter().map(|name| ExposedSymbol::remote_proxy(*name)).collect(),
    );
}

/// Bind unreachable originals for every method of an agent
fn install_agent(switchboard: &Switchboard, namespace: &str, name: &str, port: u16) -> RemoteAgent {
    let address = agent_address(namespace, name);
    for method in MethodTag::ALL {
        switchboard.bind(
            address.clone(),
            method,
            FnEndpoint::unreachable(
                address.clone(),
                format!("connection refused: http://localhost:{port}/{name}/process"),
            ),
        );
    }
    RemoteAgent::new(switchboard, address)
}

fn install_http(switchboard: &Switchboard, namespace: &str) -> ExternalClient {
    for verb in ["get", "post"] {
        let address = http_address(namespace, verb);
        switchboard.bind(
            address.clone(),
            MethodTag::Invoke,
            FnEndpoint::unreachable(address, "connection refused: http://127.0.0.1:8004"),
        );
    }
    ExternalClient::new(switchboard, format!("{namespace}.requests"))
}

fn messages_mut<'a>(state: &'a mut Value, node: &str) -> Result<&'a mut Vec<Value>, CallError> {
    state
        .get_mut("messages")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| CallError::endpoint(node, "state has no messages list"))
}

fn has_content(state: &Value, content: &str) -> bool {
    state
        .get("messages")
        .and_then(Value::as_array)
        .is_some_and(|messages| {
            messages
                .iter()
                .any(|m| m.get("content").and_then(Value::as_str) == Some(content))
        })
}

fn system_marker(content: &str) -> Value {
    json!({"role": "system", "content": content})
}

/// Shared nodes of the prompt chains
#[derive(Debug, Clone)]
struct PromptNodes {
    namespace: String,
    http: ExternalClient,
    agent1: RemoteAgent,
    agent2: RemoteAgent,
    agent3: RemoteAgent,
}

impl PromptNodes {
    fn install(switchboard: &Switchboard, catalog: &PipelineCatalog, namespace: &str) -> Self {
        register_agents(catalog, namespace, &["agent1", "agent2", "agent3"]);
        Self {
            namespace: namespace.to_string(),
            http: install_http(switchboard, namespace),
            agent1: install_agent(switchboard, namespace, "agent1", 8001),
            agent2: install_agent(switchboard, namespace, "agent2", 8002),
            agent3: install_agent(switchboard, namespace, "agent3", 8003),
        }
    }

    /// Post to api1 and append the response body to the messages
    fn api1(&self, mut state: Value) -> Result<Value, CallError> {
        let response = self.http.post(API1_URL, json!({"input": "hello"}))?;
        messages_mut(&mut state, "api1")?.push(response.json().clone());
        Ok(state)
    }

    /// Call agent1 only when the last message says hello
    fn a1(&self, state: Value) -> Result<Value, CallError> {
        let last_is_hello = state
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|messages| messages.last())
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            == Some("hello");
        if last_is_hello {
            self.agent1.invoke(state)
        } else {
            Ok(state)
        }
    }

    /// Call agent3 once and mark the state as processed
    fn a3(&self, state: Value) -> Result<Value, CallError> {
        if has_content(&state, AGENT3_MARKER) {
            return Ok(state);
        }
        let mut result = self.agent3.invoke(state)?;
        messages_mut(&mut result, "a3")?.push(system_marker(AGENT3_MARKER));
        Ok(result)
    }
}

/// Runs nodes in route order, threading object results through as state
struct RouteRun {
    state: Value,
    results: Map<String, Value>,
}

impl RouteRun {
    fn new(state: Value) -> Self {
        Self {
            state,
            results: Map::new(),
        }
    }

    fn record(&mut self, node: &str, result: Value) {
        tracing::debug!("Node {} finished", node);
        if result.is_object() {
            self.state = result.clone();
        }
        self.results.insert(node.to_string(), result);
    }

    fn finish(self) -> Value {
        Value::Object(self.results)
    }
}

/// Blocking prompt chain: `api1 -> a1 -> a2 -> a3`
///
/// Returns an object of node results keyed by node name.
#[derive(Debug, Clone)]
pub struct PromptPipeline {
    nodes: PromptNodes,
}

impl PromptPipeline {
    /// Install under [`PROMPT_NAMESPACE`]
    #[must_use]
    pub fn install(switchboard: &Switchboard, catalog: &PipelineCatalog) -> Self {
        Self::install_at(switchboard, catalog, PROMPT_NAMESPACE)
    }

    /// Install under `namespace`
    #[must_use]
    pub fn install_at(switchboard: &Switchboard, catalog: &PipelineCatalog, namespace: &str) -> Self {
        Self {
            nodes: PromptNodes::install(switchboard, catalog, namespace),
        }
    }

    /// Namespace the pipeline's targets live in
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.nodes.namespace
    }

    /// Run the chain
    ///
    /// # Errors
    /// First failing call.
    pub fn run(&self, input: Value) -> Result<Value, CallError> {
        let mut run = RouteRun::new(input);
        for node in PROMPT_ROUTE {
            let state = run.state.clone();
            let result = match node {
                "api1" => self.nodes.api1(state)?,
                "a1" => self.nodes.a1(state)?,
                "a2" => self.nodes.agent2.invoke(state)?,
                _ => self.nodes.a3(state)?,
            };
            run.record(node, result);
        }
        Ok(run.finish())
    }
}

/// Async prompt chain; `a2` awaits `agent2.ainvoke`
#[derive(Debug, Clone)]
pub struct AsyncPromptPipeline {
    nodes: PromptNodes,
}

impl AsyncPromptPipeline {
    /// Install under [`PROMPT_ASYNC_NAMESPACE`]
    #[must_use]
    pub fn install(switchboard: &Switchboard, catalog: &PipelineCatalog) -> Self {
        Self {
            nodes: PromptNodes::install(switchboard, catalog, PROMPT_ASYNC_NAMESPACE),
        }
    }

    /// Namespace the pipeline's targets live in
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.nodes.namespace
    }

    /// Run the chain
    ///
    /// # Errors
    /// First failing call.
    pub async fn run(&self, input: Value) -> Result<Value, CallError> {
        let mut run = RouteRun::new(input);
        for node in PROMPT_ROUTE {
            let state = run.state.clone();
            let result = match node {
                "api1" => self.nodes.api1(state)?,
                "a1" => self.nodes.a1(state)?,
                "a2" => self.nodes.agent2.ainvoke(state).await?,
                _ => self.nodes.a3(state)?,
            };
            run.record(node, result);
        }
        Ok(run.finish())
    }
}

/// Batch chain: `a4 -> a5`, both through `batch`
#[derive(Debug, Clone)]
pub struct BatchPipeline {
    namespace: String,
    agent4: RemoteAgent,
    agent5: RemoteAgent,
}

impl BatchPipeline {
    /// Install under [`BATCH_NAMESPACE`]
    #[must_use]
    pub fn install(switchboard: &Switchboard, catalog: &PipelineCatalog) -> Self {
        register_agents(catalog, BATCH_NAMESPACE, &["agent4", "agent5"]);
        Self {
            namespace: BATCH_NAMESPACE.to_string(),
            agent4: install_agent(switchboard, BATCH_NAMESPACE, "agent4", 8003),
            agent5: install_agent(switchboard, BATCH_NAMESPACE, "agent5", 8003),
        }
    }

    /// Namespace the pipeline's targets live in
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Run the chain; each agent receives the current state as a one-item batch
    ///
    /// # Errors
    /// First failing call.
    pub fn run(&self, input: Value) -> Result<Value, CallError> {
        let mut run = RouteRun::new(input);
        for node in BATCH_ROUTE {
            let state = run.state.clone();
            let result = if node == "a4" {
                let mut result = first_of(self.agent4.batch(vec![state])?);
                messages_mut(&mut result, "a4")?.push(system_marker(AGENT4_MARKER));
                result
            } else {
                first_of(self.agent5.batch(vec![state])?)
            };
            run.record(node, result);
        }
        Ok(run.finish())
    }
}

/// First item of a batch response; non-list responses pass through
fn first_of(response: Value) -> Value {
    match response {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    }
}

/// Every demo pipeline installed on one switchboard and catalog
#[derive(Debug, Clone)]
pub struct DemoPipelines {
    /// Catalog with every demo namespace registered
    pub catalog: PipelineCatalog,

    /// Switchboard every demo pipeline calls through
    pub switchboard: Switchboard,

    /// Blocking prompt chain
    pub prompt: PromptPipeline,

    /// Async prompt chain
    pub prompt_async: AsyncPromptPipeline,

    /// Batch chain
    pub batch: BatchPipeline,
}

impl DemoPipelines {
    /// Install all demo pipelines on a fresh switchboard and catalog
    #[must_use]
    pub fn install() -> Self {
        let catalog = PipelineCatalog::new();
        let switchboard = Switchboard::new();
        let prompt = PromptPipeline::install(&switchboard, &catalog);
        let prompt_async = AsyncPromptPipeline::install(&switchboard, &catalog);
        let batch = BatchPipeline::install(&switchboard, &catalog);
        Self {
            catalog,
            switchboard,
            prompt,
            prompt_async,
            batch,
        }
    }
}

impl Default for DemoPipelines {
    fn default() -> Self {
        Self::install()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atk_core::InterceptionSpec;
    use atk_runtime::InterceptionSession;
    use pretty_assertions::assert_eq;

    #[test]
    fn unmocked_pipeline_fails_like_a_network_error() {
        let demo = DemoPipelines::install();
        let err = demo.prompt.run(json!({"messages": []})).unwrap_err();
        assert_eq!(err.address(), "demo.prompt.requests.post");
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn prompt_chain_threads_state() {
        let demo = DemoPipelines::install();
        let ns = PROMPT_NAMESPACE;
        let mocks = vec![
            InterceptionSpec::unconditional(
                http_address(ns, "post"),
                MethodTag::Invoke,
                json!({"status": 200, "body": {"content": "hello"}}),
            ),
            InterceptionSpec::unconditional(
                agent_address(ns, "agent1"),
                MethodTag::Invoke,
                json!({"messages": [{"role": "agent1", "content": "response1"}]}),
            ),
            InterceptionSpec::unconditional(
                agent_address(ns, "agent2"),
                MethodTag::Invoke,
                json!({"messages": [{"role": "agent2", "content": "response2"}]}),
            ),
            InterceptionSpec::unconditional(
                agent_address(ns, "agent3"),
                MethodTag::Invoke,
                json!({"messages": [{"role": "agent3", "content": "response3"}]}),
            ),
        ];
        let session = InterceptionSession::open(&demo.switchboard, mocks).unwrap();
        let results = demo
            .prompt
            .run(json!({"messages": [{"role": "user", "content": "hello"}]}))
            .unwrap();
        let ledger = session.close().unwrap();

        assert_eq!(ledger.len(), 4);
        assert_eq!(
            results["api1"],
            json!({"messages": [{"role": "user", "content": "hello"}, {"content": "hello"}]})
        );
        assert_eq!(
            results["a3"]["messages"][1],
            json!({"role": "system", "content": AGENT3_MARKER})
        );
    }

    #[test]
    fn a1_is_skipped_without_hello() {
        let demo = DemoPipelines::install();
        let ns = PROMPT_NAMESPACE;
        let reply = json!({"messages": [{"role": "agent", "content": "ok"}]});
        let mocks = vec![
            InterceptionSpec::unconditional(
                http_address(ns, "post"),
                MethodTag::Invoke,
                json!({"status": 200, "body": {"content": "bye"}}),
            ),
            InterceptionSpec::unconditional(agent_address(ns, "agent2"), MethodTag::Invoke, reply.clone()),
            InterceptionSpec::unconditional(agent_address(ns, "agent3"), MethodTag::Invoke, reply),
        ];
        let session = InterceptionSession::open(&demo.switchboard, mocks).unwrap();
        let results = demo.prompt.run(json!({"messages": []})).unwrap();
        let ledger = session.close().unwrap();

        assert_eq!(ledger.for_address(&agent_address(ns, "agent1")).count(), 0);
        assert_eq!(results["a1"], results["api1"]);
    }

    #[test]
    fn batch_chain_sends_one_item_batches() {
        let demo = DemoPipelines::install();
        let ns = BATCH_NAMESPACE;
        let mocks = vec![
            InterceptionSpec::unconditional(
                agent_address(ns, "agent4"),
                MethodTag::Batch,
                json!([{"messages": [{"role": "agent4", "content": "r4"}]}]),
            ),
            InterceptionSpec::unconditional(
                agent_address(ns, "agent5"),
                MethodTag::Batch,
                json!({"messages": [{"role": "agent5", "content": "r5"}]}),
            ),
        ];
        let session = InterceptionSession::open(&demo.switchboard, mocks).unwrap();
        let results = demo.batch.run(json!({"messages": []})).unwrap();
        let ledger = session.close().unwrap();

        let agent5_arg = json!([{"messages": [
            {"role": "agent4", "content": "r4"},
            {"role": "system", "content": AGENT4_MARKER}
        ]}]);
        assert_eq!(
            ledger.count_matching(&agent_address(ns, "agent5"), MethodTag::Batch, &agent5_arg),
            1
        );
        assert_eq!(results["a5"]["messages"][0]["content"], json!("r5"));
    }

    #[tokio::test]
    async fn async_chain_awaits_agent2() {
        let demo = DemoPipelines::install();
        let ns = PROMPT_ASYNC_NAMESPACE;
        let reply = json!({"messages": [{"role": "agent", "content": "ok"}]});
        let mocks = vec![
            InterceptionSpec::unconditional(
                http_address(ns, "post"),
                MethodTag::Invoke,
                json!({"status": 200, "body": {"content": "hello"}}),
            ),
            InterceptionSpec::unconditional(agent_address(ns, "agent1"), MethodTag::Invoke, reply.clone()),
            InterceptionSpec::unconditional(agent_address(ns, "agent2"), MethodTag::AInvoke, reply.clone()),
            InterceptionSpec::unconditional(agent_address(ns, "agent3"), MethodTag::Invoke, reply),
        ];
        let session = InterceptionSession::open(&demo.switchboard, mocks).unwrap();
        demo.prompt_async
            .run(json!({"messages": [{"role": "user", "content": "hello"}]}))
            .await
            .unwrap();
        let ledger = session.close().unwrap();
        assert_eq!(
            ledger
                .for_route(&agent_address(ns, "agent2"), MethodTag::AInvoke)
                .count(),
            1
        );
    }
}
