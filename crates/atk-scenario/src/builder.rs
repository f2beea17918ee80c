//! Scenario builder
//!
//! Provides [`Harness`], which ties a pipeline's catalog and switchboard to a
//! strategy registry, and [`ScenarioBuilder`], the fluent chain a test author
//! declares input, mocks and expectations with.

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::scenario::{ExpectationSpec, Scenario};
use crate::verify::{Verified, Verifier};
use atk_core::{CallError, InterceptionSpec, MethodTag, ProtocolKind, TargetDescriptor, Value};
use atk_discovery::{discover, PipelineCatalog, TargetRegistry};
use atk_runtime::{InterceptionSession, Ledger, Switchboard};
use atk_strategy::StrategyRegistry;
use std::future::Future;
use tracing::Instrument;

/// Entry point of everything a scenario needs from a pipeline
#[derive(Debug, Clone)]
pub struct Harness {
    catalog: PipelineCatalog,
    switchboard: Switchboard,
    strategies: StrategyRegistry,
    config: HarnessConfig,
}

impl Harness {
    /// Create harness with built-in strategies and default config
    #[must_use]
    pub fn new(catalog: PipelineCatalog, switchboard: Switchboard) -> Self {
        Self {
            catalog,
            switchboard,
            strategies: StrategyRegistry::with_defaults(),
            config: HarnessConfig::default(),
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    /// With strategy registry
    #[inline]
    #[must_use]
    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Pipeline catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &PipelineCatalog {
        &self.catalog
    }

    /// Switchboard the pipeline calls through
    #[inline]
    #[must_use]
    pub fn switchboard(&self) -> &Switchboard {
        &self.switchboard
    }

    /// Start a scenario against the targets discovered under `namespace`
    #[must_use]
    pub fn scenario(&self, namespace: &str) -> ScenarioBuilder {
        let report = discover(&self.catalog, namespace);
        ScenarioBuilder::new(&self.switchboard, report.registry)
            .with_strategies(self.strategies.clone())
            .with_config(self.config.clone())
    }

    /// Start a scenario against the configured default namespace
    #[must_use]
    pub fn default_scenario(&self) -> ScenarioBuilder {
        self.scenario(&self.config.default_namespace)
    }
}

/// Fluent, order-sensitive scenario declaration
///
/// Mocks and input are accumulated until a run. Each run opens a fresh
/// session with every declared interception, executes the pipeline and
/// closes the session; expectations verify immediately against the ledger
/// of the latest run.
#[derive(Debug)]
pub struct ScenarioBuilder {
    switchboard: Switchboard,
    targets: TargetRegistry,
    strategies: StrategyRegistry,
    config: HarnessConfig,
    scenario: Scenario,
    ledger: Option<Ledger>,
    results: Vec<Value>,
}

impl ScenarioBuilder {
    /// Create builder over already-discovered targets
    #[must_use]
    pub fn new(switchboard: &Switchboard, targets: TargetRegistry) -> Self {
        Self {
            switchboard: switchboard.clone(),
            targets,
            strategies: StrategyRegistry::with_defaults(),
            config: HarnessConfig::default(),
            scenario: Scenario::default(),
            ledger: None,
            results: Vec::new(),
        }
    }

    /// With strategy registry
    #[inline]
    #[must_use]
    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the state handed to the pipeline
    pub fn set_input(&mut self, state: Value) -> &mut Self {
        tracing::debug!("Input state set: {}", state);
        self.scenario.input = state;
        self
    }

    /// Intercept an external call at a literal address
    ///
    /// # Errors
    /// - `HarnessError::InvalidAddress` for an empty address
    /// - `HarnessError::NoStrategy` if no strategy handles `protocol`
    pub fn mock_external_call(
        &mut self,
        address: &str,
        protocol: ProtocolKind,
        payload: Option<Value>,
        return_value: Value,
    ) -> Result<&mut Self, HarnessError> {
        let address = address.trim();
        if address.is_empty() || address.split('.').any(str::is_empty) {
            return Err(HarnessError::InvalidAddress {
                address: address.to_string(),
            });
        }
        let strategy = self
            .strategies
            .resolve(protocol)
            .ok_or(HarnessError::NoStrategy { protocol })?;
        let spec = strategy.build(address, payload.as_ref(), return_value);
        tracing::debug!(
            "Mocked external call {} ({}, {})",
            address,
            protocol,
            if spec.matcher.is_some() { "matching" } else { "unconditional" }
        );
        self.scenario.mocks.push(spec);
        Ok(self)
    }

    /// Answer every supported method variant of an agent with `value`
    ///
    /// # Errors
    /// `HarnessError::UnknownTarget` if no agent of that name was discovered.
    pub fn mock_agent_response(
        &mut self,
        agent_name: &str,
        value: Value,
    ) -> Result<&mut Self, HarnessError> {
        self.mock_target(agent_name, "agent", TargetRegistry::agent, value)
    }

    /// Answer every method variant of a tool with `value`
    ///
    /// # Errors
    /// `HarnessError::UnknownTarget` if no tool of that name was discovered.
    pub fn mock_tool_response(
        &mut self,
        tool_name: &str,
        value: Value,
    ) -> Result<&mut Self, HarnessError> {
        self.mock_target(tool_name, "tool", TargetRegistry::tool, value)
    }

    fn mock_target(
        &mut self,
        name: &str,
        role: &'static str,
        lookup: for<'a> fn(&'a TargetRegistry, &str) -> Option<&'a TargetDescriptor>,
        value: Value,
    ) -> Result<&mut Self, HarnessError> {
        let target = lookup(&self.targets, name)
            .ok_or_else(|| HarnessError::UnknownTarget {
                name: name.to_string(),
                role,
                namespace: self.targets.namespace().to_string(),
            })?;
        for method in target.kind.supported_methods() {
            self.scenario.mocks.push(
                InterceptionSpec::unconditional(&target.address, *method, value.clone())
                    .with_label(name),
            );
        }
        tracing::debug!(
            "Mocked {} {} at {} for {} method(s)",
            role,
            name,
            target.address,
            target.kind.supported_methods().len()
        );
        Ok(self)
    }

    /// Run a blocking pipeline entry point with the declared input
    ///
    /// # Errors
    /// - `HarnessError::Runtime` if the session cannot be opened
    /// - `HarnessError::UnmatchedCall` / `PipelineFailed` if the pipeline returned an error
    /// - `HarnessError::Teardown` if interceptions could not all be removed; the
    ///   ledger and result of the run are kept, so expectations can still be checked
    /// - `HarnessError::SwallowedUnmatched` if configured and the pipeline hid a rejection
    /// - `HarnessError::RunAndTeardown` if the run failed and teardown failed too
    pub fn run_pipeline<F>(&mut self, entry: F) -> Result<&mut Self, HarnessError>
    where
        F: FnOnce(Value) -> Result<Value, CallError>,
    {
        let session = self.open_session()?;
        let input = self.scenario.input.clone();
        let outcome = session.log().span().in_scope(|| entry(input));
        self.finish_run(session, outcome)
    }

    /// Await an async pipeline entry point with the declared input
    ///
    /// Spawns nothing; the pipeline future runs on the caller's task.
    ///
    /// # Errors
    /// Same as [`ScenarioBuilder::run_pipeline`].
    pub async fn run_pipeline_async<F, Fut>(&mut self, entry: F) -> Result<&mut Self, HarnessError>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = Result<Value, CallError>>,
    {
        let session = self.open_session()?;
        let input = self.scenario.input.clone();
        let span = session.log().span().clone();
        let outcome = entry(input).instrument(span).await;
        self.finish_run(session, outcome)
    }

    fn open_session(&self) -> Result<InterceptionSession, HarnessError> {
        tracing::info!(
            "Running pipeline in namespace {} with {} interception(s)",
            self.targets.namespace(),
            self.scenario.mocks.len()
        );
        Ok(InterceptionSession::open(
            &self.switchboard,
            self.scenario.mocks.iter().cloned(),
        )?)
    }

    fn finish_run(
        &mut self,
        session: InterceptionSession,
        outcome: Result<Value, CallError>,
    ) -> Result<&mut Self, HarnessError> {
        let (ledger, teardown) = match session.close() {
            Ok(ledger) => (ledger, None),
            Err(err) => (err.ledger.clone(), Some(err)),
        };

        let swallowed = ledger
            .rejections()
            .next()
            .map(|first| (first.address.clone(), first.args().to_string()));
        let rejected = ledger.rejections().count();
        tracing::info!("Pipeline run recorded {} intercepted call(s)", ledger.len());
        self.ledger = Some(ledger);

        let failure = match outcome {
            Ok(value) => {
                self.results.push(value);
                match swallowed {
                    Some((address, arguments)) if self.config.fail_on_swallowed_unmatched => {
                        Some(HarnessError::SwallowedUnmatched {
                            address,
                            arguments,
                            count: rejected,
                        })
                    }
                    Some((address, _)) => {
                        tracing::warn!("Pipeline swallowed unmatched call to {}", address);
                        None
                    }
                    None => None,
                }
            }
            Err(err) if err.is_unmatched() => Some(HarnessError::UnmatchedCall(err)),
            Err(err) => Some(HarnessError::PipelineFailed(err)),
        };

        match (failure, teardown) {
            (None, None) => Ok(self),
            (None, Some(teardown)) => Err(teardown.into()),
            (Some(err), None) => Err(err),
            (Some(err), Some(teardown)) => Err(err.with_teardown(teardown)),
        }
    }

    /// Verify that `target` was called `count` times via `method` with
    /// exactly `argument` as its sole positional argument
    ///
    /// # Errors
    /// - `HarnessError::UnknownTarget` if `target` is neither discovered nor a mocked address
    /// - `HarnessError::NoInterception` if nothing was mocked for that method
    /// - `HarnessError::NotRun` if no run happened yet (when required)
    /// - `HarnessError::AssertionMismatch` if the count differs
    pub fn expect_invocation(
        &mut self,
        target: &str,
        argument: Value,
        method: MethodTag,
        count: usize,
    ) -> Result<&mut Self, HarnessError> {
        self.expect(ExpectationSpec::invocation(target, argument, method, count))
    }

    /// Verify that `target` was called `count` times via `method`, whatever the arguments
    ///
    /// # Errors
    /// Same as [`ScenarioBuilder::expect_invocation`].
    pub fn expect_call_count(
        &mut self,
        target: &str,
        method: MethodTag,
        count: usize,
    ) -> Result<&mut Self, HarnessError> {
        self.expect(ExpectationSpec::call_count(target, method, count))
    }

    /// Verify that a mocked external address was hit `count` times
    ///
    /// # Errors
    /// Same as [`ScenarioBuilder::expect_invocation`].
    pub fn expect_external_call(
        &mut self,
        address: &str,
        count: usize,
    ) -> Result<&mut Self, HarnessError> {
        let method = self
            .scenario
            .mocks
            .iter()
            .find(|spec| spec.address == address)
            .map_or(MethodTag::Invoke, |spec| spec.method);
        self.expect(ExpectationSpec::call_count(address, method, count))
    }

    /// Verify one expectation and record it
    ///
    /// # Errors
    /// Same as [`ScenarioBuilder::expect_invocation`].
    pub fn expect(&mut self, expectation: ExpectationSpec) -> Result<&mut Self, HarnessError> {
        self.check(&expectation)?;
        self.scenario.expectations.push(expectation);
        Ok(self)
    }

    /// Re-verify every recorded expectation against the latest run
    ///
    /// # Errors
    /// First failing expectation.
    pub fn verify_all(&self) -> Result<Vec<Verified>, HarnessError> {
        self.scenario
            .expectations
            .iter()
            .map(|expectation| self.check(expectation))
            .collect()
    }

    fn check(&self, expectation: &ExpectationSpec) -> Result<Verified, HarnessError> {
        let address = self.resolve_address(&expectation.target)?;
        if !self.scenario.intercepts(&address, expectation.method) {
            return Err(HarnessError::NoInterception {
                target: expectation.target.clone(),
                method: expectation.method,
            });
        }
        let empty = Ledger::default();
        let ledger = match &self.ledger {
            Some(ledger) => ledger,
            None if self.config.require_prior_run => {
                return Err(HarnessError::NotRun {
                    target: expectation.target.clone(),
                });
            }
            None => &empty,
        };
        Verifier::new(ledger).verify(expectation, &address)
    }

    fn resolve_address(&self, target: &str) -> Result<String, HarnessError> {
        if let Some(descriptor) = self.targets.get(target) {
            return Ok(descriptor.address.clone());
        }
        if self.scenario.mocks.iter().any(|spec| spec.address == target) {
            return Ok(target.to_string());
        }
        Err(HarnessError::UnknownTarget {
            name: target.to_string(),
            role: "target",
            namespace: self.targets.namespace().to_string(),
        })
    }

    /// End the scenario: return what was declared and forget runs and results
    ///
    /// Sessions never outlive a run, so no interception is left on the
    /// switchboard at this point.
    pub fn teardown(&mut self) -> Scenario {
        tracing::debug!(
            "Tearing down scenario with {} mock(s) and {} expectation(s)",
            self.scenario.mocks.len(),
            self.scenario.expectations.len()
        );
        self.ledger = None;
        self.results.clear();
        std::mem::take(&mut self.scenario)
    }

    /// Declared scenario
    #[inline]
    #[must_use]
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Ledger of the latest run
    #[inline]
    #[must_use]
    pub fn ledger(&self) -> Option<&Ledger> {
        self.ledger.as_ref()
    }

    /// Pipeline outputs, one per successful run
    #[inline]
    #[must_use]
    pub fn results(&self) -> &[Value] {
        &self.results
    }

    /// Output of the latest successful run
    #[inline]
    #[must_use]
    pub fn last_result(&self) -> Option<&Value> {
        self.results.last()
    }

    /// Discovered targets
    #[inline]
    #[must_use]
    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atk_core::TargetKind;
    use atk_runtime::RemoteAgent;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const AGENT1: &str = "demo.agents.agent1";

    fn builder() -> (Switchboard, ScenarioBuilder) {
        let switchboard = Switchboard::new();
        switchboard.bind_fn(AGENT1, MethodTag::Invoke, |_| Ok(json!("original")));
        let mut targets = TargetRegistry::new("demo");
        targets.insert(TargetDescriptor::new("agent1", AGENT1, TargetKind::RemoteProxy));
        targets.insert(TargetDescriptor::new("lookup", "demo.tools.lookup", TargetKind::Tool));
        targets.insert(TargetDescriptor::new("route", "demo.graph.route", TargetKind::Callable));
        let builder = ScenarioBuilder::new(&switchboard, targets);
        (switchboard, builder)
    }

    #[test]
    fn agent_mock_covers_supported_methods() {
        let (_, mut builder) = builder();
        builder.mock_agent_response("agent1", json!("mocked")).unwrap();
        builder.mock_agent_response("route", json!("next")).unwrap();
        let methods: Vec<_> = builder.scenario().mocks().iter().map(|m| m.method).collect();
        assert_eq!(
            methods,
            vec![MethodTag::Invoke, MethodTag::AInvoke, MethodTag::Batch, MethodTag::Invoke]
        );
    }

    #[test]
    fn agent_and_tool_lookups_are_separate() {
        let (_, mut builder) = builder();
        assert!(matches!(
            builder.mock_agent_response("lookup", json!(1)),
            Err(HarnessError::UnknownTarget { role: "agent", .. })
        ));
        assert!(builder.mock_tool_response("lookup", json!(1)).is_ok());
        assert!(builder.mock_tool_response("agent1", json!(1)).is_err());
    }

    #[test]
    fn tool_sharing_an_agent_name_is_mocked_at_its_own_address() {
        let switchboard = Switchboard::new();
        let mut targets = TargetRegistry::new("demo");
        targets.insert(TargetDescriptor::new("search", "demo.agents.search", TargetKind::Callable));
        targets.insert(TargetDescriptor::new("search", "demo.tools.search", TargetKind::Tool));
        let mut builder = ScenarioBuilder::new(&switchboard, targets);

        builder.mock_agent_response("search", json!("agent")).unwrap();
        builder.mock_tool_response("search", json!("tool")).unwrap();
        let addresses: Vec<_> = builder
            .scenario()
            .mocks()
            .iter()
            .map(|m| m.address.as_str())
            .collect();
        assert_eq!(addresses[0], "demo.agents.search");
        assert!(addresses[1..].iter().all(|a| *a == "demo.tools.search"));
        assert_eq!(addresses.len(), 1 + MethodTag::ALL.len());
    }

    #[test]
    fn expectation_without_mock_fails_fast() {
        let (switchboard, mut builder) = builder();
        let agent = RemoteAgent::new(&switchboard, AGENT1);
        builder
            .run_pipeline(|state| agent.invoke(state))
            .unwrap();
        let err = builder
            .expect_call_count("agent1", MethodTag::Invoke, 0)
            .unwrap_err();
        assert!(matches!(err, HarnessError::NoInterception { .. }));
    }

    #[test]
    fn expectation_before_run_is_refused() {
        let (_, mut builder) = builder();
        builder.mock_agent_response("agent1", json!("mocked")).unwrap();
        let err = builder
            .expect_call_count("agent1", MethodTag::Invoke, 0)
            .unwrap_err();
        assert!(matches!(err, HarnessError::NotRun { .. }));
    }

    #[test]
    fn expectation_before_run_counts_zero_when_allowed() {
        let (_, builder) = builder();
        let mut builder =
            builder.with_config(HarnessConfig::new().with_require_prior_run(false));
        builder.mock_agent_response("agent1", json!("mocked")).unwrap();
        assert!(builder.expect_call_count("agent1", MethodTag::Invoke, 0).is_ok());
    }

    #[test]
    fn run_records_and_restores() {
        let (switchboard, mut builder) = builder();
        let agent = RemoteAgent::new(&switchboard, AGENT1);
        builder
            .set_input(json!({"q": 1}))
            .mock_agent_response("agent1", json!("mocked"))
            .unwrap()
            .run_pipeline(|state| agent.invoke(state))
            .unwrap()
            .expect_invocation("agent1", json!({"q": 1}), MethodTag::Invoke, 1)
            .unwrap();

        assert_eq!(builder.last_result(), Some(&json!("mocked")));
        assert_eq!(agent.invoke(json!({})).unwrap(), json!("original"));
        assert_eq!(builder.verify_all().unwrap().len(), 1);
    }

    #[test]
    fn invalid_external_address_is_rejected() {
        let (_, mut builder) = builder();
        for address in ["", "svc..get", "svc."] {
            let err = builder
                .mock_external_call(address, ProtocolKind::SyncHttp, None, json!(null))
                .unwrap_err();
            assert!(matches!(err, HarnessError::InvalidAddress { .. }));
        }
    }

    #[test]
    fn null_payload_declares_an_unconditional_mock() {
        let (_, mut builder) = builder();
        builder
            .mock_external_call("svc.get", ProtocolKind::SyncHttp, Some(json!(null)), json!(1))
            .unwrap()
            .mock_external_call("svc.put", ProtocolKind::SyncHttp, Some(json!({"q": 1})), json!(2))
            .unwrap();
        let mocks = builder.scenario().mocks();
        assert!(mocks[0].matcher.is_none());
        assert!(mocks[1].matcher.is_some());
    }

    #[test]
    fn missing_strategy_is_fatal() {
        let (_, builder) = builder();
        let mut builder = builder.with_strategies(StrategyRegistry::new());
        let err = builder
            .mock_external_call("svc.get", ProtocolKind::SyncHttp, None, json!(null))
            .unwrap_err();
        assert!(matches!(
            err,
            HarnessError::NoStrategy {
                protocol: ProtocolKind::SyncHttp
            }
        ));
    }

    #[test]
    fn teardown_returns_declarations() {
        let (_, mut builder) = builder();
        builder.mock_agent_response("agent1", json!(1)).unwrap();
        let scenario = builder.teardown();
        assert_eq!(scenario.mocks().len(), 3);
        assert!(builder.scenario().mocks().is_empty());
        assert!(builder.ledger().is_none());
    }
}
