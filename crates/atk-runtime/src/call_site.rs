//! Call-site helpers used inside pipelines
//!
//! [`RemoteAgent`] and [`ExternalClient`] are thin handles that turn method
//! calls into switchboard dispatches, so pipeline code reads like it is
//! talking to the real agent or client.

use crate::switchboard::Switchboard;
use atk_core::{CallArgs, CallError, HttpEnvelope, MethodTag, Value};

/// Proxy to a remotely deployed agent
#[derive(Debug, Clone)]
pub struct RemoteAgent {
    address: String,
    switchboard: Switchboard,
}

impl RemoteAgent {
    /// Create proxy routed at `address`
    #[must_use]
    pub fn new(switchboard: &Switchboard, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            switchboard: switchboard.clone(),
        }
    }

    /// Routed address
    #[inline]
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Direct call with one state argument
    ///
    /// # Errors
    /// Propagates the dispatch failure.
    pub fn invoke(&self, state: Value) -> Result<Value, CallError> {
        self.invoke_with(MethodTag::Invoke, &CallArgs::single(state))
    }

    /// Awaited call with one state argument
    ///
    /// # Errors
    /// Propagates the dispatch failure.
    pub async fn ainvoke(&self, state: Value) -> Result<Value, CallError> {
        self.switchboard
            .dispatch_async(&self.address, MethodTag::AInvoke, &CallArgs::single(state))
            .await
    }

    /// Batched call; the batch travels as one positional list
    ///
    /// # Errors
    /// Propagates the dispatch failure.
    pub fn batch(&self, states: Vec<Value>) -> Result<Value, CallError> {
        self.invoke_with(MethodTag::Batch, &CallArgs::single(Value::Array(states)))
    }

    /// Call with explicit arguments through any blocking method variant
    ///
    /// # Errors
    /// Propagates the dispatch failure.
    pub fn invoke_with(&self, method: MethodTag, args: &CallArgs) -> Result<Value, CallError> {
        self.switchboard.dispatch(&self.address, method, args)
    }
}

/// Client for external services
///
/// Operations are routed at `"{base}.{operation}"`, e.g. `http.post`.
#[derive(Debug, Clone)]
pub struct ExternalClient {
    base: String,
    switchboard: Switchboard,
}

impl ExternalClient {
    /// Create client rooted at `base`
    #[must_use]
    pub fn new(switchboard: &Switchboard, base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            switchboard: switchboard.clone(),
        }
    }

    /// Address an operation is routed at
    #[must_use]
    pub fn address_of(&self, operation: &str) -> String {
        format!("{}.{}", self.base, operation)
    }

    /// Blocking HTTP GET with query parameters
    ///
    /// # Errors
    /// Dispatch failure, or `CallError::MalformedResponse` if the answer is not an envelope.
    pub fn get(&self, url: &str, params: Value) -> Result<HttpEnvelope, CallError> {
        self.http("get", url, params)
    }

    /// Blocking HTTP POST with query parameters
    ///
    /// # Errors
    /// Dispatch failure, or `CallError::MalformedResponse` if the answer is not an envelope.
    pub fn post(&self, url: &str, params: Value) -> Result<HttpEnvelope, CallError> {
        self.http("post", url, params)
    }

    /// Awaited HTTP GET
    ///
    /// # Errors
    /// Dispatch failure, or `CallError::MalformedResponse` if the answer is not an envelope.
    pub async fn get_async(&self, url: &str) -> Result<HttpEnvelope, CallError> {
        let address = self.address_of("get");
        let value = self
            .switchboard
            .dispatch_async(&address, MethodTag::AInvoke, &CallArgs::single(Value::from(url)))
            .await?;
        HttpEnvelope::from_value(&address, value)
    }

    /// Blocking call with explicit arguments
    ///
    /// # Errors
    /// Propagates the dispatch failure.
    pub fn call(&self, operation: &str, args: &CallArgs) -> Result<Value, CallError> {
        self.switchboard
            .dispatch(&self.address_of(operation), MethodTag::Invoke, args)
    }

    /// Awaited call with explicit arguments
    ///
    /// # Errors
    /// Propagates the dispatch failure.
    pub async fn call_async(&self, operation: &str, args: &CallArgs) -> Result<Value, CallError> {
        self.switchboard
            .dispatch_async(&self.address_of(operation), MethodTag::AInvoke, args)
            .await
    }

    fn http(&self, verb: &str, url: &str, params: Value) -> Result<HttpEnvelope, CallError> {
        let address = self.address_of(verb);
        let args = CallArgs::single(Value::from(url)).with_keyword("params", params);
        let value = self.switchboard.dispatch(&address, MethodTag::Invoke, &args)?;
        HttpEnvelope::from_value(&address, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InterceptionSession;
    use atk_core::{ArgMatcher, ArgShape, InterceptionSpec, Packaging};
    use serde_json::json;

    #[test]
    fn agent_methods_route_to_their_variant() {
        let switchboard = Switchboard::new();
        let agent = RemoteAgent::new(&switchboard, "p.agent4");
        let session = InterceptionSession::open(
            &switchboard,
            vec![
                InterceptionSpec::unconditional("p.agent4", MethodTag::Invoke, json!("one")),
                InterceptionSpec::unconditional("p.agent4", MethodTag::Batch, json!(["many"])),
            ],
        )
        .unwrap();

        assert_eq!(agent.invoke(json!({})).unwrap(), json!("one"));
        assert_eq!(agent.batch(vec![json!({}), json!({})]).unwrap(), json!(["many"]));

        let ledger = session.close().unwrap();
        let batch = &ledger.records()[1];
        assert_eq!(batch.method, MethodTag::Batch);
        assert_eq!(batch.sole_positional(), Some(&json!([{}, {}])));
    }

    #[test]
    fn post_sends_url_and_params() {
        let switchboard = Switchboard::new();
        let client = ExternalClient::new(&switchboard, "svc.http");
        let spec = InterceptionSpec::matching(
            "svc.http.post",
            MethodTag::Invoke,
            ArgMatcher::from_payload(
                ArgShape::UrlAndParams,
                &json!({"url": "http://svc/a", "params": {"q": 1}}),
            ),
            json!({"ok": true}),
        )
        .with_packaging(Packaging::Http);
        let _session = InterceptionSession::open(&switchboard, vec![spec]).unwrap();

        let envelope = client.post("http://svc/a", json!({"q": 1})).unwrap();
        assert_eq!(envelope.json(), &json!({"ok": true}));
        assert!(client.post("http://svc/a", json!({"q": 2})).unwrap_err().is_unmatched());
    }

    #[test]
    fn raw_answer_to_http_call_is_malformed() {
        let switchboard = Switchboard::new();
        switchboard.bind_fn("svc.http.get", MethodTag::Invoke, |_| Ok(json!("raw")));
        let client = ExternalClient::new(&switchboard, "svc.http");
        let err = client.get("http://svc", Value::Null).unwrap_err();
        assert!(matches!(err, CallError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn async_calls_resolve_without_spawning() {
        let switchboard = Switchboard::new();
        let agent = RemoteAgent::new(&switchboard, "p.agent2");
        let client = ExternalClient::new(&switchboard, "svc.aio");
        let _session = InterceptionSession::open(
            &switchboard,
            vec![
                InterceptionSpec::unconditional("p.agent2", MethodTag::AInvoke, json!("async")),
                InterceptionSpec::unconditional("svc.aio.get", MethodTag::AInvoke, json!({"v": 1}))
                    .with_packaging(Packaging::Http),
            ],
        )
        .unwrap();

        assert_eq!(agent.ainvoke(json!({})).await.unwrap(), json!("async"));
        assert_eq!(client.get_async("http://x").await.unwrap().json(), &json!({"v": 1}));
    }
}
