//! Original call behavior
//!
//! An [`Endpoint`] is what a switchboard address does when no interception is
//! installed: the real agent proxy, the real HTTP client, or a stand-in bound
//! by the pipeline author.

use async_trait::async_trait;
use atk_core::{CallArgs, CallError, Value};
use std::fmt;
use std::sync::Arc;

/// Behavior bound at a switchboard address
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Blocking call
    fn call(&self, args: &CallArgs) -> Result<Value, CallError>;

    /// Awaited call; defaults to the blocking implementation
    async fn call_async(&self, args: &CallArgs) -> Result<Value, CallError> {
        self.call(args)
    }
}

type EndpointFn = Arc<dyn Fn(&CallArgs) -> Result<Value, CallError> + Send + Sync>;

/// Endpoint backed by a closure
#[derive(Clone)]
pub struct FnEndpoint {
    f: EndpointFn,
}

impl FnEndpoint {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CallArgs) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Endpoint that always answers `value`
    #[must_use]
    pub fn constant(value: Value) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    /// Endpoint that always fails, for addresses that must not be reached in tests
    #[must_use]
    pub fn unreachable(address: impl Into<String>, message: impl Into<String>) -> Self {
        let address = address.into();
        let message = message.into();
        Self::new(move |_| Err(CallError::endpoint(address.clone(), message.clone())))
    }
}

impl fmt::Debug for FnEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnEndpoint(..)")
    }
}

#[async_trait]
impl Endpoint for FnEndpoint {
    fn call(&self, args: &CallArgs) -> Result<Value, CallError> {
        (self.f)(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn closure_endpoint_sees_arguments() {
        let endpoint = FnEndpoint::new(|args| Ok(json!(args.positional.len())));
        let reply = endpoint.call(&CallArgs::positional(vec![json!(1), json!(2)]));
        assert_eq!(reply.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn async_call_defaults_to_blocking() {
        let endpoint = FnEndpoint::constant(json!("original"));
        assert_eq!(endpoint.call_async(&CallArgs::new()).await.unwrap(), json!("original"));
    }

    #[test]
    fn unreachable_endpoint_fails() {
        let endpoint = FnEndpoint::unreachable("svc.get", "network disabled");
        let err = endpoint.call(&CallArgs::new()).unwrap_err();
        assert_eq!(err.address(), "svc.get");
    }
}
