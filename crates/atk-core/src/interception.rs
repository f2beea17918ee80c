//! Interception specs
//!
//! An [`InterceptionSpec`] is built by a protocol strategy (or directly by the
//! scenario builder for agent targets) and consumed by the runtime, which
//! answers every routed call through [`InterceptionSpec::respond`].

use crate::call::{ArgShape, CallArgs};
use crate::error::CallError;
use crate::protocol::ProtocolKind;
use crate::target::MethodTag;
use crate::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Response-producing function for per-call dispatch
pub type ResponseFn = Arc<dyn Fn(&CallArgs) -> Result<Value, CallError> + Send + Sync>;

/// Source of the value an interception answers with
#[derive(Clone)]
pub enum Responder {
    /// Fixed value
    Value(Value),

    /// Computed per call
    Function(ResponseFn),
}

impl Responder {
    /// Wrap a closure
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&CallArgs) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    /// Answer successive calls with successive values, repeating the last one
    ///
    /// An empty sequence answers `null`.
    #[must_use]
    pub fn sequence(values: Vec<Value>) -> Self {
        let cursor = AtomicUsize::new(0);
        Self::function(move |_| {
            let idx = cursor.fetch_add(1, Ordering::SeqCst);
            Ok(values
                .get(idx)
                .or_else(|| values.last())
                .cloned()
                .unwrap_or(Value::Null))
        })
    }

    /// Produce the response for one call
    pub fn respond(&self, args: &CallArgs) -> Result<Value, CallError> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Function(f) => f(args),
        }
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<Value> for Responder {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Payload matcher: a reduction shape plus the reduced value calls must equal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgMatcher {
    /// How call arguments are reduced
    pub shape: ArgShape,

    /// Reduced payload
    pub expected: Value,
}

impl ArgMatcher {
    /// Build matcher from a raw declared payload
    #[must_use]
    pub fn from_payload(shape: ArgShape, payload: &Value) -> Self {
        Self {
            shape,
            expected: shape.normalize_payload(payload),
        }
    }

    /// Check if live arguments reduce to the expected value
    #[inline]
    #[must_use]
    pub fn matches(&self, args: &CallArgs) -> bool {
        self.shape.reduce(args) == self.expected
    }
}

/// Single value for every call vs. per-call dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterceptMode {
    /// Every call gets the configured response, whatever its arguments
    Single,

    /// Each call is checked against the matcher before responding
    PerCall,
}

/// How a response is wrapped before it reaches the call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Packaging {
    /// Returned as configured
    #[default]
    Raw,

    /// Wrapped in an [`HttpEnvelope`] with status 200
    Http,
}

impl Packaging {
    /// Apply packaging to a response value
    #[must_use]
    pub fn wrap(&self, value: Value) -> Value {
        match self {
            Self::Raw => value,
            Self::Http => HttpEnvelope::ok(value).into_value(),
        }
    }
}

/// HTTP-style response as seen by call sites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpEnvelope {
    /// Status code
    pub status: u16,

    /// Decoded JSON body
    pub body: Value,
}

impl HttpEnvelope {
    /// 200 response
    #[inline]
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// Unpack envelope returned by an interception or endpoint
    pub fn from_value(address: &str, value: Value) -> Result<Self, CallError> {
        serde_json::from_value(value).map_err(|e| CallError::MalformedResponse {
            address: address.to_string(),
            message: format!("expected HTTP envelope: {e}"),
        })
    }

    /// Serialize into a JSON value
    #[must_use]
    pub fn into_value(self) -> Value {
        serde_json::json!({ "status": self.status, "body": self.body })
    }

    /// Decoded body
    #[inline]
    #[must_use]
    pub fn json(&self) -> &Value {
        &self.body
    }

    /// Check for a 2xx status
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Everything the runtime needs to answer calls routed to one `(address, method)`
#[derive(Debug, Clone)]
pub struct InterceptionSpec {
    /// Routed address
    pub address: String,

    /// Method variant intercepted
    pub method: MethodTag,

    /// Protocol of an external call; `None` for agent and tool targets
    pub protocol: Option<ProtocolKind>,

    /// Target name the spec was declared for, used in diagnostics
    pub label: Option<String>,

    /// Payload matcher for per-call dispatch
    pub matcher: Option<ArgMatcher>,

    /// Response source
    pub response: Responder,

    /// Single value vs. per-call dispatch
    pub mode: InterceptMode,

    /// Response wrapping
    pub packaging: Packaging,
}

impl InterceptionSpec {
    /// Spec that answers every call with `value`
    #[must_use]
    pub fn unconditional(address: impl Into<String>, method: MethodTag, value: Value) -> Self {
        Self {
            address: address.into(),
            method,
            protocol: None,
            label: None,
            matcher: None,
            response: Responder::Value(value),
            mode: InterceptMode::Single,
            packaging: Packaging::Raw,
        }
    }

    /// Spec that answers only calls accepted by `matcher`
    #[must_use]
    pub fn matching(
        address: impl Into<String>,
        method: MethodTag,
        matcher: ArgMatcher,
        value: Value,
    ) -> Self {
        Self {
            address: address.into(),
            method,
            protocol: None,
            label: None,
            matcher: Some(matcher),
            response: Responder::Value(value),
            mode: InterceptMode::PerCall,
            packaging: Packaging::Raw,
        }
    }

    /// Set protocol
    #[inline]
    #[must_use]
    pub fn with_protocol(mut self, protocol: ProtocolKind) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Set diagnostic label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set packaging
    #[inline]
    #[must_use]
    pub fn with_packaging(mut self, packaging: Packaging) -> Self {
        self.packaging = packaging;
        self
    }

    /// Replace the response source; switches to per-call dispatch
    #[inline]
    #[must_use]
    pub fn with_responder(mut self, responder: Responder) -> Self {
        self.response = responder;
        self.mode = InterceptMode::PerCall;
        self
    }

    /// Name used in diagnostics: label if set, else address
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.address)
    }

    /// Answer one call
    ///
    /// # Errors
    /// - `CallError::Unmatched` if a matcher is set and rejects the arguments
    /// - whatever a [`Responder::Function`] returns
    pub fn respond(&self, args: &CallArgs) -> Result<Value, CallError> {
        if self.mode == InterceptMode::PerCall {
            if let Some(matcher) = &self.matcher {
                if !matcher.matches(args) {
                    return Err(CallError::Unmatched {
                        address: self.address.clone(),
                        method: self.method,
                        arguments: args.to_string(),
                        expected: matcher.expected.clone(),
                    });
                }
            }
        }
        let value = self.response.respond(args)?;
        Ok(self.packaging.wrap(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    fn http_matcher() -> ArgMatcher {
        ArgMatcher::from_payload(
            ArgShape::UrlAndParams,
            &json!({"url": "http://svc/data", "params": {"input": "hello"}}),
        )
    }

    #[test]
    fn unconditional_ignores_arguments() {
        let spec = InterceptionSpec::unconditional("a.b", MethodTag::Invoke, json!(42));
        assert_eq!(spec.respond(&CallArgs::new()).unwrap(), json!(42));
        assert_eq!(
            spec.respond(&CallArgs::single(json!("x")).with_arg(json!(1))).unwrap(),
            json!(42)
        );
    }

    #[test]
    fn matching_spec_answers_exact_match() {
        let spec = InterceptionSpec::matching(
            "svc.getdata",
            MethodTag::Invoke,
            http_matcher(),
            json!({"content": "hello"}),
        );
        let args = CallArgs::single(json!("http://svc/data"))
            .with_keyword("params", json!({"input": "hello"}));
        assert_eq!(spec.respond(&args).unwrap(), json!({"content": "hello"}));
    }

    #[test]
    fn matching_spec_rejects_drift() {
        let spec = InterceptionSpec::matching(
            "svc.getdata",
            MethodTag::Invoke,
            http_matcher(),
            json!({"content": "hello"}),
        );
        let args = CallArgs::single(json!("http://svc/data"))
            .with_keyword("params", json!({"input": "bye"}));
        let err = spec.respond(&args).unwrap_err();
        assert!(err.is_unmatched());
        assert!(err.to_string().contains("bye"));
    }

    #[test]
    fn http_packaging_wraps_body() {
        let spec = InterceptionSpec::unconditional("svc", MethodTag::Invoke, json!({"k": 1}))
            .with_packaging(Packaging::Http);
        let value = spec.respond(&CallArgs::new()).unwrap();
        let envelope = HttpEnvelope::from_value("svc", value).unwrap();
        assert!(envelope.is_success());
        assert_eq!(envelope.json(), &json!({"k": 1}));
    }

    #[test]
    fn envelope_rejects_raw_values() {
        let err = HttpEnvelope::from_value("svc", json!("plain")).unwrap_err();
        assert!(matches!(err, CallError::MalformedResponse { .. }));
    }

    #[test]
    fn sequence_responder_repeats_last() {
        let responder = Responder::sequence(vec![json!(1), json!(2)]);
        let args = CallArgs::new();
        assert_eq!(responder.respond(&args).unwrap(), json!(1));
        assert_eq!(responder.respond(&args).unwrap(), json!(2));
        assert_eq!(responder.respond(&args).unwrap(), json!(2));
    }

    #[test]
    fn with_responder_switches_to_per_call() {
        let spec = InterceptionSpec::unconditional("x", MethodTag::Batch, json!(null))
            .with_responder(Responder::function(|args| Ok(json!(args.positional.len()))));
        assert_eq!(spec.mode, InterceptMode::PerCall);
        assert_eq!(
            spec.respond(&CallArgs::positional(vec![json!(1), json!(2)])).unwrap(),
            json!(2)
        );
    }

    #[test]
    fn display_name_prefers_label() {
        let spec = InterceptionSpec::unconditional("demo.agent1", MethodTag::Invoke, json!(null));
        assert_eq!(spec.display_name(), "demo.agent1");
        assert_eq!(spec.with_label("agent1").display_name(), "agent1");
    }

    proptest! {
        #[test]
        fn unconditional_returns_value_for_any_string_args(s in ".*", n in any::<i64>()) {
            let spec = InterceptionSpec::unconditional("p", MethodTag::Invoke, json!({"fixed": true}));
            let args = CallArgs::single(json!(s)).with_keyword("n", json!(n));
            prop_assert_eq!(spec.respond(&args).unwrap(), json!({"fixed": true}));
        }
    }
}
