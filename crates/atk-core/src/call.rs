//! Call arguments and ledger records

use crate::target::MethodTag;
use crate::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::fmt;

/// Positional and keyword arguments of one call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallArgs {
    /// Positional arguments, in call order
    #[serde(default)]
    pub positional: Vec<Value>,

    /// Keyword arguments
    #[serde(default)]
    pub keyword: Map<String, Value>,
}

impl CallArgs {
    /// Create empty argument list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single positional argument (the usual state-object call)
    #[inline]
    #[must_use]
    pub fn single(value: Value) -> Self {
        Self {
            positional: vec![value],
            keyword: Map::new(),
        }
    }

    /// Create from positional arguments
    #[inline]
    #[must_use]
    pub fn positional(values: Vec<Value>) -> Self {
        Self {
            positional: values,
            keyword: Map::new(),
        }
    }

    /// Append positional argument
    #[inline]
    #[must_use]
    pub fn with_arg(mut self, value: Value) -> Self {
        self.positional.push(value);
        self
    }

    /// Set keyword argument
    #[inline]
    #[must_use]
    pub fn with_keyword(mut self, key: impl Into<String>, value: Value) -> Self {
        self.keyword.insert(key.into(), value);
        self
    }

    /// The lone positional argument, if there is exactly one
    #[inline]
    #[must_use]
    pub fn sole_positional(&self) -> Option<&Value> {
        match self.positional.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// First positional argument, falling back to a keyword of the given name
    #[must_use]
    pub fn first_or_keyword(&self, key: &str) -> Option<&Value> {
        self.positional.first().or_else(|| self.keyword.get(key))
    }

    /// Check if no arguments were passed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

impl fmt::Display for CallArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        let mut first = true;
        for value in &self.positional {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
            first = false;
        }
        for (key, value) in &self.keyword {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        f.write_str(")")
    }
}

/// How an argument list is reduced to a comparable value
///
/// Each protocol strategy picks one shape; the reduced value of a live call
/// is compared against the reduced payload declared by the test author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgShape {
    /// `{"url": .., "params": ..}` from `(url, params=..)`
    UrlAndParams,

    /// URL only
    Url,

    /// Request message of an RPC stub
    Request,

    /// Query text
    Query,

    /// `{"args": [..], "kwargs": {..}}`
    ArgumentTuple,
}

impl ArgShape {
    /// Reduce live call arguments
    #[must_use]
    pub fn reduce(&self, args: &CallArgs) -> Value {
        match self {
            Self::UrlAndParams => {
                let url = args.first_or_keyword("url").cloned().unwrap_or(Value::Null);
                let params = args
                    .keyword
                    .get("params")
                    .or_else(|| args.positional.get(1))
                    .cloned()
                    .unwrap_or(Value::Null);
                serde_json::json!({ "url": url, "params": params })
            }
            Self::Url => args.first_or_keyword("url").cloned().unwrap_or(Value::Null),
            Self::Request => args
                .first_or_keyword("request")
                .cloned()
                .unwrap_or(Value::Null),
            Self::Query => args.first_or_keyword("query").cloned().unwrap_or(Value::Null),
            Self::ArgumentTuple => serde_json::json!({
                "args": args.positional,
                "kwargs": args.keyword,
            }),
        }
    }

    /// Reduce a declared payload into the same shape as [`ArgShape::reduce`]
    ///
    /// Missing fields default the way an omitted argument would reduce.
    #[must_use]
    pub fn normalize_payload(&self, payload: &Value) -> Value {
        let field = |name: &str| payload.get(name).cloned().unwrap_or(Value::Null);
        match self {
            Self::UrlAndParams => serde_json::json!({
                "url": field("url"),
                "params": field("params"),
            }),
            Self::Url => field("url"),
            Self::Request => field("request"),
            Self::Query => field("query"),
            Self::ArgumentTuple => {
                let args = payload
                    .get("args")
                    .cloned()
                    .unwrap_or_else(|| Value::Array(Vec::new()));
                let kwargs = payload
                    .get("kwargs")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                serde_json::json!({ "args": args, "kwargs": kwargs })
            }
        }
    }
}

/// Whether an intercepted call was answered or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// Interception produced a response
    Answered,

    /// Arguments did not match the declared payload
    Rejected,
}

/// One intercepted invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Address the call was routed to
    pub address: String,

    /// Method variant used by the call site
    pub method: MethodTag,

    /// Positional arguments
    pub positional: Vec<Value>,

    /// Keyword arguments
    pub keyword: Map<String, Value>,

    /// Position in the session ledger (0-based)
    pub sequence: u64,

    /// Answered or rejected
    pub outcome: CallOutcome,

    /// Wall-clock time of the call
    pub recorded_at: DateTime<Utc>,
}

impl CallRecord {
    /// Create record from call arguments
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        method: MethodTag,
        args: &CallArgs,
        sequence: u64,
        outcome: CallOutcome,
    ) -> Self {
        Self {
            address: address.into(),
            method,
            positional: args.positional.clone(),
            keyword: args.keyword.clone(),
            sequence,
            outcome,
            recorded_at: Utc::now(),
        }
    }

    /// The lone positional argument, if the call had exactly one
    #[inline]
    #[must_use]
    pub fn sole_positional(&self) -> Option<&Value> {
        match self.positional.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Check if the record is for `(address, method)`
    #[inline]
    #[must_use]
    pub fn is_for(&self, address: &str, method: MethodTag) -> bool {
        self.address == address && self.method == method
    }

    /// Rebuild the argument list
    #[must_use]
    pub fn args(&self) -> CallArgs {
        CallArgs {
            positional: self.positional.clone(),
            keyword: self.keyword.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn sole_positional_requires_exactly_one() {
        assert!(CallArgs::new().sole_positional().is_none());
        assert_eq!(CallArgs::single(json!(1)).sole_positional(), Some(&json!(1)));
        let two = CallArgs::single(json!(1)).with_arg(json!(2));
        assert!(two.sole_positional().is_none());
    }

    #[test]
    fn keyword_only_call_has_no_sole_positional() {
        let args = CallArgs::new().with_keyword("state", json!({"a": 1}));
        assert!(args.sole_positional().is_none());
    }

    #[test]
    fn url_and_params_reduction() {
        let args = CallArgs::single(json!("http://svc/data"))
            .with_keyword("params", json!({"input": "hello"}));
        assert_eq!(
            ArgShape::UrlAndParams.reduce(&args),
            json!({"url": "http://svc/data", "params": {"input": "hello"}})
        );

        let payload = json!({"url": "http://svc/data", "params": {"input": "hello"}});
        assert_eq!(
            ArgShape::UrlAndParams.normalize_payload(&payload),
            ArgShape::UrlAndParams.reduce(&args)
        );
    }

    #[test]
    fn url_reduction_ignores_params() {
        let args = CallArgs::single(json!("http://svc")).with_keyword("params", json!({"x": 1}));
        assert_eq!(ArgShape::Url.reduce(&args), json!("http://svc"));
        assert_eq!(ArgShape::Url.normalize_payload(&json!({"url": "http://svc"})), json!("http://svc"));
    }

    #[test]
    fn argument_tuple_defaults() {
        let empty = ArgShape::ArgumentTuple.normalize_payload(&json!({}));
        assert_eq!(empty, json!({"args": [], "kwargs": {}}));
        assert_eq!(ArgShape::ArgumentTuple.reduce(&CallArgs::new()), empty);
    }

    #[test]
    fn request_falls_back_to_keyword() {
        let args = CallArgs::new().with_keyword("request", json!({"id": 7}));
        assert_eq!(ArgShape::Request.reduce(&args), json!({"id": 7}));
    }

    #[test]
    fn display_lists_positional_then_keyword() {
        let args = CallArgs::single(json!("u")).with_keyword("params", json!(null));
        assert_eq!(args.to_string(), "(\"u\", params=null)");
    }

    #[test]
    fn record_matches_address_and_method() {
        let record = CallRecord::new(
            "demo.agent1",
            MethodTag::Batch,
            &CallArgs::single(json!({})),
            3,
            CallOutcome::Answered,
        );
        assert!(record.is_for("demo.agent1", MethodTag::Batch));
        assert!(!record.is_for("demo.agent1", MethodTag::Invoke));
        assert_eq!(record.args(), CallArgs::single(json!({})));
    }
}
