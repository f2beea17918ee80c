//! Error types raised at call time

use crate::target::MethodTag;
use crate::Value;

/// Errors surfaced to the call site inside the pipeline
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallError {
    /// Call arguments did not match the payload the interception was declared with
    #[error("unmatched call to '{address}' via '{method}': got {arguments}, expected {expected}")]
    Unmatched {
        /// Intercepted address
        address: String,
        /// Method variant used
        method: MethodTag,
        /// Offending arguments, rendered
        arguments: String,
        /// Reduced payload the call had to equal
        expected: Value,
    },

    /// Nothing is bound or installed at the address
    #[error("no binding for '{address}' via '{method}'")]
    NoBinding {
        /// Requested address
        address: String,
        /// Method variant used
        method: MethodTag,
    },

    /// Original endpoint failed
    #[error("endpoint '{address}' failed: {message}")]
    Endpoint {
        /// Endpoint address
        address: String,
        /// Failure description
        message: String,
    },

    /// Response could not be unpacked by the call site
    #[error("malformed response from '{address}': {message}")]
    MalformedResponse {
        /// Responding address
        address: String,
        /// What was wrong
        message: String,
    },
}

impl CallError {
    /// Create endpoint failure
    #[inline]
    pub fn endpoint(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Endpoint {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Address the error concerns
    #[must_use]
    pub fn address(&self) -> &str {
        match self {
            Self::Unmatched { address, .. }
            | Self::NoBinding { address, .. }
            | Self::Endpoint { address, .. }
            | Self::MalformedResponse { address, .. } => address,
        }
    }

    /// Check if this is an unmatched-call failure
    #[inline]
    #[must_use]
    pub fn is_unmatched(&self) -> bool {
        matches!(self, Self::Unmatched { .. })
    }
}

/// Unknown tag while parsing a method, protocol, or target kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseTagError {
    /// What was being parsed
    pub kind: &'static str,
    /// Rejected input
    pub value: String,
}

impl ParseTagError {
    /// Create parse error
    #[inline]
    #[must_use]
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unmatched_display_names_address_and_values() {
        let err = CallError::Unmatched {
            address: "svc.getdata".to_string(),
            method: MethodTag::Invoke,
            arguments: "(\"http://x\")".to_string(),
            expected: json!({"url": "http://y"}),
        };
        let msg = err.to_string();
        assert!(msg.contains("svc.getdata"));
        assert!(msg.contains("http://x"));
        assert!(msg.contains("http://y"));
        assert!(err.is_unmatched());
        assert_eq!(err.address(), "svc.getdata");
    }

    #[test]
    fn parse_tag_error_display() {
        let err = ParseTagError::new("protocol", "WEBSOCKETS");
        assert_eq!(err.to_string(), "unknown protocol: 'WEBSOCKETS'");
    }
}
