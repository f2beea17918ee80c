//! Call protocols
//!
//! [`ProtocolKind`] is the closed set of call styles the harness knows how to
//! intercept. Scenario files may use the historical client-library names
//! (`REQUESTS`, `AIOHTTP`, `GRPC`, ...); [`ProtocolKind::from_str`] maps them
//! onto the canonical kinds.

use crate::error::ParseTagError;
use crate::target::MethodTag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Call protocol of an external dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProtocolKind {
    /// Blocking HTTP request/response
    #[serde(rename = "synchronous-http")]
    SyncHttp,

    /// Awaited HTTP request/response
    #[serde(rename = "asynchronous-http")]
    AsyncHttp,

    /// RPC stub method taking a request message
    #[serde(rename = "rpc-stub")]
    RpcStub,

    /// Query-language client (GraphQL and similar)
    #[serde(rename = "query-language")]
    QueryLanguage,

    /// Message queue producer/consumer
    #[serde(rename = "message-queue")]
    MessageQueue,

    /// Database client
    #[serde(rename = "database")]
    Database,

    /// Third-party SDK method
    #[serde(rename = "sdk-call")]
    SdkCall,

    /// Anything else called with positional/keyword arguments
    #[serde(rename = "custom")]
    Custom,
}

impl ProtocolKind {
    /// Every protocol kind
    pub const ALL: [ProtocolKind; 8] = [
        ProtocolKind::SyncHttp,
        ProtocolKind::AsyncHttp,
        ProtocolKind::RpcStub,
        ProtocolKind::QueryLanguage,
        ProtocolKind::MessageQueue,
        ProtocolKind::Database,
        ProtocolKind::SdkCall,
        ProtocolKind::Custom,
    ];

    /// Canonical tag name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SyncHttp => "synchronous-http",
            Self::AsyncHttp => "asynchronous-http",
            Self::RpcStub => "rpc-stub",
            Self::QueryLanguage => "query-language",
            Self::MessageQueue => "message-queue",
            Self::Database => "database",
            Self::SdkCall => "sdk-call",
            Self::Custom => "custom",
        }
    }

    /// Whether call sites of this protocol block or await
    #[inline]
    #[must_use]
    pub fn call_style(&self) -> CallStyle {
        match self {
            Self::AsyncHttp => CallStyle::Async,
            _ => CallStyle::Sync,
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolKind {
    type Err = ParseTagError;

    /// Accepts canonical names and client-library aliases, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let kind = match normalized.as_str() {
            "synchronous-http" | "sync-http" | "requests" | "httpx" | "urllib" => Self::SyncHttp,
            "asynchronous-http" | "async-http" | "aiohttp" => Self::AsyncHttp,
            "rpc-stub" | "rpc" | "grpc" => Self::RpcStub,
            "query-language" | "graphql" => Self::QueryLanguage,
            "message-queue" | "mq" => Self::MessageQueue,
            "database" | "db" => Self::Database,
            "sdk-call" | "sdk" => Self::SdkCall,
            "custom" | "soap" => Self::Custom,
            _ => return Err(ParseTagError::new("protocol", s.trim())),
        };
        Ok(kind)
    }
}

/// Blocking vs. awaited call sites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallStyle {
    /// Caller blocks until the call returns
    Sync,

    /// Caller awaits the call
    Async,
}

impl CallStyle {
    /// Method variant an external call of this style is routed through
    #[inline]
    #[must_use]
    pub fn method(&self) -> MethodTag {
        match self {
            Self::Sync => MethodTag::Invoke,
            Self::Async => MethodTag::AInvoke,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_parse() {
        for kind in ProtocolKind::ALL {
            assert_eq!(kind.as_str().parse::<ProtocolKind>().unwrap(), kind);
        }
    }

    #[test]
    fn library_aliases_parse() {
        assert_eq!("REQUESTS".parse::<ProtocolKind>().unwrap(), ProtocolKind::SyncHttp);
        assert_eq!("HTTPX".parse::<ProtocolKind>().unwrap(), ProtocolKind::SyncHttp);
        assert_eq!("AIOHTTP".parse::<ProtocolKind>().unwrap(), ProtocolKind::AsyncHttp);
        assert_eq!("GRPC".parse::<ProtocolKind>().unwrap(), ProtocolKind::RpcStub);
        assert_eq!("GRAPHQL".parse::<ProtocolKind>().unwrap(), ProtocolKind::QueryLanguage);
        assert_eq!("MQ".parse::<ProtocolKind>().unwrap(), ProtocolKind::MessageQueue);
        assert_eq!("DB".parse::<ProtocolKind>().unwrap(), ProtocolKind::Database);
        assert_eq!("SDK".parse::<ProtocolKind>().unwrap(), ProtocolKind::SdkCall);
        assert_eq!("SOAP".parse::<ProtocolKind>().unwrap(), ProtocolKind::Custom);
    }

    #[test]
    fn websockets_is_not_a_protocol() {
        let err = "WEBSOCKETS".parse::<ProtocolKind>().unwrap_err();
        assert!(err.to_string().contains("WEBSOCKETS"));
    }

    #[test]
    fn only_async_http_awaits() {
        assert_eq!(ProtocolKind::AsyncHttp.call_style(), CallStyle::Async);
        assert_eq!(ProtocolKind::AsyncHttp.call_style().method(), MethodTag::AInvoke);
        assert_eq!(ProtocolKind::RpcStub.call_style().method(), MethodTag::Invoke);
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&ProtocolKind::QueryLanguage).unwrap();
        assert_eq!(json, "\"query-language\"");
    }
}
