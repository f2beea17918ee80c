//! Built-in strategies

use crate::strategy::InterceptionStrategy;
use atk_core::{ArgShape, Packaging, ProtocolKind};

/// Blocking HTTP: matches URL plus query parameters, answers with an HTTP envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncHttpStrategy;

impl InterceptionStrategy for SyncHttpStrategy {
    fn protocol(&self) -> ProtocolKind {
        ProtocolKind::SyncHttp
    }

    fn arg_shape(&self) -> ArgShape {
        ArgShape::UrlAndParams
    }

    fn packaging(&self) -> Packaging {
        Packaging::Http
    }

    fn name(&self) -> &'static str {
        "sync_http"
    }
}

/// Awaited HTTP: matches the URL only, answers with an HTTP envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncHttpStrategy;

impl InterceptionStrategy for AsyncHttpStrategy {
    fn protocol(&self) -> ProtocolKind {
        ProtocolKind::AsyncHttp
    }

    fn arg_shape(&self) -> ArgShape {
        ArgShape::Url
    }

    fn packaging(&self) -> Packaging {
        Packaging::Http
    }

    fn name(&self) -> &'static str {
        "async_http"
    }
}

/// RPC stub: matches the request message
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcStubStrategy;

impl InterceptionStrategy for RpcStubStrategy {
    fn protocol(&self) -> ProtocolKind {
        ProtocolKind::RpcStub
    }

    fn arg_shape(&self) -> ArgShape {
        ArgShape::Request
    }

    fn name(&self) -> &'static str {
        "rpc_stub"
    }
}

/// Query-language client: matches the query text
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryLanguageStrategy;

impl InterceptionStrategy for QueryLanguageStrategy {
    fn protocol(&self) -> ProtocolKind {
        ProtocolKind::QueryLanguage
    }

    fn arg_shape(&self) -> ArgShape {
        ArgShape::Query
    }

    fn name(&self) -> &'static str {
        "query_language"
    }
}

/// Queue, database, SDK and custom clients: match the full argument tuple
#[derive(Debug, Clone, Copy)]
pub struct ArgumentTupleStrategy {
    protocol: ProtocolKind,
}

impl ArgumentTupleStrategy {
    /// Create strategy for `protocol`
    #[inline]
    #[must_use]
    pub fn new(protocol: ProtocolKind) -> Self {
        Self { protocol }
    }
}

impl InterceptionStrategy for ArgumentTupleStrategy {
    fn protocol(&self) -> ProtocolKind {
        self.protocol
    }

    fn arg_shape(&self) -> ArgShape {
        ArgShape::ArgumentTuple
    }

    fn name(&self) -> &'static str {
        match self.protocol {
            ProtocolKind::MessageQueue => "message_queue",
            ProtocolKind::Database => "database",
            ProtocolKind::SdkCall => "sdk_call",
            _ => "custom",
        }
    }
}
