//! ATK Strategy
//!
//! Pluggable construction of interceptions, one strategy per call protocol.
//!
//! # Core Concepts
//!
//! - [`InterceptionStrategy`]: Argument reduction and response packaging for a protocol
//! - [`SyncHttpStrategy`] / [`AsyncHttpStrategy`]: URL (+ params) matching, HTTP envelopes
//! - [`RpcStubStrategy`] / [`QueryLanguageStrategy`]: request message / query text matching
//! - [`ArgumentTupleStrategy`]: positional + keyword matching for queue, database, SDK, custom
//! - [`StrategyRegistry`]: Protocol → strategy table
//!
//! # Example
//!
//! ```rust
//! use atk_core::{CallArgs, ProtocolKind};
//! use atk_strategy::StrategyRegistry;
//! use serde_json::json;
//!
//! let registry = StrategyRegistry::with_defaults();
//! let strategy = registry.resolve(ProtocolKind::RpcStub).unwrap();
//!
//! let spec = strategy.build("stubs.users.Get", Some(&json!({"request": {"id": 1}})), json!("alice"));
//! assert_eq!(spec.respond(&CallArgs::single(json!({"id": 1}))).unwrap(), json!("alice"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod builtin;
mod registry;
mod strategy;

// Re-exports
pub use builtin::{
    ArgumentTupleStrategy, AsyncHttpStrategy, QueryLanguageStrategy, RpcStubStrategy,
    SyncHttpStrategy,
};
pub use registry::StrategyRegistry;
pub use strategy::InterceptionStrategy;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
