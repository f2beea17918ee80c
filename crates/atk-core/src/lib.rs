//! ATK Core
//!
//! Shared data model for the agent interception harness.
//!
//! # Core Concepts
//!
//! - [`TargetDescriptor`]: A named call site inside a pipeline (agent, tool, callable)
//! - [`ProtocolKind`]: Closed set of call protocols the harness can intercept
//! - [`MethodTag`]: Call-method variant (`invoke`, `ainvoke`, `batch`)
//! - [`CallArgs`] / [`CallRecord`]: Arguments of one call and its ledger entry
//! - [`InterceptionSpec`]: Everything the runtime needs to answer an intercepted call
//!
//! # Example
//!
//! ```rust
//! use atk_core::{CallArgs, InterceptionSpec, MethodTag};
//! use serde_json::json;
//!
//! let spec = InterceptionSpec::unconditional(
//!     "pipeline.agents.agent1",
//!     MethodTag::Invoke,
//!     json!({"messages": []}),
//! );
//!
//! let reply = spec.respond(&CallArgs::single(json!({"anything": true}))).unwrap();
//! assert_eq!(reply, json!({"messages": []}));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod call;
mod error;
mod interception;
mod protocol;
mod target;

// Re-exports
pub use call::{ArgShape, CallArgs, CallOutcome, CallRecord};
pub use error::{CallError, ParseTagError};
pub use interception::{
    ArgMatcher, HttpEnvelope, InterceptMode, InterceptionSpec, Packaging, Responder, ResponseFn,
};
pub use protocol::{CallStyle, ProtocolKind};
pub use target::{MethodTag, TargetDescriptor, TargetKind};

/// JSON value used for every state, payload, and response in the harness
pub type Value = serde_json::Value;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
