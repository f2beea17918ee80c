//! ATK Runtime
//!
//! The interception seam pipelines call through, and the scoped sessions that
//! overlay interceptions on it.
//!
//! # Core Concepts
//!
//! - [`Switchboard`]: Shared routing table; original behavior plus session overlays
//! - [`Endpoint`]: Original behavior bound at an address
//! - [`InterceptionSession`]: Installs interceptions at open, removes them at close (or drop)
//! - [`Ledger`]: Ordered record of intercepted calls, detached at close
//! - [`RemoteAgent`] / [`ExternalClient`]: Call-site helpers for pipeline code
//!
//! # Example
//!
//! ```rust
//! use atk_core::{InterceptionSpec, MethodTag};
//! use atk_runtime::{InterceptionSession, RemoteAgent, Switchboard};
//! use serde_json::json;
//!
//! let switchboard = Switchboard::new();
//! switchboard.bind_fn("demo.agents.agent1", MethodTag::Invoke, |_| Ok(json!("real")));
//! let agent = RemoteAgent::new(&switchboard, "demo.agents.agent1");
//!
//! let session = InterceptionSession::open(
//!     &switchboard,
//!     vec![InterceptionSpec::unconditional("demo.agents.agent1", MethodTag::Invoke, json!("mocked"))],
//! )
//! .unwrap();
//! assert_eq!(agent.invoke(json!({})).unwrap(), json!("mocked"));
//!
//! let ledger = session.close().unwrap();
//! assert_eq!(ledger.len(), 1);
//! assert_eq!(agent.invoke(json!({})).unwrap(), json!("real"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod call_site;
mod endpoint;
mod error;
mod ledger;
mod log;
mod session;
mod switchboard;

// Re-exports
pub use call_site::{ExternalClient, RemoteAgent};
pub use endpoint::{Endpoint, FnEndpoint};
pub use error::{RuntimeError, TeardownError, TeardownFailure};
pub use ledger::{Ledger, LedgerWriter};
pub use log::{SessionLog, SessionStats};
pub use session::{InterceptionSession, SessionId};
pub use switchboard::{RouteKey, Switchboard};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
