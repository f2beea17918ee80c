//! ATK Discovery
//!
//! Builds the name → target mapping a scenario resolves mock declarations
//! against.
//!
//! # Core Concepts
//!
//! - [`PipelineCatalog`]: Registration table of pipeline modules and their loaders
//! - [`ExposedSymbol`] / [`SymbolShape`]: What a module exposes and how it is classified
//! - [`discover`]: Scan a namespace into a [`TargetRegistry`] (partial results on failure)
//!
//! # Example
//!
//! ```rust
//! use atk_discovery::{discover, ExposedSymbol, PipelineCatalog};
//!
//! let catalog = PipelineCatalog::new();
//! catalog.register_symbols("demo.agents", vec![ExposedSymbol::remote_proxy("agent1")]);
//!
//! let report = discover(&catalog, "demo");
//! assert_eq!(report.registry.get("agent1").unwrap().address, "demo.agents.agent1");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod catalog;
mod error;
mod registry;

// Re-exports
pub use catalog::{discover, DiscoveryReport, ExposedSymbol, ModuleLoader, PipelineCatalog, SymbolShape};
pub use error::DiscoveryError;
pub use registry::TargetRegistry;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
