//! Pipeline catalog and namespace scanning
//!
//! Pipelines register their sub-modules in a [`PipelineCatalog`] when they are
//! defined. Each module is a loader that lists the symbols it exposes; a
//! loader may fail, in which case the scan skips that module and continues.

use crate::error::DiscoveryError;
use crate::registry::TargetRegistry;
use atk_core::{TargetDescriptor, TargetKind};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shape of a symbol exposed by a pipeline module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolShape {
    /// Plain function
    Callable,

    /// Async function
    AsyncCallable,

    /// Proxy object for a remotely deployed agent
    RemoteProxy,

    /// Tool function exposed to an agent
    Tool,

    /// Anything else (constants, helpers, types); not a target
    Other,
}

impl SymbolShape {
    /// Target kind for this shape, `None` if the symbol is not interceptable
    #[must_use]
    pub fn target_kind(&self) -> Option<TargetKind> {
        match self {
            Self::Callable => Some(TargetKind::Callable),
            Self::AsyncCallable => Some(TargetKind::AsyncCallable),
            Self::RemoteProxy => Some(TargetKind::RemoteProxy),
            Self::Tool => Some(TargetKind::Tool),
            Self::Other => None,
        }
    }
}

/// Symbol listed by a module loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposedSymbol {
    /// Symbol name (last address segment)
    pub name: String,

    /// Classified shape
    pub shape: SymbolShape,
}

impl ExposedSymbol {
    /// Create symbol
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, shape: SymbolShape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// Remote agent proxy
    #[inline]
    #[must_use]
    pub fn remote_proxy(name: impl Into<String>) -> Self {
        Self::new(name, SymbolShape::RemoteProxy)
    }

    /// Tool function
    #[inline]
    #[must_use]
    pub fn tool(name: impl Into<String>) -> Self {
        Self::new(name, SymbolShape::Tool)
    }

    /// Plain function
    #[inline]
    #[must_use]
    pub fn callable(name: impl Into<String>) -> Self {
        Self::new(name, SymbolShape::Callable)
    }

    /// Async function
    #[inline]
    #[must_use]
    pub fn async_callable(name: impl Into<String>) -> Self {
        Self::new(name, SymbolShape::AsyncCallable)
    }

    fn validate(&self, module: &str) -> Result<(), DiscoveryError> {
        let valid = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(())
        } else {
            Err(DiscoveryError::InvalidSymbol {
                module: module.to_string(),
                name: self.name.clone(),
            })
        }
    }
}

/// Loader listing the symbols of one module
pub type ModuleLoader = Arc<dyn Fn() -> Result<Vec<ExposedSymbol>, DiscoveryError> + Send + Sync>;

/// Registration table of pipeline modules, keyed by dotted module path
#[derive(Default, Clone)]
pub struct PipelineCatalog {
    modules: Arc<RwLock<IndexMap<String, ModuleLoader>>>,
}

impl fmt::Debug for PipelineCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineCatalog")
            .field("modules", &self.module_paths())
            .finish()
    }
}

impl PipelineCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module loader; re-registering a path replaces the loader
    pub fn register_module<F>(&self, module: impl Into<String>, loader: F)
    where
        F: Fn() -> Result<Vec<ExposedSymbol>, DiscoveryError> + Send + Sync + 'static,
    {
        let module = module.into();
        tracing::debug!(module = %module, "Registered pipeline module");
        self.modules.write().insert(module, Arc::new(loader));
    }

    /// Register a module with a fixed symbol list
    pub fn register_symbols(&self, module: impl Into<String>, symbols: Vec<ExposedSymbol>) {
        self.register_module(module, move || Ok(symbols.clone()));
    }

    /// Registered module paths, in registration order
    #[must_use]
    pub fn module_paths(&self) -> Vec<String> {
        self.modules.read().keys().cloned().collect()
    }

    /// Check if any module lives under `namespace`
    #[must_use]
    pub fn contains_namespace(&self, namespace: &str) -> bool {
        self.modules
            .read()
            .keys()
            .any(|module| in_namespace(module, namespace))
    }

    /// Number of registered modules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    /// Check if catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }

    fn loaders_under(&self, namespace: &str) -> Vec<(String, ModuleLoader)> {
        self.modules
            .read()
            .iter()
            .filter(|(module, _)| in_namespace(module, namespace))
            .map(|(module, loader)| (module.clone(), Arc::clone(loader)))
            .collect()
    }
}

fn in_namespace(module: &str, namespace: &str) -> bool {
    module == namespace
        || module
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Outcome of a namespace scan
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Discovered targets
    pub registry: TargetRegistry,

    /// Modules whose loader ran successfully
    pub modules_scanned: usize,

    /// Modules skipped because their loader failed
    pub modules_skipped: usize,

    /// Loader and symbol failures, in scan order
    pub failures: Vec<DiscoveryError>,
}

impl DiscoveryReport {
    /// Check if every module loaded and every symbol was accepted
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Scan `namespace` and classify every exposed symbol
///
/// Never fails: a missing namespace produces an empty registry and a failing
/// module is skipped and counted. When two modules expose the same agent name
/// (or the same tool name) the later one wins; an agent and a tool sharing a
/// name are both kept.
#[must_use]
pub fn discover(catalog: &PipelineCatalog, namespace: &str) -> DiscoveryReport {
    let mut report = DiscoveryReport {
        registry: TargetRegistry::new(namespace),
        ..DiscoveryReport::default()
    };

    let loaders = catalog.loaders_under(namespace);
    if loaders.is_empty() {
        let err = DiscoveryError::NamespaceNotFound {
            namespace: namespace.to_string(),
        };
        tracing::warn!(error = %err, "Discovery returned no targets");
        report.failures.push(err);
        return report;
    }

    for (module, loader) in loaders {
        let symbols = match loader() {
            Ok(symbols) => symbols,
            Err(err) => {
                tracing::debug!(module = %module, error = %err, "Skipping module");
                report.modules_skipped += 1;
                report.failures.push(err);
                continue;
            }
        };
        report.modules_scanned += 1;

        for symbol in symbols {
            let Some(kind) = symbol.shape.target_kind() else {
                continue;
            };
            if let Err(err) = symbol.validate(&module) {
                report.failures.push(err);
                continue;
            }
            let address = format!("{module}.{}", symbol.name);
            let descriptor = TargetDescriptor::new(symbol.name, address, kind);
            if let Some(previous) = report.registry.insert(descriptor) {
                tracing::debug!(
                    target_name = %previous.name,
                    replaced = %previous.address,
                    "Target name exposed by more than one module"
                );
            }
        }
    }

    if report.modules_skipped > 0 {
        tracing::warn!(
            namespace,
            skipped = report.modules_skipped,
            "Skipped modules that failed to load"
        );
    }
    tracing::info!(
        namespace,
        targets = report.registry.len(),
        scanned = report.modules_scanned,
        "Discovered pipeline targets"
    );
    report
}
