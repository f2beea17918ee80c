//! Discovery errors

/// Failures while scanning a pipeline namespace
///
/// None of these escape [`crate::discover`]: a failed sub-module is skipped
/// and counted, and a missing namespace yields an empty registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// Namespace has no registered modules
    #[error("namespace not found: {namespace}")]
    NamespaceNotFound {
        /// Requested namespace
        namespace: String,
    },

    /// A sub-module loader failed
    #[error("failed to load module '{module}': {message}")]
    ModuleLoad {
        /// Fully-qualified module path
        module: String,
        /// Loader failure description
        message: String,
    },

    /// Symbol name cannot be used as an address segment
    #[error("invalid symbol name '{name}' in module '{module}'")]
    InvalidSymbol {
        /// Module exposing the symbol
        module: String,
        /// Offending name
        name: String,
    },
}

impl DiscoveryError {
    /// Create module load failure
    #[inline]
    pub fn module_load(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModuleLoad {
            module: module.into(),
            message: message.into(),
        }
    }
}
