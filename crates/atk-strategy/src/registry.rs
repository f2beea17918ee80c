//! Strategy registry
//!
//! Provides [`StrategyRegistry`], the protocol → strategy table the scenario
//! builder delegates interception construction to.

use crate::builtin::{
    ArgumentTupleStrategy, AsyncHttpStrategy, QueryLanguageStrategy, RpcStubStrategy,
    SyncHttpStrategy,
};
use crate::strategy::InterceptionStrategy;
use atk_core::ProtocolKind;
use std::collections::HashMap;
use std::sync::Arc;

/// One strategy per protocol
#[derive(Debug, Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<ProtocolKind, Arc<dyn InterceptionStrategy>>,
}

impl StrategyRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Create registry with a built-in strategy for every protocol
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SyncHttpStrategy));
        registry.register(Arc::new(AsyncHttpStrategy));
        registry.register(Arc::new(RpcStubStrategy));
        registry.register(Arc::new(QueryLanguageStrategy));
        for protocol in [
            ProtocolKind::MessageQueue,
            ProtocolKind::Database,
            ProtocolKind::SdkCall,
            ProtocolKind::Custom,
        ] {
            registry.register(Arc::new(ArgumentTupleStrategy::new(protocol)));
        }
        registry
    }

    /// Register a strategy under its protocol, returning the one it replaced
    pub fn register(
        &mut self,
        strategy: Arc<dyn InterceptionStrategy>,
    ) -> Option<Arc<dyn InterceptionStrategy>> {
        let protocol = strategy.protocol();
        let previous = self.strategies.insert(protocol, strategy);
        if previous.is_some() {
            tracing::debug!(protocol = %protocol, "Replaced interception strategy");
        }
        previous
    }

    /// Strategy for `protocol`, `None` if none is registered
    #[inline]
    #[must_use]
    pub fn resolve(&self, protocol: ProtocolKind) -> Option<Arc<dyn InterceptionStrategy>> {
        self.strategies.get(&protocol).cloned()
    }

    /// Check if a strategy is registered for `protocol`
    #[inline]
    #[must_use]
    pub fn contains(&self, protocol: ProtocolKind) -> bool {
        self.strategies.contains_key(&protocol)
    }

    /// Remove strategy
    #[inline]
    pub fn remove(&mut self, protocol: ProtocolKind) -> bool {
        self.strategies.remove(&protocol).is_some()
    }

    /// Registered protocols, in canonical order
    #[must_use]
    pub fn protocols(&self) -> Vec<ProtocolKind> {
        let mut protocols: Vec<_> = self.strategies.keys().copied().collect();
        protocols.sort();
        protocols
    }

    /// Get number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atk_core::{ArgShape, Packaging};

    #[derive(Debug)]
    struct ReplacementStrategy;

    impl InterceptionStrategy for ReplacementStrategy {
        fn protocol(&self) -> ProtocolKind {
            ProtocolKind::SyncHttp
        }

        fn arg_shape(&self) -> ArgShape {
            ArgShape::Url
        }

        fn name(&self) -> &'static str {
            "replacement"
        }
    }

    #[test]
    fn registry_new_empty() {
        let registry = StrategyRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve(ProtocolKind::SyncHttp).is_none());
    }

    #[test]
    fn registry_with_defaults_covers_every_protocol() {
        let registry = StrategyRegistry::with_defaults();
        assert_eq!(registry.len(), ProtocolKind::ALL.len());
        assert_eq!(registry.protocols(), ProtocolKind::ALL.to_vec());
        for protocol in ProtocolKind::ALL {
            assert_eq!(registry.resolve(protocol).unwrap().protocol(), protocol);
        }
    }

    #[test]
    fn registration_replaces_previous() {
        let mut registry = StrategyRegistry::with_defaults();
        let previous = registry.register(Arc::new(ReplacementStrategy));
        assert_eq!(previous.unwrap().name(), "sync_http");

        let resolved = registry.resolve(ProtocolKind::SyncHttp).unwrap();
        assert_eq!(resolved.name(), "replacement");
        assert_eq!(resolved.packaging(), Packaging::Raw);
        assert_eq!(registry.len(), ProtocolKind::ALL.len());
    }

    #[test]
    fn registry_remove() {
        let mut registry = StrategyRegistry::with_defaults();
        assert!(registry.remove(ProtocolKind::Database));
        assert!(!registry.contains(ProtocolKind::Database));
        assert!(!registry.remove(ProtocolKind::Database));
    }
}
