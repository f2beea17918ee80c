//! Target registry
//!
//! Provides [`TargetRegistry`], the name → [`TargetDescriptor`] mapping
//! produced by one namespace scan.

use atk_core::{TargetDescriptor, TargetKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Lookup slot of a target; agents and tools never shadow each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum Slot {
    Agent,
    Tool,
}

impl Slot {
    fn of(kind: TargetKind) -> Self {
        if kind.is_tool() {
            Self::Tool
        } else {
            Self::Agent
        }
    }
}

/// Discovered targets of one namespace, in discovery order
///
/// Names are unique per slot: a tool and an agent may share a name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetRegistry {
    namespace: String,
    #[serde(with = "indexmap::map::serde_seq")]
    targets: IndexMap<(Slot, String), TargetDescriptor>,
}

impl TargetRegistry {
    /// Create empty registry for a namespace
    #[inline]
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            targets: IndexMap::new(),
        }
    }

    /// Namespace the registry was built from
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Insert descriptor, returning the one of the same name and slot it replaced
    pub fn insert(&mut self, descriptor: TargetDescriptor) -> Option<TargetDescriptor> {
        let key = (Slot::of(descriptor.kind), descriptor.name.clone());
        self.targets.insert(key, descriptor)
    }

    /// Look up a non-tool target by name
    #[must_use]
    pub fn agent(&self, name: &str) -> Option<&TargetDescriptor> {
        self.targets.get(&(Slot::Agent, name.to_string()))
    }

    /// Look up a tool by name
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&TargetDescriptor> {
        self.targets.get(&(Slot::Tool, name.to_string()))
    }

    /// Look up target by name, agents first
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TargetDescriptor> {
        self.agent(name).or_else(|| self.tool(name))
    }

    /// Look up target by routed address
    #[must_use]
    pub fn by_address(&self, address: &str) -> Option<&TargetDescriptor> {
        self.targets.values().find(|t| t.address == address)
    }

    /// Check if a target is registered under `name`
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Target names in discovery order; a name shared by an agent and a
    /// tool appears twice
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.targets.values().map(|t| t.name.as_str()).collect()
    }

    /// Iterate over descriptors
    pub fn iter(&self) -> impl Iterator<Item = &TargetDescriptor> {
        self.targets.values()
    }

    /// Iterate over descriptors of one kind
    pub fn of_kind(&self, kind: TargetKind) -> impl Iterator<Item = &TargetDescriptor> {
        self.targets.values().filter(move |t| t.kind == kind)
    }

    /// Number of targets
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if no target was discovered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TargetRegistry {
        let mut registry = TargetRegistry::new("demo");
        registry.insert(TargetDescriptor::new(
            "agent1",
            "demo.agents.agent1",
            TargetKind::RemoteProxy,
        ));
        registry.insert(TargetDescriptor::new(
            "lookup",
            "demo.tools.lookup",
            TargetKind::Tool,
        ));
        registry
    }

    #[test]
    fn lookup_by_name_and_address() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("agent1").unwrap().address, "demo.agents.agent1");
        assert_eq!(registry.by_address("demo.tools.lookup").unwrap().name, "lookup");
        assert!(registry.get("agent9").is_none());
    }

    #[test]
    fn insert_replaces_same_name() {
        let mut registry = registry();
        let previous = registry.insert(TargetDescriptor::new(
            "agent1",
            "demo.other.agent1",
            TargetKind::Callable,
        ));
        assert_eq!(previous.unwrap().address, "demo.agents.agent1");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("agent1").unwrap().kind, TargetKind::Callable);
    }

    #[test]
    fn tool_and_agent_share_a_name() {
        let mut registry = registry();
        let previous = registry.insert(TargetDescriptor::new(
            "agent1",
            "demo.tools.agent1",
            TargetKind::Tool,
        ));
        assert!(previous.is_none());
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.agent("agent1").unwrap().address, "demo.agents.agent1");
        assert_eq!(registry.tool("agent1").unwrap().address, "demo.tools.agent1");
        assert_eq!(registry.get("agent1").unwrap().kind, TargetKind::RemoteProxy);
        assert!(registry.agent("lookup").is_none());
        assert_eq!(registry.names(), vec!["agent1", "lookup", "agent1"]);
    }

    #[test]
    fn filter_by_kind() {
        let registry = registry();
        let tools: Vec<_> = registry.of_kind(TargetKind::Tool).map(|t| t.name.as_str()).collect();
        assert_eq!(tools, vec!["lookup"]);
        assert_eq!(registry.names(), vec!["agent1", "lookup"]);
    }
}
