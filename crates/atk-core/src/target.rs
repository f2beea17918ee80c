//! Call targets and method variants
//!
//! A target is a named call site inside the pipeline under test. Each target
//! kind supports a fixed set of [`MethodTag`] variants; interceptions are
//! installed per `(address, method)` pair.

use crate::error::ParseTagError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Call-method variant used by a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodTag {
    /// Direct blocking call
    Invoke,

    /// Awaitable call
    AInvoke,

    /// Batched call
    Batch,
}

impl MethodTag {
    /// Every method variant, in installation order
    pub const ALL: [MethodTag; 3] = [MethodTag::Invoke, MethodTag::AInvoke, MethodTag::Batch];

    /// Wire name of the method
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoke => "invoke",
            Self::AInvoke => "ainvoke",
            Self::Batch => "batch",
        }
    }

    /// Check if the method is awaited by the caller
    #[inline]
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self, Self::AInvoke)
    }
}

impl fmt::Display for MethodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodTag {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoke" => Ok(Self::Invoke),
            "ainvoke" => Ok(Self::AInvoke),
            "batch" => Ok(Self::Batch),
            _ => Err(ParseTagError::new("method", s.trim())),
        }
    }
}

/// Shape of a discovered target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// Plain function call site
    Callable,

    /// Async function call site
    AsyncCallable,

    /// Proxy to a remotely deployed agent
    RemoteProxy,

    /// Tool function exposed to an agent
    Tool,
}

impl TargetKind {
    /// Method variants a call site of this kind can be invoked through
    #[must_use]
    pub fn supported_methods(&self) -> &'static [MethodTag] {
        match self {
            Self::Callable => &[MethodTag::Invoke],
            Self::AsyncCallable => &[MethodTag::AInvoke],
            Self::RemoteProxy | Self::Tool => &MethodTag::ALL,
        }
    }

    /// Tag name of the kind
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Callable => "callable",
            Self::AsyncCallable => "async-callable",
            Self::RemoteProxy => "remote-proxy",
            Self::Tool => "tool",
        }
    }

    /// Check if this kind is addressed as a tool rather than an agent
    #[inline]
    #[must_use]
    pub fn is_tool(&self) -> bool {
        matches!(self, Self::Tool)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "callable" => Ok(Self::Callable),
            "async-callable" => Ok(Self::AsyncCallable),
            "remote-proxy" => Ok(Self::RemoteProxy),
            "tool" => Ok(Self::Tool),
            _ => Err(ParseTagError::new("target kind", s.trim())),
        }
    }
}

/// A named, addressable call site
///
/// Built once per namespace scan and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Human-readable name, unique within a namespace
    pub name: String,

    /// Fully-qualified dotted address used for routing
    pub address: String,

    /// Shape of the call site
    pub kind: TargetKind,
}

impl TargetDescriptor {
    /// Create descriptor
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>, kind: TargetKind) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            kind,
        }
    }

    /// Check if the target can be called through `method`
    #[inline]
    #[must_use]
    pub fn supports(&self, method: MethodTag) -> bool {
        self.kind.supported_methods().contains(&method)
    }

    /// Module part of the address (everything before the last dot)
    #[must_use]
    pub fn module_path(&self) -> &str {
        self.address
            .rsplit_once('.')
            .map_or("", |(module, _)| module)
    }
}

impl fmt::Display for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} @ {})", self.name, self.kind, self.address)
    }
}
