//! Named pipeline entry points
//!
//! Declarative scenarios name the pipeline they drive (the `root_path` of a
//! scenario file, the orchestrator of a feature step). A [`PipelineTable`]
//! maps those names onto blocking or async entry points.

use crate::builder::ScenarioBuilder;
use crate::error::{HarnessError, StepError};
use atk_core::{CallError, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Blocking pipeline entry point
pub type BlockingEntry = Arc<dyn Fn(Value) -> Result<Value, CallError> + Send + Sync>;

/// Future returned by an async pipeline entry point
pub type PipelineFuture = Pin<Box<dyn Future<Output = Result<Value, CallError>> + Send>>;

/// Async pipeline entry point
pub type AsyncEntry = Arc<dyn Fn(Value) -> PipelineFuture + Send + Sync>;

/// One pipeline entry point
#[derive(Clone)]
pub enum PipelineEntry {
    /// Caller blocks until the pipeline returns
    Blocking(BlockingEntry),

    /// Caller awaits the pipeline
    Async(AsyncEntry),
}

impl PipelineEntry {
    /// Create blocking entry
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Self::Blocking(Arc::new(f))
    }

    /// Create async entry
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, CallError>> + Send + 'static,
    {
        Self::Async(Arc::new(move |state| Box::pin(f(state)) as PipelineFuture))
    }

    /// Check if the entry must be awaited
    #[inline]
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    /// Run the entry through `builder`, blocking
    ///
    /// # Errors
    /// `StepError::AsyncPipeline` for async entries, otherwise whatever the run returns.
    pub fn run(&self, name: &str, builder: &mut ScenarioBuilder) -> Result<(), HarnessError> {
        match self {
            Self::Blocking(entry) => {
                builder.run_pipeline(|state| entry(state))?;
                Ok(())
            }
            Self::Async(_) => Err(StepError::AsyncPipeline {
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Run the entry through `builder`, awaiting async entries
    ///
    /// # Errors
    /// Whatever the run returns.
    pub async fn run_async(&self, builder: &mut ScenarioBuilder) -> Result<(), HarnessError> {
        match self {
            Self::Blocking(entry) => {
                builder.run_pipeline(|state| entry(state))?;
            }
            Self::Async(entry) => {
                builder.run_pipeline_async(|state| entry(state)).await?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PipelineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking(_) => f.write_str("PipelineEntry::Blocking(..)"),
            Self::Async(_) => f.write_str("PipelineEntry::Async(..)"),
        }
    }
}

/// Pipelines addressable by name
#[derive(Debug, Clone, Default)]
pub struct PipelineTable {
    entries: BTreeMap<String, PipelineEntry>,
    default: Option<String>,
}

impl PipelineTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register entry under `name`; returns the replaced entry
    pub fn register(&mut self, name: impl Into<String>, entry: PipelineEntry) -> Option<PipelineEntry> {
        let name = name.into();
        tracing::debug!("Registered pipeline {} ({})", name, if entry.is_async() { "async" } else { "blocking" });
        self.entries.insert(name, entry)
    }

    /// With entry registered under `name`
    #[must_use]
    pub fn with_pipeline(mut self, name: impl Into<String>, entry: PipelineEntry) -> Self {
        self.register(name, entry);
        self
    }

    /// With the pipeline used when a scenario names none
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// Name of the default pipeline
    #[inline]
    #[must_use]
    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Resolve `name`, or the default when `None`
    ///
    /// # Errors
    /// `StepError::UnknownPipeline` if nothing is registered under the name.
    pub fn resolve<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a PipelineEntry), StepError> {
        let name = name.or(self.default.as_deref()).unwrap_or_default();
        self.entries
            .get_key_value(name)
            .map(|(key, entry)| (key.as_str(), entry))
            .ok_or_else(|| StepError::UnknownPipeline {
                name: name.to_string(),
            })
    }

    /// Check if `name` is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Number of pipelines
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
