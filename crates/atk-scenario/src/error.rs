//! Error types for scenarios
//!
//! Provides error handling for:
//! - Unresolvable mock and expectation targets
//! - Unmatched calls raised inside the pipeline
//! - Expectation mismatches
//! - Session and teardown failures
//! - Scenario file, feature file and config loading

use atk_core::{CallError, MethodTag, ParseTagError, ProtocolKind, Value};
use atk_runtime::{RuntimeError, TeardownError};
use std::path::PathBuf;

/// Main harness error type
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Target name not found in the discovered registry
    #[error("unknown {role} '{name}' in namespace '{namespace}'")]
    UnknownTarget {
        /// Requested name
        name: String,
        /// What the name was looked up as ("agent", "tool", "target")
        role: &'static str,
        /// Namespace the registry was built from
        namespace: String,
    },

    /// No strategy registered for the protocol
    #[error("no interception strategy registered for protocol '{protocol}'")]
    NoStrategy {
        /// Requested protocol
        protocol: ProtocolKind,
    },

    /// Address of an external mock is empty or malformed
    #[error("invalid external address '{address}'")]
    InvalidAddress {
        /// Offending address
        address: String,
    },

    /// Expectation references a target with nothing installed for that method
    #[error("no interception declared for '{target}' via '{method}'; declare a mock before expecting calls")]
    NoInterception {
        /// Target name or address
        target: String,
        /// Method variant
        method: MethodTag,
    },

    /// Expectation checked before any pipeline run
    #[error("cannot verify '{target}': the pipeline has not been run")]
    NotRun {
        /// Target name or address
        target: String,
    },

    /// Call count did not match
    #[error(
        "assertion mismatch for '{target}' via '{method}' with argument {}: expected {expected}, got {actual}",
        render_argument(.argument.as_ref())
    )]
    AssertionMismatch {
        /// Target name or address
        target: String,
        /// Method variant
        method: MethodTag,
        /// Expected argument; `None` counts every call
        argument: Option<Value>,
        /// Declared count
        expected: usize,
        /// Observed count
        actual: usize,
    },

    /// Pipeline made a call whose arguments did not match the declared payload
    #[error("unmatched call: {0}")]
    UnmatchedCall(CallError),

    /// Pipeline swallowed an unmatched call but the ledger recorded it
    #[error("pipeline swallowed {count} unmatched call(s), first to '{address}' with {arguments}")]
    SwallowedUnmatched {
        /// Address of the first rejected call
        address: String,
        /// Arguments of the first rejected call, rendered
        arguments: String,
        /// Number of rejected calls
        count: usize,
    },

    /// Pipeline returned an error other than an unmatched call
    #[error("pipeline failed: {0}")]
    PipelineFailed(CallError),

    /// Session could not be opened
    #[error("session error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Session closed but some interceptions stayed installed
    #[error("teardown error: {0}")]
    Teardown(#[from] TeardownError),

    /// Run failed and its session also left interceptions installed
    #[error("{run}; teardown error: {teardown}")]
    RunAndTeardown {
        /// Error raised by the run itself
        run: Box<HarnessError>,
        /// Removals that failed while closing the session
        teardown: TeardownError,
    },

    /// Scenario, feature or config file could not be loaded
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// Step text could not be parsed or applied
    #[error("step error: {0}")]
    Step(#[from] StepError),
}

impl HarnessError {
    /// Attach a teardown failure to an error raised by the run
    #[must_use]
    pub fn with_teardown(self, teardown: TeardownError) -> Self {
        Self::RunAndTeardown {
            run: Box::new(self),
            teardown,
        }
    }

    /// Teardown failure carried by the error, alone or next to a run error
    #[must_use]
    pub fn teardown(&self) -> Option<&TeardownError> {
        match self {
            Self::Teardown(err) | Self::RunAndTeardown { teardown: err, .. } => Some(err),
            _ => None,
        }
    }

    /// Check if the error fails the scenario
    ///
    /// Teardown failures are reported but do not change the scenario verdict.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Teardown(_))
    }

    /// Check if the error is a failed expectation
    #[inline]
    #[must_use]
    pub fn is_assertion(&self) -> bool {
        match self {
            Self::RunAndTeardown { run, .. } => run.is_assertion(),
            other => matches!(other, Self::AssertionMismatch { .. }),
        }
    }

    /// Target name or address the error concerns, if any
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::UnknownTarget { name, .. } => Some(name.as_str()),
            Self::InvalidAddress { address }
            | Self::SwallowedUnmatched { address, .. } => Some(address.as_str()),
            Self::NoInterception { target, .. }
            | Self::NotRun { target }
            | Self::AssertionMismatch { target, .. } => Some(target.as_str()),
            Self::UnmatchedCall(err) | Self::PipelineFailed(err) => Some(err.address()),
            Self::Teardown(err) => err.first_address(),
            Self::RunAndTeardown { run, .. } => run.target(),
            Self::NoStrategy { .. } | Self::Runtime(_) | Self::Load(_) | Self::Step(_) => None,
        }
    }
}

fn render_argument(argument: Option<&Value>) -> String {
    argument.map_or_else(|| "<any>".to_string(), ToString::to_string)
}

/// Scenario, feature and config file errors
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// File could not be read
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Scenario JSON is malformed
    #[error("invalid scenario JSON in {origin}: {source}")]
    Json {
        /// File path or `<inline>`
        origin: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Config TOML is malformed
    #[error("invalid config in {origin}: {source}")]
    Toml {
        /// File path or `<inline>`
        origin: String,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Unknown protocol, method or kind tag
    #[error("in {origin}: {source}")]
    Tag {
        /// File path or `<inline>`
        origin: String,
        /// Underlying error
        #[source]
        source: ParseTagError,
    },

    /// Feature file text is malformed
    #[error("invalid feature file {origin}: {source}")]
    Feature {
        /// File path or `<inline>`
        origin: String,
        /// Underlying error
        #[source]
        source: StepError,
    },

    /// File extension is neither `.json` nor `.feature`
    #[error("unsupported scenario file {}", .path.display())]
    UnsupportedFile {
        /// File path
        path: PathBuf,
    },
}

/// Step vocabulary errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepError {
    /// Step text matches no known pattern
    #[error("line {line}: unrecognized step '{text}'")]
    Unrecognized {
        /// 1-based line number (0 for free-standing steps)
        line: usize,
        /// Step text without keyword
        text: String,
    },

    /// Literal value could not be parsed
    #[error("line {line}: invalid literal '{literal}': {message}")]
    Literal {
        /// 1-based line number (0 for free-standing steps)
        line: usize,
        /// Offending literal
        literal: String,
        /// Parser message
        message: String,
    },

    /// Step appears before any `Scenario:` header
    #[error("line {line}: step outside of a scenario")]
    OutsideScenario {
        /// 1-based line number
        line: usize,
    },

    /// `And`/`But` with no preceding step
    #[error("line {line}: continuation step without a preceding step")]
    DanglingContinuation {
        /// 1-based line number
        line: usize,
    },

    /// Step names a pipeline that was not registered with the runner
    #[error("unknown pipeline '{name}'")]
    UnknownPipeline {
        /// Requested pipeline name
        name: String,
    },

    /// Async-only pipeline requested by a blocking run
    #[error("pipeline '{name}' only has an async entry point; use the async runner")]
    AsyncPipeline {
        /// Pipeline name
        name: String,
    },

    /// Protocol tag inside a step is unknown
    #[error("line {line}: {source}")]
    Tag {
        /// 1-based line number
        line: usize,
        /// Underlying error
        #[source]
        source: ParseTagError,
    },
}

impl StepError {
    /// Attach a line number to an error raised without one
    #[must_use]
    pub fn at_line(self, line: usize) -> Self {
        match self {
            Self::Unrecognized { text, .. } => Self::Unrecognized { line, text },
            Self::Literal {
                literal, message, ..
            } => Self::Literal {
                line,
                literal,
                message,
            },
            Self::Tag { source, .. } => Self::Tag { line, source },
            other => other,
        }
    }
}
