//! Scenario data model

use atk_core::{InterceptionSpec, MethodTag, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Argument rule of an expectation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentMatch {
    /// Calls with exactly one positional argument deep-equal to the value
    Exactly(Value),

    /// Every call, whatever its arguments
    Any,
}

impl ArgumentMatch {
    /// Expected argument, `None` for [`ArgumentMatch::Any`]
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Exactly(value) => Some(value),
            Self::Any => None,
        }
    }
}

impl fmt::Display for ArgumentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(value) => write!(f, "{value}"),
            Self::Any => f.write_str("<any>"),
        }
    }
}

/// Declared call expectation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSpec {
    /// Target name (or literal external address)
    pub target: String,

    /// Method variant the calls must use
    pub method: MethodTag,

    /// Exact number of matching calls
    pub expected_count: usize,

    /// Argument rule
    pub argument: ArgumentMatch,
}

impl ExpectationSpec {
    /// Expect `count` calls with exactly `argument` as sole positional argument
    #[must_use]
    pub fn invocation(
        target: impl Into<String>,
        argument: Value,
        method: MethodTag,
        count: usize,
    ) -> Self {
        Self {
            target: target.into(),
            method,
            expected_count: count,
            argument: ArgumentMatch::Exactly(argument),
        }
    }

    /// Expect `count` calls regardless of arguments
    #[must_use]
    pub fn call_count(target: impl Into<String>, method: MethodTag, count: usize) -> Self {
        Self {
            target: target.into(),
            method,
            expected_count: count,
            argument: ArgumentMatch::Any,
        }
    }
}

/// One declarative test case: input, mocks, expectations
///
/// Mutated only through [`crate::ScenarioBuilder`].
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub(crate) input: Value,
    pub(crate) mocks: Vec<InterceptionSpec>,
    pub(crate) expectations: Vec<ExpectationSpec>,
}

impl Scenario {
    /// Input state handed to the pipeline
    #[inline]
    #[must_use]
    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Declared interceptions, in declaration order
    #[inline]
    #[must_use]
    pub fn mocks(&self) -> &[InterceptionSpec] {
        &self.mocks
    }

    /// Declared expectations, in declaration order
    #[inline]
    #[must_use]
    pub fn expectations(&self) -> &[ExpectationSpec] {
        &self.expectations
    }

    /// Check if an interception is declared for `(address, method)`
    #[must_use]
    pub fn intercepts(&self, address: &str, method: MethodTag) -> bool {
        self.mocks
            .iter()
            .any(|spec| spec.address == address && spec.method == method)
    }
}
