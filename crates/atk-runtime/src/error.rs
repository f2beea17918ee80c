//! Runtime errors

use crate::ledger::Ledger;
use crate::session::SessionId;
use atk_core::MethodTag;

/// Errors opening or driving an interception session
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// Another session already holds the switchboard
    #[error("switchboard already has an active session ({active})")]
    SessionActive {
        /// Session currently holding the switchboard
        active: SessionId,
    },

    /// Interception declared for an address the switchboard cannot route
    #[error("cannot install interception for '{address}' via '{method}': {reason}")]
    InstallFailed {
        /// Target address
        address: String,
        /// Method variant
        method: MethodTag,
        /// Failure description
        reason: String,
    },
}

/// One interception that could not be removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    /// Address the interception was installed at
    pub address: String,

    /// Method variant
    pub method: MethodTag,

    /// Failure description
    pub reason: String,
}

impl std::fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' via '{}': {}", self.address, self.method, self.reason)
    }
}

/// Teardown finished, but some interceptions could not be removed
///
/// Carries the detached ledger so verification can still run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("teardown left {} interception(s) in place: {}", .failures.len(), render(.failures))]
pub struct TeardownError {
    /// Every failed removal, in teardown order
    pub failures: Vec<TeardownFailure>,

    /// Ledger of the session
    pub ledger: Ledger,
}

impl TeardownError {
    /// Take the detached ledger
    #[inline]
    #[must_use]
    pub fn into_ledger(self) -> Ledger {
        self.ledger
    }

    /// First failed address
    #[must_use]
    pub fn first_address(&self) -> Option<&str> {
        self.failures.first().map(|f| f.address.as_str())
    }
}

fn render(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
