//! Expectation verification
//!
//! Replays a detached [`Ledger`] against an [`ExpectationSpec`]: records are
//! filtered to the expectation's `(address, method)`, then (for exact
//! argument rules) to calls with exactly one positional argument equal to the
//! expected value. Keyword and multi-argument calls never match. The count
//! must equal the declared count exactly.

use crate::error::HarnessError;
use crate::scenario::{ArgumentMatch, ExpectationSpec};
use atk_runtime::Ledger;

/// Outcome of one successful verification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    /// Matching calls
    pub matched: usize,

    /// All calls to the route, matching or not
    pub route_calls: usize,
}

/// Checks expectations against a ledger
#[derive(Debug, Clone, Copy)]
pub struct Verifier<'a> {
    ledger: &'a Ledger,
}

impl<'a> Verifier<'a> {
    /// Create verifier over `ledger`
    #[inline]
    #[must_use]
    pub fn new(ledger: &'a Ledger) -> Self {
        Self { ledger }
    }

    /// Count calls matching `expectation` at `address`
    #[must_use]
    pub fn count(&self, expectation: &ExpectationSpec, address: &str) -> usize {
        match &expectation.argument {
            ArgumentMatch::Exactly(value) => {
                self.ledger
                    .count_matching(address, expectation.method, value)
            }
            ArgumentMatch::Any => self.ledger.for_route(address, expectation.method).count(),
        }
    }

    /// Verify `expectation` against calls routed to `address`
    ///
    /// # Errors
    /// `HarnessError::AssertionMismatch` when the count differs, in either direction.
    pub fn verify(
        &self,
        expectation: &ExpectationSpec,
        address: &str,
    ) -> Result<Verified, HarnessError> {
        let matched = self.count(expectation, address);
        let route_calls = self.ledger.for_route(address, expectation.method).count();
        tracing::debug!(
            "Verifying {} via {}: expected {}, matched {} of {} call(s)",
            expectation.target,
            expectation.method,
            expectation.expected_count,
            matched,
            route_calls
        );
        if matched == expectation.expected_count {
            Ok(Verified {
                matched,
                route_calls,
            })
        } else {
            Err(HarnessError::AssertionMismatch {
                target: expectation.target.clone(),
                method: expectation.method,
                argument: expectation.argument.value().cloned(),
                expected: expectation.expected_count,
                actual: matched,
            })
        }
    }
}
