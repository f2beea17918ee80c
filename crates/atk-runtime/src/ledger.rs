//! Call ledger
//!
//! A [`Ledger`] is the ordered list of calls intercepted during one session.
//! While the session is open the switchboard appends to a shared
//! [`LedgerWriter`]; `close` detaches it into an immutable [`Ledger`].

use atk_core::{CallArgs, CallOutcome, CallRecord, MethodTag, Value};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Ordered record of intercepted calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    records: Vec<CallRecord>,
}

impl Ledger {
    /// Create ledger from records
    #[inline]
    #[must_use]
    pub fn from_records(records: Vec<CallRecord>) -> Self {
        Self { records }
    }

    /// All records, in call order
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    /// Iterate over records
    pub fn iter(&self) -> impl Iterator<Item = &CallRecord> {
        self.records.iter()
    }

    /// Records for `(address, method)`
    pub fn for_route<'a>(
        &'a self,
        address: &'a str,
        method: MethodTag,
    ) -> impl Iterator<Item = &'a CallRecord> + 'a {
        self.records.iter().filter(move |r| r.is_for(address, method))
    }

    /// Records for `address` under any method
    pub fn for_address<'a>(&'a self, address: &'a str) -> impl Iterator<Item = &'a CallRecord> + 'a {
        self.records.iter().filter(move |r| r.address == address)
    }

    /// Count calls to `(address, method)` made with exactly one positional
    /// argument equal to `argument`; keyword and multi-argument calls never match
    #[must_use]
    pub fn count_matching(&self, address: &str, method: MethodTag, argument: &Value) -> usize {
        self.for_route(address, method)
            .filter(|r| r.sole_positional() == Some(argument))
            .count()
    }

    /// Rejected (unmatched) calls
    pub fn rejections(&self) -> impl Iterator<Item = &CallRecord> {
        self.records
            .iter()
            .filter(|r| r.outcome == CallOutcome::Rejected)
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was intercepted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IntoIterator for Ledger {
    type Item = CallRecord;
    type IntoIter = std::vec::IntoIter<CallRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Append-only writer shared between a session and its switchboard
#[derive(Debug, Default)]
pub struct LedgerWriter {
    records: Mutex<Vec<CallRecord>>,
    next_sequence: AtomicU64,
}

impl LedgerWriter {
    /// Create empty writer
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call, returning its sequence number
    pub fn append(
        &self,
        address: &str,
        method: MethodTag,
        args: &CallArgs,
        outcome: CallOutcome,
    ) -> u64 {
        let mut records = self.records.lock();
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        records.push(CallRecord::new(address, method, args, sequence, outcome));
        sequence
    }

    /// Record a call that has not been answered yet, returning its sequence
    /// number
    ///
    /// The record reads as answered until [`LedgerWriter::settle`] says otherwise.
    pub fn reserve(&self, address: &str, method: MethodTag, args: &CallArgs) -> u64 {
        self.append(address, method, args, CallOutcome::Answered)
    }

    /// Set the outcome of a reserved call
    ///
    /// A no-op once the records were detached.
    pub fn settle(&self, sequence: u64, outcome: CallOutcome) {
        let mut records = self.records.lock();
        if let Some(record) = records.iter_mut().rev().find(|r| r.sequence == sequence) {
            record.outcome = outcome;
        }
    }

    /// Snapshot of the records appended so far
    #[must_use]
    pub fn snapshot(&self) -> Ledger {
        Ledger::from_records(self.records.lock().clone())
    }

    /// Move the records out, leaving the writer empty
    #[must_use]
    pub fn detach(&self) -> Ledger {
        Ledger::from_records(std::mem::take(&mut *self.records.lock()))
    }

    /// Number of records appended so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check if nothing was appended
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
