//! Per-session logging handle

use crate::session::SessionId;
use atk_core::CallOutcome;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::Span;

/// Counters of one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Interceptions installed at open
    pub installs: usize,

    /// Intercepted calls (answered or rejected)
    pub calls: usize,

    /// Calls rejected by a payload matcher
    pub rejections: usize,

    /// Interceptions removed at close
    pub removals: usize,
}

/// Tracing span plus counters, created at open and finished at close
#[derive(Debug)]
pub struct SessionLog {
    span: Span,
    installs: AtomicUsize,
    calls: AtomicUsize,
    rejections: AtomicUsize,
    removals: AtomicUsize,
}

impl SessionLog {
    /// Create log for a session
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            span: tracing::info_span!("interception_session", session = %id),
            installs: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            rejections: AtomicUsize::new(0),
            removals: AtomicUsize::new(0),
        }
    }

    /// Span every session event is logged under
    #[inline]
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub(crate) fn record_install(&self, address: &str, method: atk_core::MethodTag) {
        self.installs.fetch_add(1, Ordering::Relaxed);
        self.span.in_scope(|| {
            tracing::debug!("Installed interception at {} ({})", address, method);
        });
    }

    pub(crate) fn record_call(&self, address: &str, outcome: CallOutcome) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if outcome == CallOutcome::Rejected {
            self.rejections.fetch_add(1, Ordering::Relaxed);
            self.span.in_scope(|| {
                tracing::warn!("Rejected unmatched call to {}", address);
            });
        }
    }

    pub(crate) fn record_removal(&self) {
        self.removals.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            installs: self.installs.load(Ordering::Relaxed),
            calls: self.calls.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn finish(&self) {
        let stats = self.stats();
        self.span.in_scope(|| {
            tracing::info!(
                installs = stats.installs,
                calls = stats.calls,
                rejections = stats.rejections,
                removals = stats.removals,
                "Interception session closed"
            );
        });
    }
}
