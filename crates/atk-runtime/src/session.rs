//! Scoped interception sessions

use crate::error::{RuntimeError, TeardownError, TeardownFailure};
use crate::ledger::{Ledger, LedgerWriter};
use crate::log::{SessionLog, SessionStats};
use crate::switchboard::{ActiveSession, InstallId, RouteKey, Switchboard};
use atk_core::InterceptionSpec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulid::Ulid;

/// Unique session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live interceptions plus the ledger of one scenario run
///
/// Holds the switchboard exclusively from `open` until `close`. Dropping an
/// open session closes it, so interceptions are removed even when the
/// pipeline panics.
#[derive(Debug)]
pub struct InterceptionSession {
    id: SessionId,
    switchboard: Switchboard,
    installed: Vec<(RouteKey, InstallId)>,
    ledger: Arc<LedgerWriter>,
    log: Arc<SessionLog>,
    closed: bool,
}

impl InterceptionSession {
    /// Install every spec on `switchboard`
    ///
    /// # Errors
    /// - `RuntimeError::InstallFailed` if a spec has an empty address
    /// - `RuntimeError::SessionActive` if another session holds the switchboard
    pub fn open<I>(switchboard: &Switchboard, specs: I) -> Result<Self, RuntimeError>
    where
        I: IntoIterator<Item = InterceptionSpec>,
    {
        let specs: Vec<InterceptionSpec> = specs.into_iter().collect();
        if let Some(spec) = specs.iter().find(|s| s.address.trim().is_empty()) {
            return Err(RuntimeError::InstallFailed {
                address: spec.address.clone(),
                method: spec.method,
                reason: "empty address".to_string(),
            });
        }

        let id = SessionId::new();
        let ledger = Arc::new(LedgerWriter::new());
        let log = Arc::new(SessionLog::new(id));
        switchboard.acquire(ActiveSession {
            id,
            ledger: Arc::clone(&ledger),
            log: Arc::clone(&log),
        })?;

        let mut installed = Vec::with_capacity(specs.len());
        for spec in specs {
            log.record_install(&spec.address, spec.method);
            installed.push(switchboard.install(Arc::new(spec)));
        }

        log.span().in_scope(|| {
            tracing::info!("Opened interception session with {} interception(s)", installed.len());
        });

        Ok(Self {
            id,
            switchboard: switchboard.clone(),
            installed,
            ledger,
            log,
            closed: false,
        })
    }

    /// Session identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Logging handle
    #[inline]
    #[must_use]
    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.log.stats()
    }

    /// Number of interceptions installed at open
    #[inline]
    #[must_use]
    pub fn installed_count(&self) -> usize {
        self.installed.len()
    }

    /// Records appended so far
    #[must_use]
    pub fn ledger_snapshot(&self) -> Ledger {
        self.ledger.snapshot()
    }

    /// Uninstall every interception in reverse order and detach the ledger
    ///
    /// Every removal is attempted and the switchboard is released even when
    /// some removals fail.
    ///
    /// # Errors
    /// `TeardownError` listing the failed removals; it still carries the ledger.
    pub fn close(mut self) -> Result<Ledger, TeardownError> {
        let (ledger, failures) = self.teardown();
        if failures.is_empty() {
            Ok(ledger)
        } else {
            Err(TeardownError { failures, ledger })
        }
    }

    fn teardown(&mut self) -> (Ledger, Vec<TeardownFailure>) {
        self.closed = true;
        let mut failures = Vec::new();
        for (key, install) in self.installed.drain(..).rev() {
            match self.switchboard.uninstall(&key, install) {
                Ok(()) => self.log.record_removal(),
                Err(reason) => failures.push(TeardownFailure {
                    address: key.address,
                    method: key.method,
                    reason,
                }),
            }
        }
        self.switchboard.release(self.id);
        let ledger = self.ledger.detach();

        if !failures.is_empty() {
            self.log.span().in_scope(|| {
                for failure in &failures {
                    tracing::error!("Teardown failed for {}", failure);
                }
            });
        }
        self.log.finish();
        (ledger, failures)
    }
}

impl Drop for InterceptionSession {
    fn drop(&mut self) {
        if !self.closed {
            let (_, failures) = self.teardown();
            if !failures.is_empty() {
                tracing::error!(
                    session = %self.id,
                    "Session dropped with {} interception(s) that could not be removed",
                    failures.len()
                );
            }
        }
    }
}
