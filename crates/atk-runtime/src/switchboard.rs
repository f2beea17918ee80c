//! Interception seam
//!
//! Pipelines receive a [`Switchboard`] at construction and route every agent
//! and external call through it. Original behavior is bound once per
//! `(address, method)`; an open session overlays interceptions on top and
//! removes them at close. The newest overlay answers first.

use crate::endpoint::{Endpoint, FnEndpoint};
use crate::error::RuntimeError;
use crate::ledger::LedgerWriter;
use crate::log::SessionLog;
use crate::session::SessionId;
use atk_core::{CallArgs, CallError, CallOutcome, InterceptionSpec, MethodTag, Value};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Routing key: address plus method variant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    /// Dotted address
    pub address: String,

    /// Method variant
    pub method: MethodTag,
}

impl RouteKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(address: impl Into<String>, method: MethodTag) -> Self {
        Self {
            address: address.into(),
            method,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.address, self.method)
    }
}

/// Handle of one installed overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InstallId(u64);

#[derive(Debug)]
struct Overlay {
    install: InstallId,
    spec: Arc<InterceptionSpec>,
}

/// Session currently holding the switchboard
#[derive(Debug)]
pub(crate) struct ActiveSession {
    pub(crate) id: SessionId,
    pub(crate) ledger: Arc<LedgerWriter>,
    pub(crate) log: Arc<SessionLog>,
}

#[derive(Default)]
struct Inner {
    originals: DashMap<RouteKey, Arc<dyn Endpoint>>,
    overlays: DashMap<RouteKey, Vec<Overlay>>,
    active: Mutex<Option<ActiveSession>>,
    next_install: AtomicU64,
}

enum Route {
    Intercepted(Arc<InterceptionSpec>),
    Original(Arc<dyn Endpoint>),
    Unbound,
}

/// Shared routing table for agent and external calls
#[derive(Clone, Default)]
pub struct Switchboard {
    inner: Arc<Inner>,
}

impl fmt::Debug for Switchboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Switchboard")
            .field("originals", &self.inner.originals.len())
            .field("overlays", &self.inner.overlays.len())
            .field("active", &self.active_session())
            .finish()
    }
}

impl Switchboard {
    /// Create empty switchboard
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind original behavior, returning the endpoint it replaced
    pub fn bind<E>(
        &self,
        address: impl Into<String>,
        method: MethodTag,
        endpoint: E,
    ) -> Option<Arc<dyn Endpoint>>
    where
        E: Endpoint + 'static,
    {
        let key = RouteKey::new(address, method);
        tracing::debug!("Bound original endpoint {}", key);
        self.inner.originals.insert(key, Arc::new(endpoint))
    }

    /// Bind original behavior from a closure
    pub fn bind_fn<F>(&self, address: impl Into<String>, method: MethodTag, f: F)
    where
        F: Fn(&CallArgs) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.bind(address, method, FnEndpoint::new(f));
    }

    /// Remove original behavior
    pub fn unbind(&self, address: &str, method: MethodTag) -> bool {
        self.inner
            .originals
            .remove(&RouteKey::new(address, method))
            .is_some()
    }

    /// Check if original behavior is bound
    #[must_use]
    pub fn is_bound(&self, address: &str, method: MethodTag) -> bool {
        self.inner
            .originals
            .contains_key(&RouteKey::new(address, method))
    }

    /// Check if an interception currently overlays `(address, method)`
    #[must_use]
    pub fn is_intercepted(&self, address: &str, method: MethodTag) -> bool {
        self.inner
            .overlays
            .get(&RouteKey::new(address, method))
            .is_some_and(|stack| !stack.is_empty())
    }

    /// Number of installed overlays across all routes
    #[must_use]
    pub fn interception_count(&self) -> usize {
        self.inner.overlays.iter().map(|entry| entry.value().len()).sum()
    }

    /// Session currently holding the switchboard
    #[must_use]
    pub fn active_session(&self) -> Option<SessionId> {
        self.inner.active.lock().as_ref().map(|active| active.id)
    }

    /// Route a blocking call
    ///
    /// # Errors
    /// - `CallError::Unmatched` if the interception rejects the arguments
    /// - `CallError::NoBinding` if nothing is installed or bound
    /// - whatever the original endpoint returns
    pub fn dispatch(
        &self,
        address: &str,
        method: MethodTag,
        args: &CallArgs,
    ) -> Result<Value, CallError> {
        match self.route(address, method) {
            Route::Intercepted(spec) => self.answer(&spec, address, method, args),
            Route::Original(endpoint) => endpoint.call(args),
            Route::Unbound => Err(CallError::NoBinding {
                address: address.to_string(),
                method,
            }),
        }
    }

    /// Route an awaited call
    ///
    /// Interceptions resolve immediately without blocking a thread.
    ///
    /// # Errors
    /// Same as [`Switchboard::dispatch`].
    pub async fn dispatch_async(
        &self,
        address: &str,
        method: MethodTag,
        args: &CallArgs,
    ) -> Result<Value, CallError> {
        match self.route(address, method) {
            Route::Intercepted(spec) => self.answer(&spec, address, method, args),
            Route::Original(endpoint) => endpoint.call_async(args).await,
            Route::Unbound => Err(CallError::NoBinding {
                address: address.to_string(),
                method,
            }),
        }
    }

    /// Drop every interception at `(address, method)` regardless of owner
    ///
    /// A session that installed one of them reports it at close.
    pub fn force_remove(&self, address: &str, method: MethodTag) -> usize {
        self.inner
            .overlays
            .remove(&RouteKey::new(address, method))
            .map_or(0, |(_, stack)| stack.len())
    }

    // The DashMap guards are released before the spec or endpoint runs so
    // responders may dispatch through the switchboard themselves.
    fn route(&self, address: &str, method: MethodTag) -> Route {
        let key = RouteKey::new(address, method);
        if let Some(spec) = self
            .inner
            .overlays
            .get(&key)
            .and_then(|stack| stack.last().map(|overlay| Arc::clone(&overlay.spec)))
        {
            return Route::Intercepted(spec);
        }
        match self.inner.originals.get(&key) {
            Some(endpoint) => Route::Original(Arc::clone(endpoint.value())),
            None => Route::Unbound,
        }
    }

    fn answer(
        &self,
        spec: &InterceptionSpec,
        address: &str,
        method: MethodTag,
        args: &CallArgs,
    ) -> Result<Value, CallError> {
        // The call takes its sequence number before the responder runs, so
        // calls made from inside a responder are numbered after it. The lock
        // is not held while responding.
        let recording = self.inner.active.lock().as_ref().map(|active| {
            let sequence = active.ledger.reserve(address, method, args);
            (Arc::clone(&active.ledger), Arc::clone(&active.log), sequence)
        });
        let result = spec.respond(args);
        let outcome = match &result {
            Err(err) if err.is_unmatched() => CallOutcome::Rejected,
            _ => CallOutcome::Answered,
        };
        if let Some((ledger, log, sequence)) = recording {
            ledger.settle(sequence, outcome);
            log.record_call(spec.display_name(), outcome);
        }
        result
    }

    pub(crate) fn acquire(&self, session: ActiveSession) -> Result<(), RuntimeError> {
        let mut active = self.inner.active.lock();
        if let Some(current) = active.as_ref() {
            return Err(RuntimeError::SessionActive { active: current.id });
        }
        *active = Some(session);
        Ok(())
    }

    pub(crate) fn release(&self, id: SessionId) {
        let mut active = self.inner.active.lock();
        if active.as_ref().is_some_and(|current| current.id == id) {
            *active = None;
        }
    }

    pub(crate) fn install(&self, spec: Arc<InterceptionSpec>) -> (RouteKey, InstallId) {
        let key = RouteKey::new(spec.address.clone(), spec.method);
        let install = InstallId(self.inner.next_install.fetch_add(1, Ordering::SeqCst));
        self.inner
            .overlays
            .entry(key.clone())
            .or_default()
            .push(Overlay { install, spec });
        (key, install)
    }

    pub(crate) fn uninstall(&self, key: &RouteKey, install: InstallId) -> Result<(), String> {
        let mut emptied = false;
        let removed = match self.inner.overlays.get_mut(key) {
            Some(mut stack) => {
                let before = stack.len();
                stack.retain(|overlay| overlay.install != install);
                emptied = stack.is_empty();
                stack.len() < before
            }
            None => false,
        };
        if emptied {
            self.inner
                .overlays
                .remove_if(key, |_, stack| stack.is_empty());
        }
        if removed {
            Ok(())
        } else {
            Err("interception was no longer installed".to_string())
        }
    }
}
