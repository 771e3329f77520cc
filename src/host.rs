//! Platform-supplied dispatch handles.
//!
//! A host embedding the engine may hand each dispatch an execution handle.
//! Handlers use it to park background work ([`ExecutionContext::wait_until`])
//! that the host drains after the response is produced. Two shapes exist:
//! a bare [`ExecutionContext`] and an event-style [`RequestEvent`] that
//! carries one. Handles are optional; a context accessor on a dispatch that
//! was given none fails with `ContextUnavailable`.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// Background-work handle for a single dispatch.
///
/// Futures parked here are not polled by the engine; the host takes them
/// after `fetch` resolves and drives them on its own terms.
#[derive(Default)]
pub struct ExecutionContext {
    pending: Mutex<Vec<BoxFuture<'static, ()>>>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a future to be driven by the host after dispatch completes.
    pub fn wait_until(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::pin(fut));
    }

    /// Takes every parked future, leaving the handle empty.
    pub fn take_pending(&self) -> Vec<BoxFuture<'static, ()>> {
        std::mem::take(
            &mut *self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("ExecutionContext")
            .field("pending", &pending)
            .finish()
    }
}

/// Event-shaped handle: an execution context wrapped the way event-driven
/// hosts deliver it.
#[derive(Debug, Default)]
pub struct RequestEvent {
    context: Arc<ExecutionContext>,
}

impl RequestEvent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The execution context carried by this event.
    #[must_use]
    pub fn context(&self) -> Arc<ExecutionContext> {
        Arc::clone(&self.context)
    }
}

/// Either handle shape a host may attach to a dispatch.
///
/// `Context::execution_context()` accepts both shapes; `Context::request_event()`
/// only the event shape.
#[derive(Debug, Clone)]
pub enum HostContext {
    Event(Arc<RequestEvent>),
    Execution(Arc<ExecutionContext>),
}

impl From<Arc<ExecutionContext>> for HostContext {
    fn from(ctx: Arc<ExecutionContext>) -> Self {
        Self::Execution(ctx)
    }
}

impl From<Arc<RequestEvent>> for HostContext {
    fn from(event: Arc<RequestEvent>) -> Self {
        Self::Event(event)
    }
}
