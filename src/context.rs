//! Per-dispatch state shared across a handler chain.
//!
//! A [`Context`] is created once per dispatch and cloned into every chain
//! frame; clones are shallow handles over one shared record. It carries the
//! matched [`Request`](crate::request::Request), a string-keyed variable
//! store for handler-to-handler communication, the response slot the chain
//! settles, the most recent failure, and the optional host handle.

use crate::error::DispatchError;
use crate::handler::NotFoundHandler;
use crate::host::{ExecutionContext, HostContext, RequestEvent};
use crate::ids::DispatchId;
use crate::request::Request;
use crate::response::Response;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Cheaply cloneable handle over one dispatch's shared state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: DispatchId,
    request: Request,
    // Allocated on first write; most dispatches never touch it.
    variables: Mutex<Option<HashMap<String, Value>>>,
    response: Mutex<Option<Response>>,
    finalized: AtomicBool,
    error: Mutex<Option<Arc<DispatchError>>>,
    // Set when the error handler itself failed; that failure must cross the
    // fetch boundary untouched, past every frame and scope wrapper.
    fatal: AtomicBool,
    host: Option<HostContext>,
    not_found: NotFoundHandler,
}

impl Context {
    pub(crate) fn new(
        id: DispatchId,
        request: Request,
        host: Option<HostContext>,
        not_found: NotFoundHandler,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id,
                request,
                variables: Mutex::new(None),
                response: Mutex::new(None),
                finalized: AtomicBool::new(false),
                error: Mutex::new(None),
                fatal: AtomicBool::new(false),
                host,
                not_found,
            }),
        }
    }

    /// Identifier of the dispatch this context belongs to.
    #[must_use]
    pub fn id(&self) -> DispatchId {
        self.inner.id
    }

    /// The request under dispatch.
    #[must_use]
    pub fn req(&self) -> &Request {
        &self.inner.request
    }

    /// Stores a variable visible to every later frame of the chain.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .variables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
    }

    /// Reads a variable set earlier in the chain. Last write wins.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .variables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|vars| vars.get(key).cloned())
    }

    /// Commits a response and marks the dispatch finalized.
    pub fn set_response(&self, res: Response) {
        *self
            .inner
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(res);
        self.inner.finalized.store(true, Ordering::SeqCst);
    }

    /// The currently committed response, if any.
    #[must_use]
    pub fn response(&self) -> Option<Response> {
        self.inner
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn take_response(&self) -> Option<Response> {
        self.inner
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Whether a response has been committed.
    #[must_use]
    pub fn finalized(&self) -> bool {
        self.inner.finalized.load(Ordering::SeqCst)
    }

    /// The most recent failure observed on this dispatch, if any.
    ///
    /// Set before the error handler runs, so middleware resuming after its
    /// continuation can inspect what went wrong downstream.
    #[must_use]
    pub fn error(&self) -> Option<Arc<DispatchError>> {
        self.inner
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_error(&self, err: Arc<DispatchError>) {
        *self
            .inner
            .error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    pub(crate) fn set_fatal(&self) {
        self.inner.fatal.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fatal(&self) -> bool {
        self.inner.fatal.load(Ordering::SeqCst)
    }

    /// Whether this dispatch carries any host handle.
    #[must_use]
    pub fn has_execution_context(&self) -> bool {
        self.inner.host.is_some()
    }

    /// Whether this dispatch carries an event-shaped host handle.
    #[must_use]
    pub fn has_request_event(&self) -> bool {
        matches!(self.inner.host, Some(HostContext::Event(_)))
    }

    /// The host's background-work handle, from either handle shape.
    pub fn execution_context(&self) -> Result<Arc<ExecutionContext>, DispatchError> {
        match &self.inner.host {
            Some(HostContext::Execution(exec)) => Ok(Arc::clone(exec)),
            Some(HostContext::Event(event)) => Ok(event.context()),
            None => Err(DispatchError::ContextUnavailable {
                requested: "ExecutionContext",
            }),
        }
    }

    /// The event handle, when the host attached one.
    pub fn request_event(&self) -> Result<Arc<RequestEvent>, DispatchError> {
        match &self.inner.host {
            Some(HostContext::Event(event)) => Ok(Arc::clone(event)),
            _ => Err(DispatchError::ContextUnavailable {
                requested: "FetchEvent",
            }),
        }
    }

    /// Runs the not-found handler bound to this dispatch.
    ///
    /// Lets a terminal handler answer "not here" through the same handler the
    /// chain tail would use, custom or stock.
    pub async fn not_found(&self) -> Result<Response, DispatchError> {
        (self.inner.not_found)(self.clone()).await
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("path", &self.inner.request.path())
            .field("finalized", &self.finalized())
            .finish()
    }
}
