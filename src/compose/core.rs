//! Chain execution internals.

use crate::context::Context;
use crate::error::DispatchError;
use crate::handler::{ErrorHandler, NotFoundHandler, RouteHandler};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

struct ChainState {
    handlers: Vec<RouteHandler>,
    error_handler: ErrorHandler,
    not_found: NotFoundHandler,
    // Highest chain position dispatched so far; -1 before the first frame.
    // fetch_max makes the repeated-continuation check race-free.
    index: AtomicIsize,
    // Latch set once the error handler has produced the final response;
    // return values of frames still unwinding no longer overwrite it.
    error_handled: AtomicBool,
}

/// The continuation handed to every handler: "run the rest of the chain".
///
/// Running it a second time for the same chain position is a protocol
/// violation answered with [`DispatchError::DoubleNext`].
pub struct Next {
    inner: NextInner,
}

enum NextInner {
    /// Continuation into the frame at `position`.
    Chain {
        state: Arc<ChainState>,
        ctx: Context,
        position: usize,
    },
    /// Continuation past a sole handler, fused directly to the not-found
    /// tail. Used by the single-handler dispatch path, which never builds
    /// chain state.
    Tail {
        not_found: NotFoundHandler,
        ctx: Context,
        used: Arc<AtomicBool>,
    },
}

impl Next {
    pub(crate) fn tail(ctx: Context, not_found: NotFoundHandler) -> Self {
        Self {
            inner: NextInner::Tail {
                not_found,
                ctx,
                used: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    /// Runs the remainder of the chain over the shared context.
    ///
    /// The handler regains control once everything downstream has finished;
    /// by then the context holds whatever response the inner frames settled
    /// on, or the error recorded by a failure.
    pub fn run(&self) -> BoxFuture<'static, Result<(), DispatchError>> {
        match &self.inner {
            NextInner::Chain {
                state,
                ctx,
                position,
            } => dispatch(Arc::clone(state), ctx.clone(), *position),
            NextInner::Tail {
                not_found,
                ctx,
                used,
            } => {
                let not_found = Arc::clone(not_found);
                let ctx = ctx.clone();
                let used = Arc::clone(used);
                Box::pin(async move {
                    if used.swap(true, Ordering::SeqCst) {
                        warn!(position = 1, "continuation invoked twice");
                        return Err(DispatchError::DoubleNext { index: 1 });
                    }
                    if !ctx.finalized() {
                        let res = (not_found)(ctx.clone()).await?;
                        ctx.set_response(res);
                    }
                    Ok(())
                })
            }
        }
    }
}

/// Runs the frame at `position` and settles its outcome into the context.
fn dispatch(
    state: Arc<ChainState>,
    ctx: Context,
    position: usize,
) -> BoxFuture<'static, Result<(), DispatchError>> {
    Box::pin(async move {
        let reached = state.index.fetch_max(position as isize, Ordering::SeqCst);
        if reached >= position as isize {
            warn!(position, "continuation invoked twice");
            return Err(DispatchError::DoubleNext { index: position });
        }

        // Past the last handler: the not-found tail, unless an earlier frame
        // already committed a response.
        if position >= state.handlers.len() {
            if !ctx.finalized() {
                debug!(position, "chain exhausted, invoking not-found handler");
                let res = (state.not_found)(ctx.clone()).await?;
                ctx.set_response(res);
            }
            return Ok(());
        }

        ctx.req().set_route_index(position);
        let handler = state.handlers[position].clone();
        let next = Next {
            inner: NextInner::Chain {
                state: Arc::clone(&state),
                ctx: ctx.clone(),
                position: position + 1,
            },
        };

        match handler.call(ctx.clone(), next).await {
            Ok(Some(res)) => {
                // A value returned on the way back out overwrites whatever an
                // inner frame committed, unless the error handler has already
                // settled the final response.
                if !state.error_handled.load(Ordering::SeqCst) {
                    ctx.set_response(res);
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) if ctx.fatal() => Err(err),
            Err(err) => {
                let err = Arc::new(err);
                ctx.set_error(Arc::clone(&err));
                debug!(position, error = %err, "routing failure to the error handler");
                match (state.error_handler)(err, ctx.clone()).await {
                    Ok(res) => {
                        state.error_handled.store(true, Ordering::SeqCst);
                        ctx.set_response(res);
                        Ok(())
                    }
                    Err(failure) => {
                        warn!(position, error = %failure, "error handler failed");
                        ctx.set_fatal();
                        Err(failure)
                    }
                }
            }
        }
    })
}

/// An ordered handler list fused with the error and not-found handlers it
/// runs under.
///
/// A chain executes once: positions already dispatched are remembered, so a
/// second `run` over the same instance reports `DoubleNext` immediately.
/// Dispatch builds a fresh chain per fetch.
pub struct Chain {
    state: Arc<ChainState>,
}

impl Chain {
    #[must_use]
    pub fn new(
        handlers: Vec<RouteHandler>,
        error_handler: ErrorHandler,
        not_found: NotFoundHandler,
    ) -> Self {
        Self {
            state: Arc::new(ChainState {
                handlers,
                error_handler,
                not_found,
                index: AtomicIsize::new(-1),
                error_handled: AtomicBool::new(false),
            }),
        }
    }

    /// Executes the chain over `ctx`, outermost frame first.
    ///
    /// Returns the same context; the committed response (if any) stays in it.
    /// `Err` means the failure must cross the dispatch boundary: either the
    /// error handler itself failed, or an empty chain's not-found handler did.
    pub async fn run(&self, ctx: Context) -> Result<Context, DispatchError> {
        dispatch(Arc::clone(&self.state), ctx.clone(), 0).await?;
        Ok(ctx)
    }
}
