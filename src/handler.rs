//! Handler shapes accepted by the dispatch engine.
//!
//! Every registered unit is a [`RouteHandler`]. Closures come in two shapes:
//! a terminal handler built with [`handler`] that produces a response and
//! never touches the continuation, and a middleware built with [`middleware`]
//! that receives [`Next`] and decides whether the rest of the chain runs.
//! Both are erased behind the [`Handler`] trait so the chain engine treats
//! every position uniformly.
//!
//! Mounting a sub-application that carries its own error handler wraps each
//! of its handlers in [`RouteHandler::Scoped`]; the wrapper keeps the
//! sub-application's error boundary alive inside the parent's chain.

use crate::compose::Next;
use crate::context::Context;
use crate::error::DispatchError;
use crate::response::Response;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::error;

/// Outcome of one handler invocation.
///
/// `Ok(Some(_))` commits a response on the way back out of the chain;
/// `Ok(None)` leaves whatever an inner handler committed untouched.
pub type HandlerResult = Result<Option<Response>, DispatchError>;

/// Handler invoked at the composition frame nearest to a failure.
pub type ErrorHandler = Arc<
    dyn Fn(Arc<DispatchError>, Context) -> BoxFuture<'static, Result<Response, DispatchError>>
        + Send
        + Sync,
>;

/// Handler invoked when no pattern matches or a chain finishes unresolved.
pub type NotFoundHandler =
    Arc<dyn Fn(Context) -> BoxFuture<'static, Result<Response, DispatchError>> + Send + Sync>;

/// A unit of work at one chain position.
///
/// Implementors receive the dispatch [`Context`] and the [`Next`]
/// continuation. Terminal handlers may ignore `next`; middleware must either
/// run it or short-circuit with a response of its own.
pub trait Handler: Send + Sync {
    fn call(&self, ctx: Context, next: Next) -> BoxFuture<'static, HandlerResult>;
}

struct TerminalFn<F>(F);

impl<F, Fut> Handler for TerminalFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, DispatchError>> + Send + 'static,
{
    fn call(&self, ctx: Context, _next: Next) -> BoxFuture<'static, HandlerResult> {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.map(Some) })
    }
}

struct MiddlewareFn<F>(F);

impl<F, Fut> Handler for MiddlewareFn<F>
where
    F: Fn(Context, Next) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context, next: Next) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.0)(ctx, next))
    }
}

/// Wraps a terminal closure `(ctx) -> Response` as a registrable handler.
pub fn handler<F, Fut>(f: F) -> RouteHandler
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, DispatchError>> + Send + 'static,
{
    RouteHandler::Plain(Arc::new(TerminalFn(f)))
}

/// Wraps a middleware closure `(ctx, next) -> Option<Response>` as a
/// registrable handler.
pub fn middleware<F, Fut>(f: F) -> RouteHandler
where
    F: Fn(Context, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    RouteHandler::Plain(Arc::new(MiddlewareFn(f)))
}

/// A registered handler, tagged with its error scope.
///
/// `Plain` is the ordinary case. `Scoped` is produced when a mounted
/// sub-application carries its own error handler: the inner handler runs
/// inside that boundary, and failures it raises are answered by the
/// sub-application's handler instead of bubbling to the parent chain. A
/// failure of the boundary handler itself is an ordinary failure from the
/// parent's point of view.
#[derive(Clone)]
pub enum RouteHandler {
    Plain(Arc<dyn Handler>),
    Scoped {
        inner: Arc<RouteHandler>,
        boundary: ErrorHandler,
    },
}

impl RouteHandler {
    /// Invokes the handler at one chain position.
    pub fn call(&self, ctx: Context, next: Next) -> BoxFuture<'static, HandlerResult> {
        match self {
            Self::Plain(h) => h.call(ctx, next),
            Self::Scoped { inner, boundary } => {
                let inner = Arc::clone(inner);
                let boundary = Arc::clone(boundary);
                Box::pin(async move {
                    match inner.call(ctx.clone(), next).await {
                        Ok(res) => Ok(res),
                        // A fatal failure (the chain's error handler broke)
                        // must cross every boundary untouched.
                        Err(err) if ctx.fatal() => Err(err),
                        Err(err) => {
                            let err = Arc::new(err);
                            ctx.set_error(Arc::clone(&err));
                            let res = (boundary)(err, ctx).await?;
                            Ok(Some(res))
                        }
                    }
                })
            }
        }
    }

    /// The handler beneath any scope wrappers.
    #[must_use]
    pub fn innermost(&self) -> &RouteHandler {
        match self {
            Self::Scoped { inner, .. } => inner.innermost(),
            plain => plain,
        }
    }
}

impl fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain"),
            Self::Scoped { inner, .. } => f.debug_tuple("Scoped").field(inner).finish(),
        }
    }
}

/// One entry in an application's route table.
#[derive(Debug, Clone)]
pub struct Route {
    /// Registered pattern, with the owning application's base path applied.
    pub path: String,
    /// The unit executed when the pattern matches.
    pub handler: RouteHandler,
}

fn stock_not_found(_ctx: Context) -> BoxFuture<'static, Result<Response, DispatchError>> {
    Box::pin(async { Ok(Response::text("404 Not Found")) })
}

fn stock_error(
    err: Arc<DispatchError>,
    _ctx: Context,
) -> BoxFuture<'static, Result<Response, DispatchError>> {
    error!(error = %err, "unhandled dispatch failure");
    Box::pin(async { Ok(Response::text("Internal Server Error")) })
}

static DEFAULT_NOT_FOUND: Lazy<NotFoundHandler> = Lazy::new(|| Arc::new(stock_not_found));
static DEFAULT_ERROR: Lazy<ErrorHandler> = Lazy::new(|| Arc::new(stock_error));

/// The stock not-found handler: a fixed `404 Not Found` text response.
#[must_use]
pub fn default_not_found_handler() -> NotFoundHandler {
    Arc::clone(&DEFAULT_NOT_FOUND)
}

/// The stock error handler: logs the failure and answers with a fixed
/// `Internal Server Error` text response.
///
/// Every application starts from this one shared instance; mounting decides
/// whether a sub-application needs its own error scope by comparing its
/// handler against this exact allocation, not by behavior.
#[must_use]
pub fn default_error_handler() -> ErrorHandler {
    Arc::clone(&DEFAULT_ERROR)
}

pub(crate) fn is_default_error_handler(handler: &ErrorHandler) -> bool {
    Arc::ptr_eq(handler, &DEFAULT_ERROR)
}
