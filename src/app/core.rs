//! Application assembly and dispatch.

use crate::compose::{Chain, Next};
use crate::context::Context;
use crate::error::DispatchError;
use crate::handler::{
    default_error_handler, default_not_found_handler, is_default_error_handler, ErrorHandler,
    NotFoundHandler, Route, RouteHandler,
};
use crate::host::HostContext;
use crate::ids::DispatchId;
use crate::path::{extract_path, extract_path_no_strict, join_segments, merge_path};
use crate::request::Request;
use crate::response::Response;
use crate::router::{Router, TrieRouter};
use futures::future::BoxFuture;
use http::Method;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info_span, warn, Instrument};
use url::form_urlencoded;

/// Extracts the routable path from the raw path-with-query string a fetch
/// receives.
pub type GetPath = Arc<dyn Fn(&str) -> String + Send + Sync>;

fn strict_path(raw: &str) -> String {
    extract_path(raw).to_string()
}

fn loose_path(raw: &str) -> String {
    extract_path_no_strict(raw).to_string()
}

/// Construction options for [`App`].
pub struct AppOptions {
    /// Matching strategy; the segment-tree router when not given.
    pub router: Option<Box<dyn Router<Arc<Route>>>>,
    /// Whether `/books` and `/books/` are distinct routes.
    pub strict: bool,
    /// Custom path extractor. Only honored in strict mode; loose mode always
    /// uses the trailing-slash-insensitive extractor.
    pub get_path: Option<GetPath>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            router: None,
            strict: true,
            get_path: None,
        }
    }
}

/// A routing table plus the handlers that answer for it.
///
/// Registration happens up front (`get`, `use_middleware`, `route`,
/// `base_path`); dispatch happens through [`App::fetch`] and friends.
/// Dispatching is `&self` and safe to run concurrently.
///
/// There is deliberately no `Clone`: [`App::base_path`] is the cloning
/// operation, and it produces a *view* (same route table, fresh defaults),
/// not a copy.
pub struct App {
    routes: Arc<RwLock<Vec<Arc<Route>>>>,
    router: Arc<RwLock<Box<dyn Router<Arc<Route>>>>>,
    base_path: String,
    // Pattern applied to handlers registered without one.
    pending_path: String,
    error_handler: ErrorHandler,
    not_found_handler: NotFoundHandler,
    get_path: GetPath,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(AppOptions::default())
    }

    #[must_use]
    pub fn with_options(options: AppOptions) -> Self {
        let router = options
            .router
            .unwrap_or_else(|| Box::new(TrieRouter::new()));
        let get_path = if options.strict {
            options.get_path.unwrap_or_else(|| Arc::new(strict_path))
        } else {
            Arc::new(loose_path)
        };
        Self {
            routes: Arc::new(RwLock::new(Vec::new())),
            router: Arc::new(RwLock::new(router)),
            base_path: "/".to_string(),
            pending_path: "/".to_string(),
            error_handler: default_error_handler(),
            not_found_handler: default_not_found_handler(),
            get_path,
        }
    }

    /// Registers handlers under a pattern.
    ///
    /// With `Some(path)` the pattern also becomes the pending pattern for
    /// later calls; with `None` the handlers attach to the pending pattern,
    /// so `get(Some("/x"), []).get(None, [h])` registers `h` at `/x`.
    pub fn get<I>(&mut self, path: Option<&str>, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = RouteHandler>,
    {
        if let Some(path) = path {
            self.pending_path = path.to_string();
        }
        let pending = self.pending_path.clone();
        for handler in handlers {
            self.add_route(&pending, handler);
        }
        self
    }

    /// Registers middleware under a pattern, `*` when none is given.
    pub fn use_middleware<I>(&mut self, path: Option<&str>, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = RouteHandler>,
    {
        self.pending_path = path.unwrap_or("*").to_string();
        let pending = self.pending_path.clone();
        for handler in handlers {
            self.add_route(&pending, handler);
        }
        self
    }

    /// Replaces the error handler consulted by this application's dispatches.
    pub fn on_error<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Arc<DispatchError>, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, DispatchError>> + Send + 'static,
    {
        self.error_handler = Arc::new(
            move |err, ctx| -> BoxFuture<'static, Result<Response, DispatchError>> {
                Box::pin(f(err, ctx))
            },
        );
        self
    }

    /// Replaces the handler answering unmatched paths and exhausted chains.
    pub fn not_found<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, DispatchError>> + Send + 'static,
    {
        self.not_found_handler = Arc::new(
            move |ctx| -> BoxFuture<'static, Result<Response, DispatchError>> {
                Box::pin(f(ctx))
            },
        );
        self
    }

    /// A view of this application rooted at `merge(self.base, path)`.
    ///
    /// The view shares the route table and router, so registrations through
    /// it land in this application's table with the longer base applied.
    /// Handlers are not carried over: the view starts from the stock error
    /// and not-found handlers and a default path extractor.
    #[must_use]
    pub fn base_path(&self, path: &str) -> App {
        App {
            routes: Arc::clone(&self.routes),
            router: Arc::clone(&self.router),
            base_path: merge_path(&self.base_path, path),
            pending_path: "/".to_string(),
            error_handler: default_error_handler(),
            not_found_handler: default_not_found_handler(),
            get_path: Arc::new(strict_path),
        }
    }

    /// Mounts every route of `sub` under `path`.
    ///
    /// When the sub-application carries its own error handler, each of its
    /// handlers is wrapped in a scope that keeps answering failures with that
    /// handler after mounting; a sub-application still on the stock handler
    /// mounts its handlers untouched.
    pub fn route(&mut self, path: &str, sub: &App) -> &mut Self {
        let view = self.base_path(path);
        let isolate = !is_default_error_handler(&sub.error_handler);
        let sub_routes: Vec<Arc<Route>> = sub
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        debug!(prefix = %path, routes = sub_routes.len(), isolated = isolate, "mounting sub-application");
        for route in sub_routes {
            let handler = if isolate {
                RouteHandler::Scoped {
                    inner: Arc::new(route.handler.clone()),
                    boundary: Arc::clone(&sub.error_handler),
                }
            } else {
                route.handler.clone()
            };
            view.add_route(&route.path, handler);
        }
        self
    }

    /// A snapshot of the route table, in registration order.
    #[must_use]
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn add_route(&self, path: &str, handler: RouteHandler) {
        let path = merge_path(&self.base_path, path);
        let route = Arc::new(Route { path, handler });
        {
            let mut router = self.router.write().unwrap_or_else(PoisonError::into_inner);
            router.add(&Method::GET, &route.path, Arc::clone(&route));
        }
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }

    /// Dispatches `path` (which may carry a query string) through the chain.
    pub async fn fetch(&self, path: &str) -> Result<Response, DispatchError> {
        self.fetch_with(path, &[], None).await
    }

    /// Dispatches `path` with explicit query pairs and an optional host
    /// handle.
    pub async fn fetch_with(
        &self,
        path: &str,
        query: &[(&str, &str)],
        host: Option<HostContext>,
    ) -> Result<Response, DispatchError> {
        let mut raw = if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        };
        if !query.is_empty() {
            let encoded = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            raw.push('?');
            raw.push_str(&encoded);
        }
        self.dispatch(raw, host).await
    }

    /// Dispatches a path assembled from segments, the shape event-driven
    /// hosts hand over.
    pub async fn fetch_segments(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        host: Option<HostContext>,
    ) -> Result<Response, DispatchError> {
        let path = join_segments(segments);
        self.fetch_with(&path, query, host).await
    }

    async fn dispatch(
        &self,
        raw: String,
        host: Option<HostContext>,
    ) -> Result<Response, DispatchError> {
        let id = DispatchId::new();
        let path = (self.get_path)(&raw);
        let span = info_span!("dispatch", id = %id, path = %path);
        let error_handler = Arc::clone(&self.error_handler);
        let not_found = Arc::clone(&self.not_found_handler);

        async move {
            let matched = {
                let router = self.router.read().unwrap_or_else(PoisonError::into_inner);
                router.match_route(&Method::GET, &path)
            };
            debug!(matched = matched.len(), "route match complete");

            let mut handlers: Vec<RouteHandler> = matched
                .handlers
                .iter()
                .map(|(route, _)| route.handler.clone())
                .collect();
            let query = raw.split_once('?').map(|(_, q)| q.to_string());
            let request = Request::new(Method::GET, path, query, matched);
            let ctx = Context::new(id, request, host, Arc::clone(&not_found));

            // Single matched handler: no chain state, just the handler and a
            // continuation fused to the not-found tail.
            if handlers.len() == 1 {
                let handler = handlers.remove(0);
                let next = Next::tail(ctx.clone(), Arc::clone(&not_found));
                return match handler.call(ctx.clone(), next).await {
                    Ok(Some(res)) => Ok(res),
                    Ok(None) => {
                        if let Some(res) = ctx.take_response() {
                            Ok(res)
                        } else {
                            match (not_found)(ctx.clone()).await {
                                Ok(res) => Ok(res),
                                Err(err) => route_error(err, &ctx, &error_handler).await,
                            }
                        }
                    }
                    Err(err) => route_error(err, &ctx, &error_handler).await,
                };
            }

            let chain = Chain::new(
                handlers,
                Arc::clone(&error_handler),
                Arc::clone(&not_found),
            );
            match chain.run(ctx.clone()).await {
                Ok(ctx) => {
                    if ctx.finalized() {
                        if let Some(res) = ctx.take_response() {
                            debug!(response = %res, "dispatch complete");
                            return Ok(res);
                        }
                    }
                    warn!("chain completed without a committed response");
                    route_error(DispatchError::Unfinalized, &ctx, &error_handler).await
                }
                Err(err) if ctx.fatal() => Err(err),
                Err(err) => route_error(err, &ctx, &error_handler).await,
            }
        }
        .instrument(span)
        .await
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes a failure that reached the dispatch boundary to the error handler.
/// A failure raised here has nowhere further to go and crosses `fetch`.
async fn route_error(
    err: DispatchError,
    ctx: &Context,
    handler: &ErrorHandler,
) -> Result<Response, DispatchError> {
    let err = Arc::new(err);
    ctx.set_error(Arc::clone(&err));
    (handler)(err, ctx.clone()).await
}
