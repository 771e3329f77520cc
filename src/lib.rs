//! # Shallot
//!
//! **Shallot** is a small onion-model dispatch engine: pluggable path
//! routing, layered middleware composed around a shared per-dispatch
//! context, and a `fetch` entry point that runs the whole thing end to end.
//!
//! ## Overview
//!
//! Handlers are registered against path patterns and executed as an onion:
//! the router returns *every* registration covering a path, in registration
//! order, and the compose engine runs them outermost-first. Each handler
//! receives the dispatch [`Context`] and a [`Next`] continuation; work before
//! `next.run()` happens on the way in, work after it on the way out. There is
//! no transport layer; a dispatch is a plain async call producing a
//! [`Response`] value, so the engine embeds anywhere a host can hand it a
//! path.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`app`]** - Route registration, grouping, base-path views, and the
//!   `fetch` entry points
//! - **[`router`]** - Path matching: the [`Router`] contract plus the
//!   segment-tree and regex-scan implementations
//! - **[`compose`]** - The chain engine that layers matched handlers around
//!   one context
//! - **[`context`]** - Per-dispatch state shared across the chain
//! - **[`request`]** - The matched request: parameters, query data,
//!   validated input
//! - **[`response`]** - The JSON-bodied result value a chain settles on
//! - **[`handler`]** - Handler shapes, adapters, and the default error and
//!   not-found handlers
//! - **[`validator`]** - Input validation middleware over query and path
//!   parameter data
//! - **[`host`]** - Optional host-supplied execution handles for background
//!   work
//! - **[`error`]** - The dispatch error taxonomy
//!
//! ### Dispatch Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant App as App::fetch
//!     participant Router
//!     participant Chain as Compose Chain
//!     participant H1 as Middleware
//!     participant H2 as Terminal Handler
//!
//!     Caller->>App: fetch("/api/items?tag=a")
//!     App->>App: extract routable path
//!     App->>Router: match_route(GET, "/api/items")
//!     Router-->>App: [middleware, handler] + params
//!     App->>Chain: run(ctx)
//!     Chain->>H1: call(ctx, next)
//!     H1->>Chain: next.run()
//!     Chain->>H2: call(ctx, next)
//!     H2-->>Chain: Response
//!     Note over Chain: response committed to ctx
//!     Chain-->>H1: control returns
//!     H1-->>Chain: Ok(None)
//!     Chain-->>App: ctx (finalized)
//!     App-->>Caller: Response
//! ```
//!
//! Failures never unwind past a dispatch: the error handler at the nearest
//! composition frame answers them, exactly once. An unmatched path flows to
//! the not-found handler. The only error that crosses `fetch` is a failure
//! raised while the error handler itself was running.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shallot::{handler, middleware, App, Response};
//!
//! let mut app = App::new();
//! app.use_middleware(None, [middleware(|ctx, next| async move {
//!     next.run().await?;
//!     Ok(None)
//! })]);
//! app.get(Some("/hello/:name"), [handler(|ctx| async move {
//!     let name = ctx.req().param("name").unwrap_or("world").to_string();
//!     Ok(Response::text(format!("hello {name}")))
//! })]);
//!
//! let res = app.fetch("/hello/rust").await?;
//! assert_eq!(res.to_string(), "hello rust");
//! ```
//!
//! ## Runtime Considerations
//!
//! Shallot is runtime-agnostic: handlers are boxed `Send` futures and the
//! engine never spawns, sleeps, or does IO of its own. Any async runtime
//! that can drive a future can drive a dispatch; the tests use tokio.

pub mod app;
pub mod compose;
pub mod context;
pub mod error;
pub mod handler;
pub mod host;
pub mod ids;
pub mod path;
pub mod request;
pub mod response;
pub mod router;
pub mod validator;

pub use app::{App, AppOptions, GetPath};
pub use compose::{Chain, Next};
pub use context::Context;
pub use error::DispatchError;
pub use handler::{
    default_error_handler, default_not_found_handler, handler, middleware, ErrorHandler, Handler,
    HandlerResult, NotFoundHandler, Route, RouteHandler,
};
pub use host::{ExecutionContext, HostContext, RequestEvent};
pub use ids::DispatchId;
pub use request::{Request, ValidationTarget};
pub use response::Response;
pub use router::{LinearRouter, MatchResult, ParamBinding, Router, TrieRouter};
pub use validator::{typed_validator, validator, Validation};
