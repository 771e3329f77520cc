//! # Application
//!
//! The assembly surface: route registration, middleware attachment,
//! sub-application mounting, base-path views, and the `fetch` entry points
//! that run a dispatch end to end.
//!
//! ## Overview
//!
//! An [`App`] owns a route table and a pluggable router, plus the error and
//! not-found handlers its dispatches answer with. `fetch` extracts the
//! routable path, asks the router for every covering registration, builds
//! the per-dispatch context, and executes the matched handlers as one
//! composed chain. Registration mutates; dispatch is `&self` and runs
//! concurrently.

mod core;

pub use core::{App, AppOptions, GetPath};
