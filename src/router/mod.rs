//! # Routing
//!
//! Path matching and route resolution for the dispatch engine.
//!
//! ## Overview
//!
//! A router maps `(method, path)` to *every* registration whose pattern
//! covers the path, not just the best one: the ordered set is what the
//! compose engine executes as a chain, so a catch-all middleware pattern and
//! a literal terminal pattern both belong to the result. Output order is
//! registration order, which is also the middleware onion order.
//!
//! ## Patterns
//!
//! Patterns are `/`-separated segments of three kinds:
//!
//! - literals (`/books`), matched exactly; a trailing slash is a real
//!   (empty) segment, so `/books` and `/books/` are distinct patterns
//! - parameters (`/users/:id`), matching any single non-empty segment and
//!   binding it by name
//! - wildcards (`*`): trailing, they cover the prefix plus zero or more
//!   further segments; mid-pattern, they consume exactly one segment
//!
//! ## Implementations
//!
//! Two interchangeable implementations of the [`Router`] trait ship:
//! [`TrieRouter`] (the default, a segment tree walked with a node frontier)
//! and [`LinearRouter`] (an anchored-regex scan). The application accepts
//! any `Router` at construction, so embedders can swap in their own
//! strategy without touching dispatch.

mod core;
mod linear;
mod trie;


pub use core::{
    MatchResult, ParamBinding, ParamIndexVec, ParamStash, ParamVec, Router, MAX_INLINE_PARAMS,
};
pub use linear::LinearRouter;
pub use trie::TrieRouter;
