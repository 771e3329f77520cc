//! # Chain Composition
//!
//! Turns the ordered handler list a router matched into a single execution
//! over one shared [`Context`](crate::Context): the middleware onion.
//!
//! ## Overview
//!
//! The first handler is the outermost layer. Each handler receives the
//! context and a [`Next`] continuation; invoking the continuation runs
//! everything registered after it, and control returns to the handler once
//! the inner frames have finished. Work placed before `next.run()` happens on
//! the way in, work placed after it happens on the way out, in reverse
//! registration order.
//!
//! ## Outcome rules
//!
//! - A handler returning a response commits it as the frame unwinds,
//!   overwriting whatever an inner frame committed.
//! - A failure is answered by the error handler at the frame nearest to it,
//!   exactly once per dispatch; frames still unwinding can no longer
//!   overwrite the response it produced.
//! - A chain that runs past its last handler without a committed response
//!   falls back to the not-found handler.
//! - Invoking one continuation twice is reported as a distinct protocol
//!   violation rather than an application failure.

mod core;

pub use core::{Chain, Next};
