//! # Dispatch Errors
//!
//! Error taxonomy for the dispatch engine. Route misses are deliberately not
//! represented here: an unmatched path flows to the configured not-found
//! handler and never surfaces as an error value.
//!
//! Only two conditions ever cross the `fetch` boundary as `Err`: a failure
//! raised while the configured error handler itself was running, and nothing
//! else. Every other failure is absorbed by the nearest composition frame and
//! turned into a response.

use std::fmt;

/// Errors surfaced by route dispatch.
#[derive(Debug)]
pub enum DispatchError {
    /// A failure raised by application code inside a handler. Routed to the
    /// configured error handler at the nearest composition frame.
    Handler(anyhow::Error),
    /// A handler invoked its continuation more than once for the same chain
    /// position. Protocol violation; surfaced distinctly so it is never
    /// mistaken for an application failure.
    DoubleNext {
        /// Chain position of the offending second invocation.
        index: usize,
    },
    /// The chain completed without committing a response to the context.
    Unfinalized,
    /// A handler asked for a platform handle the dispatch was not given.
    /// Recoverable: callers can check for the handle before accessing it.
    ContextUnavailable {
        /// Name of the handle that was requested.
        requested: &'static str,
    },
}

impl DispatchError {
    /// Wraps an application-level failure as a handler error.
    pub fn handler<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Handler(err.into())
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(err) => write!(f, "handler error: {err}"),
            Self::DoubleNext { index } => {
                write!(f, "next() called multiple times (chain position {index})")
            }
            Self::Unfinalized => write!(
                f,
                "Context is not finalized. Did you forget to return a Response object or `await next()`?"
            ),
            Self::ContextUnavailable { requested } => {
                write!(f, "This context has no {requested}")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for DispatchError {
    fn from(err: anyhow::Error) -> Self {
        Self::Handler(err)
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Handler(anyhow::Error::new(err))
    }
}
