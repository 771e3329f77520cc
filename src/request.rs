//! The request under dispatch.
//!
//! A [`Request`] is built once per `fetch` from the router's match output and
//! shared by every chain frame through the context. Parameter lookups resolve
//! against the binding of the *currently executing* chain position, so a
//! catch-all middleware and the terminal route each see their own pattern's
//! captures. The query string is parsed lazily, at most once.

use crate::error::DispatchError;
use crate::handler::Route;
use crate::router::{MatchResult, ParamBinding, ParamStash, ParamVec};
use anyhow::anyhow;
use http::Method;
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use url::form_urlencoded;

/// Section of a request a validator may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationTarget {
    /// The parsed query string.
    Query,
    /// The path parameters of the currently matched pattern.
    Param,
}

impl ValidationTarget {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Param => "param",
        }
    }
}

impl fmt::Display for ValidationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Cheaply cloneable handle over one dispatch's request data.
#[derive(Clone)]
pub struct Request {
    parts: Arc<RequestParts>,
}

struct RequestParts {
    method: Method,
    path: String,
    query_string: Option<String>,
    routes: Vec<(Arc<Route>, ParamBinding)>,
    stash: Option<ParamStash>,
    // Chain position currently executing; advanced by the engine so param
    // lookups resolve against the right pattern.
    route_index: AtomicUsize,
    query_cache: OnceCell<Vec<(String, String)>>,
    valid: Mutex<HashMap<ValidationTarget, Value>>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        query_string: Option<String>,
        matched: MatchResult<Arc<Route>>,
    ) -> Self {
        Self {
            parts: Arc::new(RequestParts {
                method,
                path,
                query_string,
                routes: matched.handlers,
                stash: matched.stash,
                route_index: AtomicUsize::new(0),
                query_cache: OnceCell::new(),
                valid: Mutex::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// The path this dispatch was matched against.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.parts.path
    }

    /// The raw query string, without the leading `?`.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.parts.query_string.as_deref()
    }

    fn parsed_query(&self) -> &[(String, String)] {
        self.parts.query_cache.get_or_init(|| {
            match &self.parts.query_string {
                Some(raw) => form_urlencoded::parse(raw.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect(),
                None => Vec::new(),
            }
        })
    }

    /// A single query value by name. Last write wins for repeated keys.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.parsed_query()
            .iter()
            .rfind(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every query value registered under `name`, in order of appearance.
    #[must_use]
    pub fn queries(&self, name: &str) -> Vec<&str> {
        self.parsed_query()
            .iter()
            .filter(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// All decoded query pairs, in order of appearance.
    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        self.parsed_query()
    }

    /// A path parameter captured by the currently executing pattern.
    ///
    /// A wildcard middleware pattern binds no names, so it reads `None` even
    /// when a later terminal pattern in the same chain binds them.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        let idx = self.parts.route_index.load(Ordering::SeqCst);
        let (_, binding) = self.parts.routes.get(idx)?;
        binding.get(name, self.parts.stash.as_ref())
    }

    /// All path parameters of the currently executing pattern.
    #[must_use]
    pub fn params(&self) -> ParamVec {
        let idx = self.parts.route_index.load(Ordering::SeqCst);
        match self.parts.routes.get(idx) {
            Some((_, binding)) => binding.materialize(self.parts.stash.as_ref()),
            None => ParamVec::new(),
        }
    }

    /// The registered pattern of the currently executing chain position.
    #[must_use]
    pub fn route_path(&self) -> Option<&str> {
        let idx = self.parts.route_index.load(Ordering::SeqCst);
        self.parts.routes.get(idx).map(|(route, _)| route.path.as_str())
    }

    /// Every route matched for this dispatch, in chain order.
    pub fn matched_routes(&self) -> impl Iterator<Item = &Route> {
        self.parts.routes.iter().map(|(route, _)| route.as_ref())
    }

    pub(crate) fn set_route_index(&self, index: usize) {
        self.parts.route_index.store(index, Ordering::SeqCst);
    }

    /// Data accepted by a validator for `target`, if one ran.
    #[must_use]
    pub fn valid(&self, target: ValidationTarget) -> Option<Value> {
        self.parts
            .valid
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&target)
            .cloned()
    }

    /// Deserializes validated data for `target` into a typed value.
    pub fn valid_as<T: DeserializeOwned>(&self, target: ValidationTarget) -> Result<T, DispatchError> {
        let value = self
            .valid(target)
            .ok_or_else(|| DispatchError::handler(anyhow!("no validated {target} data")))?;
        serde_json::from_value(value).map_err(DispatchError::from)
    }

    pub(crate) fn add_valid(&self, target: ValidationTarget, value: Value) {
        self.parts
            .valid
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target, value);
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("path", &self.parts.path)
            .field("query", &self.parts.query_string)
            .field("matched", &self.parts.routes.len())
            .finish()
    }
}
