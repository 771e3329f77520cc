use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of path parameters stored inline without heap allocation.
/// Most route patterns bind ≤4 names; 8 keeps the whole binding on the stack.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Matched parameter values, referenced by `Indexed` bindings.
pub type ParamStash = SmallVec<[String; MAX_INLINE_PARAMS]>;

/// Materialized path parameters as (name, value) pairs.
///
/// Names are `Arc<str>` because they come from the static pattern tree and
/// are shared into every match; values are per-request data from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Parameter names mapped to positions in a shared [`ParamStash`].
pub type ParamIndexVec = SmallVec<[(Arc<str>, usize); MAX_INLINE_PARAMS]>;

/// Path-parameter binding attached to one matched registration.
///
/// Routers may emit either representation: `Mapped` carries values inline,
/// `Indexed` points into the match result's shared stash so a single capture
/// pass serves every matched registration. Both are views over
/// "parameter name → matched segment".
#[derive(Debug, Clone)]
pub enum ParamBinding {
    Mapped(ParamVec),
    Indexed(ParamIndexVec),
}

impl ParamBinding {
    /// A binding with no parameters.
    #[must_use]
    pub fn empty() -> Self {
        Self::Mapped(SmallVec::new())
    }

    /// Looks up a parameter by name.
    ///
    /// Uses "last write wins" semantics: if duplicate parameter names exist
    /// at different pattern depths, the deepest occurrence is returned.
    #[inline]
    #[must_use]
    pub fn get<'a>(&'a self, name: &str, stash: Option<&'a ParamStash>) -> Option<&'a str> {
        match self {
            Self::Mapped(params) => params
                .iter()
                .rfind(|(k, _)| k.as_ref() == name)
                .map(|(_, v)| v.as_str()),
            Self::Indexed(indices) => {
                let (_, idx) = indices.iter().rfind(|(k, _)| k.as_ref() == name)?;
                stash?.get(*idx).map(String::as_str)
            }
        }
    }

    /// Materializes the binding into (name, value) pairs.
    /// Note: this clones values - use [`ParamBinding::get`] in hot paths.
    #[must_use]
    pub fn materialize(&self, stash: Option<&ParamStash>) -> ParamVec {
        match self {
            Self::Mapped(params) => params.clone(),
            Self::Indexed(indices) => indices
                .iter()
                .filter_map(|(name, idx)| {
                    let value = stash?.get(*idx)?;
                    Some((Arc::clone(name), value.clone()))
                })
                .collect(),
        }
    }
}

/// Ordered outcome of matching one (method, path) against a router.
///
/// Entries appear in registration order; that order is what the compose
/// engine executes, so it is the middleware onion order. An empty result
/// means no registration matched, which is a not-found rather than an error.
#[derive(Debug)]
pub struct MatchResult<T> {
    /// Matched registrations with their parameter bindings, in order.
    pub handlers: Vec<(T, ParamBinding)>,
    /// Shared parameter stash referenced by `Indexed` bindings.
    pub stash: Option<ParamStash>,
}

impl<T> MatchResult<T> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
            stash: None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for MatchResult<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Pluggable path-matching strategy.
///
/// A router maps `(method, path)` to every registration whose pattern covers
/// the path. Patterns are made of literal segments, `:name` parameter
/// segments, and a trailing `*` wildcard covering zero or more remaining
/// segments. Implementations must preserve registration order in their match
/// output and must return an empty result (never an error) on a miss.
pub trait Router<T>: Send + Sync {
    /// Short implementation name, used in logs.
    fn name(&self) -> &'static str;

    /// Registers a pattern. Side effect only.
    fn add(&mut self, method: &Method, path: &str, entry: T);

    /// Collects every registration matching the path, in registration order.
    fn match_route(&self, method: &Method, path: &str) -> MatchResult<T>;
}

/// One segment of a route pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Literal(&'a str),
    Param(&'a str),
    Wildcard,
}

pub(crate) fn classify(segment: &str) -> Segment<'_> {
    if segment == "*" {
        Segment::Wildcard
    } else if let Some(name) = segment.strip_prefix(':') {
        Segment::Param(name)
    } else {
        Segment::Literal(segment)
    }
}

/// Splits a pattern or request path on `/`, dropping only the leading empty
/// segment. A trailing slash therefore survives as a trailing `""` literal,
/// which is what keeps `/books` and `/books/` distinct registrations.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = path.split('/').collect();
    if parts.first() == Some(&"") {
        parts.remove(0);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_keeps_trailing_empty_segment() {
        assert_eq!(split_path("/"), vec![""]);
        assert_eq!(split_path("/books"), vec!["books"]);
        assert_eq!(split_path("/books/"), vec!["books", ""]);
        assert_eq!(split_path("/users/:id"), vec!["users", ":id"]);
        assert_eq!(split_path("*"), vec!["*"]);
        assert_eq!(split_path("/api/*"), vec!["api", "*"]);
    }

    #[test]
    fn binding_lookup_last_write_wins() {
        let mapped = ParamBinding::Mapped(smallvec::smallvec![
            (Arc::from("id"), "outer".to_string()),
            (Arc::from("id"), "inner".to_string()),
        ]);
        assert_eq!(mapped.get("id", None), Some("inner"));
        assert_eq!(mapped.get("missing", None), None);

        let stash: ParamStash = smallvec::smallvec!["a".to_string(), "b".to_string()];
        let indexed = ParamBinding::Indexed(smallvec::smallvec![
            (Arc::from("id"), 0usize),
            (Arc::from("id"), 1usize),
        ]);
        assert_eq!(indexed.get("id", Some(&stash)), Some("b"));
        assert_eq!(indexed.get("id", None), None);
    }

    #[test]
    fn materialize_resolves_indexed_values() {
        let stash: ParamStash = smallvec::smallvec!["42".to_string()];
        let indexed = ParamBinding::Indexed(smallvec::smallvec![(Arc::from("id"), 0usize)]);
        let params = indexed.materialize(Some(&stash));
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].0.as_ref(), "id");
        assert_eq!(params[0].1, "42");
    }
}
