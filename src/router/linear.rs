//! Scan router.
//!
//! Each pattern is compiled to an anchored regex at registration; matching
//! tests every compiled pattern against the request path in registration
//! order. Captured parameter values go into the match result's shared stash,
//! with per-registration bindings indexing into it, so one capture pass
//! serves however many patterns hit.
//!
//! Slower than the tree for large tables but trivially predictable, which
//! makes it the reference implementation the tree is checked against.

use super::core::{
    classify, split_path, MatchResult, ParamBinding, ParamIndexVec, ParamStash, Router, Segment,
};
use http::Method;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, error};

struct CompiledPattern<T> {
    method: Method,
    regex: Regex,
    names: Vec<Arc<str>>,
    entry: T,
}

/// Regex-scan router; matches patterns in registration order.
pub struct LinearRouter<T> {
    patterns: Vec<CompiledPattern<T>>,
}

impl<T> LinearRouter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }
}

impl<T> Default for LinearRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiles a route pattern into an anchored regex source plus the parameter
/// names its capture groups bind, in group order.
fn compile(path: &str) -> (String, Vec<Arc<str>>) {
    let segments = split_path(path);
    let mut pattern = String::with_capacity(path.len() + 8);
    let mut names = Vec::new();
    pattern.push('^');
    for (i, segment) in segments.iter().enumerate() {
        let last = i == segments.len() - 1;
        match classify(segment) {
            // Trailing `*` covers the prefix itself plus anything below it.
            Segment::Wildcard if last => pattern.push_str("(?:/.*)?"),
            Segment::Wildcard => pattern.push_str("/[^/]+"),
            Segment::Param(name) => {
                names.push(Arc::from(name));
                pattern.push_str("/([^/]+)");
            }
            Segment::Literal(lit) => {
                pattern.push('/');
                pattern.push_str(&regex::escape(lit));
            }
        }
    }
    pattern.push('$');
    (pattern, names)
}

impl<T: Clone + Send + Sync> Router<T> for LinearRouter<T> {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn add(&mut self, method: &Method, path: &str, entry: T) {
        let (source, names) = compile(path);
        let regex = match Regex::new(&source) {
            Ok(regex) => regex,
            Err(err) => {
                error!(router = self.name(), path = %path, error = %err, "pattern failed to compile, registration dropped");
                return;
            }
        };
        debug!(router = self.name(), method = %method, path = %path, pattern = %source, "pattern registered");
        self.patterns.push(CompiledPattern {
            method: method.clone(),
            regex,
            names,
            entry,
        });
    }

    fn match_route(&self, method: &Method, path: &str) -> MatchResult<T> {
        let mut handlers = Vec::new();
        let mut stash = ParamStash::new();

        for pattern in &self.patterns {
            if pattern.method != *method {
                continue;
            }
            if let Some(caps) = pattern.regex.captures(path) {
                let offset = stash.len();
                let binding: ParamIndexVec = pattern
                    .names
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (Arc::clone(name), offset + i))
                    .collect();
                for i in 0..pattern.names.len() {
                    let value = caps
                        .get(i + 1)
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default();
                    stash.push(value);
                }
                handlers.push((pattern.entry.clone(), ParamBinding::Indexed(binding)));
            }
        }

        MatchResult {
            handlers,
            stash: if stash.is_empty() { None } else { Some(stash) },
        }
    }
}
