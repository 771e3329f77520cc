//! Segment-tree router.
//!
//! Patterns are stored as a tree keyed by path segment; matching walks the
//! request path segment by segment, carrying a frontier of live tree nodes so
//! literal, parameter, and wildcard edges are all followed in one pass. Every
//! registration that covers the path is collected; matching never stops at
//! the first hit, because the full ordered set is what the chain executes.

use super::core::{classify, split_path, MatchResult, ParamBinding, ParamVec, Router, Segment};
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

struct Registration<T> {
    seq: usize,
    method: Method,
    entry: T,
}

struct TrieNode<T> {
    literals: HashMap<String, TrieNode<T>>,
    params: Vec<(Arc<str>, TrieNode<T>)>,
    // A lone `*` mid-pattern: consumes exactly one segment, binds nothing.
    anonymous: Option<Box<TrieNode<T>>>,
    // Patterns ending at this node.
    terminals: Vec<Registration<T>>,
    // Trailing-`*` patterns rooted here; they cover this node's path prefix
    // plus zero or more further segments.
    wildcards: Vec<Registration<T>>,
}

impl<T> TrieNode<T> {
    fn new() -> Self {
        Self {
            literals: HashMap::new(),
            params: Vec::new(),
            anonymous: None,
            terminals: Vec::new(),
            wildcards: Vec::new(),
        }
    }
}

/// The default router: a segment tree matched with a frontier walk.
pub struct TrieRouter<T> {
    root: TrieNode<T>,
    registrations: usize,
}

impl<T> TrieRouter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
            registrations: 0,
        }
    }
}

impl<T> Default for TrieRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn collect<T: Clone>(
    registrations: &[Registration<T>],
    method: &Method,
    binding: &ParamVec,
    hits: &mut Vec<(usize, T, ParamVec)>,
) {
    for reg in registrations {
        if reg.method == *method {
            hits.push((reg.seq, reg.entry.clone(), binding.clone()));
        }
    }
}

impl<T: Clone + Send + Sync> Router<T> for TrieRouter<T> {
    fn name(&self) -> &'static str {
        "trie"
    }

    fn add(&mut self, method: &Method, path: &str, entry: T) {
        let seq = self.registrations;
        self.registrations += 1;
        debug!(router = self.name(), method = %method, path = %path, seq, "pattern registered");

        let segments = split_path(path);
        let mut node = &mut self.root;
        for (i, segment) in segments.iter().enumerate() {
            let last = i == segments.len() - 1;
            match classify(segment) {
                Segment::Wildcard if last => {
                    node.wildcards.push(Registration {
                        seq,
                        method: method.clone(),
                        entry,
                    });
                    return;
                }
                Segment::Wildcard => {
                    node = node
                        .anonymous
                        .get_or_insert_with(|| Box::new(TrieNode::new()))
                        .as_mut();
                }
                Segment::Param(name) => {
                    let pos = match node.params.iter().position(|(n, _)| n.as_ref() == name) {
                        Some(pos) => pos,
                        None => {
                            node.params.push((Arc::from(name), TrieNode::new()));
                            node.params.len() - 1
                        }
                    };
                    node = &mut node.params[pos].1;
                }
                Segment::Literal(lit) => {
                    node = node
                        .literals
                        .entry(lit.to_string())
                        .or_insert_with(TrieNode::new);
                }
            }
        }
        node.terminals.push(Registration {
            seq,
            method: method.clone(),
            entry,
        });
    }

    fn match_route(&self, method: &Method, path: &str) -> MatchResult<T> {
        let segments = split_path(path);
        let mut hits: Vec<(usize, T, ParamVec)> = Vec::new();
        let mut frontier: Vec<(&TrieNode<T>, ParamVec)> =
            vec![(&self.root, ParamVec::new())];

        for segment in &segments {
            // Trailing wildcards rooted on the prefix walked so far match no
            // matter what the remaining segments hold.
            for (node, binding) in &frontier {
                collect(&node.wildcards, method, binding, &mut hits);
            }

            let mut advanced: Vec<(&TrieNode<T>, ParamVec)> = Vec::new();
            for (node, binding) in &frontier {
                if let Some(child) = node.literals.get(*segment) {
                    advanced.push((child, binding.clone()));
                }
                // Parameter and anonymous-wildcard edges never match the
                // empty segment a trailing slash produces.
                if !segment.is_empty() {
                    for (name, child) in &node.params {
                        let mut bound = binding.clone();
                        bound.push((Arc::clone(name), (*segment).to_string()));
                        advanced.push((child, bound));
                    }
                    if let Some(child) = &node.anonymous {
                        advanced.push((child.as_ref(), binding.clone()));
                    }
                }
            }
            frontier = advanced;
            if frontier.is_empty() {
                break;
            }
        }

        // Every segment consumed: patterns ending here and trailing
        // wildcards rooted here both cover the path.
        for (node, binding) in &frontier {
            collect(&node.wildcards, method, binding, &mut hits);
            collect(&node.terminals, method, binding, &mut hits);
        }

        hits.sort_by_key(|(seq, _, _)| *seq);
        MatchResult {
            handlers: hits
                .into_iter()
                .map(|(_, entry, binding)| (entry, ParamBinding::Mapped(binding)))
                .collect(),
            stash: None,
        }
    }
}
