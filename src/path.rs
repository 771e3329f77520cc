//! Path manipulation helpers shared by registration and dispatch.

/// Extracts the routable path from a raw path-with-query string.
///
/// Strict form: a trailing slash is preserved, so `/books` and `/books/`
/// are distinct routes.
pub fn extract_path(raw: &str) -> &str {
    let path = match raw.split_once('?') {
        Some((path, _query)) => path,
        None => raw,
    };
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// Like [`extract_path`], but trailing-slash insensitive: `/books/` resolves
/// to `/books`. The root path is left alone.
pub fn extract_path_no_strict(raw: &str) -> &str {
    let path = extract_path(raw);
    if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

/// Joins a base path and a sub path into one normalized path.
///
/// The base's trailing slash is dropped and the sub path contributes at most
/// one leading slash, so `merge_path("/api/", "/v1")` is `/api/v1` and
/// `merge_path("/", "/")` stays `/`.
pub fn merge_path(base: &str, sub: &str) -> String {
    let mut merged = String::from(base.trim_end_matches('/'));
    let sub = sub.trim_start_matches('/');
    if sub.is_empty() {
        if merged.is_empty() {
            merged.push('/');
        }
        return merged;
    }
    merged.push('/');
    merged.push_str(sub);
    merged
}

/// Builds a canonical path from individual segments. Empty segments are
/// skipped; no segments yields the root path.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    let mut path = String::new();
    for segment in segments {
        let segment = segment.as_ref();
        if segment.is_empty() {
            continue;
        }
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}
