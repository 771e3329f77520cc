//! Tests for application assembly and the fetch surface
//!
//! # Test Coverage
//!
//! Validates registration and dispatch end to end:
//! - Route registration (`get`, `use_middleware`) and the pending pattern
//! - Path matching through `fetch`, `fetch_with`, and `fetch_segments`
//! - Strict and trailing-slash-insensitive path extraction
//! - Custom path extractors and router injection
//! - Not-found handling, stock and custom
//! - Concurrent and repeated dispatch over one application

use shallot::{
    handler, middleware, App, AppOptions, GetPath, LinearRouter, Response, Route, RouteHandler,
};
use std::sync::{Arc, Mutex};

mod tracing_util;
use tracing_util::TestTracing;

// Helper producing a terminal handler with a fixed text response.
fn text(body: &'static str) -> RouteHandler {
    handler(move |_ctx| async move { Ok(Response::text(body)) })
}

#[tokio::test]
async fn test_get_route_returns_response() {
    let _tracing = TestTracing::init();
    let mut app = App::new();
    app.get(Some("/books"), [text("shelf")]);

    let res = app.fetch("/books").await.unwrap();
    assert_eq!(res.to_string(), "shelf");
}

#[tokio::test]
async fn test_unmatched_path_returns_stock_not_found() {
    let mut app = App::new();
    app.get(Some("/books"), [text("shelf")]);

    let res = app.fetch("/missing").await.unwrap();
    assert_eq!(res.to_string(), "404 Not Found");
}

#[tokio::test]
async fn test_custom_not_found_handler() {
    let mut app = App::new();
    app.not_found(|ctx| async move {
        Ok(Response::text(format!("no page at {}", ctx.req().path())))
    });

    let res = app.fetch("/missing").await.unwrap();
    assert_eq!(res.to_string(), "no page at /missing");
}

#[tokio::test]
async fn test_pending_pattern_applies_to_later_registrations() {
    let mut app = App::new();
    // First call only moves the pending pattern; the handler lands there.
    app.get(Some("/settings"), []).get(None, [text("settings page")]);

    let res = app.fetch("/settings").await.unwrap();
    assert_eq!(res.to_string(), "settings page");
}

#[tokio::test]
async fn test_use_without_path_registers_catch_all() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let probe = Arc::clone(&seen);

    let mut app = App::new();
    app.use_middleware(
        None,
        [middleware(move |ctx, next| {
            let probe = Arc::clone(&probe);
            async move {
                probe.lock().unwrap().push(ctx.req().path().to_string());
                next.run().await?;
                Ok(None)
            }
        })],
    );
    app.get(Some("/a"), [text("a")]);
    app.get(Some("/b/c"), [text("c")]);

    assert_eq!(app.fetch("/a").await.unwrap().to_string(), "a");
    assert_eq!(app.fetch("/b/c").await.unwrap().to_string(), "c");
    assert_eq!(app.fetch("/nope").await.unwrap().to_string(), "404 Not Found");
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["/a".to_string(), "/b/c".to_string(), "/nope".to_string()]
    );
}

#[tokio::test]
async fn test_path_params_bind_through_fetch() {
    let mut app = App::new();
    app.get(
        Some("/users/:id/posts/:post"),
        [handler(|ctx| async move {
            let id = ctx.req().param("id").unwrap_or_default().to_string();
            let post = ctx.req().param("post").unwrap_or_default().to_string();
            Ok(Response::text(format!("{id}/{post}")))
        })],
    );

    let res = app.fetch("/users/7/posts/42").await.unwrap();
    assert_eq!(res.to_string(), "7/42");
}

#[tokio::test]
async fn test_fetch_with_encodes_query_pairs() {
    let mut app = App::new();
    app.get(
        Some("/search"),
        [handler(|ctx| async move {
            let q = ctx.req().query("q").unwrap_or_default().to_string();
            let tags = ctx.req().queries("tag").join(",");
            Ok(Response::text(format!("{q}|{tags}")))
        })],
    );

    let res = app
        .fetch_with("/search", &[("q", "café au lait"), ("tag", "a"), ("tag", "b")], None)
        .await
        .unwrap();
    assert_eq!(res.to_string(), "café au lait|a,b");
}

#[tokio::test]
async fn test_fetch_parses_inline_query_string() {
    let mut app = App::new();
    app.get(
        Some("/search"),
        [handler(|ctx| async move {
            Ok(Response::text(
                ctx.req().query("q").unwrap_or_default().to_string(),
            ))
        })],
    );

    let res = app.fetch("/search?q=sourdough").await.unwrap();
    assert_eq!(res.to_string(), "sourdough");
}

#[tokio::test]
async fn test_fetch_segments_joins_path() {
    let _tracing = TestTracing::init();
    let mut app = App::new();
    app.get(Some("/api/items/:id"), [handler(|ctx| async move {
        Ok(Response::text(
            ctx.req().param("id").unwrap_or_default().to_string(),
        ))
    })]);

    let res = app
        .fetch_segments(&["api", "items", "12"], &[], None)
        .await
        .unwrap();
    assert_eq!(res.to_string(), "12");

    // Empty segments are skipped; no segments means the root path.
    let mut root = App::new();
    root.get(Some("/"), [text("home")]);
    let res = root.fetch_segments(&["", ""], &[], None).await.unwrap();
    assert_eq!(res.to_string(), "home");
}

#[tokio::test]
async fn test_empty_fetch_path_resolves_to_root() {
    let mut app = App::new();
    app.get(Some("/"), [text("home")]);

    let res = app.fetch("").await.unwrap();
    assert_eq!(res.to_string(), "home");
}

#[tokio::test]
async fn test_strict_mode_distinguishes_trailing_slash() {
    let mut app = App::new();
    app.get(Some("/books"), [text("no slash")]);
    app.get(Some("/books/"), [text("slash")]);

    assert_eq!(app.fetch("/books").await.unwrap().to_string(), "no slash");
    assert_eq!(app.fetch("/books/").await.unwrap().to_string(), "slash");
}

#[tokio::test]
async fn test_loose_mode_folds_trailing_slash() {
    let mut app = App::with_options(AppOptions {
        strict: false,
        ..AppOptions::default()
    });
    app.get(Some("/books"), [text("shelf")]);

    assert_eq!(app.fetch("/books").await.unwrap().to_string(), "shelf");
    assert_eq!(app.fetch("/books/").await.unwrap().to_string(), "shelf");
    // The root path is left alone.
    let mut root = App::with_options(AppOptions {
        strict: false,
        ..AppOptions::default()
    });
    root.get(Some("/"), [text("home")]);
    assert_eq!(root.fetch("/").await.unwrap().to_string(), "home");
}

#[tokio::test]
async fn test_custom_path_extractor() {
    // A pages host that serves "/about.html" from the "/about" route.
    let strip_html: GetPath = Arc::new(|raw: &str| {
        let path = raw.split_once('?').map_or(raw, |(path, _)| path);
        path.trim_end_matches(".html").to_string()
    });
    let mut app = App::with_options(AppOptions {
        get_path: Some(strip_html),
        ..AppOptions::default()
    });
    app.get(Some("/about"), [text("about page")]);

    assert_eq!(app.fetch("/about.html").await.unwrap().to_string(), "about page");
    assert_eq!(app.fetch("/about").await.unwrap().to_string(), "about page");
}

#[tokio::test]
async fn test_linear_router_injection() {
    let mut app = App::with_options(AppOptions {
        router: Some(Box::new(LinearRouter::new())),
        ..AppOptions::default()
    });
    app.get(Some("/users/:id"), [handler(|ctx| async move {
        Ok(Response::text(
            ctx.req().param("id").unwrap_or_default().to_string(),
        ))
    })]);
    app.get(Some("/static/*"), [text("asset")]);

    assert_eq!(app.fetch("/users/9").await.unwrap().to_string(), "9");
    assert_eq!(app.fetch("/static/css/site.css").await.unwrap().to_string(), "asset");
    assert_eq!(app.fetch("/missing").await.unwrap().to_string(), "404 Not Found");
}

#[tokio::test]
async fn test_repeated_dispatch_is_stable() {
    let mut app = App::new();
    app.get(Some("/ping/:n"), [handler(|ctx| async move {
        Ok(Response::text(
            ctx.req().param("n").unwrap_or_default().to_string(),
        ))
    })]);

    assert_eq!(app.fetch("/ping/1").await.unwrap().to_string(), "1");
    assert_eq!(app.fetch("/ping/2").await.unwrap().to_string(), "2");
    assert_eq!(app.fetch("/ping/1").await.unwrap().to_string(), "1");
}

#[tokio::test]
async fn test_concurrent_dispatches_share_one_app() {
    let mut app = App::new();
    app.get(Some("/echo/:word"), [handler(|ctx| async move {
        Ok(Response::text(
            ctx.req().param("word").unwrap_or_default().to_string(),
        ))
    })]);

    let (a, b, c) = tokio::join!(
        app.fetch("/echo/one"),
        app.fetch("/echo/two"),
        app.fetch("/echo/three"),
    );
    assert_eq!(a.unwrap().to_string(), "one");
    assert_eq!(b.unwrap().to_string(), "two");
    assert_eq!(c.unwrap().to_string(), "three");
}

#[tokio::test]
async fn test_routes_snapshot_preserves_registration_order() {
    let mut app = App::new();
    app.use_middleware(None, [middleware(|_ctx, next| async move {
        next.run().await?;
        Ok(None)
    })]);
    app.get(Some("/a"), [text("a")]);
    app.get(Some("/b"), [text("b")]);

    let routes: Vec<Arc<Route>> = app.routes();
    let paths: Vec<&str> = routes.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/*", "/a", "/b"]);
}

#[tokio::test]
async fn test_multiple_handlers_in_one_registration_run_in_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&order);

    let mut app = App::new();
    app.get(
        Some("/page"),
        [
            middleware(move |_ctx, next| {
                let first = Arc::clone(&first);
                async move {
                    first.lock().unwrap().push("mw");
                    next.run().await?;
                    Ok(None)
                }
            }),
            text("content"),
        ],
    );

    let res = app.fetch("/page").await.unwrap();
    assert_eq!(res.to_string(), "content");
    assert_eq!(*order.lock().unwrap(), vec!["mw"]);
}
