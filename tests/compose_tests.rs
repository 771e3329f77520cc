//! Tests for onion composition semantics
//!
//! # Test Coverage
//!
//! Validates chain execution end to end through `fetch`:
//! - Registration-order execution, outside in and back out
//! - Response overwriting on the unwind path
//! - Short-circuiting without running the continuation
//! - Failure routing to the error handler, exactly once
//! - Repeated-continuation detection
//! - The unfinalized-chain post-condition
//! - Failures that must cross the fetch boundary

use shallot::{handler, middleware, App, DispatchError, Response};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

mod tracing_util;
use tracing_util::TestTracing;

type Log = Arc<Mutex<Vec<&'static str>>>;

// Helper building a logging middleware that records entry and exit.
fn probe(log: &Log, label: &'static str, exit: &'static str) -> shallot::RouteHandler {
    let log = Arc::clone(log);
    middleware(move |_ctx, next| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(label);
            next.run().await?;
            log.lock().unwrap().push(exit);
            Ok(None)
        }
    })
}

#[tokio::test]
async fn test_handlers_run_in_registration_order() {
    let _tracing = TestTracing::init();
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut app = App::new();
    app.use_middleware(None, [probe(&log, "a:in", "a:out")]);
    app.use_middleware(None, [probe(&log, "b:in", "b:out")]);
    let terminal = Arc::clone(&log);
    app.get(
        Some("/page"),
        [handler(move |_ctx| {
            let terminal = Arc::clone(&terminal);
            async move {
                terminal.lock().unwrap().push("c");
                Ok(Response::text("done"))
            }
        })],
    );

    let res = app.fetch("/page").await.unwrap();
    assert_eq!(res.to_string(), "done");
    assert_eq!(
        *log.lock().unwrap(),
        vec!["a:in", "b:in", "c", "b:out", "a:out"]
    );
}

#[tokio::test]
async fn test_outer_middleware_observes_inner_response() {
    let observed = Arc::new(Mutex::new(None));
    let probe = Arc::clone(&observed);

    let mut app = App::new();
    app.use_middleware(
        None,
        [middleware(move |ctx, next| {
            let probe = Arc::clone(&probe);
            async move {
                next.run().await?;
                *probe.lock().unwrap() = ctx.response().map(|r| r.to_string());
                Ok(None)
            }
        })],
    );
    app.get(Some("/page"), [handler(|_ctx| async {
        Ok(Response::text("from handler"))
    })]);

    let res = app.fetch("/page").await.unwrap();
    assert_eq!(res.to_string(), "from handler");
    assert_eq!(*observed.lock().unwrap(), Some("from handler".to_string()));
}

#[tokio::test]
async fn test_outer_return_value_overwrites_inner_response() {
    let mut app = App::new();
    app.use_middleware(
        Some("/page"),
        [middleware(|_ctx, next| async move {
            next.run().await?;
            Ok(Some(Response::text("rewritten")))
        })],
    );
    app.get(Some("/page"), [handler(|_ctx| async {
        Ok(Response::text("original"))
    })]);

    let res = app.fetch("/page").await.unwrap();
    assert_eq!(res.to_string(), "rewritten");
}

#[tokio::test]
async fn test_middleware_short_circuits_downstream() {
    let reached = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&reached);

    let mut app = App::new();
    app.use_middleware(
        None,
        [middleware(|_ctx, _next| async move {
            Ok(Some(Response::text("halted")))
        })],
    );
    app.get(
        Some("/page"),
        [handler(move |_ctx| {
            let flag = Arc::clone(&flag);
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(Response::text("never"))
            }
        })],
    );

    let res = app.fetch("/page").await.unwrap();
    assert_eq!(res.to_string(), "halted");
    assert!(!reached.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_failure_routes_to_error_handler_once() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let reached = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&reached);

    let mut app = App::new();
    app.on_error(move |err, _ctx| {
        let counter = Arc::clone(&counter);
        async move {
            *counter.lock().unwrap() += 1;
            Ok(Response::text(format!("handled: {err}")))
        }
    });
    app.use_middleware(None, [middleware(|_ctx, next| async move {
        next.run().await?;
        Ok(None)
    })]);
    app.use_middleware(None, [middleware(|_ctx, _next| async move {
        Err(DispatchError::handler(anyhow::anyhow!("boom")))
    })]);
    app.get(
        Some("/page"),
        [handler(move |_ctx| {
            let flag = Arc::clone(&flag);
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(Response::text("never"))
            }
        })],
    );

    let res = app.fetch("/page").await.unwrap();
    assert_eq!(res.to_string(), "handled: handler error: boom");
    assert_eq!(*calls.lock().unwrap(), 1);
    assert!(!reached.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_error_handler_response_survives_the_unwind() {
    // The outer middleware returns its own response after resuming, but the
    // error handler already settled the dispatch; the return value loses.
    let mut app = App::new();
    app.use_middleware(
        None,
        [middleware(|_ctx, next| async move {
            next.run().await?;
            Ok(Some(Response::text("too late")))
        })],
    );
    app.get(Some("/boom"), [handler(|_ctx| async {
        Err(DispatchError::handler(anyhow::anyhow!("boom")))
    })]);

    let res = app.fetch("/boom").await.unwrap();
    assert_eq!(res.to_string(), "Internal Server Error");
}

#[tokio::test]
async fn test_error_is_visible_on_the_context_after_next() {
    let seen = Arc::new(Mutex::new(None));
    let probe = Arc::clone(&seen);

    let mut app = App::new();
    app.use_middleware(
        None,
        [middleware(move |ctx, next| {
            let probe = Arc::clone(&probe);
            async move {
                next.run().await?;
                *probe.lock().unwrap() = ctx.error().map(|e| e.to_string());
                Ok(None)
            }
        })],
    );
    app.get(Some("/boom"), [handler(|_ctx| async {
        Err(DispatchError::handler(anyhow::anyhow!("boom")))
    })]);

    app.fetch("/boom").await.unwrap();
    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, Some("handler error: boom".to_string()));
}

#[tokio::test]
async fn test_repeated_continuation_is_a_protocol_violation() {
    let _tracing = TestTracing::init();
    let mut app = App::new();
    app.on_error(|err, _ctx| async move { Ok(Response::text(err.to_string())) });
    app.use_middleware(
        Some("/page"),
        [middleware(|_ctx, next| async move {
            next.run().await?;
            next.run().await?;
            Ok(None)
        })],
    );
    app.get(Some("/page"), [handler(|_ctx| async {
        Ok(Response::text("once"))
    })]);

    let res = app.fetch("/page").await.unwrap();
    assert_eq!(
        res.to_string(),
        "next() called multiple times (chain position 1)"
    );
}

#[tokio::test]
async fn test_unfinalized_chain_is_reported() {
    // Two frames so the chain path runs; neither commits nor continues.
    let mut app = App::new();
    app.on_error(|err, _ctx| async move { Ok(Response::text(err.to_string())) });
    app.use_middleware(Some("/stuck"), [middleware(|_ctx, _next| async move {
        Ok(None)
    })]);
    app.get(Some("/stuck"), [handler(|_ctx| async {
        Ok(Response::text("never reached"))
    })]);

    let res = app.fetch("/stuck").await.unwrap();
    assert!(res.to_string().contains("Context is not finalized"));
}

#[tokio::test]
async fn test_sole_middleware_falls_through_to_not_found() {
    // Single matched handler takes the fused-tail path; continuing past it
    // resolves to the not-found handler.
    let mut app = App::new();
    app.not_found(|_ctx| async { Ok(Response::text("tail")) });
    app.use_middleware(Some("/only"), [middleware(|_ctx, next| async move {
        next.run().await?;
        Ok(None)
    })]);

    let res = app.fetch("/only").await.unwrap();
    assert_eq!(res.to_string(), "tail");
}

#[tokio::test]
async fn test_sole_handler_failure_uses_error_handler() {
    let mut app = App::new();
    app.on_error(|err, _ctx| async move {
        Ok(Response::text(format!("caught: {err}")))
    });
    app.get(Some("/boom"), [handler(|_ctx| async {
        Err(DispatchError::handler(anyhow::anyhow!("single frame")))
    })]);

    let res = app.fetch("/boom").await.unwrap();
    assert_eq!(res.to_string(), "caught: handler error: single frame");
}

#[tokio::test]
async fn test_error_handler_failure_crosses_fetch() {
    let mut app = App::new();
    app.on_error(|_err, _ctx| async {
        Err(DispatchError::handler(anyhow::anyhow!("handler down")))
    });
    app.use_middleware(Some("/boom"), [middleware(|_ctx, next| async move {
        next.run().await?;
        Ok(None)
    })]);
    app.get(Some("/boom"), [handler(|_ctx| async {
        Err(DispatchError::handler(anyhow::anyhow!("boom")))
    })]);

    let err = app.fetch("/boom").await.unwrap_err();
    assert_eq!(err.to_string(), "handler error: handler down");
}

#[tokio::test]
async fn test_not_found_failure_routes_to_error_handler() {
    let mut app = App::new();
    app.on_error(|err, _ctx| async move {
        Ok(Response::text(format!("recovered: {err}")))
    });
    app.not_found(|_ctx| async {
        Err(DispatchError::handler(anyhow::anyhow!("renderer offline")))
    });
    app.use_middleware(Some("/ghost"), [middleware(|_ctx, next| async move {
        next.run().await?;
        Ok(None)
    })]);

    let res = app.fetch("/ghost").await.unwrap();
    assert_eq!(
        res.to_string(),
        "recovered: handler error: renderer offline"
    );
}
