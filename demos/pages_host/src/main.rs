//! Page-host demo: a small site assembled from middleware, parameterized
//! pages, and a mounted `/api` sub-application with its own error handler
//! and a typed query validator. One invocation dispatches one path, prints
//! the response, then drains background work the way a host would.
//!
//! ```bash
//! cargo run -p pages_host -- /pages/intro
//! cargo run -p pages_host -- /api/search -q q=rust -q lang=de
//! cargo run -p pages_host -- /api/boom --router linear
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shallot::{
    handler, middleware, typed_validator, App, AppOptions, DispatchError, ExecutionContext,
    HostContext, LinearRouter, Response, ValidationTarget,
};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RouterKind {
    Trie,
    Linear,
}

#[derive(Parser, Debug)]
#[command(name = "pages_host", about = "Dispatch a path through the demo site")]
struct Cli {
    /// Path to dispatch, e.g. /api/search
    path: String,

    /// Query parameter as key=value; repeatable
    #[arg(short, long = "query", value_parser = parse_pair)]
    query: Vec<(String, String)>,

    /// Router implementation to dispatch with
    #[arg(long, value_enum, default_value_t = RouterKind::Trie)]
    router: RouterKind,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

#[derive(Debug, Deserialize, Serialize)]
struct SearchQuery {
    q: String,
    #[serde(default)]
    lang: Option<String>,
}

fn build_site(options: AppOptions) -> App {
    let mut app = App::with_options(options);

    app.use_middleware(
        None,
        [middleware(|ctx, next| async move {
            info!(path = %ctx.req().path(), "page request");
            next.run().await?;
            Ok(None)
        })],
    );

    app.get(
        Some("/"),
        [handler(|_ctx| async {
            Ok(Response::text("welcome to the page host"))
        })],
    );

    app.get(
        Some("/pages/:slug"),
        [handler(|ctx| async move {
            let slug = ctx.req().param("slug").unwrap_or("unknown").to_string();
            if let Ok(exec) = ctx.execution_context() {
                let viewed = slug.clone();
                exec.wait_until(async move {
                    info!(slug = %viewed, "page view recorded");
                });
            }
            Ok(Response::json(json!({ "page": slug })))
        })],
    );

    let mut api = App::new();
    api.on_error(|err, _ctx| async move {
        Ok(Response::json(json!({ "error": err.to_string() })))
    });
    api.get(
        Some("/search"),
        [
            typed_validator::<SearchQuery>(ValidationTarget::Query),
            handler(|ctx| async move {
                let query: SearchQuery = ctx.req().valid_as(ValidationTarget::Query)?;
                Ok(Response::json(json!({
                    "q": query.q,
                    "lang": query.lang.unwrap_or_else(|| "en".to_string()),
                    "results": [],
                })))
            }),
        ],
    );
    api.get(
        Some("/boom"),
        [handler(|_ctx| async {
            Err(DispatchError::handler(anyhow::anyhow!(
                "search backend unavailable"
            )))
        })],
    );
    app.route("/api", &api);

    app
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let options = match cli.router {
        RouterKind::Trie => AppOptions::default(),
        RouterKind::Linear => AppOptions {
            router: Some(Box::new(LinearRouter::new())),
            ..AppOptions::default()
        },
    };
    let app = build_site(options);

    let exec = Arc::new(ExecutionContext::new());
    let query: Vec<(&str, &str)> = cli
        .query
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    // Hosts hand the path over piecewise; split the CLI path the same way.
    let segments: Vec<&str> = cli.path.split('/').collect();
    let res = app
        .fetch_segments(
            &segments,
            &query,
            Some(HostContext::from(Arc::clone(&exec))),
        )
        .await?;
    println!("{res}");

    // Drain background work the way a host would after responding.
    for task in exec.take_pending() {
        task.await;
    }
    Ok(())
}
