//! Input validation middleware.
//!
//! A validator is ordinary middleware over one request target: it extracts
//! the target's data as JSON, hands it to a validation function, and either
//! stores the accepted value on the request for downstream handlers to read
//! via [`Request::valid`](crate::Request::valid), or short-circuits the chain
//! with a rejection response. [`typed_validator`] derives the validation
//! function from a `serde` type.

use crate::context::Context;
use crate::error::DispatchError;
use crate::handler::{middleware, RouteHandler};
use crate::request::ValidationTarget;
use crate::response::Response;
use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Verdict of a validation function.
pub enum Validation {
    /// Store this value as the target's validated data and continue the
    /// chain. Often the input itself, but validators may normalize.
    Accept(Value),
    /// Stop the chain and answer with this response. Not an error: the
    /// error handler is not consulted.
    Reject(Response),
}

/// Collapses the target's request data into one JSON object.
///
/// Query strings fold repeated keys into arrays; single occurrences stay
/// scalar. Path parameters come from the pattern of the chain position the
/// validator runs at.
fn extract(target: ValidationTarget, ctx: &Context) -> Value {
    let mut map = Map::new();
    match target {
        ValidationTarget::Query => {
            for (key, value) in ctx.req().query_pairs() {
                match map.entry(key.clone()) {
                    serde_json::map::Entry::Vacant(slot) => {
                        slot.insert(Value::String(value.clone()));
                    }
                    serde_json::map::Entry::Occupied(mut slot) => match slot.get_mut() {
                        Value::Array(items) => items.push(Value::String(value.clone())),
                        existing => {
                            let first = existing.take();
                            *existing =
                                Value::Array(vec![first, Value::String(value.clone())]);
                        }
                    },
                }
            }
        }
        ValidationTarget::Param => {
            for (name, value) in ctx.req().params() {
                map.insert(name.as_ref().to_string(), Value::String(value));
            }
        }
    }
    Value::Object(map)
}

/// Builds validation middleware for one request target.
pub fn validator<F>(target: ValidationTarget, validate: F) -> RouteHandler
where
    F: Fn(Value, &Context) -> Result<Validation, DispatchError> + Send + Sync + 'static,
{
    let validate = Arc::new(validate);
    middleware(move |ctx: Context, next| {
        let validate = Arc::clone(&validate);
        async move {
            let value = extract(target, &ctx);
            match validate(value, &ctx)? {
                Validation::Accept(data) => {
                    ctx.req().add_valid(target, data);
                    next.run().await?;
                    Ok(None)
                }
                Validation::Reject(res) => {
                    debug!(section = %target, "validation rejected the request");
                    Ok(Some(res))
                }
            }
        }
    })
}

/// Builds validation middleware that accepts whatever deserializes into `T`.
///
/// The accepted value is `T` serialized back to JSON, so downstream handlers
/// get the normalized shape from
/// [`Request::valid_as`](crate::Request::valid_as). Deserialization failures
/// surface as handler errors carrying the serde message.
pub fn typed_validator<T>(target: ValidationTarget) -> RouteHandler
where
    T: DeserializeOwned + Serialize,
{
    validator(target, move |value, _ctx| {
        let parsed: T = serde_json::from_value(value)
            .map_err(|err| DispatchError::handler(anyhow!("invalid {target} data: {err}")))?;
        Ok(Validation::Accept(serde_json::to_value(&parsed)?))
    })
}
