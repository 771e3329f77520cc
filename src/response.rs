//! Response value produced by a dispatch.
//!
//! The engine does not frame responses for a transport; a [`Response`] is the
//! value a handler settles on, held by the context and handed back to the
//! `fetch` caller. Bodies are JSON values so text, rendered fragments, and
//! structured payloads all travel through the same slot.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// The result value committed by a handler chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Response {
    body: Value,
}

impl Response {
    /// Builds a plain-text response.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: Value::String(body.into()),
        }
    }

    /// Builds a response from a JSON value.
    pub fn json(body: Value) -> Self {
        Self { body }
    }

    /// Serializes any `Serialize` payload into a JSON response.
    pub fn from_serialize<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            body: serde_json::to_value(payload)?,
        })
    }

    /// The response payload.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// The payload as text, when the response holds a string body.
    pub fn as_text(&self) -> Option<&str> {
        self.body.as_str()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}
