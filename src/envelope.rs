//! The result shape every tool call renders into, and its MCP `tools/call` wrapping.

use crate::error::GatewayError;
use log::error;
use serde::Serialize;
use serde_json::Value;

/// The single output contract of every tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultEnvelope {
    Success { payload: Value },
    Error { message: String },
}

impl ResultEnvelope {
    pub fn failure(err: &GatewayError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Render a handler outcome. Never panics; a payload that cannot be turned
/// into JSON becomes an error envelope.
pub fn render<T: Serialize>(outcome: Result<T, GatewayError>) -> ResultEnvelope {
    match outcome {
        Ok(value) => match serde_json::to_value(value) {
            Ok(payload) => ResultEnvelope::Success { payload },
            Err(e) => {
                error!("failed to serialize payload: {}", e);
                ResultEnvelope::failure(&GatewayError::from(e))
            }
        },
        Err(e) => ResultEnvelope::failure(&e),
    }
}

// Build an MCP-compliant tools/call result around an envelope.
// - content: a single text block carrying the envelope JSON so any client can render it.
// - structuredContent: the envelope itself.
// - isError: included only when true to keep payloads small.
pub fn mcp_wrap(envelope: &ResultEnvelope) -> Value {
    let structured = serde_json::to_value(envelope).unwrap_or_else(|_| {
        serde_json::json!({"kind": "error", "message": "unrenderable result"})
    });
    let text = serde_json::to_string(&structured).unwrap_or_else(|_| "{}".to_string());
    let mut obj = serde_json::json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": structured,
    });
    if envelope.is_error() {
        if let Some(map) = obj.as_object_mut() {
            map.insert("isError".to_string(), Value::Bool(true));
        }
    }
    obj
}
