use crate::envelope::{mcp_wrap, ResultEnvelope};
use crate::error::GatewayError;
use crate::handlers::Gateway;
use crate::tools::{PROTOCOL_VERSION, SERVER_NAME};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use uuid::Uuid;

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Id {
    Str(String),
    Num(i64),
    Null,
}

#[derive(Debug, Serialize, Deserialize)]
struct Request {
    #[serde(default)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Response {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

fn rpc_error(id: Option<Id>, code: i64, message: &str, data: Option<Value>) -> Response {
    Response { jsonrpc: "2.0".into(), result: None, error: Some(RpcError { code, message: message.into(), data }), id }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response { jsonrpc: "2.0".into(), result: Some(result), error: None, id }
}

/// How a message arrived; the reply goes out the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Line,
    ContentLength,
}

fn frame(framing: Framing, payload: &str) -> String {
    match framing {
        Framing::Line => format!("{}\n", payload),
        Framing::ContentLength => format!("Content-Length: {}\r\n\r\n{}", payload.len(), payload),
    }
}

/// Read the next message, accepting newline-delimited JSON or
/// `Content-Length` framed bodies. `None` at end of input.
async fn read_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Option<(Framing, String)>> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(len) = content_length(trimmed) else {
            return Ok(Some((Framing::Line, trimmed.to_string())));
        };
        // Skip any further headers up to the blank separator line.
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            if line.trim().is_empty() {
                break;
            }
        }
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).await?;
        let text = String::from_utf8(body).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        return Ok(Some((Framing::ContentLength, text)));
    }
}

fn content_length(header: &str) -> Option<usize> {
    let (name, value) = header.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse().ok()
}

fn id_key(id: &Id) -> String {
    serde_json::to_string(id).unwrap_or_default()
}

struct Server {
    gateway: Arc<Gateway>,
    call_timeout: Duration,
    out: mpsc::UnboundedSender<String>,
    inflight: Mutex<HashMap<String, AbortHandle>>,
}

pub async fn run_stdio_server(gateway: Arc<Gateway>, call_timeout: Duration) -> anyhow::Result<()> {
    serve(tokio::io::stdin(), tokio::io::stdout(), gateway, call_timeout).await
}

pub async fn serve<R, W>(input: R, output: W, gateway: Arc<Gateway>, call_timeout: Duration) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    info!("Starting {} stdio server; protocol={}", SERVER_NAME, PROTOCOL_VERSION);
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut output = output;
        while let Some(chunk) = rx.recv().await {
            output.write_all(chunk.as_bytes()).await?;
            output.flush().await?;
        }
        Ok::<_, io::Error>(())
    });

    let server = Arc::new(Server { gateway, call_timeout, out: tx, inflight: Mutex::new(HashMap::new()) });
    let mut reader = BufReader::new(input);
    let mut calls: Vec<JoinHandle<()>> = Vec::new();

    while let Some((framing, body)) = read_message(&mut reader).await? {
        calls.retain(|h| !h.is_finished());
        if let Some(call) = Arc::clone(&server).handle(framing, &body) {
            calls.push(call);
        }
    }

    debug!("input closed; waiting for {} in-flight calls", calls.len());
    for call in calls {
        let _ = call.await;
    }
    // Dropping the last sender lets the writer drain and stop.
    drop(server);
    writer.await??;
    Ok(())
}

impl Server {
    fn send(&self, framing: Framing, resp: &Response) {
        match serde_json::to_string(resp) {
            Ok(payload) => {
                let _ = self.out.send(frame(framing, &payload));
            }
            Err(e) => warn!("failed to encode response: {}", e),
        }
    }

    fn inflight(&self) -> std::sync::MutexGuard<'_, HashMap<String, AbortHandle>> {
        self.inflight.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Answer synchronous methods inline; `tools/call` runs on its own task.
    fn handle(self: Arc<Self>, framing: Framing, body: &str) -> Option<JoinHandle<()>> {
        let value: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(e) => {
                self.send(framing, &rpc_error(None, PARSE_ERROR, &format!("Parse error: {}", e), None));
                return None;
            }
        };
        let req: Request = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                self.send(framing, &rpc_error(None, INVALID_REQUEST, &format!("Invalid request: {}", e), None));
                return None;
            }
        };
        debug!("Received method={}", req.method);
        let resp = match req.method.as_str() {
            "initialize" => handle_initialize(req.id),
            "tools/list" => rpc_ok(req.id, serde_json::json!({ "tools": self.gateway.tools() })),
            "tools/call" => return self.handle_tools_call(framing, req.id, req.params),
            "ping" => rpc_ok(req.id, serde_json::json!({})),
            "notifications/initialized" => return None,
            "notifications/cancelled" => {
                self.cancel(&req.params);
                return None;
            }
            other => {
                if req.id.is_none() {
                    debug!("ignoring notification {}", other);
                    return None;
                }
                rpc_error(req.id, METHOD_NOT_FOUND, &format!("Method not found: {}", other), None)
            }
        };
        if resp.id.is_some() {
            self.send(framing, &resp);
        }
        None
    }

    fn handle_tools_call(self: Arc<Self>, framing: Framing, id: Option<Id>, params: Value) -> Option<JoinHandle<()>> {
        let ToolCallParams { name, arguments } = match serde_json::from_value(params) {
            Ok(c) => c,
            Err(e) => {
                self.send(framing, &rpc_error(id, INVALID_PARAMS, &format!("Invalid params: {}", e), None));
                return None;
            }
        };
        if !self.gateway.has_tool(&name) {
            self.send(framing, &rpc_error(id, METHOD_NOT_FOUND, &format!("Tool not found: {}", name), None));
            return None;
        }

        let call_id = Uuid::new_v4();
        let key = id.as_ref().map(id_key);
        let gateway = Arc::clone(&self.gateway);
        let deadline = self.call_timeout;
        let tool = name.clone();
        let work = tokio::spawn(async move {
            info!("[{}] tools/call {}", call_id, name);
            match tokio::time::timeout(deadline, gateway.invoke(&name, arguments)).await {
                Ok(envelope) => envelope,
                Err(_) => ResultEnvelope::failure(&GatewayError::Timeout {
                    message: format!("{} did not finish within {:?}", name, deadline),
                }),
            }
        });
        if let Some(k) = &key {
            self.inflight().insert(k.clone(), work.abort_handle());
        }

        Some(tokio::spawn(async move {
            let envelope = match work.await {
                Ok(envelope) => envelope,
                Err(e) if e.is_cancelled() => ResultEnvelope::failure(&GatewayError::Cancelled {
                    message: format!("{} was cancelled by the client", tool),
                }),
                Err(e) => ResultEnvelope::failure(&GatewayError::upstream(format!("{} aborted: {}", tool, e))),
            };
            if let Some(k) = &key {
                self.inflight().remove(k);
            }
            info!("[{}] tools/call {} done (error={})", call_id, tool, envelope.is_error());
            if id.is_some() {
                self.send(framing, &rpc_ok(id, mcp_wrap(&envelope)));
            }
        }))
    }

    fn cancel(&self, params: &Value) {
        let Some(request_id) = params.get("requestId") else {
            return;
        };
        let key = serde_json::to_string(request_id).unwrap_or_default();
        if let Some(handle) = self.inflight().remove(&key) {
            let reason = params.get("reason").and_then(Value::as_str).unwrap_or("no reason given");
            info!("cancelling request {} ({})", key, reason);
            handle.abort();
        }
    }
}

fn handle_initialize(id: Option<Id>) -> Response {
    rpc_ok(
        id,
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            }
        }),
    )
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_both_framings_in_one_stream() {
        let body = r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#;
        let raw = format!(
            "{{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}}\n\n{}",
            frame(Framing::ContentLength, body)
        );
        let mut reader = BufReader::new(raw.as_bytes());
        let (f1, m1) = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(f1, Framing::Line);
        assert!(m1.contains("\"ping\""));
        let (f2, m2) = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(f2, Framing::ContentLength);
        assert_eq!(m2, body);
        assert!(read_message(&mut reader).await.unwrap().is_none());
    }

    #[test]
    fn content_length_header_is_case_insensitive() {
        assert_eq!(content_length("content-length: 42"), Some(42));
        assert_eq!(content_length("Content-Length:7"), Some(7));
        assert_eq!(content_length("{\"a\":1}"), None);
        assert_eq!(content_length("Content-Type: application/json"), None);
    }

    #[test]
    fn ids_key_the_same_as_cancel_request_ids() {
        assert_eq!(id_key(&Id::Num(7)), serde_json::to_string(&serde_json::json!(7)).unwrap());
        assert_eq!(id_key(&Id::Str("a".into())), serde_json::to_string(&serde_json::json!("a")).unwrap());
    }

    #[test]
    fn initialize_advertises_protocol_and_server() {
        let resp = handle_initialize(Some(Id::Num(1)));
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(v["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(v.get("error").is_none());
    }
}
