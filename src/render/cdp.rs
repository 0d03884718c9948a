//! Minimal DevTools protocol session.
//!
//! Commands are JSON objects `{id, method, params}`; the reply carries the
//! same `id`. Events and replies to other commands arriving in between are
//! discarded. Framing is delegated to a [`CdpTransport`].

use std::net::TcpStream;

use serde_json::{Value, json};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::RenderError;

/// Message transport under a [`CdpSession`].
pub trait CdpTransport {
    fn send_text(&mut self, text: &str) -> Result<(), RenderError>;

    /// Block until the next complete text message.
    fn recv_text(&mut self) -> Result<String, RenderError>;
}

impl CdpTransport for WebSocket<MaybeTlsStream<TcpStream>> {
    fn send_text(&mut self, text: &str) -> Result<(), RenderError> {
        self.send(Message::Text(text.to_string()))?;
        Ok(())
    }

    fn recv_text(&mut self) -> Result<String, RenderError> {
        loop {
            match self.read()? {
                Message::Text(text) => return Ok(text),
                Message::Binary(bytes) => {
                    return String::from_utf8(bytes)
                        .map_err(|e| RenderError::Protocol(e.to_string()));
                }
                Message::Close(_) => {
                    return Err(RenderError::Protocol("WebSocket closed by server".into()));
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }
}

/// Request/response session over a transport.
pub struct CdpSession<T: CdpTransport> {
    transport: T,
    last_id: u64,
}

impl<T: CdpTransport> CdpSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            last_id: 0,
        }
    }

    /// Send one command and wait for its result.
    pub fn call(&mut self, method: &str, params: Value) -> Result<Value, RenderError> {
        self.last_id += 1;
        let id = self.last_id;
        let request = json!({ "id": id, "method": method, "params": params });
        self.transport.send_text(&request.to_string())?;

        loop {
            let message: Value = serde_json::from_str(&self.transport.recv_text()?)?;
            if message.get("id").and_then(Value::as_u64) != Some(id) {
                continue;
            }
            if let Some(error) = message.get("error") {
                return Err(RenderError::Protocol(format!("{method}: {error}")));
            }
            return Ok(message.get("result").cloned().unwrap_or_else(|| json!({})));
        }
    }

    /// `Runtime.evaluate` returning the value of the expression by value.
    pub fn evaluate(&mut self, expression: &str) -> Result<Value, RenderError> {
        let result = self.call(
            "Runtime.evaluate",
            json!({ "expression": expression, "returnByValue": true }),
        )?;
        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}
