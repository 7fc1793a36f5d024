// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 client over `covend.sock` (spec.md §6.2). The daemon's
//! transport is axum over a Unix domain socket, not the line-oriented
//! request/response protocol `oj`'s own daemon speaks, so this reuses
//! `oj-cli::client`'s raw-`UnixStream` connect-per-request shape rather than
//! its framed message format: one request per connection, `Connection:
//! close` so the server's own response marks the end of the body.

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("covend is not running for this workspace (no socket at {0})")]
    NotRunning(PathBuf),
    #[error("io error talking to covend: {0}")]
    Io(#[from] std::io::Error),
    #[error("covend returned a malformed response")]
    MalformedResponse,
    #[error("{code}: {message}")]
    Daemon { code: String, message: String },
    #[error("invalid json from covend: {0}")]
    Json(#[from] serde_json::Error),
}

/// A connect-per-request client for one workspace's `covend`.
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub async fn health(&self) -> bool {
        self.request("GET", "/health", None).await.is_ok()
    }

    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.request("GET", path, None).await
    }

    /// `GET` for endpoints whose body is plain text rather than JSON, such
    /// as `/workflows/{id}/log`'s JSONL transition history.
    pub async fn get_text(&self, path: &str) -> Result<String, ClientError> {
        let (status, body_text) = self.request_raw("GET", path, None).await?;
        if !(200..300).contains(&status) {
            let value: Value = serde_json::from_str(&body_text).unwrap_or(Value::Null);
            return Err(daemon_error(&value));
        }
        Ok(body_text)
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, ClientError> {
        self.request("POST", path, body).await
    }

    pub async fn patch(&self, path: &str, body: Option<Value>) -> Result<Value, ClientError> {
        self.request("PATCH", path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        self.request("DELETE", path, None).await
    }

    /// `DELETE` with a JSON body, for routes like `/tasks/{id}/tags` where
    /// the tag list to remove doesn't fit in the path or a query string.
    pub async fn delete_with_body(&self, path: &str, body: Value) -> Result<Value, ClientError> {
        self.request("DELETE", path, Some(body)).await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let (status, body_text) = self.request_raw(method, path, body).await?;

        let value: Value = if body_text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body_text)?
        };

        if !(200..300).contains(&status) {
            return Err(daemon_error(&value));
        }

        Ok(value)
    }

    /// Sends one request and returns the status code and raw body text,
    /// without assuming the body is JSON.
    async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<(u16, String), ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|_| ClientError::NotRunning(self.socket_path.clone()))?;

        let body_bytes = match &body {
            Some(v) => serde_json::to_vec(v)?,
            None => Vec::new(),
        };

        let mut head = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
        if !body_bytes.is_empty() {
            head.push_str("Content-Type: application/json\r\n");
        }
        head.push_str(&format!("Content-Length: {}\r\n\r\n", body_bytes.len()));

        stream.write_all(head.as_bytes()).await?;
        if !body_bytes.is_empty() {
            stream.write_all(&body_bytes).await?;
        }
        stream.flush().await?;

        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await?;
        let text = String::from_utf8_lossy(&raw);

        let header_end = text.find("\r\n\r\n").ok_or(ClientError::MalformedResponse)?;
        let status_line = text[..header_end]
            .lines()
            .next()
            .ok_or(ClientError::MalformedResponse)?;
        let status: u16 = status_line
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .ok_or(ClientError::MalformedResponse)?;

        Ok((status, text[header_end + 4..].to_string()))
    }
}

fn daemon_error(value: &Value) -> ClientError {
    let code = value
        .get("code")
        .and_then(|v| v.as_str())
        .unwrap_or("internal")
        .to_string();
    let message = value
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown error")
        .to_string();
    ClientError::Daemon { code, message }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
