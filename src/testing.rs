//! Scripted transport for tests.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::api::{ApiError, ApiRequest, Transport};

enum Scripted {
  Reply(Result<Value, ApiError>),
  Gated(oneshot::Receiver<()>, Result<Value, ApiError>),
}

/// Replays canned responses per `(method, path)` and records every call.
///
/// The last scripted reply for a route repeats; gated replies are used once.
#[derive(Default)]
pub struct MockTransport {
  routes: Mutex<HashMap<(String, String), VecDeque<Scripted>>>,
  calls: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  fn push(&self, method: &str, path: &str, scripted: Scripted) {
    self
      .routes
      .lock()
      .unwrap()
      .entry((method.to_string(), path.to_string()))
      .or_default()
      .push_back(scripted);
  }

  pub fn respond(&self, method: &str, path: &str, value: Value) {
    self.push(method, path, Scripted::Reply(Ok(value)));
  }

  pub fn fail(&self, method: &str, path: &str, error: ApiError) {
    self.push(method, path, Scripted::Reply(Err(error)));
  }

  /// Reply only once `gate` fires.
  pub fn respond_after(&self, method: &str, path: &str, gate: oneshot::Receiver<()>, value: Value) {
    self.push(method, path, Scripted::Gated(gate, Ok(value)));
  }

  pub fn calls(&self) -> Vec<ApiRequest> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self, method: &str, path: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|c| c.method.to_string() == method && c.path == path)
      .count()
  }

  fn next(&self, method: &str, path: &str) -> Option<Scripted> {
    let mut routes = self.routes.lock().unwrap();
    let queue = routes.get_mut(&(method.to_string(), path.to_string()))?;
    match queue.front() {
      Some(Scripted::Reply(reply)) if queue.len() == 1 => Some(Scripted::Reply(reply.clone())),
      _ => queue.pop_front(),
    }
  }
}

impl Transport for MockTransport {
  fn call(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>> {
    let method = request.method.to_string();
    let path = request.path.clone();
    self.calls.lock().unwrap().push(request);
    let scripted = self.next(&method, &path);

    async move {
      match scripted {
        Some(Scripted::Reply(reply)) => reply,
        Some(Scripted::Gated(gate, reply)) => {
          let _ = gate.await;
          reply
        }
        None => Err(ApiError::Network(format!(
          "no scripted response for {} {}",
          method, path
        ))),
      }
    }
    .boxed()
  }
}

/// Serve exactly one HTTP response and hand back the raw request text.
pub async fn serve_once(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  let (tx, rx) = oneshot::channel();

  tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
      let n = socket.read(&mut buf).await.unwrap();
      if n == 0 {
        break;
      }
      raw.extend_from_slice(&buf[..n]);
      let text = String::from_utf8_lossy(&raw);
      if let Some(header_end) = text.find("\r\n\r\n") {
        let content_length = text[..header_end]
          .lines()
          .find_map(|l| {
            let lower = l.to_ascii_lowercase();
            lower
              .strip_prefix("content-length:")
              .map(|v| v.trim().parse::<usize>().unwrap_or(0))
          })
          .unwrap_or(0);
        if raw.len() >= header_end + 4 + content_length {
          break;
        }
      }
    }
    let response = format!(
      "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
      status_line,
      body.len(),
      body
    );
    socket.write_all(response.as_bytes()).await.unwrap();
    let _ = tx.send(String::from_utf8_lossy(&raw).to_string());
  });

  (format!("http://{}", addr), rx)
}
