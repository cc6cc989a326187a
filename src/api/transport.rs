//! HTTP transport: URL building, standard headers, bearer auth and uniform
//! error normalization for every backend call.

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiError;
use super::token::TokenStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl Method {
  fn as_reqwest(self) -> reqwest::Method {
    match self {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
    };
    f.write_str(name)
  }
}

/// One part of a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartField {
  Text {
    name: String,
    value: String,
  },
  File {
    name: String,
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
  },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
  #[default]
  Empty,
  Json(Value),
  /// Sent without an explicit content type so the client writes the
  /// multipart boundary itself.
  Multipart(Vec<MultipartField>),
}

/// A fully described backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
  pub method: Method,
  pub path: String,
  pub query: Vec<(String, String)>,
  pub body: RequestBody,
  pub require_auth: bool,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      query: Vec::new(),
      body: RequestBody::Empty,
      require_auth: false,
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::Get, path)
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self::new(Method::Post, path)
  }

  pub fn put(path: impl Into<String>) -> Self {
    Self::new(Method::Put, path)
  }

  pub fn patch(path: impl Into<String>) -> Self {
    Self::new(Method::Patch, path)
  }

  pub fn delete(path: impl Into<String>) -> Self {
    Self::new(Method::Delete, path)
  }

  /// Attach the bearer token from the token store, if present.
  pub fn authenticated(mut self) -> Self {
    self.require_auth = true;
    self
  }

  pub fn json(mut self, body: Value) -> Self {
    self.body = RequestBody::Json(body);
    self
  }

  pub fn multipart(mut self, fields: Vec<MultipartField>) -> Self {
    self.body = RequestBody::Multipart(fields);
    self
  }

  pub fn query_param(mut self, name: &str, value: impl ToString) -> Self {
    self.query.push((name.to_string(), value.to_string()));
    self
  }
}

/// Trait for anything that can execute an [`ApiRequest`].
///
/// Resolves with the parsed JSON body on 2xx and rejects with an
/// [`ApiError`] otherwise. Implementations never return sentinel values.
pub trait Transport: Send + Sync {
  fn call(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>>;
}

/// reqwest-backed transport talking to the real backend.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: String,
  tokens: Arc<dyn TokenStore>,
}

impl HttpTransport {
  pub fn new(
    base_url: &str,
    timeout: Duration,
    user_agent: &str,
    tokens: Arc<dyn TokenStore>,
  ) -> Result<Self, ApiError> {
    url::Url::parse(base_url)
      .map_err(|e| ApiError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;

    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(user_agent)
      .build()
      .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      tokens,
    })
  }

  /// Full URL for an endpoint path: plain concatenation of base and path.
  pub fn url_for(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  async fn execute(&self, request: ApiRequest) -> Result<Value, ApiError> {
    let url = self.url_for(&request.path);
    let mut builder = self
      .client
      .request(request.method.as_reqwest(), url)
      .header(ACCEPT, HeaderValue::from_static("application/json"));

    if !request.query.is_empty() {
      builder = builder.query(&request.query);
    }

    if request.require_auth {
      // A missing token is not an error here; the backend rejects the call.
      let token = self
        .tokens
        .get()
        .map_err(|e| ApiError::Storage(e.to_string()))?;
      if let Some(token) = token {
        builder = builder.bearer_auth(token);
      }
    }

    builder = match request.body {
      RequestBody::Empty => builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json")),
      RequestBody::Json(body) => builder.json(&body),
      RequestBody::Multipart(fields) => builder.multipart(build_form(fields)?),
    };

    let response = builder.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
      if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
      }
      Ok(serde_json::from_slice(&bytes)?)
    } else {
      Err(ApiError::from_response(status.as_u16(), &bytes))
    }
  }
}

impl Transport for HttpTransport {
  fn call(&self, request: ApiRequest) -> BoxFuture<'_, Result<Value, ApiError>> {
    async move {
      let method = request.method;
      let path = request.path.clone();
      let result = self.execute(request).await;
      if let Err(e) = &result {
        tracing::warn!(%method, %path, status = ?e.status(), error = %e, "API request failed");
      }
      result
    }
    .boxed()
  }
}

fn build_form(fields: Vec<MultipartField>) -> Result<Form, ApiError> {
  let mut form = Form::new();
  for field in fields {
    form = match field {
      MultipartField::Text { name, value } => form.text(name, value),
      MultipartField::File {
        name,
        file_name,
        content_type,
        bytes,
      } => {
        let mut part = Part::bytes(bytes).file_name(file_name);
        if let Some(content_type) = content_type {
          part = part
            .mime_str(&content_type)
            .map_err(|e| ApiError::Config(format!("Invalid content type: {}", e)))?;
        }
        form.part(name, part)
      }
    };
  }
  Ok(form)
}
