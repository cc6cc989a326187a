//! Typed wrapper over a [`Transport`]: encodes request records, decodes
//! response records.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use super::transport::{ApiRequest, MultipartField, Transport};

/// Marketplace API client.
#[derive(Clone)]
pub struct ApiClient {
  transport: Arc<dyn Transport>,
}

impl ApiClient {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  /// Execute a request and decode the body into `T`.
  pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
    let value = self.transport.call(request).await?;
    Ok(serde_json::from_value(value)?)
  }

  /// Execute a request whose response body carries nothing of interest.
  pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
    self.transport.call(request).await.map(|_| ())
  }

  pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    self.send(ApiRequest::get(path).authenticated()).await
  }

  pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let body = serde_json::to_value(body)?;
    self.send(ApiRequest::post(path).authenticated().json(body)).await
  }

  /// POST without the bearer token, for login and registration.
  pub async fn post_public<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let body = serde_json::to_value(body)?;
    self.send(ApiRequest::post(path).json(body)).await
  }

  pub async fn upload<T: DeserializeOwned>(
    &self,
    path: &str,
    fields: Vec<MultipartField>,
  ) -> Result<T, ApiError> {
    self
      .send(ApiRequest::post(path).authenticated().multipart(fields))
      .await
  }

  pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let body = serde_json::to_value(body)?;
    self.send(ApiRequest::put(path).authenticated().json(body)).await
  }

  pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let body = serde_json::to_value(body)?;
    self.send(ApiRequest::patch(path).authenticated().json(body)).await
  }

  pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
    self.send_unit(ApiRequest::delete(path).authenticated()).await
  }
}
