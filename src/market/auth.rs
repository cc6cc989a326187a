use crate::api::endpoints;
use crate::api::types::{AuthResponse, AvatarUpload, LoginRequest, RegisterRequest, UpdateProfileRequest, User};
use crate::api::{ApiClient, ApiError, ApiRequest, MultipartField, TokenStore};
use crate::cache::QueryCache;
use crate::mutation::Mutation;
use crate::query::{Query, QueryOptions};

use super::{keys, MarketClient, PROFILE_STALE_TIME};

fn persist_token(tokens: &dyn TokenStore, token: &str) -> Result<(), ApiError> {
  tokens
    .set(token)
    .map_err(|e| ApiError::Storage(e.to_string()))
}

impl MarketClient {
  /// The signed-in user. Disabled while no token is stored; the token is
  /// checked again on every call, so a query built before login picks up
  /// the new session.
  pub fn profile(&self) -> Query<User> {
    let tokens = self.tokens.clone();
    let options = QueryOptions::default().stale_time(PROFILE_STALE_TIME);
    self
      .get_query(keys::auth::profile(), options, endpoints::auth::ME)
      .enabled_when(move || matches!(tokens.get(), Ok(Some(_))))
  }

  /// Sign in, persist the returned token, then refresh the profile.
  pub fn login(&self) -> Mutation<LoginRequest, AuthResponse> {
    let tokens = self.tokens.clone();
    self
      .mutation(|api: ApiClient, req: LoginRequest| async move {
        api
          .post_public::<_, AuthResponse>(endpoints::auth::LOGIN, &req)
          .await
      })
      .on_success(move |resp: &AuthResponse, _: &LoginRequest, _: &QueryCache| {
        persist_token(&*tokens, &resp.token)
      })
      .invalidates(|_: &AuthResponse, _: &LoginRequest| vec![keys::auth::profile()])
  }

  /// Create an account. The token is persisted only when the backend signs
  /// the new user in.
  pub fn register(&self) -> Mutation<RegisterRequest, AuthResponse> {
    let tokens = self.tokens.clone();
    self
      .mutation(|api: ApiClient, req: RegisterRequest| async move {
        api
          .post_public::<_, AuthResponse>(endpoints::auth::REGISTER, &req)
          .await
      })
      .on_success(move |resp: &AuthResponse, _: &RegisterRequest, _: &QueryCache| {
        if resp.token.is_empty() {
          return Ok(());
        }
        persist_token(&*tokens, &resp.token)
      })
      .invalidates(|_: &AuthResponse, _: &RegisterRequest| vec![keys::auth::profile()])
  }

  /// Exchange a refresh token for a new session token.
  pub fn refresh_session(&self) -> Mutation<String, AuthResponse> {
    let tokens = self.tokens.clone();
    self
      .mutation(|api: ApiClient, refresh_token: String| async move {
        let body = serde_json::json!({ "refreshToken": refresh_token });
        api
          .post_public::<_, AuthResponse>(endpoints::auth::REFRESH, &body)
          .await
      })
      .on_success(move |resp: &AuthResponse, _: &String, _: &QueryCache| persist_token(&*tokens, &resp.token))
  }

  /// Sign out. Clears the stored token and every cached entry, since almost
  /// all cached data belongs to the signed-in user.
  pub fn logout(&self) -> Mutation<(), ()> {
    let tokens = self.tokens.clone();
    self
      .mutation(|api: ApiClient, _: ()| async move {
        api
          .send_unit(ApiRequest::post(endpoints::auth::LOGOUT).authenticated())
          .await
      })
      .on_success(move |_: &(), _: &(), cache: &QueryCache| {
        tokens.clear().map_err(|e| ApiError::Storage(e.to_string()))?;
        cache.clear();
        Ok(())
      })
  }

  pub fn update_profile(&self) -> Mutation<UpdateProfileRequest, User> {
    self
      .mutation(|api: ApiClient, req: UpdateProfileRequest| async move {
        api.patch::<_, User>(endpoints::auth::ME, &req).await
      })
      .invalidates(|_: &User, _: &UpdateProfileRequest| vec![keys::auth::profile()])
  }

  pub fn upload_avatar(&self) -> Mutation<AvatarUpload, User> {
    self
      .mutation(|api: ApiClient, upload: AvatarUpload| async move {
        let field = MultipartField::File {
          name: "avatar".to_string(),
          file_name: upload.file_name,
          content_type: Some(upload.content_type),
          bytes: upload.bytes,
        };
        api.upload::<User>(endpoints::auth::AVATAR, vec![field]).await
      })
      .invalidates(|_: &User, _: &AvatarUpload| vec![keys::auth::profile()])
  }
}

#[cfg(test)]
mod tests {
  use super::super::test_support::*;
  use super::*;
  use crate::api::{HttpTransport, MemoryTokenStore, RequestBody, Transport};
  use crate::cache::QueryStatus;
  use crate::testing::{serve_once, MockTransport};
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn user_json(name: &str) -> serde_json::Value {
    json!({"id": "u1", "name": name, "email": "ana@example.com", "role": "customer"})
  }

  #[tokio::test]
  async fn test_profile_disabled_without_token() {
    let mock = MockTransport::new();
    let market = client(&mock);

    let mut profile = market.profile();
    assert!(!profile.fetch());
    settle().await;

    assert_eq!(profile.status(), QueryStatus::Idle);
    assert!(mock.calls().is_empty());
  }

  #[tokio::test]
  async fn test_login_persists_token_then_invalidates_profile() {
    let mock = MockTransport::new();
    let tokens = Arc::new(MemoryTokenStore::new());
    let market = client_with_token(&mock, tokens.clone());
    market
      .cache()
      .set_query_data(&keys::auth::profile(), "old profile".to_string());
    mock.respond(
      "POST",
      endpoints::auth::LOGIN,
      json!({"token": "fresh-token", "user": user_json("Ana")}),
    );

    let login = market.login();
    let resp = login
      .mutate(LoginRequest {
        email: "ana@example.com".to_string(),
        password: "secret".to_string(),
      })
      .await
      .unwrap();

    assert_eq!(resp.user.name, "Ana");
    assert_eq!(tokens.get().unwrap().as_deref(), Some("fresh-token"));
    assert_eq!(market.cache().status(&keys::auth::profile()), QueryStatus::Stale);
    assert!(!mock.calls()[0].require_auth);
  }

  #[tokio::test]
  async fn test_profile_built_before_login_loads_after_it() {
    let mock = MockTransport::new();
    let tokens = Arc::new(MemoryTokenStore::new());
    let market = client_with_token(&mock, tokens.clone());
    mock.respond(
      "POST",
      endpoints::auth::LOGIN,
      json!({"token": "fresh-token", "user": user_json("Ana")}),
    );
    mock.respond("GET", endpoints::auth::ME, user_json("Ana"));

    let mut profile = market.profile();
    assert!(!profile.fetch());

    market
      .login()
      .mutate(LoginRequest {
        email: "ana@example.com".to_string(),
        password: "secret".to_string(),
      })
      .await
      .unwrap();
    settle().await;

    let user = profile.resolve().await.unwrap().unwrap();
    assert_eq!(user.name, "Ana");
    assert_eq!(profile.status(), QueryStatus::Fresh);
    assert_eq!(mock.call_count("GET", endpoints::auth::ME), 1);
  }

  #[tokio::test]
  async fn test_profile_goes_idle_after_logout() {
    let mock = MockTransport::new();
    let tokens = Arc::new(MemoryTokenStore::with_token("t0k"));
    let market = client_with_token(&mock, tokens.clone());
    mock.respond("GET", endpoints::auth::ME, user_json("Ana"));
    mock.respond("POST", endpoints::auth::LOGOUT, serde_json::Value::Null);

    let mut profile = market.profile();
    profile.resolve().await.unwrap();
    assert_eq!(profile.status(), QueryStatus::Fresh);

    market.logout().mutate(()).await.unwrap();
    settle().await;

    assert_eq!(profile.status(), QueryStatus::Idle);
    assert!(!profile.fetch());
    assert_eq!(mock.call_count("GET", endpoints::auth::ME), 1);
  }

  #[tokio::test]
  async fn test_refresh_session_rotates_token() {
    let mock = MockTransport::new();
    let tokens = Arc::new(MemoryTokenStore::with_token("old-token"));
    let market = client_with_token(&mock, tokens.clone());
    mock.respond(
      "POST",
      endpoints::auth::REFRESH,
      json!({"token": "new-token", "user": user_json("Ana")}),
    );

    market
      .refresh_session()
      .mutate("refresh-1".to_string())
      .await
      .unwrap();

    assert_eq!(tokens.get().unwrap().as_deref(), Some("new-token"));
    let call = &mock.calls()[0];
    assert!(!call.require_auth);
    assert!(matches!(&call.body, RequestBody::Json(body) if body["refreshToken"] == "refresh-1"));

    // The next authenticated request carries the rotated token
    let (base, request_rx) = serve_once("200 OK", r#"{"id":"u1"}"#).await;
    let http = HttpTransport::new(&base, Duration::from_secs(5), "marketq-test", tokens.clone()).unwrap();
    http
      .call(ApiRequest::get(endpoints::auth::ME).authenticated())
      .await
      .unwrap();
    let raw = request_rx.await.unwrap().to_ascii_lowercase();
    assert!(raw.contains("authorization: bearer new-token"));
    assert!(!raw.contains("old-token"));
  }

  #[tokio::test]
  async fn test_failed_login_keeps_state() {
    let mock = MockTransport::new();
    let tokens = Arc::new(MemoryTokenStore::new());
    let market = client_with_token(&mock, tokens.clone());
    mock.fail(
      "POST",
      endpoints::auth::LOGIN,
      ApiError::from_response(401, br#"{"message":"Invalid credentials"}"#),
    );

    let err = market
      .login()
      .mutate(LoginRequest {
        email: "ana@example.com".to_string(),
        password: "wrong".to_string(),
      })
      .await
      .unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(err.is_unauthorized());
    assert_eq!(tokens.get().unwrap(), None);
  }

  #[tokio::test]
  async fn test_register_without_token_does_not_store() {
    let mock = MockTransport::new();
    let tokens = Arc::new(MemoryTokenStore::new());
    let market = client_with_token(&mock, tokens.clone());
    mock.respond("POST", endpoints::auth::REGISTER, json!({"user": user_json("Ana")}));

    market
      .register()
      .mutate(RegisterRequest {
        name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        password: "secret".to_string(),
        role: crate::api::types::UserRole::Customer,
        phone: None,
      })
      .await
      .unwrap();

    assert_eq!(tokens.get().unwrap(), None);
  }

  #[tokio::test]
  async fn test_logout_clears_token_and_cache() {
    let mock = MockTransport::new();
    let tokens = Arc::new(MemoryTokenStore::with_token("t0k"));
    let market = client_with_token(&mock, tokens.clone());
    market.cache().set_query_data(&keys::jobs::all(), 3u32);
    market.cache().set_query_data(&keys::payments::all(), 1u32);
    mock.respond("POST", endpoints::auth::LOGOUT, serde_json::Value::Null);

    market.logout().mutate(()).await.unwrap();

    assert_eq!(tokens.get().unwrap(), None);
    assert!(market.cache().is_empty());
    assert!(mock.calls()[0].require_auth);
  }

  #[tokio::test]
  async fn test_avatar_upload_is_multipart() {
    let mock = MockTransport::new();
    let market = client_with_token(&mock, Arc::new(MemoryTokenStore::with_token("t0k")));
    mock.respond("POST", endpoints::auth::AVATAR, user_json("Ana"));

    market
      .upload_avatar()
      .mutate(AvatarUpload {
        file_name: "me.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![1, 2, 3],
      })
      .await
      .unwrap();

    let calls = mock.calls();
    assert!(matches!(&calls[0].body, RequestBody::Multipart(fields) if fields.len() == 1));
  }
}
