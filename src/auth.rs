//! Learner identification. Sessions belong to the hosted auth platform; we
//! only read the access token from the request and ask the platform whose it is.
//!
//! Env:
//!   SUPABASE_URL, SUPABASE_ANON_KEY : verify tokens against `{url}/auth/v1/user`.
//!   With neither set we run in development mode and the token is the learner
//!   id. Setting only one of them is a startup error.

use std::{sync::Arc, time::Duration};

use axum::{
  async_trait,
  extract::FromRequestParts,
  http::{header, request::Parts, HeaderMap},
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sb-access-token";

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("missing access token")]
  MissingToken,
  #[error("access token rejected")]
  InvalidToken,
  #[error("auth platform unreachable: {0}")]
  Upstream(#[from] reqwest::Error),
  #[error("SUPABASE_URL and SUPABASE_ANON_KEY must be set together")]
  PartialConfig,
  #[error("failed to build auth HTTP client: {0}")]
  ClientBuild(reqwest::Error),
}

#[derive(Clone)]
pub enum AuthVerifier {
  Supabase { client: reqwest::Client, url: String, anon_key: String },
  Development,
}

#[derive(Deserialize)]
struct AuthUser {
  id: String,
}

impl AuthVerifier {
  pub fn from_env() -> Result<Self, AuthError> {
    Self::from_settings(std::env::var("SUPABASE_URL").ok(), std::env::var("SUPABASE_ANON_KEY").ok())
  }

  /// Development mode only when neither setting is present; a configured
  /// platform never degrades to it.
  pub fn from_settings(url: Option<String>, anon_key: Option<String>) -> Result<Self, AuthError> {
    let url = url.map(|u| u.trim().trim_end_matches('/').to_string()).filter(|u| !u.is_empty());
    let anon_key = anon_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
    match (url, anon_key) {
      (None, None) => Ok(AuthVerifier::Development),
      (Some(url), Some(anon_key)) => {
        let client = reqwest::Client::builder()
          .timeout(Duration::from_secs(10))
          .build()
          .map_err(AuthError::ClientBuild)?;
        Ok(AuthVerifier::Supabase { client, url, anon_key })
      }
      _ => Err(AuthError::PartialConfig),
    }
  }

  pub fn is_development(&self) -> bool {
    matches!(self, AuthVerifier::Development)
  }

  /// Resolve an access token to the learner id.
  #[instrument(level = "debug", skip(self, token), fields(token_len = token.len()))]
  pub async fn verify(&self, token: &str) -> Result<String, AuthError> {
    match self {
      AuthVerifier::Development => Ok(token.to_string()),
      AuthVerifier::Supabase { client, url, anon_key } => {
        let res = client
          .get(format!("{url}/auth/v1/user"))
          .header("apikey", anon_key)
          .header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
          .send()
          .await?;
        if !res.status().is_success() {
          debug!(status = %res.status(), "Auth platform rejected token");
          return Err(AuthError::InvalidToken);
        }
        let user: AuthUser = res.json().await?;
        Ok(user.id)
      }
    }
  }
}

/// Bearer token from `Authorization`, else the session cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
  if let Some(v) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
    if let Some(t) = v.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty()) {
      return Some(t.to_string());
    }
  }
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
    .map(|(_, value)| value.to_string())
}

/// Authenticated caller.
#[derive(Clone, Debug)]
pub struct Learner {
  pub id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Learner {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
    let token = access_token(&parts.headers).ok_or(AuthError::MissingToken)?;
    match state.auth.verify(&token).await {
      Ok(id) => Ok(Learner { id }),
      Err(e) => {
        warn!(target: "ielts_backend", error = %e, path = %parts.uri.path(), "Authentication failed");
        Err(e.into())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  #[test]
  fn bearer_header_wins_over_cookie() {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-1"));
    h.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=tok-2"));
    assert_eq!(access_token(&h).as_deref(), Some("tok-1"));
  }

  #[test]
  fn reads_session_cookie_among_others() {
    let mut h = HeaderMap::new();
    h.insert(header::COOKIE, HeaderValue::from_static("theme=dark; sb-access-token=abc123; lang=en"));
    assert_eq!(access_token(&h).as_deref(), Some("abc123"));
  }

  #[test]
  fn missing_or_empty_token_is_none() {
    let mut h = HeaderMap::new();
    assert_eq!(access_token(&h), None);
    h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
    h.insert(header::COOKIE, HeaderValue::from_static("sb-access-token="));
    assert_eq!(access_token(&h), None);
  }

  #[test]
  fn configured_platform_never_falls_back_to_development() {
    let v = AuthVerifier::from_settings(Some("https://auth.example.com/".into()), Some("anon".into())).unwrap();
    match v {
      AuthVerifier::Supabase { url, anon_key, .. } => {
        assert_eq!(url, "https://auth.example.com");
        assert_eq!(anon_key, "anon");
      }
      AuthVerifier::Development => panic!("configured credentials must not enable development auth"),
    }
  }

  #[test]
  fn half_configured_platform_is_rejected() {
    assert!(matches!(
      AuthVerifier::from_settings(Some("https://auth.example.com".into()), None),
      Err(AuthError::PartialConfig)
    ));
    assert!(matches!(
      AuthVerifier::from_settings(Some("  ".into()), Some("anon".into())),
      Err(AuthError::PartialConfig)
    ));
    assert!(AuthVerifier::from_settings(None, None).unwrap().is_development());
  }

  #[tokio::test]
  async fn development_mode_uses_token_as_id() {
    let v = AuthVerifier::Development;
    assert_eq!(v.verify("learner-42").await.unwrap(), "learner-42");
  }
}
