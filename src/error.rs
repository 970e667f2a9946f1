//! API error categories and their JSON envelope.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::dates::DateError;
use crate::openai::LlmError;
use crate::protocol::Envelope;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("authentication required")]
  Unauthorized,
  #[error("{0}")]
  Validation(String),
  #[error("{0} not found")]
  NotFound(&'static str),
  /// The model call failed or broke its response contract; safe to retry.
  #[error("feedback service unavailable, please try again")]
  Llm(#[from] LlmError),
  #[error("internal error")]
  Internal(String),
}

impl ApiError {
  pub fn code(&self) -> &'static str {
    match self {
      ApiError::Unauthorized => "UNAUTHORIZED",
      ApiError::Validation(_) => "VALIDATION_ERROR",
      ApiError::NotFound(_) => "NOT_FOUND",
      ApiError::Llm(_) => "LLM_ERROR",
      ApiError::Internal(_) => "INTERNAL",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Llm(_) => StatusCode::BAD_GATEWAY,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<AuthError> for ApiError {
  fn from(e: AuthError) -> Self {
    match e {
      AuthError::MissingToken | AuthError::InvalidToken => ApiError::Unauthorized,
      AuthError::Upstream(e) => ApiError::Internal(format!("auth platform: {e}")),
      e @ (AuthError::PartialConfig | AuthError::ClientBuild(_)) => ApiError::Internal(e.to_string()),
    }
  }
}

impl From<DateError> for ApiError {
  fn from(e: DateError) -> Self {
    ApiError::Validation(e.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match &self {
      ApiError::Llm(e) => error!(target: "ielts_backend", error = %e, "LLM call failed"),
      ApiError::Internal(detail) => error!(target: "ielts_backend", %detail, "Internal error"),
      _ => {}
    }
    (self.status(), Json(Envelope::<()>::err(self.code(), self.to_string()))).into_response()
  }
}
