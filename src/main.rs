//! IELTS Trainer Backend
//!
//! - Axum JSON API for writing/speaking practice, model feedback and a
//!   spaced-repetition vocabulary/idiom queue
//! - Optional OpenAI integration (via environment variables)
//! - Static SPA fallback (STATIC_DIR/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   OPENAI_API_KEY      : enables model-backed routes if present
//!   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
//!   OPENAI_MODEL        : default "gpt-4o-mini"
//!   OPENAI_TIMEOUT_SECS : default 60
//!   LLM_MAX_ATTEMPTS    : tries per call when the reply is malformed JSON (default 2)
//!   SUPABASE_URL        : auth platform base URL (with SUPABASE_ANON_KEY; one without
//!                         the other aborts startup)
//!   SUPABASE_ANON_KEY   : auth platform public key
//!   IELTS_CONFIG_PATH   : path to TOML config (prompts + optional task bank)
//!   STATIC_DIR          : default "./static"
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod auth;
mod config;
mod dates;
mod domain;
mod error;
mod fill_in;
mod logic;
mod openai;
mod prompts;
mod protocol;
mod routes;
mod seeds;
mod srs;
mod state;
mod store;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (datastore, OpenAI client, prompts, auth).
  let state = Arc::new(AppState::from_env().await?);

  let app = build_router(state);

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "ielts_backend", %addr, today = %dates::today(), "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "ielts_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(target: "ielts_backend", error = %e, "Failed to listen for Ctrl-C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut s) => {
        s.recv().await;
      }
      Err(e) => {
        tracing::error!(target: "ielts_backend", error = %e, "Failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  info!(target: "ielts_backend", "Shutdown signal received");
}
