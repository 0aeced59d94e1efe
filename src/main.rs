//! Kurso · 30-Day Programming Language Trainer Backend
//!
//! - Axum HTTP API under /api/v1
//! - GigaChat generation (material, quizzes, grading, summaries)
//! - SQLite persistence for learners, training days and course summaries
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   GIGACHAT_API_KEY    : mandatory; the server refuses to start without it
//!   GIGACHAT_BASE_URL   : default "https://gigachat.devices.sberbank.ru/api/v1"
//!   GIGACHAT_MODEL      : default "GigaChat-Max"
//!   DATABASE_PATH    : SQLite file path (default "./kurso.db")
//!   TRAINER_CONFIG_PATH : optional TOML with generation/retry overrides
//!   LOG_LEVEL    : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT      : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod error;
mod prompts;
mod gigachat;
mod retry;
mod postprocess;
mod orchestrator;
mod db;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::Settings;
use crate::db::TrainingDb;
use crate::gigachat::GigaChat;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Credential and overrides first: a missing key should fail fast.
  let settings = Settings::from_env()?;

  // Open (and migrate) the SQLite store, build the GigaChat client.
  let db = TrainingDb::new(&settings.database_path).await?;
  let client = GigaChat::new(&settings.gigachat, settings.credential.clone())?;

  // Build shared application state (database handle, orchestrator).
  let state = Arc::new(AppState::new(&settings, db, client));

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "kurso_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
