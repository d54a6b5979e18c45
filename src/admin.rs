//! Thin admin/health HTTP surface (spec.md §6: "purely-presentational
//! command surfaces" are out of scope as a *feature*, but the process
//! still needs a liveness endpoint for deployment, the one ambient
//! exception SPEC_FULL §1 carries over).
//!
//! Grounded in the teacher's `servers/http/routes/server.rs` idiom of a
//! small `Router` returning a `Json<...>` details struct, extended with
//! a match-count readout so an operator can see the registry is alive
//! without a full admin UI.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::config::VERSION;
use crate::state::AppState;

#[derive(Serialize)]
struct ServerDetails {
    ident: &'static str,
    version: &'static str,
    node: String,
}

#[derive(Serialize)]
struct RegistrySnapshot {
    live_sessions: usize,
    registered_game_servers: usize,
    live_matches: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(server_details))
        .route("/healthz", get(healthz))
        .route("/matches", get(match_snapshot))
        .with_state(state)
}

async fn server_details(State(state): State<Arc<AppState>>) -> Json<ServerDetails> {
    Json(ServerDetails {
        ident: "ECHELON_RELAY",
        version: VERSION,
        node: state.node.clone(),
    })
}

async fn healthz() -> &'static str {
    "ok"
}

async fn match_snapshot(State(state): State<Arc<AppState>>) -> Json<RegistrySnapshot> {
    Json(RegistrySnapshot {
        live_sessions: state.sessions.len(),
        registered_game_servers: state.game_servers.list().len(),
        live_matches: state.lobbies.list().len(),
    })
}
