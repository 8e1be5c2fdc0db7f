//! Route table
//!
//! Every `/api/*` route mirrors a backend endpoint 1:1. Only waitlist,
//! login, logout and health answer without a session.

use crate::error::{AppError, AppResult};
use crate::proxy::{self, ProxyRequest, RelayMode};
use crate::session::resolve_session;
use crate::{waitlist, AppState};
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub mod api;
pub mod auth;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Auth
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::session))
        // Public
        .route("/api/waitlist", post(waitlist::join))
        // Meetings and sync
        .route("/api/meetings", get(api::meetings))
        .route("/api/external-meetings", post(api::sync_external_meetings))
        .route("/api/sync/external-meetings", post(api::sync_external_meetings))
        .route("/api/sync/status/{task_id}", get(api::sync_status))
        // Calendar
        .route("/api/calendar/events", get(api::calendar_events))
        // Leads
        .route("/api/leads", get(api::leads).post(api::leads))
        .route("/api/leads/export", get(api::export_leads))
        .route(
            "/api/leads/{id}",
            get(api::lead).patch(api::lead).delete(api::lead),
        )
        .route("/api/leads/{id}/status", patch(api::lead_status))
        .route("/api/leads/{id}/notes", get(api::lead_notes).post(api::lead_notes))
        // Organizations
        .route("/api/orgs/{org_id}/admins", get(api::org_admins).post(api::org_admins))
        .route("/api/invites", get(api::invites).post(api::invites))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Requires a session, then forwards the request to `path` on the backend.
pub(crate) async fn authed_proxy(
    state: &AppState,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
    path: String,
    mode: RelayMode,
) -> AppResult<Response> {
    let identity = resolve_session(headers, &state.keys)
        .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;

    proxy::forward(
        state,
        ProxyRequest {
            method,
            path,
            query: uri.query(),
            headers,
            body,
            identity: Some(&identity),
            mode,
        },
    )
    .await
}

/// Percent-encodes one path segment taken from the inbound URL.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
