// Proxied dashboard endpoints. Each handler only names its backend path.

use super::{authed_proxy, segment};
use crate::error::AppResult;
use crate::proxy::RelayMode;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;

pub async fn meetings(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    authed_proxy(&state, method, &uri, &headers, body, "/meetings".to_string(), RelayMode::Json).await
}

/// Kicks off the Fireflies/Zoom import; the backend answers with a task id.
pub async fn sync_external_meetings(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    authed_proxy(
        &state,
        method,
        &uri,
        &headers,
        body,
        "/sync/external-meetings".to_string(),
        RelayMode::Json,
    )
    .await
}

pub async fn sync_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let path = format!("/sync/status/{}", segment(&task_id));
    authed_proxy(&state, method, &uri, &headers, body, path, RelayMode::Json).await
}

pub async fn calendar_events(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    authed_proxy(&state, method, &uri, &headers, body, "/calendar/events".to_string(), RelayMode::Json).await
}

pub async fn leads(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    authed_proxy(&state, method, &uri, &headers, body, "/leads".to_string(), RelayMode::Json).await
}

/// CSV download, relayed byte for byte.
pub async fn export_leads(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    authed_proxy(&state, method, &uri, &headers, body, "/leads/export".to_string(), RelayMode::Raw).await
}

pub async fn lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let path = format!("/leads/{}", segment(&id));
    authed_proxy(&state, method, &uri, &headers, body, path, RelayMode::Json).await
}

pub async fn lead_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let path = format!("/leads/{}/status", segment(&id));
    authed_proxy(&state, method, &uri, &headers, body, path, RelayMode::Json).await
}

pub async fn lead_notes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let path = format!("/leads/{}/notes", segment(&id));
    authed_proxy(&state, method, &uri, &headers, body, path, RelayMode::Json).await
}

pub async fn org_admins(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let path = format!("/orgs/{}/admins", segment(&org_id));
    authed_proxy(&state, method, &uri, &headers, body, path, RelayMode::Json).await
}

pub async fn invites(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    authed_proxy(&state, method, &uri, &headers, body, "/invites".to_string(), RelayMode::Json).await
}
