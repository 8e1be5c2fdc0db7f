//! Authenticated proxy
//!
//! Forwards a browser request to the backend and relays the answer. The
//! backend sees the caller's cookies plus `x-user-email`,
//! `Authorization: Bearer <email>` and `x-session-token`; the browser sees
//! the backend's status, body and content type.

use crate::error::{AppError, AppResult};
use crate::session::{Identity, SESSION_TOKEN_HEADER, USER_EMAIL_HEADER};
use crate::utils::{logging, truncate_detail};
use crate::AppState;
use axum::body::Bytes;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::RequestBuilder;
use serde_json::json;
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

static FORWARDED_REQUEST_HEADERS: [HeaderName; 4] = [
    header::COOKIE,
    header::CONTENT_TYPE,
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
];

static RELAYED_RESPONSE_HEADERS: [HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_DISPOSITION,
    header::CACHE_CONTROL,
    header::LOCATION,
];

const MAX_DETAIL_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Body must be JSON (or empty); anything else on success is a 500.
    Json,
    /// Body is relayed untouched, e.g. CSV exports.
    Raw,
}

pub struct ProxyRequest<'a> {
    pub method: Method,
    /// Backend path, starting with `/`.
    pub path: String,
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    pub body: Bytes,
    pub identity: Option<&'a Identity>,
    pub mode: RelayMode,
}

pub fn backend_url(base: &str, path: &str, query: Option<&str>) -> String {
    let mut url = format!("{}{}", base.trim_end_matches('/'), path);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }
    url
}

pub fn forwarded_headers(inbound: &HeaderMap, identity: Option<&Identity>) -> HeaderMap {
    let mut out = HeaderMap::new();

    for name in FORWARDED_REQUEST_HEADERS.iter() {
        for value in inbound.get_all(name) {
            out.append(name.clone(), value.clone());
        }
    }

    let request_id = inbound
        .get(REQUEST_ID_HEADER)
        .cloned()
        .or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).ok());
    if let Some(request_id) = request_id {
        out.insert(REQUEST_ID_HEADER, request_id);
    }

    if let Some(identity) = identity {
        if let Ok(email) = HeaderValue::from_str(&identity.email) {
            out.insert(USER_EMAIL_HEADER, email);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", identity.email)) {
            out.insert(header::AUTHORIZATION, bearer);
        }
        if let Ok(token) = HeaderValue::from_str(&identity.token) {
            out.insert(SESSION_TOKEN_HEADER, token);
        }
    }

    out
}

/// Sends the request built for the primary base URL; if that host refuses
/// the connection, rebuilds it once for the fallback host.
pub async fn send_with_fallback<F>(state: &AppState, build: F) -> AppResult<reqwest::Response>
where
    F: Fn(&str) -> RequestBuilder,
{
    let primary = state.config.backend_url.as_str();

    match build(primary).send().await {
        Ok(response) => Ok(response),
        Err(err) if err.is_connect() => match state.config.fallback_url.as_deref() {
            Some(fallback) if fallback != primary => {
                log::warn!("Backend {} refused connection, retrying via {}", primary, fallback);
                build(fallback).send().await.map_err(|e| unreachable_error(&e))
            }
            _ => Err(unreachable_error(&err)),
        },
        Err(err) => Err(unreachable_error(&err)),
    }
}

fn unreachable_error(err: &reqwest::Error) -> AppError {
    logging::log_network_error("Backend request", err);

    let detail = if err.is_timeout() {
        "Backend request timed out"
    } else if err.is_connect() {
        "Could not connect to backend"
    } else {
        "Backend request failed"
    };
    AppError::unreachable(detail)
}

/// Turns a backend response into a gateway response.
pub async fn relay(response: reqwest::Response, mode: RelayMode) -> AppResult<Response> {
    let status = response.status();

    let mut headers = HeaderMap::new();
    for name in RELAYED_RESPONSE_HEADERS.iter() {
        if let Some(value) = response.headers().get(name) {
            headers.insert(name.clone(), value.clone());
        }
    }

    let body = response.bytes().await.map_err(|e| unreachable_error(&e))?;

    if mode == RelayMode::Raw || body.is_empty() {
        return Ok((status, headers, body).into_response());
    }

    if serde_json::from_slice::<serde_json::Value>(&body).is_ok() {
        // Keep specific JSON types such as application/problem+json.
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        return Ok((status, headers, body).into_response());
    }

    let text = String::from_utf8_lossy(&body);
    if status.is_success() {
        log::warn!("Backend answered {} with a non-JSON body", status);
        return Err(AppError::invalid_backend_response(truncate_detail(&text, MAX_DETAIL_CHARS)));
    }

    // Error pages keep their status; only the body is wrapped.
    Ok((
        status,
        Json(json!({
            "error": "Backend error",
            "detail": truncate_detail(&text, MAX_DETAIL_CHARS),
        })),
    )
        .into_response())
}

pub async fn forward(state: &AppState, request: ProxyRequest<'_>) -> AppResult<Response> {
    let started = Instant::now();
    let headers = forwarded_headers(request.headers, request.identity);

    let result = send_with_fallback(state, |base| {
        state
            .http
            .request(request.method.clone(), backend_url(base, &request.path, request.query))
            .headers(headers.clone())
            .body(request.body.clone())
    })
    .await;

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            log::warn!("[Proxy] {} {} failed: {}", request.method, request.path, e);
            return Err(e);
        }
    };

    logging::log_proxy_call(
        request.method.as_str(),
        &request.path,
        response.status().as_u16(),
        started.elapsed().as_millis() as u64,
    );

    relay(response, request.mode).await
}
