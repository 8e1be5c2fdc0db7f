// Login, logout and session lookup for the custom `session` cookie.

use crate::error::{AppError, AppResult};
use crate::proxy::{self, RelayMode};
use crate::session::{
    append_set_cookies, resolve_session, SessionClaims, LEGACY_USER_COOKIE, SESSION_COOKIE,
};
use crate::utils::logging;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(State(state): State<AppState>, body: Bytes) -> AppResult<Response> {
    let request: LoginRequest =
        serde_json::from_slice(&body).map_err(|_| AppError::invalid_input("Invalid JSON"))?;

    let email = request.email.trim();
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::invalid_input("Email and password are required"));
    }

    let payload = json!({ "email": email, "password": request.password });
    let response = proxy::send_with_fallback(&state, |base| {
        state
            .http
            .post(proxy::backend_url(base, "/auth/login", None))
            .json(&payload)
    })
    .await?;

    if !response.status().is_success() {
        logging::log_auth_event("Login rejected", email);
        return proxy::relay(response, RelayMode::Json).await;
    }

    let user: Value = response
        .json()
        .await
        .map_err(|e| AppError::invalid_backend_response(e.to_string()))?;

    let claims = SessionClaims::new(
        user_field(&user, "email").unwrap_or_else(|| email.to_string()),
        user_field(&user, "name"),
    );
    let token = state.keys.encrypt(&claims)?;

    let mut headers = HeaderMap::new();
    append_set_cookies(
        &mut headers,
        [state.cookie_policy().session_cookie(SESSION_COOKIE, &token)],
    );

    logging::log_auth_event("Login", &claims.email);
    Ok((
        headers,
        Json(json!({
            "ok": true,
            "user": { "email": claims.email, "name": claims.name },
        })),
    )
        .into_response())
}

/// Reads `field` from either the top level or a nested `user` object.
fn user_field(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .or_else(|| body.get("user").and_then(|u| u.get(field)))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(identity) = resolve_session(&headers, &state.keys) {
        logging::log_auth_event("Logout", &identity.email);
    }

    let policy = state.cookie_policy();
    let mut out = HeaderMap::new();
    append_set_cookies(
        &mut out,
        [
            policy.clear_cookie(SESSION_COOKIE),
            policy.clear_cookie(LEGACY_USER_COOKIE),
        ],
    );

    (out, Json(json!({ "ok": true }))).into_response()
}

pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Value>> {
    let identity = resolve_session(&headers, &state.keys)
        .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;

    Ok(Json(json!({
        "user": { "email": identity.email, "name": identity.name },
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_field_lookup() {
        let flat = json!({ "email": "a@gym.com", "name": "A" });
        assert_eq!(user_field(&flat, "email").as_deref(), Some("a@gym.com"));

        let nested = json!({ "user": { "email": "b@gym.com" } });
        assert_eq!(user_field(&nested, "email").as_deref(), Some("b@gym.com"));
        assert_eq!(user_field(&nested, "name"), None);
    }
}
