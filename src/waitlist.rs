//! Public waitlist signup
//!
//! The only route that takes input without a session, so it validates the
//! payload before anything reaches the backend.

use crate::error::{AppError, AppResult};
use crate::proxy::{self, RelayMode};
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern");
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9][0-9\s().-]{6,19}$").expect("phone pattern");
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WaitlistEntry {
    /// Trims every field, lowercases the email and drops empty optionals.
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            email: self.email.trim().to_lowercase(),
            phone: clean(self.phone),
            name: clean(self.name),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if !is_valid_email(&self.email) {
            return Err(AppError::invalid_input("Invalid email"));
        }
        if let Some(phone) = &self.phone {
            if !is_valid_phone(phone) {
                return Err(AppError::invalid_input("Invalid phone"));
            }
        }
        Ok(())
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub async fn join(State(state): State<AppState>, body: Bytes) -> AppResult<Response> {
    let entry: WaitlistEntry =
        serde_json::from_slice(&body).map_err(|_| AppError::invalid_input("Invalid JSON"))?;
    let entry = entry.normalized();
    entry.validate()?;

    let response = proxy::send_with_fallback(&state, |base| {
        state
            .http
            .post(proxy::backend_url(base, "/waitlist", None))
            .json(&entry)
    })
    .await?;

    if !response.status().is_success() {
        return proxy::relay(response, RelayMode::Json).await;
    }

    log::info!("Waitlist signup accepted for {}", crate::utils::mask_email(&entry.email));
    Ok(Json(json!({ "ok": true })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(email: &str, phone: Option<&str>) -> WaitlistEntry {
        WaitlistEntry {
            email: email.to_string(),
            phone: phone.map(str::to_string),
            name: None,
        }
        .normalized()
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last+tag@gym.co.uk"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_phone_validation() {
        assert!(is_valid_phone("555-1234567"));
        assert!(is_valid_phone("+1 (555) 123-4567"));
        assert!(!is_valid_phone("12345"));
        assert!(!is_valid_phone("call me maybe"));
    }

    #[test]
    fn test_entry_validation_messages() {
        let err = entry("not-an-email", None).validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid email");

        let err = entry("a@b.com", Some("abc")).validate().unwrap_err();
        assert_eq!(err.to_string(), "Invalid phone");

        assert!(entry(" A@B.com ", Some("  ")).validate().is_ok());
    }

    #[test]
    fn test_normalization() {
        let e = entry(" Coach@Gym.COM ", Some(" 555-1234567 "));
        assert_eq!(e.email, "coach@gym.com");
        assert_eq!(e.phone.as_deref(), Some("555-1234567"));
    }
}
