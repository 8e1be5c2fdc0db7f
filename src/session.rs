//! Session cookies
//!
//! The gateway issues its own `session` cookie: an HS256 JWT carrying the
//! coach's email, valid for seven days. Older clients still send the same
//! token under the `user` cookie name. NextAuth session tokens are accepted
//! only when they verify against `NEXTAUTH_SECRET`; the email comes from
//! their claims and the token is forwarded to the backend as-is.

use crate::error::AppResult;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "session";
pub const LEGACY_USER_COOKIE: &str = "user";
pub const NEXTAUTH_COOKIES: [&str; 2] = ["next-auth.session-token", "__Secure-next-auth.session-token"];
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// Seven days.
pub const SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new<S: Into<String>>(email: S, name: Option<String>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            email: email.into(),
            name,
            iat: now,
            exp: now + SESSION_TTL_SECS,
        }
    }
}

/// The part of a NextAuth session JWT the gateway reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextAuthClaims {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    /// Unset means NextAuth cookies are never a session.
    nextauth: Option<DecodingKey>,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            nextauth: None,
        }
    }

    pub fn with_nextauth_secret(mut self, secret: &str) -> Self {
        self.nextauth = Some(DecodingKey::from_secret(secret.as_bytes()));
        self
    }

    pub fn encrypt(&self, claims: &SessionClaims) -> AppResult<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    /// Returns `None` for any token that is malformed, expired, or signed
    /// with another secret.
    pub fn decrypt(&self, token: &str) -> Option<SessionClaims> {
        match decode::<SessionClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                log::debug!("Rejected session token: {}", e);
                None
            }
        }
    }

    /// Verifies a NextAuth session JWT. `None` when no NextAuth secret is
    /// configured or the token does not verify.
    pub fn verify_nextauth(&self, token: &str) -> Option<NextAuthClaims> {
        let key = self.nextauth.as_ref()?;
        match decode::<NextAuthClaims>(token, key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                log::debug!("Rejected NextAuth token: {}", e);
                None
            }
        }
    }
}

/// Where the caller's identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    Session,
    LegacyUser,
    NextAuth,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub email: String,
    pub name: Option<String>,
    pub source: SessionSource,
    /// Token to hand the backend in `x-session-token`.
    pub token: String,
}

/// Identity behind the request's cookies. Every value of a cookie name is
/// tried, so a stale duplicate cannot hide a valid one.
pub fn resolve_session(headers: &HeaderMap, keys: &SessionKeys) -> Option<Identity> {
    for (cookie, source) in [
        (SESSION_COOKIE, SessionSource::Session),
        (LEGACY_USER_COOKIE, SessionSource::LegacyUser),
    ] {
        for token in cookie_values(headers, cookie) {
            if let Some(claims) = keys.decrypt(&token) {
                return Some(Identity {
                    email: claims.email,
                    name: claims.name,
                    source,
                    token,
                });
            }
        }
    }

    for cookie in NEXTAUTH_COOKIES {
        for token in cookie_values(headers, cookie) {
            if let Some(claims) = keys.verify_nextauth(&token) {
                return Some(Identity {
                    email: claims.email,
                    name: claims.name,
                    source: SessionSource::NextAuth,
                    token,
                });
            }
        }
    }

    None
}

/// Every non-empty value of the named cookie, in header order. Values
/// wrapped in one pair of double quotes are unquoted.
pub fn cookie_values(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| key.trim() == name)
        .map(|(_, value)| {
            let value = value.trim();
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value)
                .to_string()
        })
        .filter(|value| !value.is_empty())
        .collect()
}

/// First value of the named cookie.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    cookie_values(headers, name).into_iter().next()
}

/// Attributes shared by set and clear so the browser matches them up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    fn attributes(&self, max_age: i64) -> String {
        let mut attrs = format!("Path=/; Max-Age={}; HttpOnly; SameSite=Lax", max_age);
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs
    }

    pub fn session_cookie(&self, name: &str, token: &str) -> String {
        format!("{}={}; {}", name, token, self.attributes(SESSION_TTL_SECS))
    }

    pub fn clear_cookie(&self, name: &str) -> String {
        format!("{}=; {}", name, self.attributes(0))
    }
}

/// Appends one `Set-Cookie` header per cookie string.
pub fn append_set_cookies<I>(headers: &mut HeaderMap, cookies: I)
where
    I: IntoIterator<Item = String>,
{
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                headers.append(SET_COOKIE, value);
            }
            Err(e) => log::warn!("Dropping unencodable cookie: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_round_trip_claims() {
        let keys = SessionKeys::new("test-secret-with-enough-length-000");
        let claims = SessionClaims::new("coach@gym.com", Some("Coach".to_string()));
        let token = keys.encrypt(&claims).unwrap();

        assert_eq!(keys.decrypt(&token), Some(claims));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = SessionKeys::new("secret-a");
        let verifier = SessionKeys::new("secret-b");
        let token = issuer.encrypt(&SessionClaims::new("coach@gym.com", None)).unwrap();

        assert!(verifier.decrypt(&token).is_none());
    }

    #[test]
    fn test_expired_and_garbage_tokens_are_rejected() {
        let keys = SessionKeys::new("secret");
        let mut claims = SessionClaims::new("coach@gym.com", None);
        claims.iat -= 2 * SESSION_TTL_SECS;
        claims.exp = Utc::now().timestamp() - 10;
        let token = keys.encrypt(&claims).unwrap();

        assert!(keys.decrypt(&token).is_none());
        assert!(keys.decrypt("not-a-jwt").is_none());
        assert!(keys.decrypt("").is_none());
    }

    #[test]
    fn test_cookie_value_parsing() {
        let headers = headers_with_cookie("theme=dark; session=abc.def.ghi; other=1");
        assert_eq!(cookie_value(&headers, "session").as_deref(), Some("abc.def.ghi"));
        assert_eq!(cookie_value(&headers, "missing"), None);

        let headers = headers_with_cookie("session=");
        assert_eq!(cookie_value(&headers, "session"), None);
    }

    #[test]
    fn test_resolve_prefers_session_then_legacy() {
        let keys = SessionKeys::new("secret");
        let a = keys.encrypt(&SessionClaims::new("a@gym.com", None)).unwrap();
        let b = keys.encrypt(&SessionClaims::new("b@gym.com", None)).unwrap();

        let headers = headers_with_cookie(&format!("user={}; session={}", b, a));
        let identity = resolve_session(&headers, &keys).unwrap();
        assert_eq!(identity.email, "a@gym.com");
        assert_eq!(identity.source, SessionSource::Session);

        let headers = headers_with_cookie(&format!("session=bogus; user={}", b));
        let identity = resolve_session(&headers, &keys).unwrap();
        assert_eq!(identity.email, "b@gym.com");
        assert_eq!(identity.source, SessionSource::LegacyUser);
    }

    fn nextauth_token(secret: &str, email: &str) -> String {
        let claims = NextAuthClaims {
            email: email.to_string(),
            name: Some("Coach".to_string()),
            exp: Utc::now().timestamp() + 3600,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .unwrap()
    }

    #[test]
    fn test_nextauth_identity_comes_from_verified_claims() {
        let keys = SessionKeys::new("secret").with_nextauth_secret("nextauth-secret");
        let token = nextauth_token("nextauth-secret", "coach@gym.com");

        let mut headers = headers_with_cookie(&format!("next-auth.session-token={}", token));
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("someone-else@gym.com"));

        let identity = resolve_session(&headers, &keys).unwrap();
        assert_eq!(identity.source, SessionSource::NextAuth);
        assert_eq!(identity.email, "coach@gym.com");
        assert_eq!(identity.name.as_deref(), Some("Coach"));
        assert_eq!(identity.token, token);
    }

    #[test]
    fn test_unverified_nextauth_cookie_is_not_a_session() {
        let keys = SessionKeys::new("secret").with_nextauth_secret("nextauth-secret");

        let mut headers = headers_with_cookie("next-auth.session-token=opaque-token");
        headers.insert(USER_EMAIL_HEADER, HeaderValue::from_static("victim@gym.com"));
        assert!(resolve_session(&headers, &keys).is_none());

        let forged = nextauth_token("guessed-secret", "victim@gym.com");
        let headers = headers_with_cookie(&format!("__Secure-next-auth.session-token={}", forged));
        assert!(resolve_session(&headers, &keys).is_none());
    }

    #[test]
    fn test_nextauth_ignored_without_secret() {
        let keys = SessionKeys::new("secret");
        let token = nextauth_token("nextauth-secret", "coach@gym.com");
        let headers = headers_with_cookie(&format!("next-auth.session-token={}", token));

        assert!(keys.verify_nextauth(&token).is_none());
        assert!(resolve_session(&headers, &keys).is_none());
    }

    #[test]
    fn test_duplicate_and_quoted_cookies() {
        let keys = SessionKeys::new("secret");
        let token = keys.encrypt(&SessionClaims::new("coach@gym.com", None)).unwrap();

        let headers = headers_with_cookie(&format!("session=stale; session=\"{}\"", token));
        assert_eq!(cookie_values(&headers, "session"), vec!["stale".to_string(), token.clone()]);

        let identity = resolve_session(&headers, &keys).unwrap();
        assert_eq!(identity.email, "coach@gym.com");
        assert_eq!(identity.token, token);
    }

    #[test]
    fn test_set_and_clear_attributes_match() {
        let policy = CookiePolicy { secure: true };
        let set = policy.session_cookie(SESSION_COOKIE, "tok");
        let clear = policy.clear_cookie(SESSION_COOKIE);

        assert!(set.starts_with("session=tok;"));
        assert!(set.contains("Max-Age=604800"));
        assert!(clear.starts_with("session=;"));
        assert!(clear.contains("Max-Age=0"));
        for attr in ["Path=/", "HttpOnly", "SameSite=Lax", "Secure"] {
            assert!(set.contains(attr) && clear.contains(attr), "{} mismatch", attr);
        }

        let insecure = CookiePolicy { secure: false }.clear_cookie(LEGACY_USER_COOKIE);
        assert!(!insecure.contains("Secure"));
    }
}
