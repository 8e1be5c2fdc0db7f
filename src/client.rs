//! Typed client for the coaching API
//!
//! Used by the sync poll loop and the lead board. It can talk to the
//! backend directly (identity headers) or to the gateway (session cookie);
//! both expose the same paths, the gateway under `/api`.

use crate::error::{AppError, AppResult};
use crate::http_config::HttpConfig;
use crate::models::{CalendarEvent, Lead, LeadStatus, ListEnvelope, Meeting, SyncTask, TaskStatus};
use crate::session::{SESSION_COOKIE, USER_EMAIL_HEADER};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoachApi: Send + Sync {
    async fn trigger_external_meetings(&self) -> AppResult<SyncTask>;

    async fn task_status(&self, task_id: &str) -> AppResult<TaskStatus>;

    async fn list_meetings(&self) -> AppResult<Vec<Meeting>>;

    async fn list_calendar_events(&self) -> AppResult<Vec<CalendarEvent>>;

    /// Returns the updated lead when the backend echoes one back.
    async fn update_lead_status(&self, lead_id: &str, status: &LeadStatus) -> AppResult<Option<Lead>>;
}

#[derive(Debug, Clone)]
pub enum ApiAuth {
    /// Backend mode: `x-user-email` and `Authorization: Bearer <email>`.
    Email(String),
    /// Gateway mode: the signed `session` cookie.
    SessionCookie(String),
}

#[derive(Debug, Clone)]
pub struct HttpCoachApi {
    client: Client,
    base_url: String,
    prefix: &'static str,
    auth: ApiAuth,
}

impl HttpCoachApi {
    pub fn backend(base_url: impl Into<String>, email: impl Into<String>) -> AppResult<Self> {
        Ok(Self::with_client(
            HttpConfig::sync_poll().build_client()?,
            base_url.into(),
            "",
            ApiAuth::Email(email.into()),
        ))
    }

    pub fn gateway(base_url: impl Into<String>, session_token: impl Into<String>) -> AppResult<Self> {
        Ok(Self::with_client(
            HttpConfig::sync_poll().build_client()?,
            base_url.into(),
            "/api",
            ApiAuth::SessionCookie(session_token.into()),
        ))
    }

    pub fn with_client(client: Client, base_url: String, prefix: &'static str, auth: ApiAuth) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            prefix,
            auth,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}{}", self.base_url, self.prefix, path);
        let builder = self.client.request(method, url);

        match &self.auth {
            ApiAuth::Email(email) => builder
                .header(USER_EMAIL_HEADER, email.as_str())
                .header(AUTHORIZATION, format!("Bearer {}", email)),
            ApiAuth::SessionCookie(token) => {
                builder.header(COOKIE, format!("{}={}", SESSION_COOKIE, token))
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        // 204s and empty bodies read as JSON null
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| AppError::invalid_backend_response(e.to_string()))
    }
}

#[async_trait]
impl CoachApi for HttpCoachApi {
    async fn trigger_external_meetings(&self) -> AppResult<SyncTask> {
        let builder = self.request(Method::POST, "/sync/external-meetings").json(&json!({}));
        let task: SyncTask = self.send_json(builder).await?;
        log::info!("[Sync] started task {}", task.task_id);
        Ok(task)
    }

    async fn task_status(&self, task_id: &str) -> AppResult<TaskStatus> {
        let path = format!("/sync/status/{}", urlencoding::encode(task_id));
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn list_meetings(&self) -> AppResult<Vec<Meeting>> {
        let envelope: ListEnvelope<Meeting> = self.send_json(self.request(Method::GET, "/meetings")).await?;
        Ok(envelope.into_items("meetings")?)
    }

    async fn list_calendar_events(&self) -> AppResult<Vec<CalendarEvent>> {
        let envelope: ListEnvelope<CalendarEvent> =
            self.send_json(self.request(Method::GET, "/calendar/events")).await?;
        Ok(envelope.into_items("events")?)
    }

    async fn update_lead_status(&self, lead_id: &str, status: &LeadStatus) -> AppResult<Option<Lead>> {
        let path = format!("/leads/{}/status", urlencoding::encode(lead_id));
        let builder = self
            .request(Method::PATCH, &path)
            .json(&json!({ "status": status.as_str() }));
        let body: Value = self.send_json(builder).await?;
        Ok(serde_json::from_value(body).ok())
    }
}
