// CoachSync gateway library
// Session-authenticated proxy in front of the coaching backend, plus the
// client side of the meeting sync and lead pipeline.

pub mod client;
pub mod config;
pub mod error;
pub mod http_config;
pub mod leads;
pub mod models;
pub mod proxy;
pub mod routes;
pub mod session;
pub mod sync;
pub mod utils;
pub mod waitlist;

// Re-export commonly used types
pub use client::{ApiAuth, CoachApi, HttpCoachApi};
pub use config::GatewayConfig;
pub use error::{AppError, AppResult};
pub use leads::LeadBoard;
pub use models::*;
pub use routes::router;
pub use session::{CookiePolicy, Identity, SessionClaims, SessionKeys};
pub use sync::{PollConfig, PollResult, SyncNotifier, SyncPoller};

use http_config::HttpConfig;
use std::sync::Arc;

/// State shared by every route handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub keys: Arc<SessionKeys>,
    pub http: reqwest::Client,
    pub shutdown: tokio_util::sync::CancellationToken,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> AppResult<Self> {
        let http = HttpConfig::backend_proxy().build_client()?;
        let mut keys = SessionKeys::new(&config.session_secret);
        if let Some(secret) = &config.nextauth_secret {
            keys = keys.with_nextauth_secret(secret);
        }

        Ok(Self {
            config: Arc::new(config),
            keys: Arc::new(keys),
            http,
            shutdown: tokio_util::sync::CancellationToken::new(),
        })
    }

    pub fn cookie_policy(&self) -> CookiePolicy {
        CookiePolicy {
            secure: self.config.cookie_secure,
        }
    }
}
