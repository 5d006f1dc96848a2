use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MarketDashError, Result};
use crate::schema::AdSpendPayload;

pub const PRODUCTION_API_URL: &str = "https://api.marketdash.app";
pub const STAGING_API_URL: &str = "https://staging-api.marketdash.app";
pub const LOCAL_API_URL: &str = "http://localhost:8000";

/// A 401 on a token minted within this window is treated as a race with
/// login, not as an expired session.
pub const TOKEN_TEARDOWN_GRACE_SECS: i64 = 5;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: String,
    pub user_id: String,
}

impl ApiConfig {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            user_id: user_id.into(),
        }
    }

    /// Reads `MARKETDASH_TOKEN` and `MARKETDASH_USER_ID` (required) and
    /// `MARKETDASH_API_URL` (optional, defaults to production).
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("MARKETDASH_API_URL").unwrap_or_else(|_| PRODUCTION_API_URL.to_string());
        let token = std::env::var("MARKETDASH_TOKEN")
            .map_err(|_| MarketDashError::MissingConfig("MARKETDASH_TOKEN".to_string()))?;
        let user_id = std::env::var("MARKETDASH_USER_ID")
            .map_err(|_| MarketDashError::MissingConfig("MARKETDASH_USER_ID".to_string()))?;
        Ok(Self {
            base_url,
            token,
            user_id,
        })
    }

    /// Hostname-keyed base-URL policy: local hosts hit the local API,
    /// staging hosts the staging API, everything else production.
    pub fn resolve_base_url(hostname: &str) -> &'static str {
        let host = hostname.to_lowercase();
        if host.starts_with("localhost") || host.starts_with("127.") {
            LOCAL_API_URL
        } else if host.contains("staging") {
            STAGING_API_URL
        } else {
            PRODUCTION_API_URL
        }
    }
}

/// Tracks when the current token was minted so that a stale in-flight 401
/// cannot clobber a session created moments ago.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub token_created_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            token_created_at: Utc::now(),
        }
    }

    pub fn created_at(token_created_at: DateTime<Utc>) -> Self {
        Self { token_created_at }
    }

    pub fn should_teardown(&self, now: DateTime<Utc>) -> bool {
        now - self.token_created_at >= Duration::seconds(TOKEN_TEARDOWN_GRACE_SECS)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Query parameters for the row-fetching endpoints.
#[derive(Debug, Clone, Default)]
pub struct RowsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub include_raw: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkRequest<'a> {
    pub items: &'a [AdSpendPayload],
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    pub inserted: usize,
}

/// One click-tracking row; structurally parallel to a sales row but never
/// fed to the KPI engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickRow {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub sub_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub clicks: u64,
}
