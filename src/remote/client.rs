use chrono::Utc;
use log::{debug, warn};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};

use crate::dates;
use crate::error::{MarketDashError, Result};
use crate::remote::types::{
    ApiConfig, BulkRequest, BulkResponse, ClickRow, RowsQuery, SessionState,
};
use crate::schema::{AdSpend, AdSpendPayload, SalesRow};
use crate::validation;

/// JSON REST gateway for the dashboard backend. Every request carries the
/// bearer token, the `X-User-Id` header and a duplicated `user_id` query
/// parameter. Requests are not retried and cannot be cancelled.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
    session: SessionState,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            session: SessionState::new(),
        }
    }

    /// Uses an externally tracked session, e.g. restored from stored
    /// session state, so the 401 grace window matches the real token age.
    pub fn with_session(config: ApiConfig, session: SessionState) -> Self {
        Self {
            client: Client::new(),
            config,
            session,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .bearer_auth(&self.config.token)
            .header("X-User-Id", &self.config.user_id)
            .query(&[("user_id", self.config.user_id.as_str())])
    }

    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => {
                if self.session.should_teardown(Utc::now()) {
                    Err(MarketDashError::SessionExpired)
                } else {
                    warn!("401 inside the token grace window, keeping session");
                    Err(MarketDashError::Api {
                        status: status.as_u16(),
                        message: body,
                    })
                }
            }
            StatusCode::FORBIDDEN if is_subscription_denial(&body) => {
                Err(MarketDashError::SubscriptionRequired)
            }
            _ => Err(MarketDashError::Api {
                status: status.as_u16(),
                message: body,
            }),
        }
    }

    fn rows_request(&self, path: &str, query: &RowsQuery) -> RequestBuilder {
        let mut request = self.request(Method::GET, path);
        if let Some(from) = query.from {
            request = request.query(&[("from", dates::date_key(from))]);
        }
        if let Some(to) = query.to {
            request = request.query(&[("to", dates::date_key(to))]);
        }
        if query.include_raw {
            request = request.query(&[("include_raw", "true")]);
        }
        request
    }

    pub async fn fetch_sales_rows(&self, query: &RowsQuery) -> Result<Vec<SalesRow>> {
        let request = self.rows_request("/api/v1/datasets/all/rows", query);
        let response = self.check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn fetch_clicks(&self, query: &RowsQuery) -> Result<Vec<ClickRow>> {
        let request = self.rows_request("/api/v1/clicks/all/rows", query);
        let response = self.check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn list_ad_spends(&self) -> Result<Vec<AdSpend>> {
        let request = self.request(Method::GET, "/api/v1/ad_spends");
        let response = self.check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn create_ad_spend(&self, payload: &AdSpendPayload) -> Result<AdSpend> {
        validation::validate_payload(payload)?;
        let request = self.request(Method::POST, "/api/v1/ad_spends").json(payload);
        let response = self.check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn update_ad_spend(&self, id: &str, payload: &AdSpendPayload) -> Result<AdSpend> {
        validation::validate_payload(payload)?;
        let path = format!("/api/v1/ad_spends/{}", id);
        let request = self.request(Method::PATCH, &path).json(payload);
        let response = self.check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_ad_spend(&self, id: &str) -> Result<()> {
        let path = format!("/api/v1/ad_spends/{}", id);
        let request = self.request(Method::DELETE, &path);
        self.check(request.send().await?).await?;
        Ok(())
    }

    pub async fn delete_all_ad_spends(&self) -> Result<()> {
        let request = self.request(Method::DELETE, "/api/v1/ad_spends");
        self.check(request.send().await?).await?;
        Ok(())
    }

    /// Bulk upload of an import batch; returns the number of rows the
    /// backend actually inserted.
    pub async fn bulk_create_ad_spends(&self, items: &[AdSpendPayload]) -> Result<usize> {
        for payload in items {
            validation::validate_payload(payload)?;
        }
        let request = self
            .request(Method::POST, "/api/v1/ad_spends/bulk")
            .json(&BulkRequest { items });
        let response = self.check(request.send().await?).await?;
        let body: BulkResponse = response.json().await?;
        Ok(body.inserted)
    }
}

/// A 403 body that mentions the subscription (either language) means the
/// plan lapsed, which the caller turns into a checkout redirect.
fn is_subscription_denial(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("assinatura") || lower.contains("subscription")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_denial_matching() {
        assert!(is_subscription_denial("Sua assinatura expirou"));
        assert!(is_subscription_denial(
            r#"{"error": "Subscription required"}"#
        ));
        assert!(!is_subscription_denial("forbidden"));
    }

    #[test]
    fn test_invalid_payload_rejected_before_network() {
        let client = ApiClient::new(ApiConfig::new("http://invalid", "t", "1"));
        let payload = AdSpendPayload {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            amount: 0.0,
            sub_id: None,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = runtime
            .block_on(client.create_ad_spend(&payload))
            .unwrap_err();
        assert!(matches!(err, MarketDashError::Validation { .. }));
    }
}
