use crate::core::currency::RateSupplier;
use crate::providers::util::{RetryPolicy, http_client, with_retry};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Latest rates from fxratesapi.com, quoted against a requested base.
pub struct FxRatesApiProvider {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl FxRatesApiProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(FxRatesApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client().context("Failed to build HTTP client")?,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, serde_json::Value>,
}

#[async_trait]
impl RateSupplier for FxRatesApiProvider {
    #[instrument(name = "FxRatesFetch", skip(self), fields(base = %base_currency))]
    async fn fetch_latest_rates(&self, base_currency: &str) -> Result<HashMap<String, f64>> {
        let url = format!("{}/latest?base={}", self.base_url, base_currency);
        debug!("Requesting exchange rates from {}", url);

        let response = with_retry(|| self.client.get(&url).send(), self.retry)
            .await
            .with_context(|| format!("Failed to send request for base currency: {base_currency}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base_currency
            ));
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to get response text for base currency: {base_currency}"))?;

        let data: LatestRatesResponse = serde_json::from_str(&text).map_err(|e| {
            anyhow!("Failed to parse JSON response for {}: {}", base_currency, e)
        })?;

        // Non-numeric entries become NaN so the refresh rejects them row by row.
        let rates: HashMap<String, f64> = data
            .rates
            .into_iter()
            .map(|(code, value)| {
                let rate = value.as_f64().unwrap_or(f64::NAN);
                (code, rate)
            })
            .collect();
        debug!("Received {} rates for {}", rates.len(), base_currency);
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(base: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("base", base))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &MockServer) -> FxRatesApiProvider {
        FxRatesApiProvider::new(&server.uri())
            .unwrap()
            .with_retry_policy(RetryPolicy {
                retries: 1,
                delay: Duration::from_millis(1),
            })
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let body = r#"{
            "success": true,
            "base": "PLN",
            "date": "2024-11-24T12:00:00.000Z",
            "rates": { "PLN": 1, "EUR": 0.2301, "USD": 0.2403 }
        }"#;
        let server = create_mock_server("PLN", 200, body).await;

        let rates = provider(&server).fetch_latest_rates("PLN").await.unwrap();
        assert_eq!(rates.len(), 3);
        assert_eq!(rates["PLN"], 1.0);
        assert_eq!(rates["EUR"], 0.2301);
    }

    #[tokio::test]
    async fn test_non_numeric_rate_becomes_nan() {
        let body = r#"{ "rates": { "EUR": 0.23, "XYZ": "n/a", "ABC": null } }"#;
        let server = create_mock_server("PLN", 200, body).await;

        let rates = provider(&server).fetch_latest_rates("PLN").await.unwrap();
        assert_eq!(rates["EUR"], 0.23);
        assert!(rates["XYZ"].is_nan());
        assert!(rates["ABC"].is_nan());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = create_mock_server("PLN", 500, "oops").await;

        let err = provider(&server).fetch_latest_rates("PLN").await.unwrap_err();
        assert!(err.to_string().contains("HTTP error: 500"));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = create_mock_server("PLN", 200, r#"{"success": false}"#).await;

        let err = provider(&server).fetch_latest_rates("PLN").await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse JSON response for PLN"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let provider = FxRatesApiProvider::new("http://127.0.0.1:9")
            .unwrap()
            .with_retry_policy(RetryPolicy {
                retries: 0,
                delay: Duration::from_millis(1),
            });
        let err = provider.fetch_latest_rates("PLN").await.unwrap_err();
        assert!(err.to_string().contains("Failed to send request"));
    }
}
