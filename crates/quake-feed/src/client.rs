use std::time::Duration;

use thiserror::Error;

use crate::cwa::{FeedEarthquake, FeedResponse};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("feed returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("feed api key is not configured")]
    MissingApiKey,
}

/// Connection parameters for the report feed.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub url: String,
    pub api_key: String,
    pub limit: u32,
    pub request_timeout: Duration,
}

/// Polls the agency's significant-earthquake report dataset.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    settings: FeedSettings,
}

impl FeedClient {
    /// Builds a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::MissingApiKey` for an empty key, or
    /// `FeedError::Network` if the HTTP client cannot be constructed.
    pub fn new(settings: FeedSettings) -> Result<Self, FeedError> {
        if settings.api_key.trim().is_empty() {
            return Err(FeedError::MissingApiKey);
        }
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("quake-feed/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, settings })
    }

    /// Fetches the most recent reports, newest first as served by the feed.
    pub async fn fetch_reports(&self) -> Result<Vec<FeedEarthquake>, FeedError> {
        let limit = self.settings.limit.to_string();
        let resp = self
            .http
            .get(&self.settings.url)
            .query(&[
                ("Authorization", self.settings.api_key.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FeedError::Status(resp.status()));
        }

        let body: FeedResponse = resp.json().await?;
        tracing::debug!(
            reports = body.records.earthquakes.len(),
            "fetched earthquake reports"
        );
        Ok(body.records.earthquakes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn settings(addr: SocketAddr) -> FeedSettings {
        FeedSettings {
            url: format!("http://{addr}/datastore/E-A0015-001"),
            api_key: "CWA-TEST".into(),
            limit: 5,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn fetches_and_decodes_reports() {
        let app = Router::new().route(
            "/datastore/E-A0015-001",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                if params.get("Authorization").map(String::as_str) != Some("CWA-TEST") {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                assert_eq!(params.get("limit").map(String::as_str), Some("5"));
                Ok(Json(serde_json::json!({
                    "records": {
                        "Earthquake": [{
                            "EarthquakeNo": 114097,
                            "EarthquakeInfo": {
                                "OriginTime": "2025-05-01 12:00:00",
                                "FocalDepth": 10.0,
                                "Epicenter": {
                                    "Location": "宜蘭縣外海",
                                    "EpicenterLatitude": 24.6,
                                    "EpicenterLongitude": 122.0
                                },
                                "EarthquakeMagnitude": { "MagnitudeValue": 5.1 }
                            },
                            "Intensity": { "ShakingArea": [] }
                        }]
                    }
                })))
            }),
        );
        let addr = serve(app).await;

        let client = FeedClient::new(settings(addr)).unwrap();
        let reports = client.fetch_reports().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].earthquake_no, 114097);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/datastore/E-A0015-001",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let addr = serve(app).await;

        let client = FeedClient::new(settings(addr)).unwrap();
        let err = client.fetch_reports().await.unwrap_err();
        assert!(
            matches!(err, FeedError::Status(status) if status == reqwest::StatusCode::SERVICE_UNAVAILABLE),
            "got {err:?}"
        );
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = FeedClient::new(FeedSettings {
            url: "http://localhost/".into(),
            api_key: "  ".into(),
            limit: 1,
            request_timeout: Duration::from_secs(1),
        })
        .unwrap_err();
        assert!(matches!(err, FeedError::MissingApiKey));
    }
}
