//! User Data Stream Session Client
//!
//! `reqwest` adapter for the listen key endpoints:
//!
//! - `POST /api/v3/userDataStream` starts a session and returns `{"listenKey": ...}`
//! - `PUT /api/v3/userDataStream?listenKey=...` extends it
//!
//! Both authenticate with the `X-MBX-APIKEY` header only. Requests are not
//! retried here; the user stream manager owns the retry policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::application::ports::{DataStream, SessionError, SessionPort};
use crate::infrastructure::config::{AdapterConfig, Credentials};

/// Path of the user data stream session endpoint.
pub const USER_DATA_STREAM_PATH: &str = "/api/v3/userDataStream";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Error body returned by the REST API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: i64,
    msg: String,
}

/// HTTP client for user data stream sessions.
#[derive(Debug, Clone)]
pub struct BinanceSessionClient {
    client: Client,
    credentials: Credentials,
    endpoint: String,
}

impl BinanceSessionClient {
    /// Create a client for `rest_base_url`.
    pub fn new(
        rest_base_url: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, SessionError> {
        if credentials.api_key().is_empty() {
            return Err(SessionError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::Transport {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            credentials,
            endpoint: format!(
                "{}{USER_DATA_STREAM_PATH}",
                rest_base_url.trim_end_matches('/')
            ),
        })
    }

    /// Create a client from adapter configuration.
    pub fn from_config(config: &AdapterConfig) -> Result<Self, SessionError> {
        let credentials = config
            .credentials
            .clone()
            .ok_or(SessionError::MissingApiKey)?;
        Self::new(
            &config.endpoints.rest_base_url,
            credentials,
            config.endpoints.http_timeout,
        )
    }

    /// Full URL of the session endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SessionError> {
        let response = request
            .header(API_KEY_HEADER, self.credentials.api_key())
            .send()
            .await
            .map_err(|e| SessionError::Transport {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(rejection(status.as_u16(), body))
    }
}

fn rejection(status: u16, body: String) -> SessionError {
    let body = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(err) => format!("{} {}", err.code, err.msg),
        Err(_) => body,
    };
    SessionError::Rejected { status, body }
}

#[async_trait]
impl SessionPort for BinanceSessionClient {
    async fn get_data_stream(&self) -> Result<DataStream, SessionError> {
        let response = self.send(self.client.post(&self.endpoint)).await?;
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::Transport {
                message: e.to_string(),
            })?;
        serde_json::from_str(&text).map_err(|e| SessionError::InvalidResponse {
            message: e.to_string(),
        })
    }

    async fn keep_data_stream(&self, listen_key: &str) -> Result<(), SessionError> {
        let request = self
            .client
            .put(&self.endpoint)
            .query(&[("listenKey", listen_key)]);
        self.send(request).await?;
        Ok(())
    }
}
