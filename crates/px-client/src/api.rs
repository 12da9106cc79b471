//! JSON-over-HTTPS plumbing shared by the REST services.
//!
//! Every gateway endpoint is a `POST` with a JSON body and answers with the
//! same envelope:
//!
//! ```json
//! { "success": false, "errorCode": 3, "errorMessage": "...", ...payload }
//! ```
//!
//! Transport problems and non-2xx statuses surface as [`ApiError`] before the
//! envelope is looked at; an envelope with `success: false` becomes
//! [`ApiError::Rejected`] through [`ApiResponse::into_result`].

use std::sync::Arc;
use std::time::Duration;

use px_core::context::ClientContext;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("undecodable response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("gateway rejected request (code {code}): {message}")]
    Rejected { code: i32, message: String },

    #[error("login succeeded without a token")]
    MissingToken,
}

/// Gateway response envelope. `data` holds the endpoint-specific fields that
/// sit next to `success` in the JSON object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, ApiError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected {
                code: self.error_code,
                message: self.error_message.unwrap_or_default(),
            })
        }
    }
}

/// Thin `reqwest` wrapper: base URL, user agent, timeout and bearer token.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    context: Arc<ClientContext>,
}

impl ApiClient {
    pub fn new(base: Url, context: Arc<ClientContext>, user_agent: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().user_agent(user_agent).timeout(timeout).build()?;
        Ok(Self { http, base, context })
    }

    pub fn context(&self) -> &Arc<ClientContext> {
        &self.context
    }

    /// Absolute endpoint URL. `path` replaces the base URL's path.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    /// `POST` `body` as JSON and decode the response envelope.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<ApiResponse<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        self.execute(path, self.http.post(url).json(body)).await
    }

    /// `POST` without a body.
    pub async fn post_empty<R: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<R>, ApiError> {
        let url = self.endpoint(path)?;
        self.execute(path, self.http.post(url)).await
    }

    async fn execute<R: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<ApiResponse<R>, ApiError> {
        let mut request = request.header(ACCEPT, "application/json");
        if let Some(token) = self.context.token() {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        debug!("[rest] POST {path} -> {status}");

        if !status.is_success() {
            return Err(ApiError::Http { status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }
}
