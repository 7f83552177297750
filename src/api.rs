// Typed JSON client for the backend REST API

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Response};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{ApiError, ErrorEnvelope, codes};

/// HTTP client shared by every store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::new(format!("Failed to build HTTP client: {}", e), 0, codes::UNKNOWN_ERROR))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Client for `base_url` with otherwise default settings
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(&Config::default().with_base_url(base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, cancel: Option<&CancelToken>) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, endpoint, None, cancel).await
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B, cancel: Option<&CancelToken>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, endpoint, Some(body), cancel).await
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B, cancel: Option<&CancelToken>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, endpoint, Some(body), cancel).await
    }

    pub async fn patch<T, B>(&self, endpoint: &str, body: &B, cancel: Option<&CancelToken>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PATCH, endpoint, Some(body), cancel).await
    }

    /// Issue a request and decode the JSON response.
    ///
    /// Every failure is normalized to [`ApiError`]; nothing is retried.
    pub async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        cancel: Option<&CancelToken>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let fut = self.send(method, endpoint, body);
        match cancel {
            Some(token) => token.run(fut).await,
            None => fut.await,
        }
    }

    async fn send<T, B>(&self, method: Method, endpoint: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(method = %method, url = %url, "Sending request");

        let mut builder = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(method = %method, url = %url, error = %e, "Request failed");
            ApiError::network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let err = error_from_response(response).await;
            debug!(status = status.as_u16(), code = %err.code, "Backend returned error");
            return Err(err);
        }

        parse_json(response).await
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

/// Check the content type, then decode
async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status().as_u16();

    if !is_json(&response) {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("no content type")
            .to_string();
        return Err(ApiError::new(
            format!("Expected JSON response, got {}", content_type),
            status,
            codes::INVALID_RESPONSE_TYPE,
        ));
    }

    let bytes = response.bytes().await.map_err(|e| ApiError::network(e.to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::new(format!("Failed to parse JSON: {}", e), status, codes::JSON_PARSE_ERROR))
}

/// Decode the `{ok: false, error: {...}}` envelope, falling back to the status line
async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    if !is_json(&response) {
        return ApiError::from_status(status);
    }

    match response.bytes().await {
        Ok(bytes) => match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
            Ok(envelope) => ApiError::from_envelope(status.as_u16(), envelope),
            Err(_) => ApiError::from_status(status),
        },
        Err(_) => ApiError::from_status(status),
    }
}
