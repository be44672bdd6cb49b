// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request dispatch for the API client.

use async_trait::async_trait;
use reqwest::{cookie::Jar, Method, StatusCode};
use serde_json::Value;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::client::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REFRESH_PATH: &str = "/api/v1/refresh";

/// One API call, replayable after a refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            body: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    /// Machine-readable code from the error envelope, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.body.get("code").and_then(Value::as_str)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Carries requests and owns the credentials they are sent with.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request with the current credentials.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError>;

    /// Exchange the refresh credential for a new access credential.
    async fn refresh(&self) -> Result<(), ClientError>;
}

/// reqwest transport with a browser-like cookie jar.
///
/// The server's httpOnly cookies live in the jar. An `access_token` field in
/// a JSON body is also kept and sent as a bearer token.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    access_token: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::new(Jar::default()))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: RwLock::new(None),
        })
    }

    fn bearer(&self) -> Option<String> {
        self.access_token.read().ok().and_then(|token| token.clone())
    }

    fn remember_token(&self, body: &Value) {
        if let Some(token) = body.get("access_token").and_then(Value::as_str) {
            if let Ok(mut slot) = self.access_token.write() {
                *slot = Some(token.to_string());
            }
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some(token) = self.bearer() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))?
        };

        if status.is_success() {
            self.remember_token(&body);
        }
        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ClientError> {
        self.dispatch(request).await
    }

    async fn refresh(&self) -> Result<(), ClientError> {
        let request = ApiRequest {
            method: Method::POST,
            path: REFRESH_PATH.to_string(),
            body: None,
        };
        let response = self.dispatch(&request).await?;

        if response.is_success() {
            tracing::debug!("Access token refreshed");
            Ok(())
        } else {
            Err(ClientError::RefreshRejected(response.status.as_u16()))
        }
    }
}
