//! Thin JSON-over-HTTP wrapper around `reqwest` with bearer authentication.

use std::{sync::RwLock, time::Duration};

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::infra::{config::ServerConfig, secrets::redact_text};

use super::error::{ApiError, GENERIC_SERVER_DETAIL};

const HTTP_REQUEST_FAILED: &str = "API_HTTP_REQUEST_FAILED";

#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpClient {
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("vchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|token| token.clone())
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut current) = self.token.write() {
            *current = token;
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(path, self.client.get(self.url(path))).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        self.execute(path, self.client.get(self.url(path)).query(query))
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(path, self.client.post(self.url(path)).json(body))
            .await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(path, self.client.post(self.url(path))).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(path, self.client.delete(self.url(path))).await
    }

    pub async fn delete_with_body<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(path, self.client.delete(self.url(path)).json(body))
            .await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let request = match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let result = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                return Err(error_for_status(status, &body));
            }

            decode_body(&body)
        }
        .await;

        if let Err(error) = &result {
            tracing::warn!(
                code = HTTP_REQUEST_FAILED,
                path,
                error_code = error.code(),
                "api request failed"
            );
        }

        result
    }
}

pub fn error_for_status(status: StatusCode, body: &str) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound,
        _ => ApiError::Server {
            status: status.as_u16(),
            detail: extract_detail(body),
        },
    }
}

/// Pulls the human-readable `detail` (or `message`) out of an error body.
pub fn extract_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return GENERIC_SERVER_DETAIL.to_owned();
    };

    ["detail", "message", "error"]
        .iter()
        .find_map(|key| match value.get(*key) {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
            Some(Value::Object(inner)) => inner
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        })
        .map(|detail| redact_text(&detail))
        .unwrap_or_else(|| GENERIC_SERVER_DETAIL.to_owned())
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    if body.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }

    Ok(serde_json::from_str(body)?)
}
