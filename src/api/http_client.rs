use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::types::Envelope;
use crate::error::ApiError;

/// Thin transport over the SP API: one base URL, one envelope format
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| ApiError::validation(format!("Invalid base URL '{}': {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(ApiError::validation(format!(
                "Invalid base URL '{}'",
                base_url
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with each segment appended and percent-encoded
    pub fn endpoint_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::validation(format!("Invalid base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint_url(segments)?;

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(body) = &body {
            request = request.json(body);
        }

        tracing::debug!(%method, %url, "api request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, %url, error = %e, "api request failed");
            ApiError::from(e)
        })?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        let data = decode_envelope(status, &text).map_err(|e| {
            tracing::warn!(%method, %url, status, error = %e, "api call rejected");
            e
        })?;

        decode_data(data)
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.call(Method::GET, segments, &[], None).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        self.call(Method::GET, segments, query, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::Decode(format!("failed to encode request body: {}", e)))?;
        self.call(Method::POST, segments, &[], Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.call(Method::DELETE, segments, &[], None).await
    }
}

/// Turn a raw status + body into the envelope's `data`, or the matching error
pub fn decode_envelope(status: u16, body: &str) -> Result<Value, ApiError> {
    let envelope: Option<Envelope> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let message = envelope
            .and_then(|e| e.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(ApiError::Http { status, message });
    }

    let envelope = envelope.ok_or_else(|| {
        ApiError::Decode(format!("response is not an API envelope: {}", preview(body)))
    })?;

    if !envelope.success {
        let message = envelope
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Request failed".to_string());
        return Err(ApiError::Application(message));
    }

    Ok(envelope.data.unwrap_or(Value::Null))
}

pub fn decode_data<T: DeserializeOwned>(data: Value) -> Result<T, ApiError> {
    serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
}

fn preview(body: &str) -> String {
    body.chars().take(80).collect()
}
