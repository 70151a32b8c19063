use reqwest::header::{self, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::NetworkError;

/// JSON-over-HTTP client bound to one API base URL.
///
/// URLs are built by appending the relative path to the base URL as given, so
/// paths must start with `/` and the base URL should not end with one.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) const fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Sends one request and returns the parsed JSON payload.
    ///
    /// `body` is only sent for non-GET methods. A success response whose body
    /// is empty or not JSON yields `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, NetworkError> {
        let url = self.url(path);
        debug!(%method, %url, "Sending API request");

        let mut request = self.client.request(method.clone(), &url).header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        if let Some(body) = body.filter(|_| method != Method::GET) {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::transport(path, &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NetworkError::transport(path, &e))?;
        let payload = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            let error = error_from_response(path, status, payload, text);
            warn!(
                %method,
                endpoint = %error.endpoint,
                status = status.as_u16(),
                message = %error.message,
                "API request failed"
            );
            return Err(error);
        }

        debug!(%method, %url, status = status.as_u16(), "API request succeeded");
        Ok(payload)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, NetworkError> {
        let payload = self.request(Method::GET, path, None).await?;
        decode(path, payload)
    }

    pub async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, NetworkError> {
        let body = encode(path, body)?;
        let payload = self.request(Method::POST, path, Some(&body)).await?;
        decode(path, payload)
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T, NetworkError> {
        let payload = self.request(Method::PUT, path, body).await?;
        decode(path, payload)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, NetworkError> {
        let payload = self.request(Method::DELETE, path, None).await?;
        decode(path, payload)
    }
}

fn error_from_response(path: &str, status: StatusCode, payload: Value, text: String) -> NetworkError {
    let message = payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| status.canonical_reason().map(str::to_owned))
        .unwrap_or_else(|| status.to_string());

    let raw_data = match payload {
        Value::Null if text.is_empty() => None,
        Value::Null => Some(Value::String(text)),
        payload => Some(payload),
    };

    NetworkError {
        status_code: Some(status.as_u16()),
        endpoint: path.to_string(),
        message,
        raw_data,
    }
}

fn encode<B: Serialize>(path: &str, body: &B) -> Result<Value, NetworkError> {
    serde_json::to_value(body).map_err(|e| NetworkError {
        status_code: None,
        endpoint: path.to_string(),
        message: format!("Failed to encode request body: {e}"),
        raw_data: None,
    })
}

fn decode<T: DeserializeOwned>(path: &str, payload: Value) -> Result<T, NetworkError> {
    T::deserialize(&payload).map_err(|e| NetworkError {
        status_code: None,
        endpoint: path.to_string(),
        message: format!("Unexpected response shape: {e}"),
        raw_data: Some(payload),
    })
}
