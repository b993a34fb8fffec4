//! Remote API call wrapper.
//!
//! Builds form-encoded method calls, decodes the JSON envelope and maps
//! envelope-level failures. The polling engine consumes this only through
//! the [`ApiClient`] trait, so tests substitute their own implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::params::Params;

/// Default API endpoint.
pub const API_URL: &str = "https://api.vk.com/method/";

/// API version sent with every call.
pub const API_VERSION: &str = "5.130";

/// A client able to call remote API methods by name.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Call a remote method with the given parameters.
    ///
    /// Returns the decoded `response` payload: a JSON object for
    /// method-specific results, or a bare integer for status-only methods.
    async fn call_method(&self, method: &str, params: Params) -> Result<Value>;
}

/// HTTP implementation of [`ApiClient`].
pub struct HttpApiClient {
    base_url: String,
    version: String,
    language: Option<String>,
    token: String,
    http: reqwest::Client,
}

impl HttpApiClient {
    /// Create a client with the default endpoint and version.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: API_URL.to_string(),
            version: API_VERSION.to_string(),
            language: None,
            token: token.into(),
            http: http_client()?,
        })
    }

    /// Override the API endpoint (trailing slash included).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the API version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Request localized responses.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn call_method(&self, method: &str, params: Params) -> Result<Value> {
        let mut params = params;
        params.insert("v", self.version.as_str());
        params.insert("access_token", self.token.as_str());
        if let Some(language) = &self.language {
            params.insert("lang", language.as_str());
        }

        let url = format!("{}{}", self.base_url, method);
        debug!(method, "calling api method");

        let response = self
            .http
            .post(&url)
            .form(&params.to_form())
            .send()
            .await
            .map_err(|err| Error::transport("error occurred while making request", err))?;
        let body = response
            .text()
            .await
            .map_err(|err| Error::transport("error occurred while reading response body", err))?;
        let data: Value = serde_json::from_str(&body).map_err(|err| {
            Error::protocol_source(format!("malformed response from method '{method}'"), err)
        })?;

        decode_envelope(method, data)
    }
}

/// Map the response envelope to the method result.
fn decode_envelope(method: &str, data: Value) -> Result<Value> {
    let Some(object) = data.as_object() else {
        let mut misc = Map::new();
        misc.insert("resp".into(), data);
        return Err(Error::protocol_with(
            format!("response from method '{method}' is not an object"),
            misc,
        ));
    };

    if object.contains_key("error") {
        let mut misc = Map::new();
        misc.insert("resp".into(), data.clone());
        return Err(Error::api(
            format!("error response from method '{method}'"),
            misc,
        ));
    }
    let Some(response) = object.get("response") else {
        let mut misc = Map::new();
        misc.insert("resp".into(), data.clone());
        return Err(Error::api(
            format!("invalid response from method '{method}'"),
            misc,
        ));
    };

    match response {
        Value::Object(_) | Value::Number(_) => Ok(response.clone()),
        other => {
            let mut misc = Map::new();
            misc.insert("response".into(), other.clone());
            Err(Error::protocol_with(
                format!("response field of method '{method}' is neither an object nor a number"),
                misc,
            ))
        }
    }
}

/// Build the tuned HTTP client shared by the API wrapper and the long-poll
/// engine.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(100)
        .build()
        .map_err(|err| Error::transport("failed to build http client", err))
}
