//! Outbound Bot API client.
//!
//! Every method is a JSON `POST` to the endpoint rendered from the URL
//! template. The platform wraps results in an envelope:
//!
//! ```json
//! {"ok": true, "result": {...}}
//! {"ok": false, "error_code": 401, "description": "Unauthorized"}
//! ```
//!
//! The rendered URL contains the bot token and is never logged.

use std::time::Duration;

use parking_lot::Mutex;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::template::UrlTemplate;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    description: String,
}

/// Client for the platform's Bot API.
pub struct BotApiClient {
    client: Client,
    endpoint: UrlTemplate,
    username: Mutex<Option<String>>,
}

impl BotApiClient {
    /// Creates a client for the default API endpoint.
    pub fn new(token: &str) -> ApiResult<Self> {
        Self::with_template(token, UrlTemplate::default())
    }

    /// Creates a client for a custom endpoint template.
    pub fn with_template(token: &str, template: UrlTemplate) -> ApiResult<Self> {
        Self::with_timeout(token, template, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom request timeout.
    pub fn with_timeout(token: &str, template: UrlTemplate, timeout: Duration) -> ApiResult<Self> {
        let client = ClientBuilder::new().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: template.with_token(token),
            username: Mutex::new(None),
        })
    }

    /// Calls `method` with JSON `params` and returns the `result` field.
    pub async fn call(&self, method: &str, params: Value) -> ApiResult<Value> {
        debug!(method = %method, params = ?param_names(&params), "Bot API call");

        let response = self
            .client
            .post(self.endpoint.url_for(method))
            .json(&params)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;

        let envelope: Envelope = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ApiError::Status {
                    status: status.as_u16(),
                });
            }
            Err(err) => return Err(err.into()),
        };
        debug!(
            method = %method,
            ok = envelope.ok,
            result = %envelope.result,
            "Bot API response"
        );

        if !envelope.ok {
            return Err(ApiError::Api {
                error_code: envelope.error_code,
                description: envelope.description,
            });
        }
        Ok(envelope.result)
    }

    /// Registers `url` as the webhook.
    pub async fn set_webhook(&self, url: &str) -> ApiResult<Value> {
        self.call("setWebhook", json!({ "url": url })).await
    }

    /// Returns the bot's username, asking the platform only the first time.
    pub async fn get_username(&self) -> ApiResult<String> {
        let cached = self.username.lock().clone();
        if let Some(username) = cached {
            return Ok(username);
        }
        self.get_username_forced().await
    }

    /// Asks the platform for the bot's username and refreshes the cache.
    pub async fn get_username_forced(&self) -> ApiResult<String> {
        let me = self.call("getMe", json!({})).await?;
        let username = me
            .get("username")
            .and_then(Value::as_str)
            .ok_or(ApiError::MissingField("username"))?
            .to_string();

        debug!(username = %username, "Bot username");
        *self.username.lock() = Some(username.clone());
        Ok(username)
    }
}

/// Names of the call parameters; values such as the webhook URL carry secrets.
fn param_names(params: &Value) -> Vec<&str> {
    params
        .as_object()
        .map(|params| params.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

impl std::fmt::Debug for BotApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotApiClient")
            .field("endpoint", &self.endpoint)
            .field("username", &*self.username.lock())
            .finish()
    }
}
