//! Shared plumbing for the Lark open platform API.
//!
//! Every Lark endpoint answers with a `{code, msg, ...}` body, usually carrying
//! the payload under `data`. This module owns the HTTP client, the tenant access
//! token, and the decoding of that envelope, so that the chat and task clients
//! only deal with their own request and response shapes.

use std::{ops::Deref, sync::Arc};

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::base::{config::Config, types::Res};

// Types.

/// An error reported by the Lark API itself (non-zero `code`).
///
/// Callers downcast to this to surface `msg` to users instead of the full error chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Lark API error {code}: {msg}")]
pub struct LarkApiError {
    pub code: i64,
    pub msg: String,
}

/// Response of the tenant access token endpoint (not wrapped in `data`).
#[derive(Debug, Deserialize)]
struct TenantAccessTokenResponse {
    tenant_access_token: String,
    /// Lifetime in seconds.
    expire: i64,
}

/// Response of the bot info endpoint (not wrapped in `data`).
#[derive(Debug, Deserialize)]
struct BotInfoResponse {
    bot: BotInfo,
}

#[derive(Debug, Deserialize)]
struct BotInfo {
    open_id: String,
}

#[derive(Debug, Serialize)]
struct TenantAccessTokenRequest<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Tokens are refreshed this long before Lark expires them.
const TOKEN_REFRESH_MARGIN_SECONDS: i64 = 60;

// Structs.

/// Client for the Lark open platform.
///
/// This is a concrete client, shared by the chat and task services, and does not
/// expose a generic trait interface.
///
/// It is designed to be trivially cloneable.
#[derive(Clone)]
pub struct LarkApi {
    inner: Arc<LarkApiInner>,
}

impl Deref for LarkApi {
    type Target = LarkApiInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Inner implementation of the Lark API client.
pub struct LarkApiInner {
    http: reqwest::Client,
    base: String,
    app_id: String,
    app_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl LarkApi {
    /// Creates a new Lark API client.
    pub fn new(config: &Config) -> Self {
        Self {
            inner: Arc::new(LarkApiInner {
                http: reqwest::Client::new(),
                base: config.api_base().to_string(),
                app_id: config.app_id.clone(),
                app_secret: config.app_secret.clone(),
                token: Mutex::new(None),
            }),
        }
    }

    /// Returns a valid tenant access token, fetching a new one when the cached one is close to expiring.
    #[instrument(name = "LarkApi::tenant_access_token", skip_all)]
    pub async fn tenant_access_token(&self) -> Res<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref()
            && token.expires_at > Utc::now()
        {
            return Ok(token.value.clone());
        }

        debug!("Fetching a new tenant access token ...");

        let request = self.http.post(self.url("/open-apis/auth/v3/tenant_access_token/internal")).json(&TenantAccessTokenRequest {
            app_id: &self.app_id,
            app_secret: &self.app_secret,
        });

        let body = Self::send(request).await?;
        let response: TenantAccessTokenResponse = serde_json::from_value(body)?;

        let lifetime = (response.expire - TOKEN_REFRESH_MARGIN_SECONDS).max(0);
        let token = CachedToken {
            value: response.tenant_access_token,
            expires_at: Utc::now() + TimeDelta::seconds(lifetime),
        };

        *cached = Some(token.clone());

        Ok(token.value)
    }

    /// Fetches the bot's own open ID.
    #[instrument(name = "LarkApi::bot_open_id", skip_all)]
    pub async fn bot_open_id(&self) -> Res<String> {
        let request = self.authorized(Method::GET, "/open-apis/bot/v3/info", &[]).await?;
        let body = Self::send(request).await?;
        let response: BotInfoResponse = serde_json::from_value(body)?;

        info!("Lark bot open ID: {}", response.bot.open_id);

        Ok(response.bot.open_id)
    }

    /// Sends an authorized `POST` and decodes the `data` of the response.
    pub async fn post<B, R>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Res<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.authorized(Method::POST, path, query).await?.json(body);
        let body = Self::send(request).await?;

        Ok(serde_json::from_value(body.get("data").cloned().unwrap_or(Value::Null))?)
    }

    /// Builds a request carrying the tenant access token.
    async fn authorized(&self, method: Method, path: &str, query: &[(&str, &str)]) -> Res<RequestBuilder> {
        let token = self.tenant_access_token().await?;

        Ok(self.http.request(method, self.url(path)).query(query).bearer_auth(token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Sends the request and checks the `{code, msg}` envelope.
    ///
    /// Lark reports most failures with a non-2xx status *and* an envelope, so the
    /// envelope is checked first and the status only matters when the body is not one.
    async fn send(request: RequestBuilder) -> Res<Value> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let Ok(body) = serde_json::from_str::<Value>(&text) else {
            return Err(anyhow::anyhow!("Lark API request failed ({}): {}", status, text));
        };

        let code = body.get("code").and_then(Value::as_i64);

        match code {
            Some(0) => Ok(body),
            Some(code) => Err(LarkApiError {
                code,
                msg: body.get("msg").and_then(Value::as_str).unwrap_or_default().to_string(),
            }
            .into()),
            None if status.is_success() => Ok(body),
            None => Err(anyhow::anyhow!("Lark API request failed ({}): {}", status, text)),
        }
    }
}

// Tests.
