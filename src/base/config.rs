//! Load configuration via `config` crate with env-override support.

use std::{net::SocketAddr, ops::Deref, sync::Arc};

use serde::Deserialize;

use super::types::Res;

/// Default Lark open platform domain.
fn default_base_domain() -> String {
    "https://open.feishu.cn".to_string()
}

/// Default address the event listener binds to.
fn default_listen_address() -> String {
    "0.0.0.0:3000".to_string()
}

/// Default route the platform posts event callbacks to.
fn default_event_path() -> String {
    "/webhook/event".to_string()
}

/// Default due offset for new tasks (one day).
fn default_task_due_offset_hours() -> u32 {
    24
}

/// Configuration for the task-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    /// The shared configuration values.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

/// Configuration values, read from the environment and an optional TOML file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Lark application ID (`APP_ID`).
    pub app_id: String,
    /// Lark application secret (`APP_SECRET`).
    pub app_secret: String,
    /// Open platform domain (`BASE_DOMAIN`), e.g. `https://open.larksuite.com` for Lark international.
    #[serde(default = "default_base_domain")]
    pub base_domain: String,
    /// Event subscription verification token (`VERIFICATION_TOKEN`).
    /// When set, callbacks carrying a different token are rejected.
    #[serde(default)]
    pub verification_token: Option<String>,
    /// Address the event listener binds to (`LISTEN_ADDRESS`).
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Route the platform posts event callbacks to (`EVENT_PATH`).
    #[serde(default = "default_event_path")]
    pub event_path: String,
    /// Hours from now until a new task is due (`TASK_DUE_OFFSET_HOURS`); `0` creates tasks without a due time.
    #[serde(default = "default_task_due_offset_hours")]
    pub task_due_offset_hours: u32,
    /// Answer messages without a command with a usage hint instead of ignoring them (`REPLY_WITH_USAGE_HINT`).
    #[serde(default)]
    pub reply_with_usage_hint: bool,
}

impl Config {
    /// Loads the configuration from the environment and, if present, a TOML file.
    ///
    /// An explicit path takes precedence over `.hidden/config.toml`.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default());

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Checks the values `serde` cannot check on its own.
    pub fn validate(&self) -> Res<()> {
        if self.app_id.trim().is_empty() {
            return Err(anyhow::anyhow!("App ID must not be empty."));
        }

        if self.app_secret.trim().is_empty() {
            return Err(anyhow::anyhow!("App secret must not be empty."));
        }

        if !self.base_domain.starts_with("http://") && !self.base_domain.starts_with("https://") {
            return Err(anyhow::anyhow!("Base domain must be an http(s) URL."));
        }

        if !self.event_path.starts_with('/') {
            return Err(anyhow::anyhow!("Event path must start with `/`."));
        }

        if self.listen_address.parse::<SocketAddr>().is_err() {
            return Err(anyhow::anyhow!("Listen address must be a socket address, e.g. `0.0.0.0:3000`."));
        }

        if self.task_due_offset_hours > 24 * 365 {
            return Err(anyhow::anyhow!("Task due offset must be at most one year."));
        }

        Ok(())
    }

    /// The base domain without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.base_domain.trim_end_matches('/')
    }
}
