//! Workflow configuration.
//!
//! The outer adapter builds one `Config` and passes it into every run; nothing
//! in the core reads process-wide settings. Config files are JSON. String
//! values may reference environment variables as `${NAME}`, and a few well-known
//! variables fill gaps the file leaves open.
use crate::model::Platform;
use anyhow::{anyhow, Context, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_IMAGE_ROOT: &str = "/data";
pub const CONFIG_ENV: &str = "SHEETPOST_CONFIG";
pub const SHEETS_URL_ENV: &str = "SHEETS_WEB_APP_URL";
pub const SHEETS_TOKEN_ENV: &str = "SHEETS_TOKEN";
pub const IMAGE_ROOT_ENV: &str = "W4_IMAGE_ROOT";

/// Where content rows are fetched from and written back to.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Spreadsheet web app reached over HTTP.
    Sheets { web_app_url: String, token: String },
    /// Local JSON array of rows.
    File { path: PathBuf },
}

/// Per-platform publisher settings.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PlatformSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Saved browser session used by the automation command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_state: Option<PathBuf>,
    /// External automation command; without one the platform uses the dummy publisher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub store: Option<StoreConfig>,
    #[serde(default)]
    pub image_root: Option<PathBuf>,
    /// Default platform selection when the adapter passes none.
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub platform_settings: BTreeMap<Platform, PlatformSettings>,
    /// Pause after each live publish attempt.
    #[serde(default)]
    pub wait_after_publish_ms: u64,
}

impl Config {
    /// Root that sheet-relative media paths are joined onto.
    pub fn image_root(&self) -> PathBuf {
        self.image_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE_ROOT))
    }

    pub fn publish_pause(&self) -> Option<Duration> {
        (self.wait_after_publish_ms > 0)
            .then(|| Duration::from_millis(self.wait_after_publish_ms))
    }

    pub fn settings_for(&self, platform: Platform) -> Option<&PlatformSettings> {
        self.platform_settings.get(&platform)
    }

    /// Check that the configured store has the credentials it needs.
    pub fn validate_store(&self) -> Result<&StoreConfig> {
        let store = self.store.as_ref().ok_or_else(|| {
            anyhow!(
                "no content store configured \
                 (set `store` in the config or {SHEETS_URL_ENV} and {SHEETS_TOKEN_ENV})"
            )
        })?;
        match store {
            StoreConfig::Sheets { web_app_url, token } => {
                if web_app_url.trim().is_empty() {
                    return Err(anyhow!("sheets store requires web_app_url"));
                }
                if token.trim().is_empty() {
                    return Err(anyhow!("sheets store requires token"));
                }
            }
            StoreConfig::File { path } => {
                if path.as_os_str().is_empty() {
                    return Err(anyhow!("file store requires path"));
                }
            }
        }
        Ok(store)
    }

    /// Fill unset fields from well-known environment variables.
    pub fn apply_env_fallbacks(&mut self, env: &dyn Fn(&str) -> Option<String>) {
        if self.store.is_none() {
            if let (Some(web_app_url), Some(token)) = (env(SHEETS_URL_ENV), env(SHEETS_TOKEN_ENV)) {
                self.store = Some(StoreConfig::Sheets { web_app_url, token });
            }
        }
        if self.image_root.is_none() {
            self.image_root = env(IMAGE_ROOT_ENV).map(PathBuf::from);
        }
    }
}

/// Parse config JSON text, substituting `${VAR}` references first.
pub fn parse_config(text: &str, env: &dyn Fn(&str) -> Option<String>) -> Result<Config> {
    let raw: Value = serde_json::from_str(text).context("parse config JSON")?;
    let substituted = substitute_env(raw, env);
    let mut config: Config =
        serde_json::from_value(substituted).context("decode config fields")?;
    config.apply_env_fallbacks(env);
    Ok(config)
}

/// Load the config from `path`, or from the default location when `None`.
///
/// An explicit path must exist. A missing default config is not an error: the
/// result is built from environment fallbacks alone.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let env = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());
    let explicit = path
        .map(Path::to_path_buf)
        .or_else(|| env(CONFIG_ENV).map(PathBuf::from));
    let path = match explicit {
        Some(path) => path,
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => path,
            None => {
                tracing::debug!("no config file found; using environment only");
                let mut config = Config::default();
                config.apply_env_fallbacks(&env);
                return Ok(config);
            }
        },
    };
    let text =
        fs::read_to_string(&path).with_context(|| format!("read config {}", path.display()))?;
    let config = parse_config(&text, &env).with_context(|| format!("load {}", path.display()))?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sheetpost").join("config.json"))
}

/// Replace `${NAME}` in every string value. Unset names are left verbatim.
pub fn substitute_env(value: Value, env: &dyn Fn(&str) -> Option<String>) -> Value {
    match value {
        Value::String(text) => Value::String(substitute_str(&text, env)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| substitute_env(item, env))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, substitute_env(item, env)))
                .collect(),
        ),
        other => other,
    }
}

fn env_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("regex for env references"))
}

fn substitute_str(text: &str, env: &dyn Fn(&str) -> Option<String>) -> String {
    env_reference_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            env(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
