use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://your-logto-endpoint.logto.app";
pub const DEFAULT_APP_ID: &str = "your-app-id";
pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";
const DEFAULT_SIGN_IN_TIMEOUT_SECS: u64 = 180;

/// On-disk layout of `config.toml`. Every key is optional.
#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct FileConfig {
    identity: IdentitySection,
    api: UrlSection,
    app: UrlSection,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct IdentitySection {
    endpoint: Option<String>,
    app_id: Option<String>,
    resource: Option<String>,
    sign_in_timeout_secs: Option<u64>,
}

#[derive(Deserialize, Default, Debug)]
#[serde(default)]
struct UrlSection {
    url: Option<String>,
}

/// Identity provider settings used by the session gate.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub endpoint: String,
    pub app_id: String,
    pub resource: Option<String>,
    pub sign_in_timeout: Duration,
}

/// Resolved runtime configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub identity: IdentityConfig,
    pub api_url: String,
    pub app_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let file = if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|e| Error::ConfigRead {
                    path: config_path.clone(),
                    source: e,
                })?;

            toml::from_str(&contents).map_err(|e| Error::ConfigParse {
                path: config_path,
                source: e,
            })?
        } else {
            FileConfig::default()
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "users")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(Error::NoConfigDir)
    }

    /// Session tokens live next to the config file.
    pub fn session_path() -> Result<PathBuf> {
        Self::config_path().map(|p| p.with_file_name("session.json"))
    }

    /// Merge environment, file and defaults, in that order of precedence.
    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let endpoint = env("LOGTO_ENDPOINT")
            .or(file.identity.endpoint)
            .unwrap_or_else(|| DEFAULT_IDENTITY_ENDPOINT.to_string());
        let app_id = env("LOGTO_APP_ID")
            .or(file.identity.app_id)
            .unwrap_or_else(|| DEFAULT_APP_ID.to_string());
        let resource = env("LOGTO_RESOURCE").or(file.identity.resource);
        let api_url = env("API_URL")
            .or(file.api.url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let app_url = env("APP_URL")
            .or(file.app.url)
            .unwrap_or_else(|| DEFAULT_APP_URL.to_string());
        let timeout_secs = file
            .identity
            .sign_in_timeout_secs
            .unwrap_or(DEFAULT_SIGN_IN_TIMEOUT_SECS);

        Ok(Self {
            identity: IdentityConfig {
                endpoint: normalize_url("identity endpoint", &endpoint)?,
                app_id,
                resource,
                sign_in_timeout: Duration::from_secs(timeout_secs),
            },
            api_url: normalize_url("API URL", &api_url)?,
            app_url: normalize_url("app URL", &app_url)?,
        })
    }

    /// Base of the REST resources, e.g. `http://localhost:8080/api`.
    pub fn api_base(&self) -> String {
        format!("{}/api", self.api_url)
    }

    /// Where the identity provider sends the browser after sign-in.
    pub fn callback_uri(&self) -> String {
        format!("{}/callback", self.app_url)
    }

    /// Where the identity provider sends the browser after sign-out.
    pub fn sign_out_uri(&self) -> String {
        self.app_url.clone()
    }
}

fn normalize_url(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim().trim_end_matches('/');
    match Url::parse(trimmed) {
        Ok(url) if url.has_host() => Ok(trimmed.to_string()),
        _ => Err(Error::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}
