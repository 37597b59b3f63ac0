// src/config.rs
//! Runtime configuration, read from `SNAPFEED_*` environment variables
//! (a `.env` file is honoured by the binary).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;
use crate::ingest::config::{clean_list, parse_list, resolve_whitelist, ENV_PATH};
use crate::logging::LogFormat;
use crate::store::name::is_valid_account;
use crate::upstream::Credentials;

pub const DEFAULT_DELAY_MINUTES: u64 = 60;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// Pre-existing session token; skips credential login when set.
    pub auth_token: Option<String>,
    pub base_url: Url,
    pub store_path: PathBuf,
    pub delay: Duration,
    pub whitelist: Vec<String>,
    pub regenerate_only: bool,
    pub upstream_url: String,
    pub fetch_timeout: Duration,
    pub metrics_addr: Option<SocketAddr>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; tests feed a map instead of the process env.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let opt = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| opt(key).ok_or(ConfigError::Missing(key));

        let username = required("SNAPFEED_USERNAME")?;
        let password = opt("SNAPFEED_PASSWORD");
        let auth_token = opt("SNAPFEED_AUTH_TOKEN");
        if password.is_none() && auth_token.is_none() {
            return Err(ConfigError::Missing("SNAPFEED_PASSWORD"));
        }
        let credentials = Credentials {
            username,
            password,
            secondary_identity: required("SNAPFEED_SECONDARY_IDENTITY")?,
            secondary_credential: required("SNAPFEED_SECONDARY_CREDENTIAL")?,
        };

        let base_url = parse_base_url(&required("SNAPFEED_BASE_URL")?)?;

        let store_path = PathBuf::from(required("SNAPFEED_STORE_PATH")?);
        if !store_path.is_dir() {
            return Err(ConfigError::StorePath(store_path.display().to_string()));
        }

        let delay_minutes = parse_num(opt("SNAPFEED_DELAY_MINUTES"), "SNAPFEED_DELAY_MINUTES")?
            .unwrap_or(DEFAULT_DELAY_MINUTES);
        if delay_minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "SNAPFEED_DELAY_MINUTES",
                reason: "must be at least 1".into(),
            });
        }
        let timeout_secs = parse_num(
            opt("SNAPFEED_FETCH_TIMEOUT_SECS"),
            "SNAPFEED_FETCH_TIMEOUT_SECS",
        )?
        .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);

        let mut whitelist = opt("SNAPFEED_WHITELIST")
            .map(|s| parse_list(&s))
            .unwrap_or_default();
        let from_file = resolve_whitelist(opt(ENV_PATH).as_deref()).map_err(|e| ConfigError::Invalid {
            key: ENV_PATH,
            reason: format!("{e:#}"),
        })?;
        whitelist.extend(from_file);
        let whitelist = clean_list(whitelist);
        // Accounts become file and directory names in the store.
        if let Some(bad) = whitelist.iter().find(|a| !is_valid_account(a)) {
            return Err(ConfigError::Invalid {
                key: "SNAPFEED_WHITELIST",
                reason: format!("{bad:?} is not a valid account name"),
            });
        }

        let metrics_addr = opt("SNAPFEED_METRICS_ADDR")
            .map(|s| {
                s.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
                    key: "SNAPFEED_METRICS_ADDR",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let log_format = match opt("SNAPFEED_LOG_FORMAT").as_deref() {
            None => LogFormat::Compact,
            Some(s) => s.parse().map_err(|reason| ConfigError::Invalid {
                key: "SNAPFEED_LOG_FORMAT",
                reason,
            })?,
        };

        Ok(Self {
            credentials,
            auth_token,
            base_url,
            store_path,
            delay: Duration::from_secs(delay_minutes * 60),
            whitelist,
            regenerate_only: opt("SNAPFEED_REGENERATE_ONLY").is_some_and(|v| is_truthy(&v)),
            upstream_url: required("SNAPFEED_UPSTREAM_URL")?,
            fetch_timeout: Duration::from_secs(timeout_secs.max(1)),
            metrics_addr,
            log_format,
        })
    }
}

/// Links are resolved relative to the base, so it must name a directory.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        key: "SNAPFEED_BASE_URL",
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Invalid {
            key: "SNAPFEED_BASE_URL",
            reason: "not usable as a base URL".into(),
        });
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_num(v: Option<String>, key: &'static str) -> Result<Option<u64>, ConfigError> {
    v.map(|s| {
        s.parse::<u64>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
    })
    .transpose()
}

fn is_truthy(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
