// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment exactly once, at startup, into
//! an immutable [`Config`]. Components receive it (or the pieces they need)
//! through their constructors and never touch the environment themselves.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `BOT_TOKEN` | Discord bot credential used to mint invites | Required |
//! | `CHANNEL_ID` | Channel the invites point at | Required |
//! | `DB_NAME` | Path of the redb registration database | `pubkeyhashes.redb` |
//! | `DISCORD_URL` | Public base of invite links | `https://discord.gg` |
//! | `DISCORD_API_URL` | Discord REST API base | `https://discord.com/api/v10` |
//! | `TEZOS_URL` | Wallet lookup service base | `https://check.tezos.com` |
//! | `ENVIRONMENT` | `production` or anything else | `development` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `WWW_DIR` | Static site root | `www` |
//! | `UPSTREAM_TIMEOUT_SECS` | Timeout for each upstream call, under half the reservation TTL | `5` |
//! | `VERIFIER_ATTEMPTS` | Attempts for the wallet lookup | `2` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter, overrides `ENVIRONMENT` | unset |

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use url::Url;

use crate::storage::RESERVATION_TTL_SECS;

pub const BOT_TOKEN_ENV: &str = "BOT_TOKEN";
pub const CHANNEL_ID_ENV: &str = "CHANNEL_ID";
pub const DB_NAME_ENV: &str = "DB_NAME";
pub const DISCORD_URL_ENV: &str = "DISCORD_URL";
pub const DISCORD_API_URL_ENV: &str = "DISCORD_API_URL";
pub const TEZOS_URL_ENV: &str = "TEZOS_URL";
pub const ENVIRONMENT_ENV: &str = "ENVIRONMENT";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const WWW_DIR_ENV: &str = "WWW_DIR";
pub const UPSTREAM_TIMEOUT_ENV: &str = "UPSTREAM_TIMEOUT_SECS";
pub const VERIFIER_ATTEMPTS_ENV: &str = "VERIFIER_ATTEMPTS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_DB_NAME: &str = "pubkeyhashes.redb";
const DEFAULT_DISCORD_URL: &str = "https://discord.gg";
const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";
const DEFAULT_TEZOS_URL: &str = "https://check.tezos.com";
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WWW_DIR: &str = "www";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 5;
const DEFAULT_VERIFIER_ATTEMPTS: u32 = 2;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(String),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Immutable process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub channel_id: String,
    pub db_path: PathBuf,
    /// Public invite base, without trailing slash.
    pub invite_base_url: String,
    /// Discord REST API base, without trailing slash.
    pub discord_api_url: String,
    /// Wallet lookup base, without trailing slash.
    pub verifier_base_url: String,
    pub environment: String,
    pub host: String,
    pub port: u16,
    pub www_dir: PathBuf,
    pub upstream_timeout: Duration,
    pub verifier_attempts: u32,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty or whitespace-only values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &str| get(name).ok_or_else(|| ConfigError::Missing(name.to_string()));
        let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let bot_token = required(BOT_TOKEN_ENV)?;
        let channel_id = required(CHANNEL_ID_ENV)?;

        let invite_base_url =
            parse_base_url(DISCORD_URL_ENV, &or_default(DISCORD_URL_ENV, DEFAULT_DISCORD_URL))?;
        let discord_api_url = parse_base_url(
            DISCORD_API_URL_ENV,
            &or_default(DISCORD_API_URL_ENV, DEFAULT_DISCORD_API_URL),
        )?;
        let verifier_base_url =
            parse_base_url(TEZOS_URL_ENV, &or_default(TEZOS_URL_ENV, DEFAULT_TEZOS_URL))?;

        let port = match get(PORT_ENV) {
            Some(raw) => parse_positive::<u16>(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };
        let timeout_secs = match get(UPSTREAM_TIMEOUT_ENV) {
            Some(raw) => parse_positive::<u64>(UPSTREAM_TIMEOUT_ENV, &raw)?,
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };
        // A live request must never look abandoned to the reservation takeover
        if timeout_secs.saturating_mul(2) >= RESERVATION_TTL_SECS.unsigned_abs() {
            return Err(ConfigError::Invalid {
                name: UPSTREAM_TIMEOUT_ENV.to_string(),
                reason: format!(
                    "must be below {} seconds (half the reservation TTL), got {timeout_secs}",
                    RESERVATION_TTL_SECS / 2
                ),
            });
        }
        let verifier_attempts = match get(VERIFIER_ATTEMPTS_ENV) {
            Some(raw) => parse_positive::<u32>(VERIFIER_ATTEMPTS_ENV, &raw)?,
            None => DEFAULT_VERIFIER_ATTEMPTS,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV.to_string(),
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        Ok(Self {
            bot_token,
            channel_id,
            db_path: PathBuf::from(or_default(DB_NAME_ENV, DEFAULT_DB_NAME)),
            invite_base_url,
            discord_api_url,
            verifier_base_url,
            environment: or_default(ENVIRONMENT_ENV, DEFAULT_ENVIRONMENT),
            host: or_default(HOST_ENV, DEFAULT_HOST),
            port,
            www_dir: PathBuf::from(or_default(WWW_DIR_ENV, DEFAULT_WWW_DIR)),
            upstream_timeout: Duration::from_secs(timeout_secs),
            verifier_attempts,
            log_format,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Socket address the HTTP server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: HOST_ENV.to_string(),
                reason: format!("{e}"),
            })
    }
}

/// Validate an absolute http(s) URL and return it without trailing slashes.
fn parse_base_url(name: &str, raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name: name.to_string(),
            reason: format!("unsupported scheme `{}`", parsed.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_positive<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialEq + Default,
    T::Err: std::fmt::Display,
{
    let value: T = raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            name: name.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
