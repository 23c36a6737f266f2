// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Discord invite minting.
//!
//! Invites are single-use and expire after a random age drawn uniformly from
//! `[MIN_INVITE_AGE_SECS, MAX_INVITE_AGE_SECS)`.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Config;

/// Shortest invite lifetime (2 hours).
pub const MIN_INVITE_AGE_SECS: u32 = 7200;
/// Upper bound of invite lifetime, exclusive (just under 24 hours).
pub const MAX_INVITE_AGE_SECS: u32 = 86399;

#[derive(Debug, thiserror::Error)]
pub enum IssuerError {
    #[error("invite creation timed out for channel {0}")]
    Timeout(String),

    #[error("invite request failed: {0}")]
    Request(String),

    #[error("invite creation rejected with {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("invite response was invalid: {0}")]
    InvalidResponse(String),
}

/// Mints single-use invites to a channel and returns their public URL.
#[async_trait]
pub trait InviteIssuer: Send + Sync {
    async fn issue(&self, channel_id: &str) -> Result<String, IssuerError>;
}

/// Draw an invite lifetime in seconds.
pub fn random_max_age() -> u32 {
    rand::thread_rng().gen_range(MIN_INVITE_AGE_SECS..MAX_INVITE_AGE_SECS)
}

#[derive(Debug, Serialize)]
struct CreateInviteRequest {
    max_age: u32,
    max_uses: u32,
    unique: bool,
}

#[derive(Debug, Deserialize)]
struct InviteResponse {
    code: String,
}

#[derive(Debug, Clone)]
pub struct DiscordIssuer {
    api_base_url: Url,
    invite_base_url: String,
    bot_token: String,
    http: Client,
}

impl DiscordIssuer {
    pub fn new(
        api_base_url: &str,
        invite_base_url: &str,
        bot_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IssuerError> {
        let api_base_url = Url::parse(api_base_url)
            .map_err(|e| IssuerError::Request(format!("invalid API URL {api_base_url}: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IssuerError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url,
            invite_base_url: invite_base_url.trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, IssuerError> {
        Self::new(
            &config.discord_api_url,
            &config.invite_base_url,
            config.bot_token.clone(),
            config.upstream_timeout,
        )
    }

    /// `{api}/channels/{channel_id}/invites`
    fn invites_url(&self, channel_id: &str) -> Result<Url, IssuerError> {
        let mut url = self.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| IssuerError::Request(format!("{} cannot be a base", self.api_base_url)))?
            .pop_if_empty()
            .extend(["channels", channel_id, "invites"]);
        Ok(url)
    }

    /// Public URL for an invite code.
    pub fn invite_url(&self, code: &str) -> String {
        format!("{}/{}", self.invite_base_url, code)
    }
}

#[async_trait]
impl InviteIssuer for DiscordIssuer {
    async fn issue(&self, channel_id: &str) -> Result<String, IssuerError> {
        let url = self.invites_url(channel_id)?;
        let payload = CreateInviteRequest {
            max_age: random_max_age(),
            max_uses: 1,
            unique: true,
        };
        debug!(channel_id = %channel_id, max_age = payload.max_age, "Creating invite");

        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IssuerError::Timeout(channel_id.to_string())
                } else {
                    IssuerError::Request(format!("POST invite for channel {channel_id} failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IssuerError::Rejected { status, body });
        }

        let invite: InviteResponse = response
            .json()
            .await
            .map_err(|e| IssuerError::InvalidResponse(e.to_string()))?;

        let code = invite.code.trim();
        if code.is_empty() {
            return Err(IssuerError::InvalidResponse(
                "response did not include an invite code".to_string(),
            ));
        }

        Ok(self.invite_url(code))
    }
}
