// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tezos wallet existence lookup.
//!
//! The lookup service answers `GET {base}/{wallet}.json`. A 404 means the
//! wallet does not exist, which is a business answer and not a failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;

/// Pause between lookup attempts.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Answer from the wallet lookup service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletStatus {
    Valid,
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("wallet lookup timed out: {0}")]
    Timeout(String),

    #[error("wallet lookup failed: {0}")]
    Request(String),

    #[error("wallet lookup returned {status} for {url}")]
    UnexpectedStatus { status: StatusCode, url: String },
}

/// Checks whether a wallet exists upstream.
#[async_trait]
pub trait WalletVerifier: Send + Sync {
    async fn verify(&self, wallet: &str) -> Result<WalletStatus, VerifierError>;
}

#[derive(Debug, Clone)]
pub struct TezosVerifier {
    base_url: Url,
    attempts: u32,
    http: Client,
}

impl TezosVerifier {
    /// Create a verifier against `base_url`.
    ///
    /// `attempts` is clamped to at least one. Only failed lookups are retried;
    /// a 404 is final.
    pub fn new(base_url: &str, timeout: Duration, attempts: u32) -> Result<Self, VerifierError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| VerifierError::Request(format!("invalid base URL {base_url}: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VerifierError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            attempts: attempts.max(1),
            http,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, VerifierError> {
        Self::new(
            &config.verifier_base_url,
            config.upstream_timeout,
            config.verifier_attempts,
        )
    }

    /// `{base}/{wallet}.json`, with the wallet percent-encoded as one segment.
    fn lookup_url(&self, wallet: &str) -> Result<Url, VerifierError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| VerifierError::Request(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push(&format!("{wallet}.json"));
        Ok(url)
    }

    async fn lookup_once(&self, url: &Url) -> Result<WalletStatus, VerifierError> {
        let response = self.http.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                VerifierError::Timeout(url.to_string())
            } else {
                VerifierError::Request(format!("GET {url} failed: {e}"))
            }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(WalletStatus::NotFound),
            status if status.is_success() => Ok(WalletStatus::Valid),
            status => Err(VerifierError::UnexpectedStatus {
                status,
                url: url.to_string(),
            }),
        }
    }
}

#[async_trait]
impl WalletVerifier for TezosVerifier {
    async fn verify(&self, wallet: &str) -> Result<WalletStatus, VerifierError> {
        let url = self.lookup_url(wallet)?;
        debug!(wallet = %wallet, url = %url, "Fetching wallet");

        let mut attempt = 1;
        loop {
            match self.lookup_once(&url).await {
                Ok(status) => {
                    debug!(wallet = %wallet, ?status, "Wallet lookup answered");
                    return Ok(status);
                }
                Err(e) if attempt < self.attempts => {
                    warn!(wallet = %wallet, attempt, error = %e, "Wallet lookup failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use axum::{extract::Path, http::StatusCode as AxumStatus, routing::get, Router};

    const KNOWN: &str = "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb";
    const UNKNOWN: &str = "tz1UnknownUnknownUnknownUnknownUnkno";

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn lookup_service() -> Router {
        Router::new().route(
            "/{file}",
            get(|Path(file): Path<String>| async move {
                if file == format!("{KNOWN}.json") {
                    (AxumStatus::OK, r#"{"balance":"1"}"#)
                } else {
                    (AxumStatus::NOT_FOUND, "")
                }
            }),
        )
    }

    #[test]
    fn lookup_url_appends_json_segment() {
        let verifier =
            TezosVerifier::new("https://check.tezos.com/", Duration::from_secs(1), 1).unwrap();
        assert_eq!(
            verifier.lookup_url(KNOWN).unwrap().as_str(),
            format!("https://check.tezos.com/{KNOWN}.json")
        );

        let nested = TezosVerifier::new("http://host/api", Duration::from_secs(1), 1).unwrap();
        assert_eq!(
            nested.lookup_url("a/b?c").unwrap().as_str(),
            "http://host/api/a%2Fb%3Fc.json"
        );
    }

    #[tokio::test]
    async fn existing_wallet_is_valid() {
        let base = spawn(lookup_service()).await;
        let verifier = TezosVerifier::new(&base, Duration::from_secs(2), 1).unwrap();
        assert_eq!(verifier.verify(KNOWN).await.unwrap(), WalletStatus::Valid);
    }

    #[tokio::test]
    async fn missing_wallet_is_not_found() {
        let base = spawn(lookup_service()).await;
        let verifier = TezosVerifier::new(&base, Duration::from_secs(2), 3).unwrap();
        assert_eq!(verifier.verify(UNKNOWN).await.unwrap(), WalletStatus::NotFound);
    }

    #[tokio::test]
    async fn server_error_is_retried_then_surfaced() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/{file}",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    AxumStatus::BAD_GATEWAY
                }
            }),
        );
        let base = spawn(router).await;
        let verifier = TezosVerifier::new(&base, Duration::from_secs(2), 2).unwrap();

        let err = verifier.verify(KNOWN).await.unwrap_err();
        assert!(matches!(err, VerifierError::UnexpectedStatus { status, .. } if status == StatusCode::BAD_GATEWAY));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transient_failure_recovers_on_retry() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/{file}",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        AxumStatus::SERVICE_UNAVAILABLE
                    } else {
                        AxumStatus::OK
                    }
                }
            }),
        );
        let base = spawn(router).await;
        let verifier = TezosVerifier::new(&base, Duration::from_secs(2), 2).unwrap();

        assert_eq!(verifier.verify(KNOWN).await.unwrap(), WalletStatus::Valid);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let router = Router::new().route(
            "/{file}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                AxumStatus::OK
            }),
        );
        let base = spawn(router).await;
        let verifier = TezosVerifier::new(&base, Duration::from_millis(200), 1).unwrap();

        let err = verifier.verify(KNOWN).await.unwrap_err();
        assert!(matches!(err, VerifierError::Timeout(_)));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_an_error() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let verifier =
            TezosVerifier::new(&format!("http://{addr}"), Duration::from_secs(1), 1).unwrap();
        assert!(verifier.verify(KNOWN).await.is_err());
    }
}
