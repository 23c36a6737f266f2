// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Registration Workflow
//!
//! Turns one submitted wallet address into exactly one [`Outcome`]:
//!
//! ```text
//! validate ─✗→ BadInput
//!    │
//! lookup ──Issued/Reserved→ AlreadyRegistered
//!    │ (absent)
//! verify ──NotFound→ WalletNotFound
//!    │  └─error→ UpstreamError
//! reserve ─held→ AlreadyRegistered
//!    │
//! issue ───error→ release slot, IssuerError
//!    │
//! complete ─error→ StoreError
//!    │
//! Issued
//! ```
//!
//! The slot is reserved with an atomic insert-if-absent *before* the invite
//! is minted, so concurrent requests for one wallet mint at most one invite.
//! Verification runs before the reservation so an unknown wallet never
//! touches the store. The reservation token travels to `complete` and
//! `release`, which refuse to act once the slot has been taken over.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::{
    providers::{InviteIssuer, WalletStatus, WalletVerifier},
    storage::{Registry, Reservation, ReservationToken, StorageError},
    validation::validate_address,
};

/// Attempts at recording a minted invite before giving up.
const COMPLETE_ATTEMPTS: u32 = 3;
const COMPLETE_BACKOFF: Duration = Duration::from_millis(50);

/// Terminal result of one registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeTag {
    BadInput,
    AlreadyRegistered,
    WalletNotFound,
    UpstreamError,
    IssuerError,
    StoreError,
    Issued,
}

impl OutcomeTag {
    /// Whether this outcome is an internal failure rather than a business answer.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            OutcomeTag::UpstreamError | OutcomeTag::IssuerError | OutcomeTag::StoreError
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub tag: OutcomeTag,
    /// Present for `Issued`, and for `AlreadyRegistered` once the earlier
    /// invite has been recorded.
    pub invite_url: Option<String>,
}

impl Outcome {
    pub fn new(tag: OutcomeTag) -> Self {
        Self {
            tag,
            invite_url: None,
        }
    }

    pub fn with_url(tag: OutcomeTag, invite_url: impl Into<String>) -> Self {
        Self {
            tag,
            invite_url: Some(invite_url.into()),
        }
    }

    fn already_registered(invite_url: Option<String>) -> Self {
        Self {
            tag: OutcomeTag::AlreadyRegistered,
            invite_url,
        }
    }
}

/// Request-scoped orchestration of validation, dedupe, verification,
/// invite minting and persistence. Shared across requests.
pub struct RegistrationWorkflow {
    store: Arc<dyn Registry>,
    verifier: Arc<dyn WalletVerifier>,
    issuer: Arc<dyn InviteIssuer>,
    channel_id: String,
}

impl RegistrationWorkflow {
    pub fn new(
        store: Arc<dyn Registry>,
        verifier: Arc<dyn WalletVerifier>,
        issuer: Arc<dyn InviteIssuer>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            verifier,
            issuer,
            channel_id: channel_id.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn Registry> {
        &self.store
    }

    /// Run the workflow for one submitted address. Never retries as a whole.
    pub async fn register(&self, address: &str) -> Outcome {
        if !validate_address(address) {
            debug!(length = address.len(), "Rejected address with invalid length");
            return Outcome::new(OutcomeTag::BadInput);
        }
        let wallet = address;

        match self.store.get(wallet) {
            Ok(Some(existing)) => {
                debug!(wallet = %wallet, status = ?existing.status, "Wallet already registered");
                return Outcome::already_registered(existing.invite_url);
            }
            Ok(None) => debug!(wallet = %wallet, "Wallet is not registered yet"),
            Err(e) => {
                error!(wallet = %wallet, operation = "lookup", error = %e, "Could not check registration");
                return Outcome::new(OutcomeTag::StoreError);
            }
        }

        match self.verifier.verify(wallet).await {
            Ok(WalletStatus::Valid) => debug!(wallet = %wallet, "Wallet exists"),
            Ok(WalletStatus::NotFound) => {
                warn!(wallet = %wallet, "Wallet not found");
                return Outcome::new(OutcomeTag::WalletNotFound);
            }
            Err(e) => {
                error!(wallet = %wallet, operation = "verify", error = %e, "Could not verify wallet");
                return Outcome::new(OutcomeTag::UpstreamError);
            }
        }

        let token = match self.store.reserve(wallet, Utc::now()) {
            Ok(Reservation::Acquired(token)) => {
                debug!(wallet = %wallet, "Reserved registration slot");
                token
            }
            Ok(Reservation::Held(existing)) => {
                debug!(wallet = %wallet, "Lost reservation race");
                return Outcome::already_registered(existing.invite_url);
            }
            Err(e) => {
                error!(wallet = %wallet, operation = "reserve", error = %e, "Could not reserve registration");
                return Outcome::new(OutcomeTag::StoreError);
            }
        };

        let invite_url = match self.issuer.issue(&self.channel_id).await {
            Ok(url) => url,
            Err(e) => {
                error!(
                    wallet = %wallet,
                    channel_id = %self.channel_id,
                    operation = "issue",
                    error = %e,
                    "Could not generate invite link"
                );
                if let Err(release_err) = self.store.release(wallet, token) {
                    error!(
                        wallet = %wallet,
                        operation = "release",
                        error = %release_err,
                        "Could not release reservation"
                    );
                }
                return Outcome::new(OutcomeTag::IssuerError);
            }
        };

        match self.complete_with_retry(wallet, token, &invite_url).await {
            Ok(()) => {
                info!(wallet = %wallet, "Invite issued");
                Outcome::with_url(OutcomeTag::Issued, invite_url)
            }
            Err(e) => {
                // The minted invite is only in this log line. The wallet stays
                // blocked until the reservation expires, after which it can
                // mint again.
                error!(
                    wallet = %wallet,
                    invite_url = %invite_url,
                    operation = "complete",
                    error = %e,
                    "Invite minted but registration could not be saved"
                );
                Outcome::new(OutcomeTag::StoreError)
            }
        }
    }

    async fn complete_with_retry(
        &self,
        wallet: &str,
        token: ReservationToken,
        invite_url: &str,
    ) -> Result<(), StorageError> {
        let mut attempt = 1;
        loop {
            match self.store.complete(wallet, token, invite_url, Utc::now()) {
                Ok(_) => return Ok(()),
                Err(e @ (StorageError::AlreadyIssued(_) | StorageError::ReservationLost(_))) => {
                    return Err(e)
                }
                Err(e) if attempt < COMPLETE_ATTEMPTS => {
                    warn!(wallet = %wallet, attempt, error = %e, "Saving registration failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(COMPLETE_BACKOFF).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
