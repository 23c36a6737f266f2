// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upstream integrations.
//!
//! - `tezos` - wallet existence lookup
//! - `discord` - single-use invite minting
//!
//! Each upstream call is a single request bounded by the configured timeout.
//! Only the read-only wallet lookup is ever retried.

pub mod discord;
pub mod tezos;

pub use discord::{DiscordIssuer, InviteIssuer, IssuerError};
pub use tezos::{TezosVerifier, VerifierError, WalletStatus, WalletVerifier};
