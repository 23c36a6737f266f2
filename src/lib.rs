// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet Invite Gate - wallet-gated community invites
//!
//! A caller submits a Tezos wallet address. If the wallet exists upstream and
//! has never been given an invite, the service mints a single-use, expiring
//! Discord invite and records the wallet so it can never mint another.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers and router (Axum)
//! - `config` - Environment configuration
//! - `providers` - Wallet lookup and invite platform clients
//! - `registration` - The registration workflow
//! - `storage` - Registration registry (redb)
//! - `validation` - Address syntax checks

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod providers;
pub mod registration;
pub mod state;
pub mod storage;
pub mod validation;
