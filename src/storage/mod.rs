// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Registration Storage
//!
//! Durable record of which wallets have already been given an invite. This is
//! the dedupe source of truth: a wallet with an `Issued` record never mints a
//! second invite.
//!
//! ## Storage Layout
//!
//! ```text
//! {DB_NAME}                     # single redb file, created on first run
//!   registrations: wallet -> {"wallet", "status", "invite_url", "reserved_at", "issued_at"}
//! ```

pub mod registry;

pub use registry::{
    Registration, RegistrationStatus, RegistrationStore, Registry, Reservation, ReservationToken,
    StorageError, StorageResult, RESERVATION_TTL_SECS,
};
