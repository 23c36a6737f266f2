// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration registry backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `registrations`: wallet address → serialized [`Registration`] (JSON bytes)
//!
//! ## Reservation Protocol
//!
//! A wallet moves through at most two states: `Reserved` (slot claimed, no
//! invite yet) and `Issued` (invite URL recorded). Claiming the slot is an
//! insert-if-absent inside a single write transaction; redb admits one writer
//! at a time, so two concurrent claims for the same wallet cannot both win.
//!
//! The winner gets a [`ReservationToken`]. `complete` and `release` only act
//! on the reservation the token names, so a holder whose slot was taken over
//! after [`RESERVATION_TTL_SECS`] can neither record nor drop anything.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: wallet address → serialized Registration (JSON bytes).
const REGISTRATIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("registrations");

/// Age after which an unfinished reservation is treated as abandoned.
///
/// Must stay well above the worst-case time between `reserve` and `complete`
/// (one bounded invite call plus the save). Takeover exists to recover slots
/// left behind by a crash or a failed save; once it happens the wallet can
/// mint again even if the earlier invite is still live.
pub const RESERVATION_TTL_SECS: i64 = 600;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("wallet {0} already has an issued invite")]
    AlreadyIssued(String),

    #[error("reservation for wallet {0} is no longer held by the caller")]
    ReservationLost(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Slot claimed, invite not yet minted or not yet recorded.
    Reserved,
    /// Invite minted and recorded. Terminal.
    Issued,
}

/// Persisted registration for one wallet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub wallet: String,
    pub status: RegistrationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_url: Option<String>,
    pub reserved_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
}

impl Registration {
    fn reserved(wallet: &str, now: DateTime<Utc>) -> Self {
        Self {
            wallet: wallet.to_string(),
            status: RegistrationStatus::Reserved,
            invite_url: None,
            reserved_at: now,
            issued_at: None,
        }
    }

    pub fn is_issued(&self) -> bool {
        self.status == RegistrationStatus::Issued
    }

    /// A reservation nobody finished within [`RESERVATION_TTL_SECS`].
    pub fn is_abandoned(&self, now: DateTime<Utc>) -> bool {
        self.status == RegistrationStatus::Reserved
            && (now - self.reserved_at).num_seconds() >= RESERVATION_TTL_SECS
    }

    fn is_held_by(&self, token: ReservationToken) -> bool {
        self.status == RegistrationStatus::Reserved && self.reserved_at == token.reserved_at
    }
}

/// Proof of owning one particular reservation of a wallet's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationToken {
    pub reserved_at: DateTime<Utc>,
}

/// Result of trying to claim a wallet's slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// The caller now owns the slot and must `complete` or `release` it.
    Acquired(ReservationToken),
    /// Someone else holds the slot.
    Held(Registration),
}

// =============================================================================
// Registry trait
// =============================================================================

/// Dedupe store used by the registration workflow.
pub trait Registry: Send + Sync {
    /// Look up the registration for a wallet.
    fn get(&self, wallet: &str) -> StorageResult<Option<Registration>>;

    /// Atomically claim the slot for a wallet if nobody holds it.
    fn reserve(&self, wallet: &str, now: DateTime<Utc>) -> StorageResult<Reservation>;

    /// Record the minted invite on the reservation `token` names.
    ///
    /// Never overwrites an `Issued` record, and fails with `ReservationLost`
    /// when the slot now belongs to someone else.
    fn complete(
        &self,
        wallet: &str,
        token: ReservationToken,
        invite_url: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Registration>;

    /// Drop the unfinished reservation `token` names. `Issued` records are
    /// never removed.
    fn release(&self, wallet: &str, token: ReservationToken) -> StorageResult<()>;

    /// Number of stored registrations, reserved or issued.
    fn count(&self) -> StorageResult<u64>;
}

// =============================================================================
// RegistrationStore
// =============================================================================

/// Embedded ACID registration database.
pub struct RegistrationStore {
    db: Database,
}

impl RegistrationStore {
    /// Open the database at the given path, creating it on first run.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(REGISTRATIONS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl Registry for RegistrationStore {
    fn get(&self, wallet: &str) -> StorageResult<Option<Registration>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REGISTRATIONS)?;
        match table.get(wallet)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn reserve(&self, wallet: &str, now: DateTime<Utc>) -> StorageResult<Reservation> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(REGISTRATIONS)?;

            let existing = match table.get(wallet)? {
                Some(value) => Some(serde_json::from_slice::<Registration>(value.value())?),
                None => None,
            };

            if let Some(existing) = existing {
                if !existing.is_abandoned(now) {
                    // Nothing written; dropping the transaction aborts it
                    return Ok(Reservation::Held(existing));
                }
                tracing::warn!(
                    wallet = %wallet,
                    reserved_at = %existing.reserved_at,
                    "Taking over abandoned reservation"
                );
            }

            let json = serde_json::to_vec(&Registration::reserved(wallet, now))?;
            table.insert(wallet, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(Reservation::Acquired(ReservationToken { reserved_at: now }))
    }

    fn complete(
        &self,
        wallet: &str,
        token: ReservationToken,
        invite_url: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Registration> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(REGISTRATIONS)?;

            let existing = match table.get(wallet)? {
                Some(value) => Some(serde_json::from_slice::<Registration>(value.value())?),
                None => None,
            };

            let mut record = match existing {
                Some(r) if r.is_issued() => {
                    return Err(StorageError::AlreadyIssued(wallet.to_string()))
                }
                Some(r) if r.is_held_by(token) => r,
                _ => return Err(StorageError::ReservationLost(wallet.to_string())),
            };
            record.status = RegistrationStatus::Issued;
            record.invite_url = Some(invite_url.to_string());
            record.issued_at = Some(now);

            let json = serde_json::to_vec(&record)?;
            table.insert(wallet, json.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    fn release(&self, wallet: &str, token: ReservationToken) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(REGISTRATIONS)?;

            let existing = match table.get(wallet)? {
                Some(value) => Some(serde_json::from_slice::<Registration>(value.value())?),
                None => None,
            };

            match existing {
                Some(r) if r.is_held_by(token) => {
                    table.remove(wallet)?;
                }
                _ => return Err(StorageError::ReservationLost(wallet.to_string())),
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(REGISTRATIONS)?;
        Ok(table.len()?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const WALLET: &str = "tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb";

    fn temp_store() -> (RegistrationStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RegistrationStore::open(&dir.path().join("registry.redb")).unwrap();
        (store, dir)
    }

    fn acquire(store: &RegistrationStore, now: DateTime<Utc>) -> ReservationToken {
        match store.reserve(WALLET, now).unwrap() {
            Reservation::Acquired(token) => token,
            Reservation::Held(r) => panic!("slot unexpectedly held: {r:?}"),
        }
    }

    #[test]
    fn open_creates_missing_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("registry.redb");
        assert!(!path.exists());

        let store = RegistrationStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn get_missing_wallet_is_none() {
        let (store, _dir) = temp_store();
        assert_eq!(store.get(WALLET).unwrap(), None);
    }

    #[test]
    fn reserve_then_complete() {
        let (store, _dir) = temp_store();
        let now = Utc::now();

        let token = acquire(&store, now);
        assert_eq!(token.reserved_at, now);
        let pending = store.get(WALLET).unwrap().unwrap();
        assert_eq!(pending.status, RegistrationStatus::Reserved);
        assert_eq!(pending.invite_url, None);

        let record = store
            .complete(WALLET, token, "https://discord.gg/abc123", now)
            .unwrap();
        assert!(record.is_issued());

        let stored = store.get(WALLET).unwrap().unwrap();
        assert_eq!(stored.invite_url.as_deref(), Some("https://discord.gg/abc123"));
        assert_eq!(stored.issued_at, Some(now));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn second_reservation_is_held() {
        let (store, _dir) = temp_store();
        let now = Utc::now();

        acquire(&store, now);
        match store.reserve(WALLET, now).unwrap() {
            Reservation::Held(r) => assert_eq!(r.status, RegistrationStatus::Reserved),
            Reservation::Acquired(_) => panic!("second reservation must not win"),
        }
    }

    #[test]
    fn issued_record_is_never_overwritten() {
        let (store, _dir) = temp_store();
        let now = Utc::now();
        let token = acquire(&store, now);
        store.complete(WALLET, token, "https://discord.gg/first", now).unwrap();

        let err = store
            .complete(WALLET, token, "https://discord.gg/second", now)
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyIssued(_)));

        // Even far in the future an issued record is not reclaimable
        let later = now + Duration::days(30);
        assert!(matches!(
            store.reserve(WALLET, later).unwrap(),
            Reservation::Held(r) if r.invite_url.as_deref() == Some("https://discord.gg/first")
        ));
    }

    #[test]
    fn release_drops_reservation_only() {
        let (store, _dir) = temp_store();
        let now = Utc::now();

        let token = acquire(&store, now);
        store.release(WALLET, token).unwrap();
        assert_eq!(store.get(WALLET).unwrap(), None);

        let token = acquire(&store, now);
        store.complete(WALLET, token, "https://discord.gg/keep", now).unwrap();
        assert!(matches!(
            store.release(WALLET, token).unwrap_err(),
            StorageError::ReservationLost(_)
        ));
        assert!(store.get(WALLET).unwrap().unwrap().is_issued());
    }

    #[test]
    fn abandoned_reservation_can_be_taken_over() {
        let (store, _dir) = temp_store();
        let then = Utc::now();
        store.reserve(WALLET, then).unwrap();

        let soon = then + Duration::seconds(RESERVATION_TTL_SECS - 1);
        assert!(matches!(store.reserve(WALLET, soon).unwrap(), Reservation::Held(_)));

        let later = then + Duration::seconds(RESERVATION_TTL_SECS);
        assert_eq!(
            store.reserve(WALLET, later).unwrap(),
            Reservation::Acquired(ReservationToken { reserved_at: later })
        );
        assert_eq!(store.get(WALLET).unwrap().unwrap().reserved_at, later);
    }

    #[test]
    fn stale_holder_cannot_complete_or_release_after_takeover() {
        let (store, _dir) = temp_store();
        let then = Utc::now();
        let stale = acquire(&store, then);

        let later = then + Duration::seconds(RESERVATION_TTL_SECS);
        let current = acquire(&store, later);

        let err = store
            .complete(WALLET, stale, "https://discord.gg/stale", later)
            .unwrap_err();
        assert!(matches!(err, StorageError::ReservationLost(_)));
        let err = store.release(WALLET, stale).unwrap_err();
        assert!(matches!(err, StorageError::ReservationLost(_)));
        assert_eq!(store.get(WALLET).unwrap().unwrap().reserved_at, later);

        let record = store
            .complete(WALLET, current, "https://discord.gg/current", later)
            .unwrap();
        assert_eq!(record.invite_url.as_deref(), Some("https://discord.gg/current"));
    }

    #[test]
    fn complete_without_reservation_is_refused() {
        let (store, _dir) = temp_store();
        let now = Utc::now();
        let token = ReservationToken { reserved_at: now };

        let err = store
            .complete(WALLET, token, "https://discord.gg/orphan", now)
            .unwrap_err();
        assert!(matches!(err, StorageError::ReservationLost(_)));
        assert_eq!(store.get(WALLET).unwrap(), None);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.redb");
        let now = Utc::now();
        {
            let store = RegistrationStore::open(&path).unwrap();
            let token = acquire(&store, now);
            store.complete(WALLET, token, "https://discord.gg/persist", now).unwrap();
        }

        let reopened = RegistrationStore::open(&path).unwrap();
        let record = reopened.get(WALLET).unwrap().unwrap();
        assert_eq!(record.invite_url.as_deref(), Some("https://discord.gg/persist"));
    }

    #[test]
    fn concurrent_reservations_have_one_winner() {
        let (store, _dir) = temp_store();
        let store = std::sync::Arc::new(store);
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.reserve(WALLET, now).unwrap())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| matches!(r, Reservation::Acquired(_)))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(store.count().unwrap(), 1);
    }
}
