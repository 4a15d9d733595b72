// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Bridge Ledger Database
//!
//! Embedded [redb](https://docs.rs/redb) database holding the internal
//! ledger: accounts, custodial register snapshots, transaction history and
//! swap orders. Values are serde_json bytes; secondary indexes map composite
//! keys to primary ids.
//!
//! ## Table Layout
//!
//! - `accounts`: account_id -> StoredAccount
//! - `screen_names`: normalized screen name -> account_id
//! - `registers`: register address -> StoredRegister
//! - `transactions`: txn_id -> TransactionRecord
//! - `external_txn_ids`: settlement-network txn id -> txn_id
//! - `account_txn_index`: account_id | ts_be | txn_id -> txn_id (ascending)
//! - `swaps`: swap_id -> SwapRecord
//! - `swap_index`: account_id | !ts_be | swap_id -> swap_id (descending)
//! - `meta`: counters (wallet tag allocator)
//!
//! ## Write discipline
//!
//! Multi-row mutations (`commit_transfer`, `commit_reconciliation`) run in a
//! single write transaction and re-validate their preconditions inside it,
//! so a commit either lands whole or not at all.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use rust_decimal::Decimal;
use thiserror::Error;

use super::records::{normalize_screen_name, StoredAccount, StoredRegister, SwapRecord, TransactionRecord};

// ============================================================================
// Table definitions
// ============================================================================

/// account_id -> JSON-serialized StoredAccount
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// normalized screen name -> account_id
const SCREEN_NAMES: TableDefinition<&str, &str> = TableDefinition::new("screen_names");

/// register address -> JSON-serialized StoredRegister
const REGISTERS: TableDefinition<&str, &[u8]> = TableDefinition::new("registers");

/// txn_id -> JSON-serialized TransactionRecord
const TRANSACTIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("transactions");

/// settlement-network txn id -> txn_id (idempotency guard)
const EXTERNAL_TXN_IDS: TableDefinition<&str, &str> = TableDefinition::new("external_txn_ids");

/// account_id | 0x00 | timestamp_be | 0x00 | txn_id -> txn_id
///
/// Plain big-endian millis, so a forward scan walks oldest-first.
const ACCOUNT_TXN_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("account_txn_index");

/// swap_id -> JSON-serialized SwapRecord
const SWAPS: TableDefinition<&str, &[u8]> = TableDefinition::new("swaps");

/// account_id | 0x00 | !timestamp_be | 0x00 | swap_id -> swap_id
///
/// Inverted big-endian millis, so a forward scan walks newest-first.
const SWAP_INDEX: TableDefinition<&[u8], &str> = TableDefinition::new("swap_index");

/// Singleton counters, keyed by name.
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// Meta key for the wallet tag allocator.
const NEXT_WALLET_TAG: &str = "next_wallet_tag";

/// First destination tag handed out by the allocator.
const WALLET_TAG_SEED: u64 = 1000;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum LedgerDbError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("insufficient balance")]
    InsufficientBalance,
}

/// Result of a reconciliation commit.
#[derive(Debug)]
pub struct ReconcileCommit {
    /// Account state after the commit.
    pub account: StoredAccount,
    /// Rows newly inserted.
    pub inserted: usize,
    /// Rows skipped because their external id was already recorded.
    pub skipped: usize,
}

// ============================================================================
// Key helpers
// ============================================================================

/// Build a time-ordered index key: `id | 0x00 | ts_be | 0x00 | suffix`.
///
/// `timestamp` is pre-inverted by the caller for descending indexes.
fn make_index_key(id: &str, timestamp: u64, suffix: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(id.len() + suffix.len() + 10);
    key.extend_from_slice(id.as_bytes());
    key.push(0);
    key.extend_from_slice(&timestamp.to_be_bytes());
    key.push(0);
    key.extend_from_slice(suffix.as_bytes());
    key
}

/// Prefix covering every index key for `id`.
fn index_prefix(id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(id.len() + 1);
    key.extend_from_slice(id.as_bytes());
    key.push(0);
    key
}

/// First key past every index key for `id` (separator bumped 0x00 -> 0x01).
fn index_prefix_end(id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(id.len() + 1);
    key.extend_from_slice(id.as_bytes());
    key.push(1);
    key
}

/// Prefix covering index keys for `id` starting at `timestamp`.
fn index_prefix_from(id: &str, timestamp: u64) -> Vec<u8> {
    let mut key = index_prefix(id);
    key.extend_from_slice(&timestamp.to_be_bytes());
    key
}

fn millis(date: DateTime<Utc>) -> u64 {
    date.timestamp_millis().max(0) as u64
}

// ============================================================================
// Database
// ============================================================================

pub struct LedgerDb {
    db: Database,
}

impl LedgerDb {
    /// Open (or create) the ledger database at `path`.
    ///
    /// All tables are created up front so later read transactions never hit
    /// a missing table.
    pub fn open(path: &Path) -> Result<Self, LedgerDbError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            write_txn.open_table(ACCOUNTS)?;
            write_txn.open_table(SCREEN_NAMES)?;
            write_txn.open_table(REGISTERS)?;
            write_txn.open_table(TRANSACTIONS)?;
            write_txn.open_table(EXTERNAL_TXN_IDS)?;
            write_txn.open_table(ACCOUNT_TXN_INDEX)?;
            write_txn.open_table(SWAPS)?;
            write_txn.open_table(SWAP_INDEX)?;
            write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap readiness probe: can we start a read transaction?
    pub fn is_healthy(&self) -> bool {
        self.db.begin_read().is_ok()
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Create an account with a balance of zero.
    ///
    /// Fails with [`LedgerDbError::Conflict`] if the account id or the
    /// normalized screen name is already taken.
    pub fn create_account(
        &self,
        account_id: &str,
        screen_name: &str,
        register_address: Option<String>,
        initial_tag: u64,
    ) -> Result<StoredAccount, LedgerDbError> {
        let key = normalize_screen_name(screen_name);
        let account = StoredAccount {
            account_id: account_id.to_string(),
            screen_name: screen_name.to_string(),
            screen_name_key: key.clone(),
            balance: Decimal::ZERO,
            register_address,
            wallet_tags: vec![initial_tag],
            last_reconciled_txn_id: None,
            version: 0,
            created_at: Utc::now(),
        };
        let bytes = serde_json::to_vec(&account)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let mut names = write_txn.open_table(SCREEN_NAMES)?;

            if accounts.get(account_id)?.is_some() {
                return Err(LedgerDbError::Conflict(format!(
                    "account {account_id} already exists"
                )));
            }
            if names.get(key.as_str())?.is_some() {
                return Err(LedgerDbError::Conflict(format!(
                    "screen name {screen_name} already taken"
                )));
            }

            accounts.insert(account_id, bytes.as_slice())?;
            names.insert(key.as_str(), account_id)?;
        }
        write_txn.commit()?;

        Ok(account)
    }

    pub fn get_account(&self, account_id: &str) -> Result<Option<StoredAccount>, LedgerDbError> {
        let read_txn = self.db.begin_read()?;
        let accounts = read_txn.open_table(ACCOUNTS)?;
        match accounts.get(account_id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes.value())?)),
            None => Ok(None),
        }
    }

    /// Look up an account by screen name, normalizing first.
    pub fn find_account_by_screen_name(
        &self,
        screen_name: &str,
    ) -> Result<Option<StoredAccount>, LedgerDbError> {
        let key = normalize_screen_name(screen_name);
        let read_txn = self.db.begin_read()?;
        let names = read_txn.open_table(SCREEN_NAMES)?;
        let account_id = match names.get(key.as_str())? {
            Some(id) => id.value().to_string(),
            None => return Ok(None),
        };
        let accounts = read_txn.open_table(ACCOUNTS)?;
        match accounts.get(account_id.as_str())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes.value())?)),
            None => Ok(None),
        }
    }

    /// Append a wallet tag to an account. Idempotent for known tags.
    pub fn append_wallet_tag(
        &self,
        account_id: &str,
        tag: u64,
    ) -> Result<StoredAccount, LedgerDbError> {
        let write_txn = self.db.begin_write()?;
        let account = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let bytes = accounts
                .get(account_id)?
                .map(|guard| guard.value().to_vec())
                .ok_or_else(|| LedgerDbError::NotFound(format!("account {account_id}")))?;
            let mut account: StoredAccount = serde_json::from_slice(&bytes)?;
            if !account.wallet_tags.contains(&tag) {
                account.wallet_tags.push(tag);
                account.version += 1;
                let updated = serde_json::to_vec(&account)?;
                accounts.insert(account_id, updated.as_slice())?;
            }
            account
        };
        write_txn.commit()?;
        Ok(account)
    }

    /// Hand out the next destination tag. Tags are unique for the lifetime
    /// of the database so routing on a shared register stays unambiguous.
    pub fn allocate_wallet_tag(&self) -> Result<u64, LedgerDbError> {
        let write_txn = self.db.begin_write()?;
        let tag = {
            let mut meta = write_txn.open_table(META)?;
            let current = meta
                .get(NEXT_WALLET_TAG)?
                .map(|guard| {
                    let mut buf = [0u8; 8];
                    let value = guard.value();
                    if value.len() == 8 {
                        buf.copy_from_slice(value);
                    }
                    u64::from_be_bytes(buf)
                })
                .unwrap_or(WALLET_TAG_SEED);
            let next = current + 1;
            meta.insert(NEXT_WALLET_TAG, next.to_be_bytes().as_slice())?;
            current
        };
        write_txn.commit()?;
        Ok(tag)
    }

    // ------------------------------------------------------------------
    // Custodial registers
    // ------------------------------------------------------------------

    /// Insert a register row if none exists yet.
    pub fn ensure_register(&self, address: &str) -> Result<(), LedgerDbError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut registers = write_txn.open_table(REGISTERS)?;
            if registers.get(address)?.is_none() {
                let bytes = serde_json::to_vec(&StoredRegister::unobserved(address))?;
                registers.insert(address, bytes.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_register(&self, address: &str) -> Result<Option<StoredRegister>, LedgerDbError> {
        let read_txn = self.db.begin_read()?;
        let registers = read_txn.open_table(REGISTERS)?;
        match registers.get(address)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes.value())?)),
            None => Ok(None),
        }
    }

    /// Overwrite a register's balance snapshot.
    pub fn upsert_register(
        &self,
        address: &str,
        balance: Decimal,
        refreshed_at: DateTime<Utc>,
    ) -> Result<(), LedgerDbError> {
        let register = StoredRegister {
            address: address.to_string(),
            balance,
            refreshed_at: Some(refreshed_at),
        };
        let bytes = serde_json::to_vec(&register)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut registers = write_txn.open_table(REGISTERS)?;
            registers.insert(address, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Atomic commits
    // ------------------------------------------------------------------

    /// Apply an internal transfer: debit one account, credit the other and
    /// insert both history rows, all in one transaction.
    ///
    /// The sender's balance is re-validated here, inside the write
    /// transaction, so two racing transfers cannot both spend the same
    /// funds. Returns the sender's new balance.
    pub fn commit_transfer(
        &self,
        debit: &TransactionRecord,
        credit: &TransactionRecord,
    ) -> Result<Decimal, LedgerDbError> {
        debug_assert!(debit.amount < Decimal::ZERO && credit.amount == -debit.amount);
        let amount = -debit.amount;

        let write_txn = self.db.begin_write()?;
        let sender_balance = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;

            let sender_bytes = accounts
                .get(debit.account_id.as_str())?
                .map(|guard| guard.value().to_vec())
                .ok_or_else(|| LedgerDbError::NotFound(format!("account {}", debit.account_id)))?;
            let mut sender: StoredAccount = serde_json::from_slice(&sender_bytes)?;

            let receiver_bytes = accounts
                .get(credit.account_id.as_str())?
                .map(|guard| guard.value().to_vec())
                .ok_or_else(|| LedgerDbError::NotFound(format!("account {}", credit.account_id)))?;
            let mut receiver: StoredAccount = serde_json::from_slice(&receiver_bytes)?;

            if sender.balance < amount {
                return Err(LedgerDbError::InsufficientBalance);
            }

            sender.balance -= amount;
            sender.version += 1;
            receiver.balance += amount;
            receiver.version += 1;

            let sender_updated = serde_json::to_vec(&sender)?;
            let receiver_updated = serde_json::to_vec(&receiver)?;
            accounts.insert(sender.account_id.as_str(), sender_updated.as_slice())?;
            accounts.insert(receiver.account_id.as_str(), receiver_updated.as_slice())?;

            let mut transactions = write_txn.open_table(TRANSACTIONS)?;
            let mut index = write_txn.open_table(ACCOUNT_TXN_INDEX)?;
            for record in [debit, credit] {
                let bytes = serde_json::to_vec(record)?;
                transactions.insert(record.txn_id.as_str(), bytes.as_slice())?;
                let key = make_index_key(&record.account_id, millis(record.date), &record.txn_id);
                index.insert(key.as_slice(), record.txn_id.as_str())?;
            }

            sender.balance
        };
        write_txn.commit()?;

        Ok(sender_balance)
    }

    /// Commit the outcome of a reconciliation walk: new balance, advanced
    /// checkpoint and the rows for newly observed settlement events.
    ///
    /// The commit is compare-and-set on the account `version` read at the
    /// start of the walk; a concurrent writer makes this fail with
    /// [`LedgerDbError::Conflict`] and nothing is persisted. Rows whose
    /// external id is already recorded are skipped, which makes replays of
    /// the same settlement event a no-op.
    pub fn commit_reconciliation(
        &self,
        account_id: &str,
        expected_version: u64,
        new_balance: Decimal,
        checkpoint: Option<&str>,
        rows: &[TransactionRecord],
    ) -> Result<ReconcileCommit, LedgerDbError> {
        let write_txn = self.db.begin_write()?;
        let commit = {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            let bytes = accounts
                .get(account_id)?
                .map(|guard| guard.value().to_vec())
                .ok_or_else(|| LedgerDbError::NotFound(format!("account {account_id}")))?;
            let mut account: StoredAccount = serde_json::from_slice(&bytes)?;

            if account.version != expected_version {
                return Err(LedgerDbError::Conflict(format!(
                    "account {account_id} moved from version {expected_version} to {}",
                    account.version
                )));
            }

            let mut transactions = write_txn.open_table(TRANSACTIONS)?;
            let mut external_ids = write_txn.open_table(EXTERNAL_TXN_IDS)?;
            let mut index = write_txn.open_table(ACCOUNT_TXN_INDEX)?;

            let mut inserted = 0;
            let mut skipped = 0;
            for record in rows {
                if let Some(external_id) = record.external_txn_id.as_deref() {
                    if external_ids.get(external_id)?.is_some() {
                        skipped += 1;
                        continue;
                    }
                    external_ids.insert(external_id, record.txn_id.as_str())?;
                }
                let record_bytes = serde_json::to_vec(record)?;
                transactions.insert(record.txn_id.as_str(), record_bytes.as_slice())?;
                let key = make_index_key(&record.account_id, millis(record.date), &record.txn_id);
                index.insert(key.as_slice(), record.txn_id.as_str())?;
                inserted += 1;
            }

            account.balance = new_balance;
            if let Some(checkpoint) = checkpoint {
                account.last_reconciled_txn_id = Some(checkpoint.to_string());
            }
            account.version += 1;
            let updated = serde_json::to_vec(&account)?;
            accounts.insert(account_id, updated.as_slice())?;

            ReconcileCommit {
                account,
                inserted,
                skipped,
            }
        };
        write_txn.commit()?;

        Ok(commit)
    }

    // ------------------------------------------------------------------
    // Transaction history
    // ------------------------------------------------------------------

    /// The `limit` most recent rows for an account, ordered oldest-first.
    pub fn recent_transactions(
        &self,
        account_id: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, LedgerDbError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACCOUNT_TXN_INDEX)?;

        let prefix = index_prefix(account_id);
        let end = index_prefix_end(account_id);
        let mut txn_ids = Vec::with_capacity(limit);
        for entry in index.range::<&[u8]>(prefix.as_slice()..end.as_slice())?.rev() {
            let (_key, value) = entry?;
            txn_ids.push(value.value().to_string());
            if txn_ids.len() == limit {
                break;
            }
        }
        txn_ids.reverse();

        let transactions = read_txn.open_table(TRANSACTIONS)?;
        let mut records = Vec::with_capacity(txn_ids.len());
        for txn_id in txn_ids {
            if let Some(bytes) = transactions.get(txn_id.as_str())? {
                records.push(serde_json::from_slice(bytes.value())?);
            }
        }
        Ok(records)
    }

    /// Up to `limit` rows strictly after `min_date`, ordered oldest-first.
    pub fn transactions_after(
        &self,
        account_id: &str,
        min_date: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>, LedgerDbError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACCOUNT_TXN_INDEX)?;

        let start = index_prefix_from(account_id, millis(min_date).saturating_add(1));
        let end = index_prefix_end(account_id);
        let mut txn_ids = Vec::new();
        for entry in index.range::<&[u8]>(start.as_slice()..end.as_slice())? {
            let (_key, value) = entry?;
            txn_ids.push(value.value().to_string());
            if txn_ids.len() == limit {
                break;
            }
        }

        let transactions = read_txn.open_table(TRANSACTIONS)?;
        let mut records = Vec::with_capacity(txn_ids.len());
        for txn_id in txn_ids {
            if let Some(bytes) = transactions.get(txn_id.as_str())? {
                records.push(serde_json::from_slice(bytes.value())?);
            }
        }
        Ok(records)
    }

    /// Whether a settlement-network transaction id has already produced a row.
    pub fn contains_external_txn(&self, external_id: &str) -> Result<bool, LedgerDbError> {
        let read_txn = self.db.begin_read()?;
        let external_ids = read_txn.open_table(EXTERNAL_TXN_IDS)?;
        Ok(external_ids.get(external_id)?.is_some())
    }

    // ------------------------------------------------------------------
    // Swaps
    // ------------------------------------------------------------------

    pub fn insert_swap(&self, record: &SwapRecord) -> Result<(), LedgerDbError> {
        let bytes = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut swaps = write_txn.open_table(SWAPS)?;
            swaps.insert(record.swap_id.as_str(), bytes.as_slice())?;

            let mut index = write_txn.open_table(SWAP_INDEX)?;
            let key = make_index_key(&record.account_id, !millis(record.date), &record.swap_id);
            index.insert(key.as_slice(), record.swap_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Record the settlement-network id of the payment that funded a swap.
    pub fn set_swap_external_id(
        &self,
        swap_id: &str,
        external_id: &str,
    ) -> Result<SwapRecord, LedgerDbError> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut swaps = write_txn.open_table(SWAPS)?;
            let bytes = swaps
                .get(swap_id)?
                .map(|guard| guard.value().to_vec())
                .ok_or_else(|| LedgerDbError::NotFound(format!("swap {swap_id}")))?;
            let mut record: SwapRecord = serde_json::from_slice(&bytes)?;
            record.external_txn_id = Some(external_id.to_string());
            let updated = serde_json::to_vec(&record)?;
            swaps.insert(swap_id, updated.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    /// Find an account's swap by deposit address and recorded date.
    pub fn find_swap(
        &self,
        account_id: &str,
        deposit_address: &str,
        date: DateTime<Utc>,
    ) -> Result<Option<SwapRecord>, LedgerDbError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(SWAP_INDEX)?;
        let swaps = read_txn.open_table(SWAPS)?;

        let prefix = index_prefix(account_id);
        let end = index_prefix_end(account_id);
        for entry in index.range::<&[u8]>(prefix.as_slice()..end.as_slice())? {
            let (_key, value) = entry?;
            if let Some(bytes) = swaps.get(value.value())? {
                let record: SwapRecord = serde_json::from_slice(bytes.value())?;
                if record.deposit_address == deposit_address && record.date == date {
                    return Ok(Some(record));
                }
            }
        }
        Ok(None)
    }

    /// The `limit` most recent swaps for an account, newest-first.
    pub fn recent_swaps(
        &self,
        account_id: &str,
        limit: usize,
    ) -> Result<Vec<SwapRecord>, LedgerDbError> {
        let prefix = index_prefix(account_id);
        self.scan_swaps(account_id, prefix, limit)
    }

    /// Up to `limit` swaps strictly older than `max_date`, newest-first.
    pub fn swaps_before(
        &self,
        account_id: &str,
        max_date: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SwapRecord>, LedgerDbError> {
        let newest_allowed = millis(max_date).saturating_sub(1);
        let start = index_prefix_from(account_id, !newest_allowed);
        self.scan_swaps(account_id, start, limit)
    }

    fn scan_swaps(
        &self,
        account_id: &str,
        start: Vec<u8>,
        limit: usize,
    ) -> Result<Vec<SwapRecord>, LedgerDbError> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(SWAP_INDEX)?;
        let swaps = read_txn.open_table(SWAPS)?;

        let end = index_prefix_end(account_id);
        let mut records = Vec::with_capacity(limit);
        for entry in index.range::<&[u8]>(start.as_slice()..end.as_slice())? {
            let (_key, value) = entry?;
            if let Some(bytes) = swaps.get(value.value())? {
                records.push(serde_json::from_slice(bytes.value())?);
            }
            if records.len() == limit {
                break;
            }
        }
        Ok(records)
    }
}
