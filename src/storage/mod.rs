// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Durable state and its supporting pieces:
//!
//! - [`ledger_db`]: the embedded redb database holding accounts, register
//!   snapshots, transaction history and swap orders. This is the system of
//!   record for internal balances.
//! - [`cache`]: process-local LRU cache with TTLs, for read acceleration
//!   and short-lived parked state. Never the only home of durable data.
//! - [`audit`]: append-only JSONL trail of money-moving operations.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   bridge.redb       # ledger database
//!   audit/
//!     {date}.jsonl    # daily audit logs
//! ```

pub mod audit;
pub mod cache;
pub mod ledger_db;
pub mod records;

pub use audit::{AuditEvent, AuditEventType, AuditLog};
pub use cache::CacheService;
pub use ledger_db::{LedgerDb, LedgerDbError, ReconcileCommit};
pub use records::{
    normalize_screen_name, StoredAccount, StoredRegister, SwapRecord, TransactionRecord,
};
