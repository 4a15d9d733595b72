// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistent record types for the bridge ledger.
//!
//! These are the shapes stored in redb (as serde_json bytes) and, for
//! [`TransactionRecord`] and [`SwapRecord`], returned verbatim in API
//! responses. Monetary amounts are [`Decimal`] end to end.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

// ============================================================================
// Accounts
// ============================================================================

/// An internal ledger account.
///
/// `balance` is the bridge-internal balance, denominated in the external
/// network's native unit. `version` increments on every persisted mutation
/// and guards the compare-and-set commits in
/// [`LedgerDb::commit_reconciliation`](super::LedgerDb::commit_reconciliation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAccount {
    /// Opaque account identifier (matches the upstream identity provider).
    pub account_id: String,
    /// Display handle, unique under normalization.
    pub screen_name: String,
    /// NFKC-normalized, casefolded form of `screen_name` used for lookups.
    pub screen_name_key: String,
    /// Internal ledger balance.
    pub balance: Decimal,
    /// Custodial register this account receives through, once assigned.
    pub register_address: Option<String>,
    /// Destination/source tags this account is known to use on the
    /// external network.
    pub wallet_tags: Vec<u64>,
    /// External id of the newest settlement event already folded into
    /// `balance`. `None` until the first reconciliation.
    pub last_reconciled_txn_id: Option<String>,
    /// Optimistic-concurrency version, bumped on every write.
    pub version: u64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Normalize a screen name for uniqueness checks and lookups.
///
/// NFKC folds visually-equivalent Unicode sequences to one form, then
/// lowercasing collapses case. Two names normalizing to the same key are
/// considered the same handle.
pub fn normalize_screen_name(name: &str) -> String {
    name.trim().nfkc().collect::<String>().to_lowercase()
}

// ============================================================================
// Custodial registers
// ============================================================================

/// Cached view of a custodial register's on-network balance.
///
/// The authoritative balance lives on the external network; this row is a
/// snapshot refreshed during reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRegister {
    /// On-network address of the register.
    pub address: String,
    /// Last observed on-network balance.
    pub balance: Decimal,
    /// When `balance` was last refreshed from the network, if ever.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl StoredRegister {
    /// A register that has never been observed on the network.
    pub fn unobserved(address: &str) -> Self {
        Self {
            address: address.to_string(),
            balance: Decimal::ZERO,
            refreshed_at: None,
        }
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// One ledger movement as seen by a single account.
///
/// Internal transfers produce two of these (a debit and a credit, one per
/// side, sharing a timestamp). Reconciliation produces one per successful
/// settlement event, with `external_txn_id` set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionRecord {
    /// Bridge-local transaction id.
    pub txn_id: String,
    /// Account whose history this row belongs to.
    pub account_id: String,
    /// Settlement-network transaction id, for reconciled rows.
    pub external_txn_id: Option<String>,
    /// When the movement happened (settlement timestamp for reconciled
    /// rows, local time for internal transfers).
    pub date: DateTime<Utc>,
    /// Signed amount from this account's point of view. Negative amounts
    /// are outgoing and, for reconciled rows, already carry the surcharge.
    pub amount: Decimal,
    /// The other side: a screen name for internal transfers, an external
    /// address for reconciled rows.
    pub counterparty: String,
    /// Destination/source tag on this account's side of the movement.
    pub tag: Option<u64>,
}

// ============================================================================
// Swaps
// ============================================================================

/// A cross-asset swap initiated through an external swap service.
///
/// The bridge only tracks these; the swap itself happens elsewhere.
/// `external_txn_id` is filled in lazily once the funding payment is found
/// on the settlement network.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SwapRecord {
    /// Bridge-local swap id.
    pub swap_id: String,
    /// Account that initiated the swap.
    pub account_id: String,
    /// Asset sent into the swap service.
    pub from_asset: String,
    /// Asset the swap pays out.
    pub to_asset: String,
    /// Deposit address string handed out by the swap service. May embed a
    /// destination tag as `<address>?dt=<tag>`.
    pub deposit_address: String,
    /// Refund address supplied to the swap service.
    pub refund_address: String,
    /// Swap service's own order identifier.
    pub order_id: String,
    /// When the swap was recorded.
    pub date: DateTime<Utc>,
    /// Settlement-network id of the payment that funded the swap, once
    /// resolved.
    pub external_txn_id: Option<String>,
}
