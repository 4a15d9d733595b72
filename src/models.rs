// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize`, `Deserialize`, and `ToSchema`
//! for automatic JSON handling and OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Payments**: internal transfers, fee quotes, register sends
//! - **Transactions**: reconciled balance and history pages
//! - **Swaps**: cross-asset swap orders and funding resolution
//! - **Accounts**: provisioning and wallet tag allocation
//!
//! Monetary amounts are [`Decimal`] end to end and serialize as strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::storage::{StoredAccount, SwapRecord, TransactionRecord};

// =============================================================================
// Payment Models
// =============================================================================

/// Request to move funds between two internal accounts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Screen name of the receiving account (matched case-insensitively).
    pub receiver_screen_name: String,
    /// Amount to transfer. Must be positive.
    pub amount: Decimal,
}

/// Result of an internal transfer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The sender's balance after the transfer.
    pub balance: Decimal,
}

/// Request to price an outgoing payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteRequest {
    /// Destination address on the settlement network.
    pub to_address: String,
    /// Destination tag, when the receiver requires one.
    #[serde(default)]
    pub dest_tag: Option<u64>,
    /// Source tag to send under. Defaults to the account's first wallet tag.
    #[serde(default)]
    pub source_tag: Option<u64>,
    /// Amount to send. Must be positive and within the internal balance.
    pub amount: Decimal,
}

/// A priced payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteResponse {
    /// Network fee for the payment. Zero for pool-internal destinations.
    pub fee: Decimal,
    /// True when the destination is another custodial register and the
    /// payment settles internally.
    pub pool_internal: bool,
}

/// Request to submit the payment prepared by a preceding quote.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendRequest {
    /// The custodial register to send from.
    pub from_address: String,
    /// Amount being sent; used for the register liquidity check.
    pub amount: Decimal,
}

/// Result of a submitted payment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendResponse {
    /// Settlement-network result code, e.g. `tesSUCCESS`.
    pub result_code: String,
}

// =============================================================================
// Transaction Models
// =============================================================================

/// Reconciled balance with the newest page of history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionsResponse {
    /// The account balance after folding settlement-network history.
    pub balance: Decimal,
    /// Up to one page of history rows, oldest first.
    pub transactions: Vec<TransactionRecord>,
}

/// Cursor for paging further into stored history.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct NextTransactionsQuery {
    /// Return rows strictly after this instant (RFC 3339).
    pub min_date: DateTime<Utc>,
}

/// One further page of history rows.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NextTransactionsResponse {
    /// History rows strictly after the cursor, oldest first.
    pub transactions: Vec<TransactionRecord>,
}

// =============================================================================
// Swap Models
// =============================================================================

/// Request to record a swap order created with the external swap service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordSwapRequest {
    /// Asset being sold, e.g. `XRP`.
    pub from_asset: String,
    /// Asset being bought, e.g. `BTC`.
    pub to_asset: String,
    /// Deposit address issued by the swap service, with the destination
    /// tag inline (`rAddress?dt=NNN`).
    pub deposit_address: String,
    /// Address refunds are returned to if the swap fails.
    pub refund_address: String,
    /// The swap service's order id.
    pub order_id: String,
}

/// The newest page of an account's swaps.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SwapsResponse {
    /// Swap records, newest first.
    pub swaps: Vec<SwapRecord>,
}

/// Cursor for paging further into swap history.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct NextSwapsQuery {
    /// Return swaps strictly older than this instant (RFC 3339).
    pub max_date: DateTime<Utc>,
}

/// One further page of swap records.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NextSwapsResponse {
    /// Swap records strictly older than the cursor, newest first.
    pub swaps: Vec<SwapRecord>,
    /// True when a full page came back and older records may remain.
    pub has_more: bool,
}

/// Lookup of the payment that funded a swap deposit.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ResolveSwapQuery {
    /// The swap's deposit address, as recorded.
    pub deposit_address: String,
    /// The swap's recorded date (RFC 3339).
    pub date: DateTime<Utc>,
    /// The custodial register the deposit was funded from.
    pub from_address: String,
}

/// Result of a swap funding lookup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolveSwapResponse {
    /// Settlement-network id of the funding payment, if one has appeared.
    pub external_txn_id: Option<String>,
}

// =============================================================================
// Account Models
// =============================================================================

/// Request to provision a new internal account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProvisionAccountRequest {
    /// Caller-assigned account id.
    pub account_id: String,
    /// Display name; must be unique after normalization.
    pub screen_name: String,
    /// Custodial register to route deposits through. Assigned
    /// round-robin from the configured pool when omitted.
    #[serde(default)]
    pub register_address: Option<String>,
}

/// An internal account as exposed by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    /// The account id.
    pub account_id: String,
    /// The account's display name.
    pub screen_name: String,
    /// Current internal balance.
    pub balance: Decimal,
    /// The custodial register deposits route through.
    pub register_address: Option<String>,
    /// Destination tags owned by this account.
    pub wallet_tags: Vec<u64>,
}

impl From<StoredAccount> for AccountResponse {
    fn from(account: StoredAccount) -> Self {
        Self {
            account_id: account.account_id,
            screen_name: account.screen_name,
            balance: account.balance,
            register_address: account.register_address,
            wallet_tags: account.wallet_tags,
        }
    }
}

/// A freshly allocated wallet tag.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletTagResponse {
    /// The register the tag routes through.
    pub register_address: String,
    /// The allocated destination tag.
    pub tag: u64,
}
