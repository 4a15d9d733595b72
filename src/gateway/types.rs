// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wire types for the settlement network gateway.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Engine result code reported for a fully applied payment.
pub const RESULT_SUCCESS: &str = "tesSUCCESS";

/// One endpoint of a payment: an address plus an optional routing tag.
///
/// Custodial registers are shared, so the tag is what maps a ledger event
/// back to an individual account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEndpoint {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u64>,
}

impl PaymentEndpoint {
    pub fn new(address: impl Into<String>, tag: Option<u64>) -> Self {
        Self {
            address: address.into(),
            tag,
        }
    }
}

/// The payment as submitted (what the sender asked for).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSpecification {
    pub source: PaymentEndpoint,
    pub destination: PaymentEndpoint,
}

/// Optional narrowing of a history query to one counterparty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub counterparty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u64>,
}

/// Per-address balance movement reported by the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceChange {
    pub currency: String,
    pub value: Decimal,
}

/// Validated outcome of a ledger transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    /// Engine result code, `tesSUCCESS` when fully applied.
    pub result: String,
    pub timestamp: DateTime<Utc>,
    /// Net movement per address. Failed transactions still burn the network
    /// fee for the source, so an entry can exist for a non-success result.
    #[serde(default)]
    pub balance_changes: HashMap<String, Vec<BalanceChange>>,
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        self.result == RESULT_SUCCESS
    }

    /// Net balance movement for one address, if the network reported any.
    pub fn balance_change_for(&self, address: &str) -> Option<Decimal> {
        self.balance_changes
            .get(address)
            .and_then(|changes| changes.first())
            .map(|change| change.value)
    }
}

/// A historical transaction as returned by the settlement network.
///
/// `source`/`destination` are the resolved endpoints; `specification` is what
/// the sender originally submitted. Routing tags are matched against the
/// specification, counterparties are read from the resolved endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: String,
    pub specification: PaymentSpecification,
    pub source: PaymentEndpoint,
    pub destination: PaymentEndpoint,
    pub outcome: TransactionOutcome,
}

/// Fee and sequencing data for an unsigned payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub fee: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ledger_version: Option<u64>,
}

/// An unsigned payment prepared by the network, ready for signing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedPayment {
    /// Opaque payment body; passed back verbatim on submission.
    pub payment: serde_json::Value,
    pub instructions: PaymentInstructions,
}

/// Result of a signed submission that reached the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    /// Engine result code, e.g. `tesSUCCESS`.
    pub result_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_txn_id: Option<String>,
}
