// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Settlement Network Gateway
//!
//! Boundary to the external append-only settlement network. Everything the
//! bridge knows about the network arrives through [`LedgerGateway`]:
//! balance reads, transaction history, payment preparation, and signed
//! submission.
//!
//! The production implementation is [`SettlementClient`], a JSON-over-HTTP
//! client for a co-located gateway daemon that performs the actual signing
//! and submission. Sign-and-submit requests carry register secrets, so the
//! gateway endpoint must only ever be reachable over a private channel.
//!
//! Transport and decode failures surface as [`GatewayError`]; a submission
//! that got through but produced no usable result is reported as
//! `Ok(None)` and mapped to a submission failure by the caller.

pub mod client;
pub mod types;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::vault::Secret;

pub use client::SettlementClient;
pub use types::{
    BalanceChange, HistoryFilter, LedgerTransaction, PaymentEndpoint, PaymentInstructions,
    PaymentSpecification, PreparedPayment, SubmitResult, TransactionOutcome, RESULT_SUCCESS,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(String),

    #[error("gateway returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Client-side view of the settlement network.
///
/// Implementations must be safe to share across tasks; engines hold them
/// behind `Arc<dyn LedgerGateway>`.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Current on-network balance of `address` in the native unit.
    async fn get_balance(&self, address: &str) -> Result<Decimal, GatewayError>;

    /// Full transaction history of `address`, newest-first, optionally
    /// narrowed to one counterparty address/tag.
    async fn get_transaction_history(
        &self,
        address: &str,
        filter: Option<&HistoryFilter>,
    ) -> Result<Vec<LedgerTransaction>, GatewayError>;

    /// Build an unsigned payment with network-computed instructions
    /// (fee, sequence, expiry).
    async fn build_instructions(
        &self,
        source: &PaymentEndpoint,
        destination: &PaymentEndpoint,
        amount: Decimal,
    ) -> Result<PreparedPayment, GatewayError>;

    /// Sign `payment` with `secret` and submit it from `address`.
    ///
    /// `Ok(None)` means the gateway answered but had no result to report;
    /// the payment must be treated as failed and never blindly retried.
    async fn sign_and_submit(
        &self,
        address: &str,
        secret: &Secret,
        payment: &PreparedPayment,
    ) -> Result<Option<SubmitResult>, GatewayError>;
}
