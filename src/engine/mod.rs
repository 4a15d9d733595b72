// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Core Engines
//!
//! The bridge's business logic, one module per concern:
//!
//! - [`transfer`]: instant transfers between internal accounts.
//! - [`quote`]: fee quoting; prepares and parks unsigned payments.
//! - [`liquidity`]: custodial register sends with reserve refills.
//! - [`reconcile`]: folds settlement-network history into the internal
//!   ledger.
//! - [`swap`]: cross-asset swap tracking and funding-payment resolution.
//!
//! Engines hold their dependencies behind `Arc` and are shared across
//! request handlers via [`AppState`](crate::state::AppState).

pub mod liquidity;
pub mod quote;
pub mod reconcile;
pub mod swap;
pub mod transfer;

pub use liquidity::CustodialLiquidityManager;
pub use quote::{FeeQuote, FeeQuoteEngine};
pub use reconcile::{LedgerReconciler, ReconcileOutcome};
pub use swap::{SwapDetails, SwapPage, SwapTracker};
pub use transfer::InternalTransferEngine;

/// Cache namespace for unsigned payments parked between quote and send,
/// keyed by account id.
pub(crate) const PREPARED_PAYMENT_NS: &str = "prepared-payments";
