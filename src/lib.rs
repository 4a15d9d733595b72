// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Bridge - Custodial Payment Bridge Service
//!
//! This crate provides a custodial payment bridge in front of a Ripple-style
//! settlement network, routing user funds through shared custodial registers
//! addressed by wallet tags.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `engine` - Transfer, quote, liquidity, reconciliation and swap logic
//! - `gateway` - Settlement network client
//! - `storage` - Ledger database, cache and audit log (redb)
//! - `vault` - Custodial key directory and secret handling

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod models;
pub mod state;
pub mod storage;
pub mod vault;
