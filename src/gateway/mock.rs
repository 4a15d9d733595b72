// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scripted in-memory gateway for engine tests.
//!
//! Balances and history are set up front; submissions are recorded in call
//! order and their results can be scripted per call. With nothing scripted,
//! submissions succeed with `tesSUCCESS`.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::types::{
    BalanceChange, HistoryFilter, LedgerTransaction, PaymentEndpoint, PaymentInstructions,
    PaymentSpecification, PreparedPayment, SubmitResult, TransactionOutcome, RESULT_SUCCESS,
};
use super::{GatewayError, LedgerGateway};
use crate::vault::Secret;

/// One recorded `sign_and_submit` attempt.
#[derive(Debug, Clone)]
pub struct Submission {
    pub address: String,
    pub payment: serde_json::Value,
}

#[derive(Default)]
struct MockState {
    balances: HashMap<String, Decimal>,
    history: HashMap<String, Vec<LedgerTransaction>>,
    fee: Decimal,
    submit_results: VecDeque<Option<SubmitResult>>,
    submissions: Vec<Submission>,
    unavailable: bool,
}

pub struct MockGateway {
    state: Mutex<MockState>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                fee: dec!(0.000012),
                ..MockState::default()
            }),
        }
    }

    pub fn set_balance(&self, address: &str, balance: Decimal) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(address.to_string(), balance);
    }

    pub fn set_history(&self, address: &str, history: Vec<LedgerTransaction>) {
        self.state
            .lock()
            .unwrap()
            .history
            .insert(address.to_string(), history);
    }

    pub fn set_fee(&self, fee: Decimal) {
        self.state.lock().unwrap().fee = fee;
    }

    /// Script the result of the next unscripted submission.
    pub fn push_submit_result(&self, result: Option<SubmitResult>) {
        self.state.lock().unwrap().submit_results.push_back(result);
    }

    /// Make every call fail with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    fn check_available(state: &MockState) -> Result<(), GatewayError> {
        if state.unavailable {
            return Err(GatewayError::Request("gateway offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    async fn get_balance(&self, address: &str) -> Result<Decimal, GatewayError> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        state
            .balances
            .get(address)
            .copied()
            .ok_or_else(|| GatewayError::Request(format!("no balance scripted for {address}")))
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        _filter: Option<&HistoryFilter>,
    ) -> Result<Vec<LedgerTransaction>, GatewayError> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(state.history.get(address).cloned().unwrap_or_default())
    }

    async fn build_instructions(
        &self,
        source: &PaymentEndpoint,
        destination: &PaymentEndpoint,
        amount: Decimal,
    ) -> Result<PreparedPayment, GatewayError> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(PreparedPayment {
            payment: serde_json::json!({
                "source": source,
                "destination": destination,
                "amount": amount,
            }),
            instructions: PaymentInstructions {
                fee: state.fee,
                sequence: Some(1),
                max_ledger_version: None,
            },
        })
    }

    async fn sign_and_submit(
        &self,
        address: &str,
        _secret: &Secret,
        payment: &PreparedPayment,
    ) -> Result<Option<SubmitResult>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        state.submissions.push(Submission {
            address: address.to_string(),
            payment: payment.payment.clone(),
        });
        Ok(state.submit_results.pop_front().unwrap_or_else(|| {
            Some(SubmitResult {
                result_code: RESULT_SUCCESS.to_string(),
                external_txn_id: None,
            })
        }))
    }
}

/// Build a history event where the resolved endpoints match the submitted
/// specification. Tests pinning the divergence between the two construct
/// [`LedgerTransaction`] directly.
pub fn ledger_event(
    id: &str,
    source: (&str, Option<u64>),
    destination: (&str, Option<u64>),
    changes: &[(&str, Decimal)],
    result: &str,
    timestamp: DateTime<Utc>,
) -> LedgerTransaction {
    let source = PaymentEndpoint::new(source.0, source.1);
    let destination = PaymentEndpoint::new(destination.0, destination.1);
    let mut balance_changes = HashMap::new();
    for (address, delta) in changes {
        balance_changes.insert(
            address.to_string(),
            vec![BalanceChange {
                currency: "XRP".to_string(),
                value: *delta,
            }],
        );
    }
    LedgerTransaction {
        id: id.to_string(),
        specification: PaymentSpecification {
            source: source.clone(),
            destination: destination.clone(),
        },
        source,
        destination,
        outcome: TransactionOutcome {
            result: result.to_string(),
            timestamp,
            balance_changes,
        },
    }
}
