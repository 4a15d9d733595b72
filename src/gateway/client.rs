// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-over-HTTP client for the settlement gateway daemon.
//!
//! The daemon wraps the actual network client library and exposes a small
//! REST surface: balances, account history, payment preparation and
//! sign-and-submit. Submission requests carry the register secret, which is
//! why the daemon is expected to sit on the same host or a private network
//! segment.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{
    BalanceChange, HistoryFilter, LedgerTransaction, PaymentEndpoint, PaymentInstructions,
    PreparedPayment, SubmitResult,
};
use super::{GatewayError, LedgerGateway};
use crate::vault::Secret;

/// Per-request timeout. The gateway talks to the network itself, so this
/// is deliberately generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct SettlementClient {
    http: reqwest::Client,
    base_url: String,
}

impl SettlementClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Request(format!(
                "{context} returned {status}: {body}"
            )));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("{context}: {e}")))
    }
}

// ============================================================================
// Wire envelopes
// ============================================================================

#[derive(Deserialize)]
struct BalancesEnvelope {
    balances: Vec<BalanceChange>,
}

#[derive(Deserialize)]
struct HistoryEnvelope {
    transactions: Vec<LedgerTransaction>,
}

#[derive(Serialize)]
struct PrepareRequest<'a> {
    source: &'a PaymentEndpoint,
    destination: &'a PaymentEndpoint,
    amount: Decimal,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    secret: &'a str,
    payment: &'a serde_json::Value,
    instructions: &'a PaymentInstructions,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitEnvelope {
    result_code: Option<String>,
    id: Option<String>,
}

/// A `null` body, or one with no result code, means the gateway had
/// nothing usable to report.
fn submit_result_from(body: serde_json::Value) -> Option<SubmitResult> {
    if body.is_null() {
        return None;
    }
    let envelope: SubmitEnvelope = serde_json::from_value(body).unwrap_or_default();
    envelope.result_code.map(|result_code| SubmitResult {
        result_code,
        external_txn_id: envelope.id,
    })
}

#[async_trait]
impl LedgerGateway for SettlementClient {
    async fn get_balance(&self, address: &str) -> Result<Decimal, GatewayError> {
        let url = self.endpoint(&format!("/v1/accounts/{address}/balances"));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("GET {url}: {e}")))?;
        let envelope: BalancesEnvelope = Self::decode(response, "balances").await?;
        envelope
            .balances
            .first()
            .map(|change| change.value)
            .ok_or_else(|| {
                GatewayError::InvalidResponse(format!("no balance entries for {address}"))
            })
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        filter: Option<&HistoryFilter>,
    ) -> Result<Vec<LedgerTransaction>, GatewayError> {
        let url = self.endpoint(&format!("/v1/accounts/{address}/transactions"));
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(filter) = filter {
            query.push(("counterparty", filter.counterparty.clone()));
            if let Some(tag) = filter.tag {
                query.push(("tag", tag.to_string()));
            }
        }
        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("GET {url}: {e}")))?;
        let envelope: HistoryEnvelope = Self::decode(response, "transaction history").await?;
        Ok(envelope.transactions)
    }

    async fn build_instructions(
        &self,
        source: &PaymentEndpoint,
        destination: &PaymentEndpoint,
        amount: Decimal,
    ) -> Result<PreparedPayment, GatewayError> {
        let url = self.endpoint(&format!("/v1/accounts/{}/payments/prepare", source.address));
        let response = self
            .http
            .post(&url)
            .json(&PrepareRequest {
                source,
                destination,
                amount,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("POST {url}: {e}")))?;
        Self::decode(response, "payment preparation").await
    }

    async fn sign_and_submit(
        &self,
        address: &str,
        secret: &Secret,
        payment: &PreparedPayment,
    ) -> Result<Option<SubmitResult>, GatewayError> {
        let url = self.endpoint(&format!("/v1/accounts/{address}/payments/submit"));
        let response = self
            .http
            .post(&url)
            .json(&SubmitRequest {
                secret: secret.expose(),
                payment: &payment.payment,
                instructions: &payment.instructions,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("POST {url}: {e}")))?;
        let body: serde_json::Value = Self::decode(response, "submission").await?;
        Ok(submit_result_from(body))
    }
}
