// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Submitting payments from custodial registers.
//!
//! Registers hold working float only. Before a send that would leave a
//! register under the reserve floor, the manager tops it up from the
//! reserve account, then signs and submits the caller's prepared payment
//! with the register's vaulted secret.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use crate::config::{REGISTER_REFILL_AMOUNT, REGISTER_REFILL_FLOOR};
use crate::engine::PREPARED_PAYMENT_NS;
use crate::error::BridgeError;
use crate::gateway::{LedgerGateway, PaymentEndpoint, PreparedPayment, SubmitResult};
use crate::storage::{AuditEvent, AuditEventType, AuditLog, CacheService};
use crate::vault::{CustodialDirectory, VaultError};

pub struct CustodialLiquidityManager {
    directory: Arc<CustodialDirectory>,
    gateway: Arc<dyn LedgerGateway>,
    cache: Arc<CacheService>,
    audit: Arc<AuditLog>,
}

impl CustodialLiquidityManager {
    pub fn new(
        directory: Arc<CustodialDirectory>,
        gateway: Arc<dyn LedgerGateway>,
        cache: Arc<CacheService>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            directory,
            gateway,
            cache,
            audit,
        }
    }

    /// Signs and submits the payment prepared for `account_id`, sending
    /// `amount` out of `from_address`.
    ///
    /// The parked payment is consumed up front: after any failure the
    /// caller must request a fresh quote. The register balance check uses
    /// the live network balance, not the stored snapshot, and a refill that
    /// cannot be confirmed aborts the send.
    pub async fn send_from_register(
        &self,
        account_id: &str,
        from_address: &str,
        amount: Decimal,
    ) -> Result<SubmitResult, BridgeError> {
        if amount <= Decimal::ZERO {
            return Err(BridgeError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }
        let secret = self
            .directory
            .secret_for(from_address)
            .ok_or(BridgeError::UnknownCustodialAddress)?;
        let prepared: PreparedPayment = self
            .cache
            .take(PREPARED_PAYMENT_NS, account_id)
            .ok_or(BridgeError::NoPreparedPayment)?;

        let register_balance = self.gateway.get_balance(from_address).await?;
        if register_balance - amount < REGISTER_REFILL_FLOOR {
            self.refill(from_address, register_balance).await?;
        }

        match self
            .gateway
            .sign_and_submit(from_address, &secret, &prepared)
            .await?
        {
            Some(result) => {
                tracing::info!(
                    account = account_id,
                    register = from_address,
                    amount = %amount,
                    result = %result.result_code,
                    "payment submitted"
                );
                let _ = self.audit.log(
                    &AuditEvent::new(AuditEventType::PaymentSubmitted)
                        .with_account(account_id)
                        .with_details(json!({
                            "register": from_address,
                            "amount": amount,
                            "result_code": result.result_code,
                            "external_txn_id": result.external_txn_id,
                        })),
                );
                Ok(result)
            }
            None => {
                let _ = self.audit.log(
                    &AuditEvent::new(AuditEventType::PaymentSubmitted)
                        .with_account(account_id)
                        .with_details(json!({
                            "register": from_address,
                            "amount": amount,
                        }))
                        .failed("gateway returned no submission result"),
                );
                Err(BridgeError::SubmissionFailed)
            }
        }
    }

    /// Moves one refill increment from the reserve into `register`.
    async fn refill(&self, register: &str, register_balance: Decimal) -> Result<(), BridgeError> {
        let (reserve_address, reserve_secret) = self
            .directory
            .reserve()
            .ok_or(BridgeError::Vault(VaultError::MissingReserve))?;

        let source = PaymentEndpoint::new(reserve_address.as_str(), None);
        let destination = PaymentEndpoint::new(register, None);
        let prepared = self
            .gateway
            .build_instructions(&source, &destination, REGISTER_REFILL_AMOUNT)
            .await?;

        match self
            .gateway
            .sign_and_submit(&reserve_address, &reserve_secret, &prepared)
            .await?
        {
            Some(result) => {
                tracing::info!(
                    register,
                    balance = %register_balance,
                    amount = %REGISTER_REFILL_AMOUNT,
                    result = %result.result_code,
                    "register refilled from reserve"
                );
                let _ = self.audit.log(
                    &AuditEvent::new(AuditEventType::RegisterRefill).with_details(json!({
                        "register": register,
                        "amount": REGISTER_REFILL_AMOUNT,
                        "result_code": result.result_code,
                    })),
                );
                Ok(())
            }
            None => {
                let _ = self.audit.log(
                    &AuditEvent::new(AuditEventType::RegisterRefill)
                        .with_details(json!({
                            "register": register,
                            "amount": REGISTER_REFILL_AMOUNT,
                        }))
                        .failed("gateway returned no submission result"),
                );
                Err(BridgeError::SubmissionFailed)
            }
        }
    }
}
