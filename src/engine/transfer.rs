// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Instant transfers between internal accounts.
//!
//! A transfer never touches the settlement network: it debits the sender
//! and credits the receiver inside one database transaction and records a
//! mirrored pair of transaction rows, both stamped with the same instant.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::error::BridgeError;
use crate::storage::{
    AuditEvent, AuditEventType, AuditLog, LedgerDb, LedgerDbError, TransactionRecord,
};

pub struct InternalTransferEngine {
    db: Arc<LedgerDb>,
    audit: Arc<AuditLog>,
}

impl InternalTransferEngine {
    pub fn new(db: Arc<LedgerDb>, audit: Arc<AuditLog>) -> Self {
        Self { db, audit }
    }

    /// Moves `amount` from the sender to the account registered under
    /// `receiver_screen_name`. Returns the sender's new balance.
    ///
    /// The receiver lookup is case- and width-insensitive. The sender's
    /// balance is re-checked inside the commit, so a concurrent debit
    /// cannot overdraw the account.
    pub fn transfer(
        &self,
        sender_id: &str,
        receiver_screen_name: &str,
        amount: Decimal,
    ) -> Result<Decimal, BridgeError> {
        if amount <= Decimal::ZERO {
            return Err(BridgeError::Validation(
                "transfer amount must be positive".to_string(),
            ));
        }
        let sender = self
            .db
            .get_account(sender_id)?
            .ok_or_else(|| BridgeError::Validation(format!("unknown account {sender_id}")))?;
        if amount > sender.balance {
            return Err(BridgeError::InsufficientBalance);
        }
        let receiver = self
            .db
            .find_account_by_screen_name(receiver_screen_name)?
            .ok_or(BridgeError::UnknownRecipient)?;
        if receiver.account_id == sender.account_id {
            return Err(BridgeError::Validation(
                "cannot transfer to your own account".to_string(),
            ));
        }

        let now = Utc::now();
        let debit = TransactionRecord {
            txn_id: Uuid::new_v4().to_string(),
            account_id: sender.account_id.clone(),
            external_txn_id: None,
            date: now,
            amount: -amount,
            counterparty: receiver.screen_name.clone(),
            tag: None,
        };
        let credit = TransactionRecord {
            txn_id: Uuid::new_v4().to_string(),
            account_id: receiver.account_id.clone(),
            external_txn_id: None,
            date: now,
            amount,
            counterparty: sender.screen_name.clone(),
            tag: None,
        };

        let balance = match self.db.commit_transfer(&debit, &credit) {
            Ok(balance) => balance,
            Err(LedgerDbError::InsufficientBalance) => {
                return Err(BridgeError::InsufficientBalance)
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            sender = %sender.account_id,
            receiver = %receiver.account_id,
            amount = %amount,
            "internal transfer applied"
        );
        let _ = self.audit.log(
            &AuditEvent::new(AuditEventType::InternalTransfer)
                .with_account(&sender.account_id)
                .with_details(json!({
                    "receiver": receiver.screen_name,
                    "amount": amount,
                    "debit_txn_id": debit.txn_id,
                    "credit_txn_id": credit.txn_id,
                })),
        );

        Ok(balance)
    }
}
