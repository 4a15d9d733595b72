// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Folding settlement-network history into the internal ledger.
//!
//! The network's history is the source of truth for everything that
//! touched a custodial register. A walk reads the register's history
//! newest-first, keeps the events routed to the caller's wallet tags,
//! folds their balance deltas on top of the stored balance and stops at
//! the checkpoint left by the previous walk. One CAS-guarded commit
//! applies the balance, the new checkpoint and the history rows together;
//! losing the race to a concurrent writer just means adopting its state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::config::{OUTGOING_TRANSFER_SURCHARGE, TRANSACTION_PAGE_SIZE};
use crate::error::BridgeError;
use crate::gateway::{LedgerGateway, LedgerTransaction};
use crate::storage::{
    AuditEvent, AuditEventType, AuditLog, LedgerDb, LedgerDbError, StoredAccount,
    TransactionRecord,
};

/// Balance and newest history page after a reconciliation walk.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub balance: Decimal,
    pub transactions: Vec<TransactionRecord>,
}

struct HistoryFold {
    new_balance: Decimal,
    checkpoint: Option<String>,
    rows: Vec<TransactionRecord>,
    folded: usize,
}

pub struct LedgerReconciler {
    db: Arc<LedgerDb>,
    gateway: Arc<dyn LedgerGateway>,
    audit: Arc<AuditLog>,
}

impl LedgerReconciler {
    pub fn new(db: Arc<LedgerDb>, gateway: Arc<dyn LedgerGateway>, audit: Arc<AuditLog>) -> Self {
        Self { db, gateway, audit }
    }

    /// Reconciles `account_id` against the settlement network and returns
    /// the resulting balance with the newest page of history.
    ///
    /// Gateway failures abort before anything is written. A commit lost to
    /// a concurrent walk or transfer is not retried here; the winner's
    /// checkpoint stands and the next walk folds whatever this one saw.
    pub async fn reconcile(&self, account_id: &str) -> Result<ReconcileOutcome, BridgeError> {
        let account = self
            .db
            .get_account(account_id)?
            .ok_or_else(|| BridgeError::Validation(format!("unknown account {account_id}")))?;

        let Some(register) = account.register_address.clone() else {
            return Ok(ReconcileOutcome {
                balance: account.balance,
                transactions: self.db.recent_transactions(account_id, TRANSACTION_PAGE_SIZE)?,
            });
        };

        let register_balance = self.gateway.get_balance(&register).await?;
        self.db.upsert_register(&register, register_balance, Utc::now())?;

        let history = self.gateway.get_transaction_history(&register, None).await?;
        let fold = fold_history(&account, &register, &history);

        let unchanged = fold.rows.is_empty()
            && fold.new_balance == account.balance
            && fold.checkpoint.as_deref() == account.last_reconciled_txn_id.as_deref();
        let balance = if fold.checkpoint.is_none() || unchanged {
            account.balance
        } else {
            match self.db.commit_reconciliation(
                account_id,
                account.version,
                fold.new_balance,
                fold.checkpoint.as_deref(),
                &fold.rows,
            ) {
                Ok(commit) => {
                    tracing::info!(
                        account = account_id,
                        folded = fold.folded,
                        inserted = commit.inserted,
                        skipped = commit.skipped,
                        balance = %commit.account.balance,
                        "reconciliation applied"
                    );
                    let _ = self.audit.log(
                        &AuditEvent::new(AuditEventType::ReconciliationApplied)
                            .with_account(account_id)
                            .with_details(json!({
                                "register": register,
                                "folded": fold.folded,
                                "inserted": commit.inserted,
                                "skipped": commit.skipped,
                                "balance": commit.account.balance,
                            })),
                    );
                    commit.account.balance
                }
                Err(LedgerDbError::Conflict(reason)) => {
                    // A concurrent walk or transfer won the commit. Its
                    // checkpoint stands; events this walk saw are picked up
                    // by the next one.
                    tracing::debug!(account = account_id, %reason, "reconciliation lost the commit race");
                    self.db
                        .get_account(account_id)?
                        .map(|fresh| fresh.balance)
                        .unwrap_or(account.balance)
                }
                Err(e) => return Err(e.into()),
            }
        };

        Ok(ReconcileOutcome {
            balance,
            transactions: self.db.recent_transactions(account_id, TRANSACTION_PAGE_SIZE)?,
        })
    }

    /// Next page of stored history, strictly after `min_date`, oldest
    /// first.
    pub fn load_more(
        &self,
        account_id: &str,
        min_date: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, BridgeError> {
        Ok(self
            .db
            .transactions_after(account_id, min_date, TRANSACTION_PAGE_SIZE)?)
    }
}

/// Walks `history` newest-first and folds the events relevant to
/// `account` into a balance, a checkpoint and history rows.
///
/// Relevance is decided by the submitted specification's tags so partial
/// deliveries cannot dodge their owner, while the recorded tag and
/// counterparty come from the resolved endpoints. The checkpoint is the
/// first relevant event seen, captured before the stop check so it is
/// never overwritten by an older event. Failed events move the balance
/// (network cost of the attempt) but produce no row.
fn fold_history(account: &StoredAccount, register: &str, history: &[LedgerTransaction]) -> HistoryFold {
    let mut fold = HistoryFold {
        new_balance: account.balance,
        checkpoint: None,
        rows: Vec::new(),
        folded: 0,
    };

    for event in history {
        let received = event.destination.address == register
            && event
                .specification
                .destination
                .tag
                .is_some_and(|tag| account.wallet_tags.contains(&tag));
        let sent = event.source.address == register
            && event
                .specification
                .source
                .tag
                .is_some_and(|tag| account.wallet_tags.contains(&tag));
        if !received && !sent {
            continue;
        }

        if fold.checkpoint.is_none() {
            fold.checkpoint = Some(event.id.clone());
        }
        if account.last_reconciled_txn_id.as_deref() == Some(event.id.as_str()) {
            break;
        }

        let (counterparty, tag) = if received {
            (event.source.address.clone(), event.destination.tag)
        } else {
            (event.destination.address.clone(), event.source.tag)
        };

        let mut delta = event
            .outcome
            .balance_change_for(register)
            .unwrap_or(Decimal::ZERO);
        if delta < Decimal::ZERO && event.outcome.is_success() {
            delta -= OUTGOING_TRANSFER_SURCHARGE;
        }
        fold.new_balance += delta;
        fold.folded += 1;

        if event.outcome.is_success() {
            fold.rows.push(TransactionRecord {
                txn_id: Uuid::new_v4().to_string(),
                account_id: account.account_id.clone(),
                external_txn_id: Some(event.id.clone()),
                date: event.outcome.timestamp,
                amount: delta,
                counterparty,
                tag,
            });
        }
    }

    fold
}
