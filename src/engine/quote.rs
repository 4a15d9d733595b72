// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fee quoting for outgoing payments.
//!
//! A destination inside the custodial pool settles internally and costs
//! nothing. Anything else is priced by asking the settlement gateway to
//! build unsigned payment instructions; the prepared payment is parked in
//! the cache so a follow-up send can submit exactly what was quoted.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::PREPARED_PAYMENT_TTL;
use crate::engine::PREPARED_PAYMENT_NS;
use crate::error::BridgeError;
use crate::gateway::{LedgerGateway, PaymentEndpoint};
use crate::storage::{CacheService, LedgerDb};
use crate::vault::CustodialDirectory;

/// Outcome of pricing a payment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FeeQuote {
    pub fee: Decimal,
    /// True when the destination is one of our own custodial registers and
    /// the payment never leaves the pool.
    pub pool_internal: bool,
}

pub struct FeeQuoteEngine {
    db: Arc<LedgerDb>,
    directory: Arc<CustodialDirectory>,
    gateway: Arc<dyn LedgerGateway>,
    cache: Arc<CacheService>,
}

impl FeeQuoteEngine {
    pub fn new(
        db: Arc<LedgerDb>,
        directory: Arc<CustodialDirectory>,
        gateway: Arc<dyn LedgerGateway>,
        cache: Arc<CacheService>,
    ) -> Self {
        Self {
            db,
            directory,
            gateway,
            cache,
        }
    }

    /// Prices a payment of `amount` from the caller's custodial register to
    /// `destination`.
    ///
    /// The source address always comes from the caller's account record;
    /// `source_tag` falls back to the account's first wallet tag. For an
    /// external destination the prepared payment is parked under the
    /// caller's account id, replacing any earlier quote.
    pub async fn quote(
        &self,
        account_id: &str,
        destination: &PaymentEndpoint,
        source_tag: Option<u64>,
        amount: Decimal,
    ) -> Result<FeeQuote, BridgeError> {
        if amount <= Decimal::ZERO {
            return Err(BridgeError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }
        let account = self
            .db
            .get_account(account_id)?
            .ok_or_else(|| BridgeError::Validation(format!("unknown account {account_id}")))?;
        if amount > account.balance {
            return Err(BridgeError::InsufficientBalance);
        }

        if self.directory.contains(&destination.address) {
            tracing::debug!(
                account = account_id,
                destination = %destination.address,
                "destination is pool-internal, no network fee"
            );
            return Ok(FeeQuote {
                fee: Decimal::ZERO,
                pool_internal: true,
            });
        }

        let register = account.register_address.clone().ok_or_else(|| {
            BridgeError::Validation("account has no custodial register assigned".to_string())
        })?;
        let source = PaymentEndpoint::new(
            register,
            source_tag.or_else(|| account.wallet_tags.first().copied()),
        );

        let prepared = self
            .gateway
            .build_instructions(&source, destination, amount)
            .await?;
        let fee = prepared.instructions.fee;
        self.cache
            .set_with_ttl(PREPARED_PAYMENT_NS, account_id, &prepared, PREPARED_PAYMENT_TTL);

        tracing::debug!(
            account = account_id,
            destination = %destination.address,
            %fee,
            "payment prepared and parked"
        );
        Ok(FeeQuote {
            fee,
            pool_internal: false,
        })
    }
}
