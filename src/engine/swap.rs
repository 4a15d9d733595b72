// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cross-asset swap tracking.
//!
//! Swaps run through an external swap service: the bridge records the
//! service's deposit address and order id, then later resolves which
//! settlement-network payment actually funded the deposit by scanning the
//! funding register's history. Listing is cache-aside with the newest
//! page kept warm per account.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::SWAP_PAGE_SIZE;
use crate::error::BridgeError;
use crate::gateway::LedgerGateway;
use crate::storage::{CacheService, LedgerDb, SwapRecord};

const SWAP_CACHE_NS: &str = "swap-transactions";

/// Client-supplied details of a swap order.
#[derive(Debug, Clone)]
pub struct SwapDetails {
    pub from_asset: String,
    pub to_asset: String,
    pub deposit_address: String,
    pub refund_address: String,
    pub order_id: String,
}

/// One page of swap history.
#[derive(Debug)]
pub struct SwapPage {
    pub swaps: Vec<SwapRecord>,
    pub has_more: bool,
}

pub struct SwapTracker {
    db: Arc<LedgerDb>,
    cache: Arc<CacheService>,
    gateway: Arc<dyn LedgerGateway>,
}

impl SwapTracker {
    pub fn new(db: Arc<LedgerDb>, cache: Arc<CacheService>, gateway: Arc<dyn LedgerGateway>) -> Self {
        Self { db, cache, gateway }
    }

    /// Stores a freshly created swap order, stamped with the current
    /// instant.
    pub fn record(&self, account_id: &str, details: SwapDetails) -> Result<SwapRecord, BridgeError> {
        if details.deposit_address.trim().is_empty() {
            return Err(BridgeError::Validation(
                "deposit address must not be empty".to_string(),
            ));
        }
        let record = SwapRecord {
            swap_id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            from_asset: details.from_asset,
            to_asset: details.to_asset,
            deposit_address: details.deposit_address,
            refund_address: details.refund_address,
            order_id: details.order_id,
            date: Utc::now(),
            external_txn_id: None,
        };
        self.db.insert_swap(&record)?;

        let newest = record.clone();
        self.cache
            .update_in_place::<Vec<SwapRecord>, _>(SWAP_CACHE_NS, account_id, |swaps| {
                swaps.insert(0, newest);
            });

        tracing::debug!(account = account_id, order = %record.order_id, "swap recorded");
        Ok(record)
    }

    /// The newest page of an account's swaps, newest-first.
    pub fn list(&self, account_id: &str) -> Result<Vec<SwapRecord>, BridgeError> {
        if let Some(cached) = self.cache.get::<Vec<SwapRecord>>(SWAP_CACHE_NS, account_id) {
            return Ok(cached);
        }
        let swaps = self.db.recent_swaps(account_id, SWAP_PAGE_SIZE)?;
        self.cache.set(SWAP_CACHE_NS, account_id, &swaps);
        Ok(swaps)
    }

    /// The page of swaps strictly older than `max_date`. `has_more` is a
    /// full-page heuristic: a short page means the history is exhausted.
    pub fn load_more(
        &self,
        account_id: &str,
        max_date: DateTime<Utc>,
    ) -> Result<SwapPage, BridgeError> {
        let swaps = self.db.swaps_before(account_id, max_date, SWAP_PAGE_SIZE)?;
        let has_more = swaps.len() >= SWAP_PAGE_SIZE;

        let tail = swaps.clone();
        self.cache
            .update_in_place::<Vec<SwapRecord>, _>(SWAP_CACHE_NS, account_id, |cached| {
                cached.extend(tail);
            });

        Ok(SwapPage { swaps, has_more })
    }

    /// Finds the settlement-network payment that funded a swap's deposit
    /// address and persists its id on the swap record.
    ///
    /// The deposit address carries the destination tag inline
    /// (`rAddress?dt=NNN`). The funding register's history is scanned
    /// newest-first and the scan stops once events predate the swap.
    /// Returns `None` when no funding payment has appeared yet.
    pub async fn resolve_external_id(
        &self,
        account_id: &str,
        deposit_address: &str,
        date: DateTime<Utc>,
        from_address: &str,
    ) -> Result<Option<String>, BridgeError> {
        let swap = self
            .db
            .find_swap(account_id, deposit_address, date)?
            .ok_or_else(|| {
                BridgeError::Validation(
                    "no swap recorded for this deposit address and date".to_string(),
                )
            })?;
        if swap.external_txn_id.is_some() {
            return Ok(swap.external_txn_id);
        }

        let (dest_address, dest_tag) = parse_deposit_address(deposit_address)?;
        let history = self
            .gateway
            .get_transaction_history(from_address, None)
            .await?;

        for event in &history {
            if event.specification.destination.address == dest_address
                && event.specification.destination.tag == Some(dest_tag)
            {
                self.db.set_swap_external_id(&swap.swap_id, &event.id)?;

                let swap_id = swap.swap_id.clone();
                let external_id = event.id.clone();
                self.cache.update_in_place::<Vec<SwapRecord>, _>(
                    SWAP_CACHE_NS,
                    account_id,
                    move |swaps| {
                        if let Some(cached) = swaps.iter_mut().find(|s| s.swap_id == swap_id) {
                            cached.external_txn_id = Some(external_id);
                        }
                    },
                );

                tracing::debug!(swap = %swap.swap_id, external = %event.id, "swap funding payment resolved");
                return Ok(Some(event.id.clone()));
            }
            // History is newest-first; anything older than the swap cannot
            // have funded it.
            if event.outcome.timestamp < date {
                break;
            }
        }
        Ok(None)
    }
}

/// Splits a swap deposit string into its bare address and destination tag.
fn parse_deposit_address(raw: &str) -> Result<(String, u64), BridgeError> {
    let address: String = raw.chars().take_while(char::is_ascii_alphanumeric).collect();
    let tag = raw.split_once("?dt=").and_then(|(_, rest)| {
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        digits.parse::<u64>().ok()
    });
    match tag {
        Some(tag) if !address.is_empty() => Ok((address, tag)),
        _ => Err(BridgeError::MalformedSwapAddress),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::{ledger_event, MockGateway};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000 + secs, 0).unwrap()
    }

    fn setup() -> (SwapTracker, Arc<LedgerDb>, Arc<MockGateway>, Arc<CacheService>, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(LedgerDb::open(&dir.path().join("ledger.redb")).unwrap());
        let gateway = Arc::new(MockGateway::new());
        let cache = Arc::new(CacheService::default());
        let tracker = SwapTracker::new(db.clone(), cache.clone(), gateway.clone());
        (tracker, db, gateway, cache, dir)
    }

    fn details(deposit_address: &str) -> SwapDetails {
        SwapDetails {
            from_asset: "XRP".to_string(),
            to_asset: "BTC".to_string(),
            deposit_address: deposit_address.to_string(),
            refund_address: "rRefund".to_string(),
            order_id: "order-1".to_string(),
        }
    }

    fn stored_swap(deposit_address: &str, date: DateTime<Utc>) -> SwapRecord {
        SwapRecord {
            swap_id: Uuid::new_v4().to_string(),
            account_id: "acct-1".to_string(),
            from_asset: "XRP".to_string(),
            to_asset: "BTC".to_string(),
            deposit_address: deposit_address.to_string(),
            refund_address: "rRefund".to_string(),
            order_id: "order-1".to_string(),
            date,
            external_txn_id: None,
        }
    }

    #[test]
    fn record_then_list_serves_the_cached_page() {
        let (tracker, db, _gateway, _cache, _dir) = setup();

        tracker.record("acct-1", details("rDepositA?dt=1")).unwrap();
        // Recorded dates index the page, so keep them a tick apart.
        std::thread::sleep(std::time::Duration::from_millis(5));
        tracker.record("acct-1", details("rDepositB?dt=2")).unwrap();

        let listed = tracker.list("acct-1").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].deposit_address, "rDepositB?dt=2");

        // A record call keeps the warm page current.
        tracker.record("acct-1", details("rDepositC?dt=3")).unwrap();
        let listed = tracker.list("acct-1").unwrap();
        assert_eq!(listed[0].deposit_address, "rDepositC?dt=3");

        // The page is served from cache: a row slipped straight into the
        // database does not appear until the cache expires.
        db.insert_swap(&stored_swap("rDepositD?dt=4", Utc::now())).unwrap();
        let listed = tracker.list("acct-1").unwrap();
        assert_eq!(listed.len(), 3);
    }

    #[test]
    fn rejects_empty_deposit_address() {
        let (tracker, _db, _gateway, _cache, _dir) = setup();
        let err = tracker.record("acct-1", details("  ")).unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }

    #[test]
    fn load_more_pages_strictly_older_than_the_cursor() {
        let (tracker, db, _gateway, _cache, _dir) = setup();
        for i in 0..13 {
            db.insert_swap(&stored_swap(&format!("rDeposit{i}?dt={i}"), at(i)))
                .unwrap();
        }

        let newest = tracker.list("acct-1").unwrap();
        assert_eq!(newest.len(), SWAP_PAGE_SIZE);
        assert_eq!(newest[0].date, at(12));

        let oldest_shown = newest.last().unwrap().date;
        assert_eq!(oldest_shown, at(3));

        let page = tracker.load_more("acct-1", oldest_shown).unwrap();
        assert_eq!(page.swaps.len(), 3);
        assert_eq!(page.swaps[0].date, at(2));
        assert!(!page.has_more);
    }

    #[test]
    fn load_more_reports_more_when_the_page_is_full() {
        let (tracker, db, _gateway, _cache, _dir) = setup();
        for i in 0..25 {
            db.insert_swap(&stored_swap(&format!("rDeposit{i}?dt={i}"), at(i)))
                .unwrap();
        }

        let page = tracker.load_more("acct-1", at(15)).unwrap();
        assert_eq!(page.swaps.len(), SWAP_PAGE_SIZE);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn resolve_finds_the_funding_payment_and_persists_it() {
        let (tracker, db, gateway, _cache, _dir) = setup();
        let swap = stored_swap("rShapeShift?dt=777", at(0));
        db.insert_swap(&swap).unwrap();
        gateway.set_history(
            "rHot1",
            vec![ledger_event(
                "EV-FUND",
                ("rHot1", Some(42)),
                ("rShapeShift", Some(777)),
                &[("rHot1", dec!(-3))],
                "tesSUCCESS",
                at(5),
            )],
        );

        let resolved = tracker
            .resolve_external_id("acct-1", "rShapeShift?dt=777", at(0), "rHot1")
            .await
            .unwrap();
        assert_eq!(resolved.as_deref(), Some("EV-FUND"));
        assert_eq!(
            db.find_swap("acct-1", "rShapeShift?dt=777", at(0))
                .unwrap()
                .unwrap()
                .external_txn_id
                .as_deref(),
            Some("EV-FUND")
        );

        // Once stored, resolution never hits the gateway again.
        gateway.set_unavailable(true);
        let resolved = tracker
            .resolve_external_id("acct-1", "rShapeShift?dt=777", at(0), "rHot1")
            .await
            .unwrap();
        assert_eq!(resolved.as_deref(), Some("EV-FUND"));
    }

    #[tokio::test]
    async fn resolve_stops_scanning_past_the_swap_date() {
        let (tracker, db, gateway, _cache, _dir) = setup();
        db.insert_swap(&stored_swap("rShapeShift?dt=777", at(10))).unwrap();
        gateway.set_history(
            "rHot1",
            vec![
                ledger_event(
                    "EV-NEWER",
                    ("rHot1", Some(42)),
                    ("rElsewhere", Some(1)),
                    &[("rHot1", dec!(-1))],
                    "tesSUCCESS",
                    at(20),
                ),
                ledger_event(
                    "EV-TOO-OLD",
                    ("rHot1", Some(42)),
                    ("rElsewhere", Some(2)),
                    &[("rHot1", dec!(-1))],
                    "tesSUCCESS",
                    at(5),
                ),
                // Matches the deposit endpoint but sits past the cutoff.
                ledger_event(
                    "EV-UNREACHED",
                    ("rHot1", Some(42)),
                    ("rShapeShift", Some(777)),
                    &[("rHot1", dec!(-3))],
                    "tesSUCCESS",
                    at(1),
                ),
            ],
        );

        let resolved = tracker
            .resolve_external_id("acct-1", "rShapeShift?dt=777", at(10), "rHot1")
            .await
            .unwrap();
        assert_eq!(resolved, None);
        assert_eq!(
            db.find_swap("acct-1", "rShapeShift?dt=777", at(10))
                .unwrap()
                .unwrap()
                .external_txn_id,
            None
        );
    }

    #[tokio::test]
    async fn resolve_requires_a_recorded_swap() {
        let (tracker, _db, _gateway, _cache, _dir) = setup();
        let err = tracker
            .resolve_external_id("acct-1", "rShapeShift?dt=777", at(0), "rHot1")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }

    #[tokio::test]
    async fn resolve_rejects_deposit_addresses_without_a_tag() {
        let (tracker, db, _gateway, _cache, _dir) = setup();
        db.insert_swap(&stored_swap("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", at(0)))
            .unwrap();

        let err = tracker
            .resolve_external_id("acct-1", "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2", at(0), "rHot1")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::MalformedSwapAddress));
    }

    #[test]
    fn deposit_address_parsing() {
        assert_eq!(
            parse_deposit_address("rXYZ?dt=42").unwrap(),
            ("rXYZ".to_string(), 42)
        );
        assert_eq!(
            parse_deposit_address("rXYZ?dt=12abc").unwrap(),
            ("rXYZ".to_string(), 12)
        );
        assert!(parse_deposit_address("rXYZ").is_err());
        assert!(parse_deposit_address("rXYZ?dt=").is_err());
        assert!(parse_deposit_address("?dt=42").is_err());
    }
}
