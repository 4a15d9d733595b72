// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::{
    CustodialLiquidityManager, FeeQuoteEngine, InternalTransferEngine, LedgerReconciler,
    SwapTracker,
};
use crate::gateway::LedgerGateway;
use crate::storage::{AuditLog, CacheService, LedgerDb};
use crate::vault::CustodialDirectory;

/// Shared application state, cloned into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<LedgerDb>,
    pub cache: Arc<CacheService>,
    pub audit: Arc<AuditLog>,
    pub directory: Arc<CustodialDirectory>,
    pub transfers: Arc<InternalTransferEngine>,
    pub quotes: Arc<FeeQuoteEngine>,
    pub liquidity: Arc<CustodialLiquidityManager>,
    pub reconciler: Arc<LedgerReconciler>,
    pub swaps: Arc<SwapTracker>,
    pub data_dir: PathBuf,
}

impl AppState {
    pub fn new(
        db: Arc<LedgerDb>,
        cache: Arc<CacheService>,
        audit: Arc<AuditLog>,
        directory: Arc<CustodialDirectory>,
        gateway: Arc<dyn LedgerGateway>,
        data_dir: PathBuf,
    ) -> Self {
        let transfers = Arc::new(InternalTransferEngine::new(db.clone(), audit.clone()));
        let quotes = Arc::new(FeeQuoteEngine::new(
            db.clone(),
            directory.clone(),
            gateway.clone(),
            cache.clone(),
        ));
        let liquidity = Arc::new(CustodialLiquidityManager::new(
            directory.clone(),
            gateway.clone(),
            cache.clone(),
            audit.clone(),
        ));
        let reconciler = Arc::new(LedgerReconciler::new(
            db.clone(),
            gateway.clone(),
            audit.clone(),
        ));
        let swaps = Arc::new(SwapTracker::new(db.clone(), cache.clone(), gateway));

        Self {
            db,
            cache,
            audit,
            directory,
            transfers,
            quotes,
            liquidity,
            reconciler,
            swaps,
            data_dir,
        }
    }
}
