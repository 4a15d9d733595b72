// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relational_bridge_server::{
    api,
    config::{BridgeConfig, CACHE_CAPACITY, CACHE_TTL},
    gateway::SettlementClient,
    state::AppState,
    storage::{AuditLog, CacheService, LedgerDb},
    vault::{CustodialDirectory, KeyVault},
};

fn init_tracing() {
    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = BridgeConfig::from_env().expect("invalid configuration");

    let vault = KeyVault::derive(&config.vault_passphrase, config.vault_salt.as_bytes())
        .expect("failed to derive vault key");
    let (registers, reserve) = config
        .load_custodial_tables()
        .expect("failed to read custodial tables");
    let directory = Arc::new(
        CustodialDirectory::load(&vault, &registers, &reserve)
            .expect("failed to decrypt custodial directory"),
    );

    let db = Arc::new(
        LedgerDb::open(&config.data_dir.join("bridge.redb")).expect("failed to open ledger db"),
    );
    for address in directory.register_addresses() {
        db.ensure_register(&address)
            .expect("failed to seed register snapshot");
    }

    let cache = Arc::new(CacheService::new(CACHE_CAPACITY, CACHE_TTL));
    let audit = Arc::new(AuditLog::new(config.data_dir.join("audit")));
    let gateway = Arc::new(
        SettlementClient::new(config.gateway_url.as_str())
            .expect("failed to build settlement gateway client"),
    );

    let state = AppState::new(
        db.clone(),
        cache,
        audit,
        directory.clone(),
        gateway,
        config.data_dir.clone(),
    );
    let app = api::router(state);

    let shutdown = CancellationToken::new();

    // SIGHUP re-reads file-backed custodial tables so registers can be
    // rotated without a restart.
    #[cfg(unix)]
    {
        let reload_config = config.clone();
        let reload_db = db;
        let reload_directory = directory;
        let reload_shutdown = shutdown.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let mut hangup = match signal(SignalKind::hangup()) {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGHUP handler");
                    return;
                }
            };
            loop {
                tokio::select! {
                    _ = hangup.recv() => {
                        reload_custodial_tables(
                            &reload_config,
                            &vault,
                            &reload_directory,
                            &reload_db,
                        );
                    }
                    _ = reload_shutdown.cancelled() => return,
                }
            }
        });
    }

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind listener");
    tracing::info!(addr = %bind_addr, "relational bridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("server error");
}

#[cfg(unix)]
fn reload_custodial_tables(
    config: &BridgeConfig,
    vault: &KeyVault,
    directory: &CustodialDirectory,
    db: &LedgerDb,
) {
    let (registers, reserve) = match config.load_custodial_tables() {
        Ok(tables) => tables,
        Err(e) => {
            tracing::error!(error = %e, "custodial table reload failed");
            return;
        }
    };
    if let Err(e) = directory.reload(vault, &registers, &reserve) {
        tracing::error!(error = %e, "custodial table reload failed");
        return;
    }
    for address in directory.register_addresses() {
        if let Err(e) = db.ensure_register(&address) {
            tracing::error!(register = %address, error = %e, "failed to seed register snapshot");
        }
    }
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
    token.cancel();
}
