// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AccountResponse, NextSwapsResponse, NextTransactionsResponse, ProvisionAccountRequest,
        QuoteRequest, QuoteResponse, RecordSwapRequest, ResolveSwapResponse, SendRequest,
        SendResponse, SwapsResponse, TransactionsResponse, TransferRequest, TransferResponse,
        WalletTagResponse,
    },
    state::AppState,
    storage::{SwapRecord, TransactionRecord},
};

pub mod accounts;
pub mod health;
pub mod identity;
pub mod payments;
pub mod swaps;
pub mod transactions;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/payments/internal", post(payments::internal_transfer))
        .route("/payments/quote", post(payments::quote_payment))
        .route("/payments/send", post(payments::send_payment))
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/next", get(transactions::next_transactions))
        .route(
            "/swaps",
            get(swaps::list_swaps).post(swaps::record_swap),
        )
        .route("/swaps/next", get(swaps::next_swaps))
        .route("/swaps/resolve", get(swaps::resolve_swap))
        .route("/accounts", post(accounts::provision_account))
        .route("/accounts/wallet-tags", post(accounts::add_wallet_tag))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        payments::internal_transfer,
        payments::quote_payment,
        payments::send_payment,
        transactions::list_transactions,
        transactions::next_transactions,
        swaps::record_swap,
        swaps::list_swaps,
        swaps::next_swaps,
        swaps::resolve_swap,
        accounts::provision_account,
        accounts::add_wallet_tag,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            TransferRequest,
            TransferResponse,
            QuoteRequest,
            QuoteResponse,
            SendRequest,
            SendResponse,
            TransactionsResponse,
            NextTransactionsResponse,
            TransactionRecord,
            RecordSwapRequest,
            SwapsResponse,
            NextSwapsResponse,
            ResolveSwapResponse,
            SwapRecord,
            ProvisionAccountRequest,
            AccountResponse,
            WalletTagResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Payments", description = "Internal transfers, fee quotes and register sends"),
        (name = "Transactions", description = "Reconciled balance and history"),
        (name = "Swaps", description = "Cross-asset swap tracking"),
        (name = "Accounts", description = "Account provisioning and wallet tags"),
        (name = "Health", description = "Service health probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::test_state;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _gateway, _dir) = test_state();
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[test]
    fn openapi_document_includes_every_path() {
        let doc = ApiDoc::openapi();
        let paths = doc.paths.paths;
        for path in [
            "/v1/payments/internal",
            "/v1/payments/quote",
            "/v1/payments/send",
            "/v1/transactions",
            "/v1/transactions/next",
            "/v1/swaps",
            "/v1/swaps/next",
            "/v1/swaps/resolve",
            "/v1/accounts",
            "/v1/accounts/wallet-tags",
            "/health",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
