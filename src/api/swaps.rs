// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::identity::AccountId,
    engine::SwapDetails,
    error::ApiError,
    models::{
        NextSwapsQuery, NextSwapsResponse, RecordSwapRequest, ResolveSwapQuery,
        ResolveSwapResponse, SwapsResponse,
    },
    state::AppState,
    storage::SwapRecord,
};

#[utoipa::path(
    post,
    path = "/v1/swaps",
    request_body = RecordSwapRequest,
    tag = "Swaps",
    responses((status = 201, body = SwapRecord))
)]
pub async fn record_swap(
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
    Json(request): Json<RecordSwapRequest>,
) -> Result<(StatusCode, Json<SwapRecord>), ApiError> {
    let record = state.swaps.record(
        &account_id,
        SwapDetails {
            from_asset: request.from_asset,
            to_asset: request.to_asset,
            deposit_address: request.deposit_address,
            refund_address: request.refund_address,
            order_id: request.order_id,
        },
    )?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/v1/swaps",
    tag = "Swaps",
    responses((status = 200, body = SwapsResponse))
)]
pub async fn list_swaps(
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
) -> Result<Json<SwapsResponse>, ApiError> {
    let swaps = state.swaps.list(&account_id)?;
    Ok(Json(SwapsResponse { swaps }))
}

#[utoipa::path(
    get,
    path = "/v1/swaps/next",
    params(NextSwapsQuery),
    tag = "Swaps",
    responses((status = 200, body = NextSwapsResponse))
)]
pub async fn next_swaps(
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
    Query(query): Query<NextSwapsQuery>,
) -> Result<Json<NextSwapsResponse>, ApiError> {
    let page = state.swaps.load_more(&account_id, query.max_date)?;
    Ok(Json(NextSwapsResponse {
        swaps: page.swaps,
        has_more: page.has_more,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/swaps/resolve",
    params(ResolveSwapQuery),
    tag = "Swaps",
    responses(
        (status = 200, body = ResolveSwapResponse),
        (status = 400, description = "Deposit address carries no destination tag")
    )
)]
pub async fn resolve_swap(
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
    Query(query): Query<ResolveSwapQuery>,
) -> Result<Json<ResolveSwapResponse>, ApiError> {
    let external_txn_id = state
        .swaps
        .resolve_external_id(
            &account_id,
            &query.deposit_address,
            query.date,
            &query.from_address,
        )
        .await?;
    Ok(Json(ResolveSwapResponse { external_txn_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::ledger_event;
    use crate::state::testing::{test_state, TEST_REGISTER};
    use rust_decimal_macros::dec;

    fn request(deposit_address: &str) -> RecordSwapRequest {
        RecordSwapRequest {
            from_asset: "XRP".into(),
            to_asset: "BTC".into(),
            deposit_address: deposit_address.into(),
            refund_address: "rRefund".into(),
            order_id: "order-1".into(),
        }
    }

    #[tokio::test]
    async fn record_and_list_swaps() {
        let (state, _gateway, _dir) = test_state();

        let (status, Json(record)) = record_swap(
            AccountId("acct-1".into()),
            State(state.clone()),
            Json(request("rShapeShift?dt=777")),
        )
        .await
        .expect("recording succeeds");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record.deposit_address, "rShapeShift?dt=777");
        assert!(record.external_txn_id.is_none());

        let Json(response) = list_swaps(AccountId("acct-1".into()), State(state))
            .await
            .expect("listing succeeds");
        assert_eq!(response.swaps.len(), 1);
        assert_eq!(response.swaps[0].swap_id, record.swap_id);
    }

    #[tokio::test]
    async fn next_page_pages_older_swaps() {
        let (state, _gateway, _dir) = test_state();
        for i in 0..3 {
            record_swap(
                AccountId("acct-1".into()),
                State(state.clone()),
                Json(request(&format!("rDeposit{i}?dt={i}"))),
            )
            .await
            .expect("recording succeeds");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let Json(listed) = list_swaps(AccountId("acct-1".into()), State(state.clone()))
            .await
            .expect("listing succeeds");
        let oldest_shown = listed.swaps.last().unwrap().date;

        let Json(page) = next_swaps(
            AccountId("acct-1".into()),
            State(state),
            Query(NextSwapsQuery {
                max_date: oldest_shown,
            }),
        )
        .await
        .expect("paging succeeds");
        assert!(page.swaps.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn resolve_reports_the_funding_payment() {
        let (state, gateway, _dir) = test_state();
        let (_, Json(record)) = record_swap(
            AccountId("acct-1".into()),
            State(state.clone()),
            Json(request("rShapeShift?dt=777")),
        )
        .await
        .expect("recording succeeds");

        gateway.set_history(
            TEST_REGISTER,
            vec![ledger_event(
                "EV-FUND",
                (TEST_REGISTER, Some(42)),
                ("rShapeShift", Some(777)),
                &[(TEST_REGISTER, dec!(-3))],
                "tesSUCCESS",
                record.date + chrono::Duration::seconds(5),
            )],
        );

        let Json(response) = resolve_swap(
            AccountId("acct-1".into()),
            State(state),
            Query(ResolveSwapQuery {
                deposit_address: "rShapeShift?dt=777".into(),
                date: record.date,
                from_address: TEST_REGISTER.into(),
            }),
        )
        .await
        .expect("resolution succeeds");

        assert_eq!(response.external_txn_id.as_deref(), Some("EV-FUND"));
    }

    #[tokio::test]
    async fn resolve_rejects_untagged_deposit_addresses() {
        let (state, _gateway, _dir) = test_state();
        let (_, Json(record)) = record_swap(
            AccountId("acct-1".into()),
            State(state.clone()),
            Json(request("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2")),
        )
        .await
        .expect("recording succeeds");

        let err = resolve_swap(
            AccountId("acct-1".into()),
            State(state),
            Query(ResolveSwapQuery {
                deposit_address: "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2".into(),
                date: record.date,
                from_address: TEST_REGISTER.into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
