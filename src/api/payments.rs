// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    api::identity::AccountId,
    error::ApiError,
    gateway::PaymentEndpoint,
    models::{
        QuoteRequest, QuoteResponse, SendRequest, SendResponse, TransferRequest, TransferResponse,
    },
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/v1/payments/internal",
    request_body = TransferRequest,
    tag = "Payments",
    responses(
        (status = 200, body = TransferResponse),
        (status = 404, description = "No account under that screen name"),
        (status = 422, description = "Balance insufficient")
    )
)]
pub async fn internal_transfer(
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferResponse>, ApiError> {
    let balance = state
        .transfers
        .transfer(&account_id, &request.receiver_screen_name, request.amount)?;
    Ok(Json(TransferResponse {
        message: format!(
            "sent {} to {}",
            request.amount, request.receiver_screen_name
        ),
        balance,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/payments/quote",
    request_body = QuoteRequest,
    tag = "Payments",
    responses(
        (status = 200, body = QuoteResponse),
        (status = 422, description = "Balance insufficient"),
        (status = 503, description = "Settlement gateway unreachable")
    )
)]
pub async fn quote_payment(
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let destination = PaymentEndpoint::new(request.to_address, request.dest_tag);
    let quote = state
        .quotes
        .quote(&account_id, &destination, request.source_tag, request.amount)
        .await?;
    Ok(Json(QuoteResponse {
        fee: quote.fee,
        pool_internal: quote.pool_internal,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/payments/send",
    request_body = SendRequest,
    tag = "Payments",
    responses(
        (status = 200, body = SendResponse),
        (status = 400, description = "No prepared payment for this account"),
        (status = 404, description = "Not one of our custodial registers"),
        (status = 502, description = "Submission produced no result")
    )
)]
pub async fn send_payment(
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let result = state
        .liquidity
        .send_from_register(&account_id, &request.from_address, request.amount)
        .await?;
    Ok(Json(SendResponse {
        result_code: result.result_code,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{test_state, TEST_REGISTER};
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn seed_balance(state: &AppState, account_id: &str, balance: Decimal) {
        let account = state.db.get_account(account_id).unwrap().unwrap();
        state
            .db
            .commit_reconciliation(account_id, account.version, balance, None, &[])
            .unwrap();
    }

    #[tokio::test]
    async fn internal_transfer_success() {
        let (state, _gateway, _dir) = test_state();
        state
            .db
            .create_account("acct-1", "Alice", Some(TEST_REGISTER.into()), 42)
            .unwrap();
        state.db.create_account("acct-2", "Bob", None, 43).unwrap();
        seed_balance(&state, "acct-1", dec!(100));

        let Json(response) = internal_transfer(
            AccountId("acct-1".into()),
            State(state.clone()),
            Json(TransferRequest {
                receiver_screen_name: "Bob".into(),
                amount: dec!(30),
            }),
        )
        .await
        .expect("transfer succeeds");

        assert_eq!(response.balance, dec!(70));
        assert_eq!(
            state.db.get_account("acct-2").unwrap().unwrap().balance,
            dec!(30)
        );
    }

    #[tokio::test]
    async fn internal_transfer_insufficient_balance() {
        let (state, _gateway, _dir) = test_state();
        state
            .db
            .create_account("acct-1", "Alice", None, 42)
            .unwrap();
        state.db.create_account("acct-2", "Bob", None, 43).unwrap();
        seed_balance(&state, "acct-1", dec!(10));

        let err = internal_transfer(
            AccountId("acct-1".into()),
            State(state),
            Json(TransferRequest {
                receiver_screen_name: "Bob".into(),
                amount: dec!(11),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn internal_transfer_unknown_recipient() {
        let (state, _gateway, _dir) = test_state();
        state
            .db
            .create_account("acct-1", "Alice", None, 42)
            .unwrap();
        seed_balance(&state, "acct-1", dec!(10));

        let err = internal_transfer(
            AccountId("acct-1".into()),
            State(state),
            Json(TransferRequest {
                receiver_screen_name: "Nobody".into(),
                amount: dec!(5),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn quote_pool_internal_destination() {
        let (state, _gateway, _dir) = test_state();
        state
            .db
            .create_account("acct-1", "Alice", Some(TEST_REGISTER.into()), 42)
            .unwrap();
        seed_balance(&state, "acct-1", dec!(100));

        let Json(response) = quote_payment(
            AccountId("acct-1".into()),
            State(state),
            Json(QuoteRequest {
                to_address: TEST_REGISTER.into(),
                dest_tag: Some(9000),
                source_tag: None,
                amount: dec!(10),
            }),
        )
        .await
        .expect("quote succeeds");

        assert_eq!(response.fee, Decimal::ZERO);
        assert!(response.pool_internal);
    }

    #[tokio::test]
    async fn quote_external_destination_reports_the_network_fee() {
        let (state, gateway, _dir) = test_state();
        state
            .db
            .create_account("acct-1", "Alice", Some(TEST_REGISTER.into()), 42)
            .unwrap();
        seed_balance(&state, "acct-1", dec!(100));
        gateway.set_fee(dec!(0.000012));

        let Json(response) = quote_payment(
            AccountId("acct-1".into()),
            State(state),
            Json(QuoteRequest {
                to_address: "rDest".into(),
                dest_tag: Some(7),
                source_tag: None,
                amount: dec!(10),
            }),
        )
        .await
        .expect("quote succeeds");

        assert_eq!(response.fee, dec!(0.000012));
        assert!(!response.pool_internal);
    }

    #[tokio::test]
    async fn send_submits_the_prepared_payment() {
        let (state, gateway, _dir) = test_state();
        state
            .db
            .create_account("acct-1", "Alice", Some(TEST_REGISTER.into()), 42)
            .unwrap();
        seed_balance(&state, "acct-1", dec!(100));
        gateway.set_balance(TEST_REGISTER, dec!(100));

        quote_payment(
            AccountId("acct-1".into()),
            State(state.clone()),
            Json(QuoteRequest {
                to_address: "rDest".into(),
                dest_tag: Some(7),
                source_tag: None,
                amount: dec!(10),
            }),
        )
        .await
        .expect("quote succeeds");

        let Json(response) = send_payment(
            AccountId("acct-1".into()),
            State(state),
            Json(SendRequest {
                from_address: TEST_REGISTER.into(),
                amount: dec!(10),
            }),
        )
        .await
        .expect("send succeeds");

        assert_eq!(response.result_code, "tesSUCCESS");
        assert_eq!(gateway.submissions().len(), 1);
    }

    #[tokio::test]
    async fn send_without_a_quote_is_rejected() {
        let (state, gateway, _dir) = test_state();
        gateway.set_balance(TEST_REGISTER, dec!(100));

        let err = send_payment(
            AccountId("acct-1".into()),
            State(state),
            Json(SendRequest {
                from_address: TEST_REGISTER.into(),
                amount: dec!(10),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
