// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    api::identity::AccountId,
    error::ApiError,
    models::{NextTransactionsQuery, NextTransactionsResponse, TransactionsResponse},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/transactions",
    tag = "Transactions",
    responses(
        (status = 200, body = TransactionsResponse),
        (status = 503, description = "Settlement gateway unreachable")
    )
)]
pub async fn list_transactions(
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let outcome = state.reconciler.reconcile(&account_id).await?;
    Ok(Json(TransactionsResponse {
        balance: outcome.balance,
        transactions: outcome.transactions,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/transactions/next",
    params(NextTransactionsQuery),
    tag = "Transactions",
    responses((status = 200, body = NextTransactionsResponse))
)]
pub async fn next_transactions(
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
    Query(query): Query<NextTransactionsQuery>,
) -> Result<Json<NextTransactionsResponse>, ApiError> {
    let transactions = state.reconciler.load_more(&account_id, query.min_date)?;
    Ok(Json(NextTransactionsResponse { transactions }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::ledger_event;
    use crate::state::testing::{test_state, TEST_REGISTER};
    use axum::http::StatusCode;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn listing_reconciles_against_the_network() {
        let (state, gateway, _dir) = test_state();
        state
            .db
            .create_account("acct-1", "Alice", Some(TEST_REGISTER.into()), 42)
            .unwrap();
        gateway.set_balance(TEST_REGISTER, dec!(500));
        gateway.set_history(
            TEST_REGISTER,
            vec![ledger_event(
                "EV1",
                ("rPeer", None),
                (TEST_REGISTER, Some(42)),
                &[(TEST_REGISTER, dec!(10))],
                "tesSUCCESS",
                at(10),
            )],
        );

        let Json(response) = list_transactions(AccountId("acct-1".into()), State(state.clone()))
            .await
            .expect("listing succeeds");

        assert_eq!(response.balance, dec!(10));
        assert_eq!(response.transactions.len(), 1);
        assert_eq!(
            state
                .db
                .get_account("acct-1")
                .unwrap()
                .unwrap()
                .last_reconciled_txn_id
                .as_deref(),
            Some("EV1")
        );
    }

    #[tokio::test]
    async fn listing_fails_when_the_gateway_is_down() {
        let (state, gateway, _dir) = test_state();
        state
            .db
            .create_account("acct-1", "Alice", Some(TEST_REGISTER.into()), 42)
            .unwrap();
        gateway.set_unavailable(true);

        let err = list_transactions(AccountId("acct-1".into()), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn next_page_follows_the_cursor() {
        let (state, gateway, _dir) = test_state();
        state
            .db
            .create_account("acct-1", "Alice", Some(TEST_REGISTER.into()), 42)
            .unwrap();
        gateway.set_balance(TEST_REGISTER, dec!(500));
        let history: Vec<_> = (0..30)
            .rev()
            .map(|i| {
                ledger_event(
                    &format!("EV{i}"),
                    ("rPeer", None),
                    (TEST_REGISTER, Some(42)),
                    &[(TEST_REGISTER, dec!(1))],
                    "tesSUCCESS",
                    at(i),
                )
            })
            .collect();
        gateway.set_history(TEST_REGISTER, history);
        list_transactions(AccountId("acct-1".into()), State(state.clone()))
            .await
            .expect("listing succeeds");

        let Json(response) = next_transactions(
            AccountId("acct-1".into()),
            State(state),
            Query(NextTransactionsQuery { min_date: at(27) }),
        )
        .await
        .expect("paging succeeds");

        assert_eq!(response.transactions.len(), 2);
        assert_eq!(response.transactions[0].date, at(28));
    }
}
