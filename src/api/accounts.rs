// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;

use crate::{
    api::identity::AccountId,
    error::ApiError,
    models::{AccountResponse, ProvisionAccountRequest, WalletTagResponse},
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

#[utoipa::path(
    post,
    path = "/v1/accounts",
    request_body = ProvisionAccountRequest,
    tag = "Accounts",
    responses(
        (status = 201, body = AccountResponse),
        (status = 400, description = "Invalid request or unknown register"),
        (status = 409, description = "Account id or screen name already taken")
    )
)]
pub async fn provision_account(
    State(state): State<AppState>,
    Json(request): Json<ProvisionAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let account_id = request.account_id.trim();
    let screen_name = request.screen_name.trim();
    if account_id.is_empty() || screen_name.is_empty() {
        return Err(ApiError::bad_request(
            "account id and screen name are required",
        ));
    }

    let tag = state.db.allocate_wallet_tag()?;
    let register_address = match request.register_address {
        Some(address) => {
            if !state.directory.contains(&address) {
                return Err(ApiError::bad_request(format!(
                    "{address} is not a custodial register"
                )));
            }
            address
        }
        None => {
            let mut pool = state.directory.register_addresses();
            if pool.is_empty() {
                return Err(ApiError::internal("no custodial registers configured"));
            }
            pool.sort();
            pool[tag as usize % pool.len()].clone()
        }
    };

    let account =
        state
            .db
            .create_account(account_id, screen_name, Some(register_address), tag)?;

    tracing::info!(
        account = account_id,
        register = account.register_address.as_deref().unwrap_or_default(),
        tag,
        "account provisioned"
    );
    let _ = state.audit.log(
        &AuditEvent::new(AuditEventType::AccountProvisioned)
            .with_account(account_id)
            .with_details(json!({
                "screen_name": account.screen_name,
                "register": account.register_address,
                "tag": tag,
            })),
    );

    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

#[utoipa::path(
    post,
    path = "/v1/accounts/wallet-tags",
    tag = "Accounts",
    responses(
        (status = 201, body = WalletTagResponse),
        (status = 400, description = "Account has no custodial register"),
        (status = 404, description = "Unknown account")
    )
)]
pub async fn add_wallet_tag(
    AccountId(account_id): AccountId,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<WalletTagResponse>), ApiError> {
    let account = state
        .db
        .get_account(&account_id)?
        .ok_or_else(|| ApiError::not_found(format!("account {account_id} not found")))?;
    let register_address = account.register_address.ok_or_else(|| {
        ApiError::bad_request("account has no custodial register assigned")
    })?;

    let tag = state.db.allocate_wallet_tag()?;
    state.db.append_wallet_tag(&account_id, tag)?;

    tracing::info!(account = %account_id, tag, "wallet tag allocated");
    Ok((
        StatusCode::CREATED,
        Json(WalletTagResponse {
            register_address,
            tag,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{test_state, TEST_REGISTER};

    fn request(account_id: &str, screen_name: &str) -> ProvisionAccountRequest {
        ProvisionAccountRequest {
            account_id: account_id.into(),
            screen_name: screen_name.into(),
            register_address: None,
        }
    }

    #[tokio::test]
    async fn provisioning_assigns_a_register_and_tag() {
        let (state, _gateway, _dir) = test_state();

        let (status, Json(account)) =
            provision_account(State(state.clone()), Json(request("acct-1", "Alice")))
                .await
                .expect("provisioning succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(account.register_address.as_deref(), Some(TEST_REGISTER));
        assert_eq!(account.wallet_tags, vec![1000]);

        let stored = state.db.get_account("acct-1").unwrap().unwrap();
        assert_eq!(stored.screen_name, "Alice");
    }

    #[tokio::test]
    async fn provisioning_accepts_a_known_register() {
        let (state, _gateway, _dir) = test_state();
        let mut req = request("acct-1", "Alice");
        req.register_address = Some(TEST_REGISTER.into());

        let (_, Json(account)) = provision_account(State(state), Json(req))
            .await
            .expect("provisioning succeeds");
        assert_eq!(account.register_address.as_deref(), Some(TEST_REGISTER));
    }

    #[tokio::test]
    async fn provisioning_rejects_a_foreign_register() {
        let (state, _gateway, _dir) = test_state();
        let mut req = request("acct-1", "Alice");
        req.register_address = Some("rSomebodyElse".into());

        let err = provision_account(State(state), Json(req)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_screen_names_conflict() {
        let (state, _gateway, _dir) = test_state();
        provision_account(State(state.clone()), Json(request("acct-1", "Alice")))
            .await
            .expect("provisioning succeeds");

        // Same name after normalization.
        let err = provision_account(State(state), Json(request("acct-2", "  ALICE ")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn wallet_tags_accumulate_on_the_account() {
        let (state, _gateway, _dir) = test_state();
        provision_account(State(state.clone()), Json(request("acct-1", "Alice")))
            .await
            .expect("provisioning succeeds");

        let (status, Json(response)) =
            add_wallet_tag(AccountId("acct-1".into()), State(state.clone()))
                .await
                .expect("allocation succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.register_address, TEST_REGISTER);
        assert_eq!(response.tag, 1001);

        let stored = state.db.get_account("acct-1").unwrap().unwrap();
        assert_eq!(stored.wallet_tags, vec![1000, 1001]);
    }

    #[tokio::test]
    async fn wallet_tags_require_a_register() {
        let (state, _gateway, _dir) = test_state();
        state
            .db
            .create_account("acct-1", "Alice", None, 42)
            .unwrap();

        let err = add_wallet_tag(AccountId("acct-1".into()), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wallet_tags_for_unknown_accounts_are_not_found() {
        let (state, _gateway, _dir) = test_state();
        let err = add_wallet_tag(AccountId("acct-9".into()), State(state))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
