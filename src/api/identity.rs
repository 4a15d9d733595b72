// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the calling account.
//!
//! Authentication happens at the edge; by the time a request reaches this
//! service the gateway has stamped the caller's account id onto the
//! `x-account-id` header. Handlers require it with the `AccountId`
//! extractor:
//!
//! ```rust,ignore
//! async fn my_handler(AccountId(account_id): AccountId) -> impl IntoResponse {
//!     // account_id is the caller's account id
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the caller's account id.
pub const ACCOUNT_ID_HEADER: &str = "x-account-id";

/// Extractor for the calling account's id.
#[derive(Debug)]
pub struct AccountId(pub String);

impl FromRequestParts<AppState> for AccountId {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let account_id = parts
            .headers
            .get(ACCOUNT_ID_HEADER)
            .ok_or_else(|| {
                ApiError::new(StatusCode::UNAUTHORIZED, "missing x-account-id header")
            })?
            .to_str()
            .map_err(|_| {
                ApiError::new(StatusCode::UNAUTHORIZED, "malformed x-account-id header")
            })?
            .trim();
        if account_id.is_empty() {
            return Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                "missing x-account-id header",
            ));
        }
        Ok(AccountId(account_id.to_string()))
    }
}
