// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::gateway::GatewayError;
use crate::storage::LedgerDbError;
use crate::vault::VaultError;

/// Domain errors for bridge operations.
///
/// Gateway transport failures collapse into `GatewayUnavailable`; a submission
/// that reached the network but produced no result is `SubmissionFailed`.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("balance insufficient")]
    InsufficientBalance,

    #[error("unknown recipient")]
    UnknownRecipient,

    #[error("address is not a custodial register")]
    UnknownCustodialAddress,

    #[error("settlement network unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("transaction failed")]
    SubmissionFailed,

    #[error("no prepared payment for this account")]
    NoPreparedPayment,

    #[error("malformed swap deposit address")]
    MalformedSwapAddress,

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] LedgerDbError),

    #[error("vault error: {0}")]
    Vault(#[from] VaultError),
}

impl From<GatewayError> for BridgeError {
    fn from(e: GatewayError) -> Self {
        BridgeError::GatewayUnavailable(e.to_string())
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }
}

impl From<BridgeError> for ApiError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::InsufficientBalance => ApiError::unprocessable("Balance insufficient"),
            BridgeError::UnknownRecipient => ApiError::not_found("Recipient not found"),
            BridgeError::UnknownCustodialAddress => {
                ApiError::not_found("Address is not a custodial register")
            }
            BridgeError::GatewayUnavailable(msg) => {
                tracing::warn!(error = %msg, "settlement network unavailable");
                ApiError::service_unavailable("Settlement network unavailable")
            }
            BridgeError::SubmissionFailed => ApiError::bad_gateway("Transaction failed"),
            BridgeError::NoPreparedPayment => {
                ApiError::bad_request("No prepared payment; request a quote first")
            }
            BridgeError::MalformedSwapAddress => {
                ApiError::bad_request("Malformed swap deposit address")
            }
            BridgeError::Validation(msg) => ApiError::bad_request(msg),
            BridgeError::Storage(e) => {
                tracing::error!(error = %e, "storage failure");
                ApiError::internal("Storage failure")
            }
            BridgeError::Vault(e) => {
                tracing::error!(error = %e, "vault failure");
                ApiError::internal("Key vault failure")
            }
        }
    }
}

impl From<LedgerDbError> for ApiError {
    fn from(e: LedgerDbError) -> Self {
        match e {
            LedgerDbError::Conflict(msg) => ApiError::conflict(msg),
            LedgerDbError::NotFound(msg) => ApiError::not_found(msg),
            other => ApiError::from(BridgeError::Storage(other)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
