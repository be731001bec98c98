use crate::app::registry_service::{RegistryService, ServiceError};
use crate::domain::chain::ChainBook;
use crate::error::codes;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<Mutex<RegistryService>>,
    pub chain: Arc<ChainBook>,
}

impl AppState {
    pub fn new(initial_credits: u32) -> Self {
        Self {
            service: Arc::new(Mutex::new(RegistryService::new(initial_credits))),
            chain: Arc::new(ChainBook::new()),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

/// OAuth2 password-flow form body.
#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct UserOut {
    pub id: i64,
    pub email: String,
    pub credits: i64,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct TokenOut {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct FileRecordOut {
    pub id: i64,
    pub filename: String,
    pub file_hash: String,
    pub tx_hash: Option<String>,
    pub block_number: Option<u64>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ChainRecordOut {
    pub owner: String,
    pub timestamp: i64,
    pub timestamp_iso: String,
    pub stored_hash: String,
    pub metadata: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct VerifyResultOut {
    pub filename: String,
    pub file_hash: String,
    pub on_chain: bool,
    /// Present only when `on_chain` is true.
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub matches: Option<bool>,
    /// Present only when `on_chain` is true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ChainRecordOut>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HealthOut {
    pub status: String,
    pub chain_height: u64,
}

/// Every non-2xx response carries this body.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
    pub code: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub detail: String,
}

impl ApiError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: codes::VALIDATION_ERROR,
            detail: detail.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: codes::UNAUTHORIZED,
            detail: "Could not validate credentials.".to_string(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let (status, code) = match &err {
            ServiceError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, codes::VALIDATION_ERROR),
            ServiceError::DuplicateAccount => (StatusCode::BAD_REQUEST, codes::DUPLICATE_ACCOUNT),
            ServiceError::InvalidCredentials => (StatusCode::UNAUTHORIZED, codes::INVALID_CREDENTIALS),
            ServiceError::Unauthorized => (StatusCode::UNAUTHORIZED, codes::UNAUTHORIZED),
            ServiceError::InsufficientCredits => (StatusCode::PAYMENT_REQUIRED, codes::INSUFFICIENT_CREDITS),
            ServiceError::Ledger(_) => (StatusCode::INTERNAL_SERVER_ERROR, codes::LEDGER_ERROR),
        };
        Self {
            status,
            code,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            detail: self.detail,
            code: self.code.to_string(),
        });
        if self.status == StatusCode::UNAUTHORIZED {
            (self.status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (self.status, body).into_response()
        }
    }
}
