//! Service failures and how they surface over HTTP.

use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::schema::ValidationError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{field} {value} is already taken")]
    Duplicate { field: String, value: String },

    /// Another request held the collection for longer than the lock timeout.
    #[error("collection {collection} is busy")]
    Busy { collection: String },

    #[error("storage failure: {0}")]
    Store(StoreError),

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("blocking task failed: {0}")]
    Blocking(#[from] BlockingError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { field, value } => Self::Duplicate { field, value },
            StoreError::LockTimeout { collection, .. } => Self::Busy { collection },
            other => Self::Store(other),
        }
    }
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_request",
            Self::NotFound { .. } => "not_found",
            Self::InvalidCredentials => "unauthorized",
            Self::Duplicate { .. } => "conflict",
            Self::Busy { .. } => "service_unavailable",
            Self::Store(_) | Self::PasswordHash(_) | Self::Blocking(_) => "internal_error",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Duplicate { .. } => StatusCode::CONFLICT,
            Self::Busy { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) | Self::PasswordHash(_) | Self::Blocking(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {self}");
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };
        let details = match self {
            Self::Validation(errors) => serde_json::to_value(errors.fields()).ok(),
            _ => None,
        };
        HttpResponse::build(status).json(ErrorBody {
            code: self.code(),
            message,
            details,
        })
    }
}
