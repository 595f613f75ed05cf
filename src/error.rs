use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    client::LocalStoreError,
    response::ApiResponse,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Invalid adjustment: stock {current} (reserved {reserved}) cannot move by {delta}")]
    InvalidAdjustment {
        current: i32,
        reserved: i32,
        delta: i32,
    },

    #[error("Persistence failure")]
    PersistenceFailure(#[from] sea_orm::DbErr),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("Local cart storage error")]
    LocalStore(#[from] LocalStoreError),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::InvalidAdjustment { .. } => StatusCode::BAD_REQUEST,
            AppError::PersistenceFailure(_)
            | AppError::DbError(_)
            | AppError::LocalStore(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // the envelope only carries the display text, keep the cause in the logs
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.to_string();
        let body = ApiResponse::failure(message.clone(), ErrorData { error: message });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
