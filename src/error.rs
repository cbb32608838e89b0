use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::{auth::repo::RepoError, health::HealthReport};

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Email already registered")]
    Conflict,
    #[error("Incorrect email or password")]
    Unauthorized,
    /// No Basic credentials were presented at all.
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Code expired")]
    Expired,
    #[error("Invalid code")]
    InvalidCode,
    #[error("{0}")]
    Validation(String),
    #[error("dependencies unavailable")]
    Unavailable(HealthReport),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Conflict | AppError::Expired | AppError::InvalidCode => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized | AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Duplicate => AppError::Conflict,
            RepoError::Database(e) => AppError::Internal(e.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::UNAUTHORIZED {
            let mut res = (
                status,
                Json(ErrorBody {
                    detail: self.to_string(),
                }),
            )
                .into_response();
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
            return res;
        }
        match self {
            AppError::Unavailable(report) => (status, Json(report)).into_response(),
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    status,
                    Json(ErrorBody {
                        detail: "Internal server error".into(),
                    }),
                )
                    .into_response()
            }
            other => (
                status,
                Json(ErrorBody {
                    detail: other.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
