//! JSON error responses for the `/api` routes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::cache::CacheError;
use crate::generator::GeneratorError;

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorBody {
    status: String,
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("Failed to store generated file: {0}")]
    Output(#[from] std::io::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Cache(CacheError::NotFound) => StatusCode::NOT_FOUND,
            Self::Cache(CacheError::Busy) => StatusCode::CONFLICT,
            Self::Generator(GeneratorError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Generator(_) => StatusCode::BAD_GATEWAY,
            Self::Output(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Output(err) => {
                error!("Failed to store generated file: {err}");
                "Failed to store generated file".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            status: "error".to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
