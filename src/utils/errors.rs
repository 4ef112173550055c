//! Sistema de manejo de errores
//!
//! Este módulo define los errores que llegan a la frontera HTTP y su
//! conversión a respuestas JSON con el código de estado apropiado.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::repositories::StoreError;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ActiveTripExists => AppError::Conflict("session already in progress".to_string()),
            StoreError::TripNotActive(_) => AppError::NotFound("session not found or not in progress".to_string()),
            StoreError::VehicleNotFound(_) => AppError::NotFound("vehicle not found".to_string()),
            StoreError::Rejected(rejection) => AppError::BadRequest(rejection.to_string()),
            StoreError::Database(e) => AppError::Database(e),
            StoreError::Backend(msg) => AppError::Internal(msg),
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: String,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message,
            details: None,
            code: code.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Database(e) => {
                error!("❌ Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Database Error",
                        "An error occurred while accessing the database".to_string(),
                        "DB_ERROR",
                    ),
                )
            }

            AppError::Validation(e) => {
                warn!("Validation error: {}", e);
                let mut body = ErrorResponse::new(
                    "Validation Error",
                    "The provided data is invalid".to_string(),
                    "VALIDATION_ERROR",
                );
                body.details = Some(json!(e));
                (StatusCode::BAD_REQUEST, body)
            }

            AppError::Unauthorized(msg) => {
                warn!("Unauthorized access: {}", msg);
                (StatusCode::UNAUTHORIZED, ErrorResponse::new("Unauthorized", msg, "UNAUTHORIZED"))
            }

            AppError::Forbidden(msg) => {
                warn!("Forbidden access: {}", msg);
                (StatusCode::FORBIDDEN, ErrorResponse::new("Forbidden", msg, "FORBIDDEN"))
            }

            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new("Not Found", msg, "NOT_FOUND")),

            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new("Conflict", msg, "CONFLICT")),

            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new("Bad Request", msg, "BAD_REQUEST"))
            }

            AppError::Internal(msg) => {
                error!("❌ Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Internal Server Error",
                        "An unexpected error occurred".to_string(),
                        "INTERNAL_ERROR",
                    ),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;
