//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` for every failure class the session can surface and
//! implements Axum's `IntoResponse` so handlers can return it directly.
//!
//! Error mappings:
//! - `NotARepository` → 404
//! - `Validation`, `InvalidPath` → 400
//! - `NoSession`, `Busy` → 409
//! - `InvalidOperation`, `OperationFailed` → 422
//! - `ExternalTool` → 502
//! - `Git`, `Internal` → 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not a git repository: {0}")]
    NotARepository(String),

    #[error("No repository is open")]
    NoSession,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Operation not allowed: {0}")]
    InvalidOperation(String),

    #[error("Another operation is already running")]
    Busy,

    #[error("{operation} failed: {message}")]
    OperationFailed { operation: String, message: String },

    /// The command-line tool exited non-zero, timed out, or could not start.
    /// Output is kept raw for display.
    #[error("{operation} failed: {message}")]
    ExternalTool {
        operation: String,
        message: String,
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable label for the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotARepository(_) => "not_a_repository",
            AppError::NoSession => "no_session",
            AppError::Validation(_) => "validation",
            AppError::InvalidPath(_) => "invalid_path",
            AppError::InvalidOperation(_) => "invalid_operation",
            AppError::Busy => "busy",
            AppError::OperationFailed { .. } => "operation_failed",
            AppError::ExternalTool { .. } => "external_tool",
            AppError::Git(_) => "git",
            AppError::Internal(_) => "internal",
        }
    }

    /// Scope a backend failure to the operation that triggered it.
    ///
    /// Rejections that never reached the backend and tool failures keep
    /// their own shape.
    pub fn at_operation(self, operation: &str) -> AppError {
        match self {
            AppError::Git(e) => AppError::OperationFailed {
                operation: operation.to_string(),
                message: e.message().to_string(),
            },
            AppError::Internal(message) | AppError::NotARepository(message) => {
                AppError::OperationFailed {
                    operation: operation.to_string(),
                    message,
                }
            }
            other => other,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotARepository(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            AppError::NoSession | AppError::Busy => StatusCode::CONFLICT,
            AppError::InvalidOperation(_) | AppError::OperationFailed { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::ExternalTool { .. } => StatusCode::BAD_GATEWAY,
            AppError::Git(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AppError::OperationFailed { operation, .. } => json!({
                "error": self.to_string(),
                "kind": self.kind(),
                "operation": operation,
            }),
            AppError::ExternalTool {
                operation,
                stdout,
                stderr,
                exit_code,
                ..
            } => json!({
                "error": self.to_string(),
                "kind": self.kind(),
                "operation": operation,
                "stdout": stdout,
                "stderr": stderr,
                "exit_code": exit_code,
            }),
            _ => json!({
                "error": self.to_string(),
                "kind": self.kind(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
