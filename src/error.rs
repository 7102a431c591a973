//! Typed errors and HTTP mapping.

use crate::response::ResponseEntity;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid setting {key}={value}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Faults raised by the data-access layer. Driver errors pass through untouched.
#[derive(Error, Debug)]
pub enum DataError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error("unknown column '{column}' on table {table}")]
    UnknownColumn { table: String, column: String },
    #[error("table {0} declares no key field")]
    MissingKey(String),
    #[error("procedure {procedure} called without {param}")]
    MissingParam {
        procedure: &'static str,
        param: &'static str,
    },
    #[error("decode: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("procedure {0} returned an unexpected result shape")]
    UnexpectedOutput(&'static str),
}

/// Field name to messages, the `content` of a 400 response.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("Input data is invalid!")]
    Validation(FieldErrors),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Data(DataError::Db(e))
    }
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.entry(field.into()).or_default().push(message.into());
        AppError::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Data(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let content = match &self {
            AppError::Validation(errors) => serde_json::to_value(errors).unwrap_or_default(),
            _ => serde_json::Value::Null,
        };
        ResponseEntity::new(status, content, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_errors_are_not_rewrapped() {
        let err = DataError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.to_string(), sqlx::Error::RowNotFound.to_string());
        assert!(matches!(AppError::from(err), AppError::Data(DataError::Db(sqlx::Error::RowNotFound))));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::validation("name", "required").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Internal("x".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::Data(DataError::MissingKey("t".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
