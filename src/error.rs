//!
//! # Custom Error Handling
//!
//! This module defines the error type `AppError` shared by the services, repositories
//! and HTTP handlers. Every operation of the identity and task services returns one of
//! these variants, and the transport layer renders them as HTTP responses.
//!
//! `AppError` implements `actix_web::error::ResponseError` so handlers can return it
//! directly. Infrastructure failures (storage, cache, mail, hashing...) are logged with
//! their details and reported to the client with a generic message only.
//! `From` implementations for `sqlx::Error`, `redis::RedisError`, `bcrypt::BcryptError`
//! and `validator::ValidationErrors` allow using the `?` operator across layers.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

/// Represents all possible errors that can occur within the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input. `field` names the offending input field (HTTP 422).
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },
    /// A unique resource already exists, e.g. a duplicate email (HTTP 409).
    #[error("{0}")]
    Conflict(String),
    /// The verification code is missing, expired or already consumed (HTTP 400).
    #[error("verification code is invalid or expired")]
    CodeInvalid,
    /// Verification replay on an already verified account (HTTP 409).
    #[error("user is already verified")]
    AlreadyVerified,
    /// Wrong email or wrong password. Does not say which (HTTP 401).
    #[error("invalid email or password")]
    InvalidCredentials,
    /// The referenced user does not exist (HTTP 404).
    #[error("user not found")]
    UserNotFound,
    /// The referenced resource does not exist (HTTP 404).
    #[error("{0}")]
    NotFound(String),
    /// Missing, malformed or expired bearer token (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Relational store failure.
    #[error("storage error: {0}")]
    Storage(String),
    /// Verification cache failure.
    #[error("cache error: {0}")]
    Cache(String),
    /// The verification email could not be dispatched.
    #[error("notification error: {0}")]
    Notification(String),
    /// The session token could not be signed.
    #[error("token issuance error: {0}")]
    TokenIssuance(String),
    /// The OS entropy source was unavailable.
    #[error("random source error: {0}")]
    RandomSource(String),
    /// Password hashing or hash parsing failed.
    #[error("hashing error: {0}")]
    Hashing(String),
}

impl AppError {
    /// Shorthand for a [`AppError::Validation`] on `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True for failures of a backing service rather than of the request itself.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            AppError::Storage(_)
                | AppError::Cache(_)
                | AppError::Notification(_)
                | AppError::TokenIssuance(_)
                | AppError::RandomSource(_)
                | AppError::Hashing(_)
        )
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) | AppError::AlreadyVerified => StatusCode::CONFLICT,
            AppError::CodeInvalid => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match self {
            AppError::Validation { field, .. } => HttpResponse::build(status).json(json!({
                "error": self.to_string(),
                "field": field
            })),
            // Details of backing-service failures stay in the logs.
            err if err.is_infrastructure() => {
                log::error!("{}", err);
                HttpResponse::build(status).json(json!({
                    "error": "internal server error"
                }))
            }
            _ => HttpResponse::build(status).json(json!({
                "error": self.to_string()
            })),
        }
    }
}

/// Converts `sqlx::Error` into `AppError`.
///
/// `sqlx::Error::RowNotFound` becomes `AppError::NotFound`, everything else is a
/// storage failure. Repositories handle unique and foreign-key violations themselves.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            _ => AppError::Storage(error.to_string()),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(error: redis::RedisError) -> AppError {
        AppError::Cache(error.to_string())
    }
}

/// Converts `validator::ValidationErrors` into `AppError::Validation`.
///
/// Only the first offending field (in alphabetical order) is reported.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> AppError {
        let field_errors = errors.field_errors();
        let first = field_errors.iter().min_by_key(|(field, _)| **field);

        match first {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .map(|e| match &e.message {
                        Some(msg) => msg.to_string(),
                        None => e.code.to_string(),
                    })
                    .unwrap_or_else(|| "invalid value".to_string());
                AppError::validation(*field, message)
            }
            None => AppError::validation("input", errors.to_string()),
        }
    }
}

/// Converts `bcrypt::BcryptError` into `AppError::Hashing`.
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Hashing(error.to_string())
    }
}
