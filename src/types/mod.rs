//! Shared types and error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<SimulationError> for ApiError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::InvalidAmount(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

/// Errors that abort a whole simulation call.
///
/// Per-market failures never surface here; they are recorded in the
/// market's `SwapResult` instead.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Invalid input amount: {0}")]
    InvalidAmount(String),

    #[error("Ledger failed to initialize: {0}")]
    LedgerInit(#[source] LedgerError),

    #[error("Program image rejected by ledger: {0}")]
    ProgramLoad(#[source] LedgerError),

    #[error("Synthetic user could not be funded: {0}")]
    Funding(#[source] LedgerError),

    #[error("Simulator thread unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by a ledger while booting or accepting state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("program {program_id} could not be installed: {reason}")]
    ProgramRejected { program_id: String, reason: String },

    #[error("account {address} could not be seeded: {reason}")]
    AccountRejected { address: String, reason: String },
}

/// Swap instruction payload decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstructionError {
    #[error("swap payload must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unexpected instruction discriminator {0}")]
    UnknownDiscriminator(u8),

    #[error("unknown swap direction flag {0}")]
    UnknownDirection(u8),
}

/// Malformed values in the environment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid base58 address: {value}")]
    InvalidAddress { name: String, value: String },

    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: String, value: String },

    #[error("{name} must not be empty")]
    Empty { name: String },
}

/// Failures while reading account snapshot files.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
