//! Error types and error codes for the rotas services
//!
//! This module defines:
//! - `RotasError`: Application-specific error enum
//! - `ErrorCode`: Wire error codes paired with their HTTP status

use serde::{Deserialize, Serialize};

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum RotasError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("mapping already exists: {0}")]
    DuplicateMap(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid prefix list: {0}")]
    InvalidPrefixList(String),

    #[error("prefix list is empty")]
    EmptyPrefixList,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

/// Error code structure for API responses.
///
/// `code` is the machine-readable value carried in the response body and
/// `status` the HTTP status the response is sent with.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: &'a str,
    pub status: u16,
}

// Authentication and authorization
pub const UNAUTHORIZED: ErrorCode<'static> = ErrorCode {
    code: "unauthorized",
    status: 401,
};

pub const FORBIDDEN: ErrorCode<'static> = ErrorCode {
    code: "forbidden",
    status: 403,
};

// Request validation
pub const INVALID_JSON: ErrorCode<'static> = ErrorCode {
    code: "invalid_json",
    status: 400,
};

pub const INVALID_PAYLOAD: ErrorCode<'static> = ErrorCode {
    code: "invalid_payload",
    status: 400,
};

pub const INVALID_PREFIX_LIST: ErrorCode<'static> = ErrorCode {
    code: "invalid_prefix_list",
    status: 400,
};

pub const EMPTY_PREFIX_LIST: ErrorCode<'static> = ErrorCode {
    code: "empty_prefix_list",
    status: 400,
};

// Mapping registry
pub const INVALID_TIPO: ErrorCode<'static> = ErrorCode {
    code: "invalid_tipo",
    status: 400,
};

pub const INVALID_CODIGO: ErrorCode<'static> = ErrorCode {
    code: "invalid_codigo",
    status: 400,
};

pub const INVALID_NOME: ErrorCode<'static> = ErrorCode {
    code: "invalid_nome",
    status: 400,
};

pub const DUPLICATE_MAP: ErrorCode<'static> = ErrorCode {
    code: "duplicate_map",
    status: 409,
};

pub const NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: "not_found",
    status: 404,
};

pub const INTERNAL_ERROR: ErrorCode<'static> = ErrorCode {
    code: "internal_error",
    status: 500,
};

impl RotasError {
    /// Wire code and HTTP status for this error.
    pub fn error_code(&self) -> ErrorCode<'static> {
        match self {
            RotasError::InvalidPayload(_) => INVALID_PAYLOAD,
            RotasError::DuplicateMap(_) => DUPLICATE_MAP,
            RotasError::NotFound(_) => NOT_FOUND,
            RotasError::InvalidPrefixList(_) => INVALID_PREFIX_LIST,
            RotasError::EmptyPrefixList => EMPTY_PREFIX_LIST,
            RotasError::ConfigError(_) => INTERNAL_ERROR,
            RotasError::InternalError(_) => INTERNAL_ERROR,
        }
    }
}
