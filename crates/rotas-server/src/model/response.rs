use actix_web::http::StatusCode;
use actix_web::{HttpResponse, HttpResponseBuilder};
use rotas_common::error::{ErrorCode, RotasError};
use serde::{Deserialize, Serialize};

/// Envelope returned by every failing API operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResult {
    pub ok: bool,
    pub error: String,
}

impl ErrorResult {
    pub fn new(code: &str) -> Self {
        ErrorResult {
            ok: false,
            error: code.to_string(),
        }
    }
}

/// Builds the error response for a wire error code.
pub fn error_response(error_code: ErrorCode<'_>) -> HttpResponse {
    HttpResponseBuilder::new(StatusCode::from_u16(error_code.status).unwrap_or_default())
        .json(ErrorResult::new(error_code.code))
}

/// Builds the error response for an application error.
pub fn from_error(error: &RotasError) -> HttpResponse {
    error_response(error.error_code())
}
