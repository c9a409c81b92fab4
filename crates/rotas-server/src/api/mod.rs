//! HTTP API surface.
//!
//! Each module contributes a `routes()` scope mounted under `/api`. The
//! mapping endpoints register inside the rotas scope because actix-web
//! cannot have two scopes with the same path prefix.

pub mod balance;
pub mod ingest;
pub mod maps;
pub mod rotas;

use actix_web::{HttpMessage, HttpRequest, HttpResponse, Scope, web};
use rotas_common::error;
use serde_json::Value;

use crate::model::common::AuthContext;
use crate::model::response;

pub fn routes() -> Scope {
    web::scope("/api")
        .service(ingest::routes())
        .service(rotas::routes())
        .service(balance::routes())
}

/// Context placed by the authentication middleware. Anonymous when the
/// middleware is not mounted.
pub(crate) fn auth_context(req: &HttpRequest) -> AuthContext {
    req.extensions()
        .get::<AuthContext>()
        .cloned()
        .unwrap_or_default()
}

/// 401 for missing or unknown tokens, 403 for tokens without the app slug.
/// Staff tokens reach every app.
pub(crate) fn authorize(req: &HttpRequest, app: &str) -> Result<AuthContext, HttpResponse> {
    let context = auth_context(req);
    if !context.authenticated() {
        return Err(response::error_response(error::UNAUTHORIZED));
    }
    if !(context.staff || context.can_access(app)) {
        return Err(response::error_response(error::FORBIDDEN));
    }
    Ok(context)
}

/// Integer body field that arrives as a number or a numeric string.
/// `Ok(None)` means absent, `Err` means present but not an integer.
pub(crate) fn integer_field(value: Option<&Value>) -> Result<Option<i64>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number.as_i64().map(Some).ok_or(()),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                text.parse::<i64>().map(Some).map_err(|_| ())
            }
        }
        Some(_) => Err(()),
    }
}
