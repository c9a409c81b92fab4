//! Telemetry batch ingestion.
//!
//! A batch is applied atomically: any invalid item rejects the whole
//! request before the store is touched.

use actix_web::{HttpRequest, HttpResponse, Responder, Scope, delete, post, web};
use chrono::Utc;
use rotas_common::error;
use rotas_core::model::IngestItem;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::api;
use crate::model::common::AppState;
use crate::model::response;

pub fn routes() -> Scope {
    web::scope("/ingest")
        .service(ingest_batch)
        .service(reset_records)
}

#[derive(Debug, Serialize)]
struct IngestResult {
    ok: bool,
    count: usize,
}

#[derive(Debug, Serialize)]
struct ResetResult {
    ok: bool,
    removed: usize,
}

#[post("")]
pub async fn ingest_batch(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> impl Responder {
    let context = api::auth_context(&req);
    let authorized = !data.ingest_token.is_empty()
        && context.token.as_deref() == Some(data.ingest_token.as_str());
    if !authorized {
        return response::error_response(error::UNAUTHORIZED);
    }

    let parsed: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(err) => {
            warn!("ingest batch rejected: {}", err);
            return response::error_response(error::INVALID_JSON);
        }
    };

    let items = match parse_items(&parsed) {
        Ok(items) => items,
        Err(response) => return response,
    };

    let count = data.store.apply_batch(&items, Utc::now());
    info!(count, "ingest batch applied");
    HttpResponse::Ok().json(IngestResult { ok: true, count })
}

#[delete("/records")]
pub async fn reset_records(data: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    let context = api::auth_context(&req);
    if !context.authenticated() {
        return response::error_response(error::UNAUTHORIZED);
    }
    if !context.staff {
        return response::error_response(error::FORBIDDEN);
    }

    let removed = data.store.clear();
    info!(removed, "ingest records reset");
    HttpResponse::Ok().json(ResetResult { ok: true, removed })
}

fn parse_items(parsed: &Value) -> Result<Vec<IngestItem>, HttpResponse> {
    let Some(list) = parsed.as_array() else {
        return Err(response::error_response(error::INVALID_PAYLOAD));
    };

    let mut items = Vec::with_capacity(list.len());
    for raw in list {
        let Some(obj) = raw.as_object() else {
            return Err(response::error_response(error::INVALID_PAYLOAD));
        };
        let source_id = required_field(obj, "source_id")?;
        let client_id = required_field(obj, "client_id")?;
        let agent_id = required_field(obj, "agent_id")?;
        let source = required_field(obj, "source")?;
        let payload = match obj.get("payload") {
            // String payloads carry JSON documents of their own
            Some(Value::String(text)) => match serde_json::from_str(text) {
                Ok(inner) => inner,
                Err(_) => return Err(response::error_response(error::INVALID_PAYLOAD)),
            },
            Some(value) => value.clone(),
            None => return Err(response::error_response(error::INVALID_PAYLOAD)),
        };
        items.push(IngestItem {
            source_id,
            client_id,
            agent_id,
            source,
            payload,
        });
    }
    Ok(items)
}

fn required_field(obj: &Map<String, Value>, key: &str) -> Result<String, HttpResponse> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .ok_or_else(|| response::error_response(error::INVALID_PAYLOAD))
}
