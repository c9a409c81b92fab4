//! Origin/destination code mappings.
//!
//! Handlers live on the `/rotas` scope, see [`super::rotas::routes`].

use actix_web::{HttpRequest, HttpResponse, Responder, delete, get, post, web};
use chrono::Utc;
use rotas_common::{APP_ROTAS, error};
use rotas_core::model::{MapTipo, RouteMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::api;
use crate::model::common::AppState;
use crate::model::response;

#[derive(Debug, Deserialize)]
pub struct MapsQuery {
    tipo: Option<String>,
}

#[derive(Debug, Serialize)]
struct MapsView {
    ok: bool,
    mapeamentos: Vec<RouteMap>,
}

#[derive(Debug, Serialize)]
struct MapResult {
    ok: bool,
    mapeamento: RouteMap,
}

#[derive(Debug, Serialize)]
struct DeleteResult {
    ok: bool,
}

#[get("/maps")]
pub async fn list_maps(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<MapsQuery>,
) -> impl Responder {
    if let Err(response) = api::authorize(&req, APP_ROTAS) {
        return response;
    }

    let tipo = match query
        .tipo
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
    {
        Some(text) => match MapTipo::parse(&text.to_uppercase()) {
            Some(tipo) => Some(tipo),
            None => return response::error_response(error::INVALID_TIPO),
        },
        None => None,
    };

    let mapeamentos = data.maps.list(APP_ROTAS, tipo);
    HttpResponse::Ok().json(MapsView {
        ok: true,
        mapeamentos,
    })
}

#[post("/maps")]
pub async fn save_map(
    data: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> impl Responder {
    if let Err(response) = api::authorize(&req, APP_ROTAS) {
        return response;
    }

    let parsed: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return response::error_response(error::INVALID_JSON),
    };
    let Some(obj) = parsed.as_object() else {
        return response::error_response(error::INVALID_PAYLOAD);
    };

    let tipo = match obj.get("tipo").and_then(Value::as_str) {
        Some(text) => match MapTipo::parse(&text.trim().to_uppercase()) {
            Some(tipo) => tipo,
            None => return response::error_response(error::INVALID_TIPO),
        },
        None => return response::error_response(error::INVALID_TIPO),
    };
    let codigo = match api::integer_field(obj.get("codigo")) {
        Ok(Some(codigo)) => codigo,
        _ => return response::error_response(error::INVALID_CODIGO),
    };
    let nome = match obj.get("nome").and_then(Value::as_str).map(str::trim) {
        Some(nome) if !nome.is_empty() => nome.to_string(),
        _ => return response::error_response(error::INVALID_NOME),
    };
    let ativo = match obj.get("ativo") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Null) | None => true,
        Some(_) => return response::error_response(error::INVALID_PAYLOAD),
    };
    let id = match api::integer_field(obj.get("id")) {
        Ok(None) => None,
        Ok(Some(value)) if value >= 0 => Some(value as u64),
        _ => return response::error_response(error::INVALID_PAYLOAD),
    };

    match data
        .maps
        .save(APP_ROTAS, id, tipo, codigo, &nome, ativo, Utc::now())
    {
        Ok(mapeamento) => {
            info!(id = mapeamento.id, "route map saved");
            HttpResponse::Ok().json(MapResult {
                ok: true,
                mapeamento,
            })
        }
        Err(err) => response::from_error(&err),
    }
}

#[delete("/maps/{id}")]
pub async fn delete_map(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<u64>,
) -> impl Responder {
    if let Err(response) = api::authorize(&req, APP_ROTAS) {
        return response;
    }

    let id = path.into_inner();
    match data.maps.delete(APP_ROTAS, id) {
        Ok(()) => {
            info!(id, "route map deleted");
            HttpResponse::Ok().json(DeleteResult { ok: true })
        }
        Err(err) => response::from_error(&err),
    }
}
