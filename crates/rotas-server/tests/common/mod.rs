#![allow(dead_code)]

//! Shared fixtures for the HTTP API tests.

use std::sync::Arc;

use actix_http::Request;
use actix_web::body::{BoxBody, EitherBody};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{App, test, web};
use chrono::{Duration, FixedOffset, SecondsFormat, Utc};
use rotas_core::model::AppConfig;
use rotas_core::registry::{AccessLogRegistry, AppRegistry, MapRegistry, RouteConfigRegistry};
use rotas_core::store::IngestStore;
use rotas_server::api;
use rotas_server::middleware::Authentication;
use rotas_server::model::common::{AppState, TokenDef};
use serde_json::{Value, json};

pub const INGEST_TOKEN: &str = "ingest-secret";
pub const STAFF_TOKEN: &str = "painel-token";
pub const READER_TOKEN: &str = "reader-token";

pub const CLIENT_ID: &str = "site-01";
pub const ROTAS_AGENT: &str = "plc-rotas";
pub const BALANCE_AGENT: &str = "plc-balanca";

pub fn create_test_state() -> AppState {
    let apps = AppRegistry::default();
    apps.seed(vec![
        AppConfig {
            slug: "approtas".to_string(),
            nome: "Painel de Rotas".to_string(),
            client_id: CLIENT_ID.to_string(),
            agent_id: ROTAS_AGENT.to_string(),
            sources: vec![],
            ativo: true,
        },
        AppConfig {
            slug: "appmilhaobla".to_string(),
            nome: "Balanca do Milhao".to_string(),
            client_id: CLIENT_ID.to_string(),
            agent_id: BALANCE_AGENT.to_string(),
            sources: vec![
                "balanca_acumulado_hora".to_string(),
                "balanca_acumulado".to_string(),
            ],
            ativo: true,
        },
    ]);

    AppState {
        store: IngestStore::new(),
        apps,
        route_configs: RouteConfigRegistry::default(),
        maps: MapRegistry::default(),
        access_log: AccessLogRegistry::default(),
        tokens: vec![
            TokenDef {
                token: STAFF_TOKEN.to_string(),
                name: "painel".to_string(),
                staff: true,
                apps: vec![],
            },
            TokenDef {
                token: READER_TOKEN.to_string(),
                name: "reader".to_string(),
                staff: false,
                apps: vec!["approtas".to_string()],
            },
        ],
        ingest_token: INGEST_TOKEN.to_string(),
        site_offset: FixedOffset::east_opt(-3 * 3600).unwrap(),
        timeline_limit: 288,
    }
}

/// State whose apps have no ingest scope configured.
pub fn create_unconfigured_state() -> AppState {
    let state = create_test_state();
    state.apps.seed(vec![
        AppConfig {
            slug: "approtas".to_string(),
            nome: "Painel de Rotas".to_string(),
            client_id: String::new(),
            agent_id: String::new(),
            sources: vec![],
            ativo: true,
        },
        AppConfig {
            slug: "appmilhaobla".to_string(),
            nome: "Balanca do Milhao".to_string(),
            client_id: String::new(),
            agent_id: String::new(),
            sources: vec![],
            ativo: true,
        },
    ]);
    state
}

pub async fn create_test_app_with(
    app_state: AppState,
) -> impl Service<Request, Response = ServiceResponse<EitherBody<BoxBody>>, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .wrap(Authentication)
            .app_data(web::Data::from(Arc::new(app_state)))
            .service(api::routes()),
    )
    .await
}

pub async fn create_test_app()
-> impl Service<Request, Response = ServiceResponse<EitherBody<BoxBody>>, Error = actix_web::Error>
{
    create_test_app_with(create_test_state()).await
}

/// UTC instant `minutes` ago, in a form that survives query strings.
pub fn minutes_ago(minutes: i64) -> String {
    (Utc::now() - Duration::minutes(minutes)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn rota_item(source_id: &str, tag: &str, value: Value, timestamp: &str) -> Value {
    json!({
        "source_id": source_id,
        "client_id": CLIENT_ID,
        "agent_id": ROTAS_AGENT,
        "source": "telemetria_rotas",
        "payload": {
            "Name": tag,
            "Value": value,
            "TimestampUtc": timestamp
        }
    })
}

pub fn balance_item(source_id: &str, tag: &str, producao: f64, hora: &str) -> Value {
    json!({
        "source_id": source_id,
        "client_id": CLIENT_ID,
        "agent_id": BALANCE_AGENT,
        "source": "balanca_acumulado_hora",
        "payload": {
            "TagName": tag,
            "ProducaoHora": producao,
            "Hora": hora
        }
    })
}

pub fn ingest_request(items: &Value) -> Request {
    test::TestRequest::post()
        .uri("/api/ingest")
        .insert_header(("Authorization", format!("Bearer {}", INGEST_TOKEN)))
        .set_json(items)
        .to_request()
}

pub fn get_request(uri: &str, token: &str) -> Request {
    test::TestRequest::get()
        .uri(uri)
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request()
}

pub fn post_json(uri: &str, token: &str, body: &Value) -> Request {
    test::TestRequest::post()
        .uri(uri)
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(body)
        .to_request()
}

pub fn delete_request(uri: &str, token: &str) -> Request {
    test::TestRequest::delete()
        .uri(uri)
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request()
}
