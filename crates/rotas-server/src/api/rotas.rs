//! Route dashboard, route detail, configuration and record inspection.

use std::collections::{HashMap, HashSet};

use actix_web::{HttpRequest, HttpResponse, Responder, Scope, get, post, web};
use chrono::{DateTime, Duration, FixedOffset, LocalResult, Utc};
use rotas_common::{APP_ROTAS, Page, error};
use rotas_core::extract::{
    ParsedDateTime, build_event, events_from_records, extract_tag, extract_value, lifebit_fresh,
    parse_datetime,
};
use rotas_core::model::{
    AttrValues, Attribute, BASELINE_RECORDS_LIMIT, Event, IngestRecord, MAX_DASHBOARD_RECORDS,
    MAX_ROUTE_RECORDS, MapTipo, RECENT_EVENTS_LIMIT, RECENT_EVENTS_PAGE_SIZE,
    ROUTE_EVENTS_PAGE_SIZE, RouteConfig,
};
use rotas_core::state::{
    ChangeLogRow, LigadaInterval, RouteCard, build_change_log, build_global_ligada_intervals,
    build_ligada_intervals, build_route_cards, context_status_label, filter_cards, fold_attrs,
    local_display_full, local_display_short, route_status, seed_states,
};
use rotas_core::timeline::{TimelinePoint, build_timeline, select_point};
use rotas_core::value::{ScalarValue, format_value, is_active, scalar_text, value_to_int};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::maps;
use crate::api;
use crate::model::common::AppState;
use crate::model::response;

/// Detail view window when no explicit bounds are given.
const ROUTE_DETAIL_WINDOW_DAYS: i64 = 7;

/// Lifebit readings listed on the connection view.
const LIFEBIT_LIST_LIMIT: usize = 30;

/// Page size of the record inspection view.
const RECORDS_PAGE_SIZE: u64 = 50;

/// Records probed for the parse-success sample statistics.
const PARSE_SAMPLE_LIMIT: usize = 1200;

pub fn routes() -> Scope {
    web::scope("/rotas")
        .service(dashboard)
        .service(connection)
        .service(records)
        .service(reorder_routes)
        .service(maps::list_maps)
        .service(maps::save_map)
        .service(maps::delete_map)
        .service(save_route_config)
        .service(route_detail)
}

// ============================================================================
// Shared view pieces
// ============================================================================

#[derive(Debug, Serialize)]
struct TimelinePointView {
    timestamp: String,
    timestamp_display: String,
    count: u64,
}

impl TimelinePointView {
    fn from_point(point: &TimelinePoint, offset: FixedOffset) -> Self {
        TimelinePointView {
            timestamp: point.timestamp.to_rfc3339(),
            timestamp_display: local_display_short(point.timestamp, offset),
            count: point.count,
        }
    }
}

#[derive(Debug, Serialize)]
struct IntervalView {
    inicio: String,
    fim: String,
}

impl IntervalView {
    fn from_interval(interval: &LigadaInterval) -> Self {
        IntervalView {
            inicio: interval.inicio.to_rfc3339(),
            fim: interval.fim.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct EventView {
    prefixo: String,
    atributo: String,
    tag: String,
    valor_display: String,
    timestamp: String,
    timestamp_display: String,
}

impl EventView {
    fn from_event(event: &Event, offset: FixedOffset) -> Self {
        EventView {
            prefixo: event.prefixo.clone(),
            atributo: event.atributo.as_str().to_string(),
            tag: event.tag.clone(),
            valor_display: format_value(event.valor.as_ref()),
            timestamp: event.timestamp.to_rfc3339(),
            timestamp_display: local_display_short(event.timestamp, offset),
        }
    }
}

/// Tolerant instant parsing for `inicio`/`fim`/`at` query values. Naive
/// datetimes are interpreted at the site offset.
fn parse_instant(text: Option<&str>, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }
    match parse_datetime(text)? {
        ParsedDateTime::Aware(dt) => Some(dt.with_timezone(&Utc)),
        ParsedDateTime::Naive(naive) => match naive.and_local_timezone(offset) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                Some(dt.with_timezone(&Utc))
            }
            LocalResult::None => None,
        },
    }
}

/// Snaps the requested instant to the latest timeline point at or before
/// it. Index is -1 when the timeline has no points.
fn select_instant(
    timeline: &[TimelinePoint],
    at: Option<DateTime<Utc>>,
    fallback: DateTime<Utc>,
) -> (i64, DateTime<Utc>) {
    match at {
        Some(at) => match select_point(timeline, at) {
            Some((index, point)) => (index as i64, point.timestamp),
            None => (-1, at),
        },
        None => match timeline.last() {
            Some(point) => (timeline.len() as i64 - 1, point.timestamp),
            None => (-1, fallback),
        },
    }
}

// ============================================================================
// Dashboard
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    inicio: Option<String>,
    fim: Option<String>,
    at: Option<String>,
    #[serde(default)]
    busca: String,
    mostrar_inativas: Option<String>,
    events_page: Option<u64>,
}

#[derive(Debug, Serialize)]
struct DashboardView {
    ok: bool,
    config_missing: bool,
    inicio: String,
    fim: String,
    selected_at: String,
    selected_index: i64,
    timeline: Vec<TimelinePointView>,
    rotas: Vec<RouteCard>,
    total_rotas: usize,
    rotas_ativas: usize,
    eventos: Page<EventView>,
    conectado: bool,
    conexao_display: String,
    intervalos: Vec<IntervalView>,
}

impl DashboardView {
    fn not_configured() -> Self {
        DashboardView {
            ok: true,
            config_missing: true,
            inicio: String::new(),
            fim: String::new(),
            selected_at: String::new(),
            selected_index: -1,
            timeline: vec![],
            rotas: vec![],
            total_rotas: 0,
            rotas_ativas: 0,
            eventos: Page::default(),
            conectado: false,
            conexao_display: "--".to_string(),
            intervalos: vec![],
        }
    }
}

#[get("/dashboard")]
pub async fn dashboard(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<DashboardQuery>,
) -> impl Responder {
    if let Err(response) = api::authorize(&req, APP_ROTAS) {
        return response;
    }
    let Some(app) = data.apps.get_active(APP_ROTAS) else {
        return response::error_response(error::NOT_FOUND);
    };
    if app.config_missing() {
        return HttpResponse::Ok().json(DashboardView::not_configured());
    }

    let offset = data.site_offset;
    let now = Utc::now();
    let fim = parse_instant(query.fim.as_deref(), offset).unwrap_or(now);
    let inicio = parse_instant(query.inicio.as_deref(), offset)
        .unwrap_or_else(|| fim - Duration::hours(24));

    let window_records = data
        .store
        .records_in_window(&app, inicio, fim, MAX_DASHBOARD_RECORDS);
    let baseline_records = data.store.records_before(&app, inicio, BASELINE_RECORDS_LIMIT);

    let day_events = events_from_records(&window_records, Some((inicio, fim)), None, offset);
    let day_prefixes: HashSet<String> = day_events
        .iter()
        .map(|event| event.prefixo.clone())
        .collect();

    // Baseline seeds carry the state from before the window for the
    // prefixes that actually show up in it.
    let baseline_events = events_from_records(&baseline_records, None, None, offset);
    let mut seeds = seed_states(&baseline_events);
    seeds.retain(|prefixo, _| day_prefixes.contains(prefixo));

    let timeline = build_timeline(&day_events, data.timeline_limit);
    let at = parse_instant(query.at.as_deref(), offset);
    let (selected_index, selected_at) = select_instant(&timeline, at, fim);

    let origem_names = data.maps.name_lookup(APP_ROTAS, MapTipo::Origem);
    let destino_names = data.maps.name_lookup(APP_ROTAS, MapTipo::Destino);
    let configs = data.route_configs.for_app(APP_ROTAS);

    let cards = build_route_cards(
        &day_events,
        selected_at,
        &origem_names,
        &destino_names,
        &seeds,
        &day_prefixes,
        &configs,
        offset,
    );
    let total_rotas = cards.len();
    let rotas_ativas = cards.iter().filter(|card| !card.is_inactive).count();
    let mostrar_inativas = query.mostrar_inativas.as_deref() == Some("1");
    let rotas = filter_cards(cards, &query.busca, mostrar_inativas);

    let recent: Vec<EventView> = day_events
        .iter()
        .filter(|event| event.timestamp <= selected_at)
        .rev()
        .take(RECENT_EVENTS_LIMIT)
        .map(|event| EventView::from_event(event, offset))
        .collect();
    let eventos = Page::paginate(recent, query.events_page.unwrap_or(1), RECENT_EVENTS_PAGE_SIZE);

    let lifebit = data.store.latest_lifebit(&app);
    let conectado = lifebit
        .as_ref()
        .map(|record| lifebit_fresh(record.effective_time(), now))
        .unwrap_or(false);
    let conexao_display = lifebit
        .as_ref()
        .map(|record| local_display_full(record.effective_time(), offset))
        .unwrap_or_else(|| "--".to_string());

    let initial_on: HashSet<String> = seeds
        .iter()
        .filter(|(_, state)| is_active(state.attrs.get(Attribute::Ligada)))
        .map(|(prefixo, _)| prefixo.clone())
        .collect();
    let intervalos: Vec<IntervalView> =
        build_global_ligada_intervals(&day_events, inicio, selected_at, &initial_on)
            .iter()
            .map(IntervalView::from_interval)
            .collect();

    debug!(
        rotas = total_rotas,
        eventos = day_events.len(),
        "route dashboard rendered"
    );

    HttpResponse::Ok().json(DashboardView {
        ok: true,
        config_missing: false,
        inicio: inicio.to_rfc3339(),
        fim: fim.to_rfc3339(),
        selected_at: selected_at.to_rfc3339(),
        selected_index,
        timeline: timeline
            .iter()
            .map(|point| TimelinePointView::from_point(point, offset))
            .collect(),
        rotas,
        total_rotas,
        rotas_ativas,
        eventos,
        conectado,
        conexao_display,
        intervalos,
    })
}

// ============================================================================
// Route detail
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    inicio: Option<String>,
    fim: Option<String>,
    at: Option<String>,
    detail_events_page: Option<u64>,
}

#[derive(Debug, Serialize)]
struct AttributeRow {
    atributo: String,
    valor_display: String,
}

#[derive(Debug, Serialize)]
struct RouteDetailView {
    ok: bool,
    config_missing: bool,
    prefixo: String,
    nome_exibicao: String,
    inicio: String,
    fim: String,
    selected_at: String,
    selected_index: i64,
    timeline: Vec<TimelinePointView>,
    atributos: Vec<AttributeRow>,
    play_blink: bool,
    play_on: bool,
    pause_on: bool,
    is_inactive: bool,
    context_status: String,
    last_update: Option<String>,
    last_update_display: String,
    eventos: Page<ChangeLogRow>,
    intervalos: Vec<IntervalView>,
    config: Option<RouteConfig>,
}

#[get("/routes/{prefixo}")]
pub async fn route_detail(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<DetailQuery>,
) -> impl Responder {
    if let Err(response) = api::authorize(&req, APP_ROTAS) {
        return response;
    }
    let Some(app) = data.apps.get_active(APP_ROTAS) else {
        return response::error_response(error::NOT_FOUND);
    };
    let prefixo = path.into_inner().trim().to_uppercase();
    if prefixo.is_empty() {
        return response::error_response(error::NOT_FOUND);
    }

    let offset = data.site_offset;
    let now = Utc::now();
    let fim = parse_instant(query.fim.as_deref(), offset).unwrap_or(now);
    let inicio = parse_instant(query.inicio.as_deref(), offset)
        .unwrap_or_else(|| fim - Duration::days(ROUTE_DETAIL_WINDOW_DAYS));

    let (window_records, baseline_records) = if app.config_missing() {
        (Vec::new(), Vec::new())
    } else {
        (
            data.store
                .records_in_window(&app, inicio, fim, MAX_ROUTE_RECORDS),
            data.store.records_before(&app, inicio, BASELINE_RECORDS_LIMIT),
        )
    };

    let events = events_from_records(&window_records, Some((inicio, fim)), Some(&prefixo), offset);
    let baseline_events = events_from_records(&baseline_records, None, Some(&prefixo), offset);
    let seed = seed_states(&baseline_events).remove(&prefixo);
    let initial_ligada_on = seed
        .as_ref()
        .map(|state| is_active(state.attrs.get(Attribute::Ligada)))
        .unwrap_or(false);

    let timeline = build_timeline(&events, data.timeline_limit);
    let at = parse_instant(query.at.as_deref(), offset);
    let (selected_index, selected_at) = select_instant(&timeline, at, fim);

    let (attrs, last_update) = fold_attrs(seed.as_ref(), &events, selected_at);
    let status = route_status(&attrs);
    let context_status = context_status_label(
        attrs.get(Attribute::Ligar),
        attrs.get(Attribute::Desligar),
        attrs.get(Attribute::Ligada),
    );

    let origem_names = data.maps.name_lookup(APP_ROTAS, MapTipo::Origem);
    let destino_names = data.maps.name_lookup(APP_ROTAS, MapTipo::Destino);

    let atributos: Vec<AttributeRow> = [
        Attribute::Ligar,
        Attribute::Desligar,
        Attribute::Ligada,
        Attribute::Origem,
        Attribute::Destino,
    ]
    .iter()
    .map(|&atributo| AttributeRow {
        atributo: atributo.as_str().to_string(),
        valor_display: attribute_display(&attrs, atributo, &origem_names, &destino_names),
    })
    .collect();

    let rows = build_change_log(&events, selected_at, &origem_names, &destino_names, offset);
    let eventos = Page::paginate(
        rows,
        query.detail_events_page.unwrap_or(1),
        ROUTE_EVENTS_PAGE_SIZE,
    );

    let intervalos: Vec<IntervalView> =
        build_ligada_intervals(&events, inicio, selected_at, initial_ligada_on)
            .iter()
            .map(IntervalView::from_interval)
            .collect();

    let config = data.route_configs.get(APP_ROTAS, &prefixo);
    let nome_exibicao = config
        .as_ref()
        .map(|c| c.nome_exibicao.trim())
        .filter(|nome| !nome.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| prefixo.clone());

    HttpResponse::Ok().json(RouteDetailView {
        ok: true,
        config_missing: app.config_missing(),
        prefixo,
        nome_exibicao,
        inicio: inicio.to_rfc3339(),
        fim: fim.to_rfc3339(),
        selected_at: selected_at.to_rfc3339(),
        selected_index,
        timeline: timeline
            .iter()
            .map(|point| TimelinePointView::from_point(point, offset))
            .collect(),
        atributos,
        play_blink: status.play_blink,
        play_on: status.play_on,
        pause_on: status.pause_on,
        is_inactive: status.is_inactive(),
        context_status: context_status.to_string(),
        last_update: last_update.map(|ts| ts.to_rfc3339()),
        last_update_display: last_update
            .map(|ts| local_display_full(ts, offset))
            .unwrap_or_else(|| "--".to_string()),
        eventos,
        intervalos,
        config,
    })
}

fn attribute_display(
    attrs: &AttrValues,
    atributo: Attribute,
    origem_names: &HashMap<i64, String>,
    destino_names: &HashMap<i64, String>,
) -> String {
    let value = attrs.get(atributo);
    match atributo {
        Attribute::Origem => endpoint_label(value, origem_names),
        Attribute::Destino => endpoint_label(value, destino_names),
        _ => format_value(value),
    }
}

fn endpoint_label(value: Option<&ScalarValue>, names: &HashMap<i64, String>) -> String {
    match value_to_int(value) {
        Some(code) => match names.get(&code) {
            Some(name) if !name.is_empty() => format!("{} ({})", name, code),
            _ => code.to_string(),
        },
        None => format_value(value),
    }
}

// ============================================================================
// Route configuration
// ============================================================================

#[derive(Debug, Serialize)]
struct RouteConfigResult {
    ok: bool,
    config: RouteConfig,
}

#[derive(Debug, Serialize)]
struct ReorderResult {
    ok: bool,
    changed: u64,
}

#[post("/routes/{prefixo}/config")]
pub async fn save_route_config(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
) -> impl Responder {
    if let Err(response) = api::authorize(&req, APP_ROTAS) {
        return response;
    }
    let prefixo = path.into_inner().trim().to_uppercase();
    if prefixo.is_empty() {
        return response::error_response(error::NOT_FOUND);
    }

    let parsed: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => return response::error_response(error::INVALID_JSON),
    };
    let Some(obj) = parsed.as_object() else {
        return response::error_response(error::INVALID_PAYLOAD);
    };

    // Missing fields keep their stored value
    let existing = data.route_configs.get(APP_ROTAS, &prefixo);
    let nome_exibicao = match obj.get("nome_exibicao") {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Null) | None => existing
            .as_ref()
            .map(|config| config.nome_exibicao.clone())
            .unwrap_or_default(),
        Some(_) => return response::error_response(error::INVALID_PAYLOAD),
    };
    let ordem = match api::integer_field(obj.get("ordem")) {
        Ok(Some(ordem)) => ordem,
        Ok(None) => existing.as_ref().map(|config| config.ordem).unwrap_or(0),
        Err(()) => return response::error_response(error::INVALID_PAYLOAD),
    };
    let ativo = match obj.get("ativo") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Null) | None => existing.as_ref().map(|config| config.ativo).unwrap_or(true),
        Some(_) => return response::error_response(error::INVALID_PAYLOAD),
    };

    let config = data
        .route_configs
        .save(APP_ROTAS, &prefixo, &nome_exibicao, ordem, ativo, Utc::now());
    info!(prefixo = %config.prefixo, "route config saved");
    HttpResponse::Ok().json(RouteConfigResult { ok: true, config })
}

#[post("/order")]
pub async fn reorder_routes(
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
    let Some(list) = parsed.as_array() else {
        return response::error_response(error::INVALID_PREFIX_LIST);
    };

    let mut prefixos: Vec<String> = Vec::with_capacity(list.len());
    let mut seen: HashSet<String> = HashSet::new();
    for raw in list {
        let Some(text) = raw.as_str() else {
            return response::error_response(error::INVALID_PREFIX_LIST);
        };
        let prefixo = text.trim().to_uppercase();
        if prefixo.is_empty() {
            return response::error_response(error::INVALID_PREFIX_LIST);
        }
        if seen.insert(prefixo.clone()) {
            prefixos.push(prefixo);
        }
    }

    match data.route_configs.reorder(APP_ROTAS, &prefixos, Utc::now()) {
        Ok(changed) => {
            info!(changed, "route order saved");
            HttpResponse::Ok().json(ReorderResult { ok: true, changed })
        }
        Err(err) => response::from_error(&err),
    }
}

// ============================================================================
// Connection status
// ============================================================================

#[derive(Debug, Serialize)]
struct LifebitView {
    source_id: String,
    timestamp: String,
    timestamp_display: String,
}

#[derive(Debug, Serialize)]
struct ConnectionView {
    ok: bool,
    conectado: bool,
    conexao_display: String,
    lifebits: Vec<LifebitView>,
}

#[get("/connection")]
pub async fn connection(data: web::Data<AppState>, req: HttpRequest) -> impl Responder {
    if let Err(response) = api::authorize(&req, APP_ROTAS) {
        return response;
    }
    let Some(app) = data.apps.get_active(APP_ROTAS) else {
        return response::error_response(error::NOT_FOUND);
    };

    let offset = data.site_offset;
    let now = Utc::now();
    let lifebits = data.store.lifebit_records(&app, LIFEBIT_LIST_LIMIT);
    let conectado = lifebits
        .first()
        .map(|record| lifebit_fresh(record.effective_time(), now))
        .unwrap_or(false);
    let conexao_display = lifebits
        .first()
        .map(|record| local_display_full(record.effective_time(), offset))
        .unwrap_or_else(|| "--".to_string());

    HttpResponse::Ok().json(ConnectionView {
        ok: true,
        conectado,
        conexao_display,
        lifebits: lifebits
            .iter()
            .map(|record| LifebitView {
                source_id: record.source_id.clone(),
                timestamp: record.effective_time().to_rfc3339(),
                timestamp_display: local_display_full(record.effective_time(), offset),
            })
            .collect(),
    })
}

// ============================================================================
// Record inspection
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    source: Option<String>,
    source_id: Option<String>,
    tag: Option<String>,
    valor: Option<String>,
    prefixo: Option<String>,
    atributo: Option<String>,
    page: Option<u64>,
}

#[derive(Debug, Serialize)]
struct RecordRow {
    source_id: String,
    source: String,
    tag: String,
    valor_display: String,
    created_display: String,
    effective_display: String,
}

impl RecordRow {
    fn from_record(record: &IngestRecord, offset: FixedOffset) -> Self {
        let payload = record.payload.as_object();
        RecordRow {
            source_id: record.source_id.clone(),
            source: record.source.clone(),
            tag: payload.map(extract_tag).unwrap_or_default(),
            valor_display: payload
                .and_then(extract_value)
                .map(|value| scalar_text(&value))
                .unwrap_or_else(|| "-".to_string()),
            created_display: local_display_full(record.created_at, offset),
            effective_display: local_display_full(record.effective_time(), offset),
        }
    }
}

#[derive(Debug, Serialize)]
struct RecordsView {
    ok: bool,
    total_geral: usize,
    total_fonte: usize,
    sample_total: usize,
    sample_ok: usize,
    registros: Page<RecordRow>,
}

struct RecordFilters {
    source: Option<String>,
    source_id: Option<String>,
    tag: Option<String>,
    valor: Option<String>,
    prefixo: Option<String>,
    atributo: Option<Attribute>,
}

impl RecordFilters {
    fn from_query(query: &RecordsQuery) -> Self {
        let clean = |text: &Option<String>| {
            text.as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_lowercase)
        };
        RecordFilters {
            source: clean(&query.source),
            source_id: clean(&query.source_id),
            tag: clean(&query.tag),
            valor: clean(&query.valor),
            prefixo: query
                .prefixo
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(|t| format!("{}_", t.to_uppercase())),
            atributo: query
                .atributo
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .and_then(|t| Attribute::parse(&t.to_uppercase())),
        }
    }

    fn matches(&self, record: &IngestRecord) -> bool {
        if let Some(source) = &self.source
            && !record.source.to_lowercase().contains(source)
        {
            return false;
        }
        if let Some(source_id) = &self.source_id
            && !record.source_id.to_lowercase().contains(source_id)
        {
            return false;
        }

        let tag = record
            .payload
            .as_object()
            .map(extract_tag)
            .unwrap_or_default();
        if let Some(wanted) = &self.tag
            && !tag.to_lowercase().contains(wanted)
        {
            return false;
        }
        if let Some(prefix) = &self.prefixo
            && !tag.to_uppercase().starts_with(prefix.as_str())
        {
            return false;
        }
        if let Some(atributo) = self.atributo {
            let upper = tag.to_uppercase();
            if !atributo
                .tag_suffixes()
                .iter()
                .any(|suffix| upper.ends_with(suffix))
            {
                return false;
            }
        }
        if let Some(valor) = &self.valor {
            let text = record
                .payload
                .as_object()
                .and_then(extract_value)
                .map(|value| scalar_text(&value))
                .unwrap_or_default();
            if !text.to_lowercase().contains(valor.as_str()) {
                return false;
            }
        }
        true
    }
}

#[get("/records")]
pub async fn records(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<RecordsQuery>,
) -> impl Responder {
    if let Err(response) = api::authorize(&req, APP_ROTAS) {
        return response;
    }
    let Some(app) = data.apps.get_active(APP_ROTAS) else {
        return response::error_response(error::NOT_FOUND);
    };

    let offset = data.site_offset;
    let total_geral = data
        .store
        .scoped_records(&app.client_id, &app.agent_id)
        .len();
    let scoped = data.store.recent_by_created(&app, usize::MAX);
    let total_fonte = scoped.len();

    let filters = RecordFilters::from_query(&query);
    let filtered: Vec<&IngestRecord> = scoped
        .iter()
        .filter(|record| filters.matches(record))
        .collect();

    let sample_total = filtered.len().min(PARSE_SAMPLE_LIMIT);
    let sample_ok = filtered
        .iter()
        .take(PARSE_SAMPLE_LIMIT)
        .filter(|record| build_event(record, offset).is_ok())
        .count();

    let rows: Vec<RecordRow> = filtered
        .iter()
        .map(|record| RecordRow::from_record(record, offset))
        .collect();
    let registros = Page::paginate(rows, query.page.unwrap_or(1), RECORDS_PAGE_SIZE);

    HttpResponse::Ok().json(RecordsView {
        ok: true,
        total_geral,
        total_fonte,
        sample_total,
        sample_ok,
        registros,
    })
}
