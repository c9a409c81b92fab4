//! Scale production dashboard.

use actix_web::{HttpRequest, HttpResponse, Responder, Scope, get, web};
use chrono::NaiveDate;
use rotas_common::{APP_MILHAO_BLA, error};
use rotas_core::balance::{
    AVERAGE_WINDOW_DAYS, BALANCE_NAMES, BALANCE_RECENT_RECORDS, BalanceAverage, BalanceEntry,
    CompositionSlice, balance_dates, balance_label, balance_names, composition, daily_averages,
    entries_from_records, total_value, totals_by_balance,
};
use serde::Serialize;
use tracing::debug;

use crate::api;
use crate::model::common::AppState;
use crate::model::response;

pub fn routes() -> Scope {
    web::scope("/balance").service(dashboard)
}

#[derive(Debug, Serialize)]
struct BalanceOption {
    balance: String,
    label: String,
    selected: bool,
}

#[derive(Debug, Serialize)]
struct BalanceTotal {
    balance: String,
    label: String,
    total: f64,
}

#[derive(Debug, Serialize)]
struct BalanceDashboardView {
    ok: bool,
    config_missing: bool,
    date: Option<String>,
    dates: Vec<String>,
    balances: Vec<BalanceOption>,
    entries: Vec<BalanceEntry>,
    total: f64,
    totals: Vec<BalanceTotal>,
    latest: Option<BalanceEntry>,
    composition: Vec<CompositionSlice>,
    averages: Vec<BalanceAverage>,
}

impl BalanceDashboardView {
    fn empty(config_missing: bool) -> Self {
        BalanceDashboardView {
            ok: true,
            config_missing,
            date: None,
            dates: vec![],
            balances: vec![],
            entries: vec![],
            total: 0.0,
            totals: vec![],
            latest: None,
            composition: vec![],
            averages: vec![],
        }
    }
}

#[get("/dashboard")]
pub async fn dashboard(
    data: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<Vec<(String, String)>>,
) -> impl Responder {
    if let Err(response) = api::authorize(&req, APP_MILHAO_BLA) {
        return response;
    }
    let Some(app) = data.apps.get_active(APP_MILHAO_BLA) else {
        return response::error_response(error::NOT_FOUND);
    };
    if app.config_missing() {
        return HttpResponse::Ok().json(BalanceDashboardView::empty(true));
    }

    // `balance` may repeat or come comma-joined; `date` takes the first
    let mut date_param: Option<String> = None;
    let mut requested: Vec<String> = Vec::new();
    for (key, value) in query.into_inner() {
        match key.as_str() {
            "date" if date_param.is_none() => date_param = Some(value),
            "balance" => requested.extend(
                value
                    .split(',')
                    .map(|part| part.trim().to_uppercase())
                    .filter(|part| !part.is_empty()),
            ),
            _ => {}
        }
    }

    let record_list = data.store.recent_by_created(&app, BALANCE_RECENT_RECORDS);
    let entries = entries_from_records(&record_list);
    let dates = balance_dates(&entries);
    let names = balance_names(&entries);

    let selected_date = date_param
        .as_deref()
        .and_then(|text| NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").ok())
        .or_else(|| dates.last().copied());
    let Some(selected_date) = selected_date else {
        return HttpResponse::Ok().json(BalanceDashboardView::empty(false));
    };

    let mut selected: Vec<String> = Vec::new();
    for name in requested {
        if BALANCE_NAMES.contains(&name.as_str()) && !selected.contains(&name) {
            selected.push(name);
        }
    }
    if selected.is_empty() && names.iter().any(|name| name == "LIMBL01") {
        selected.push("LIMBL01".to_string());
    }

    let filtered: Vec<BalanceEntry> = entries
        .iter()
        .filter(|entry| entry.date == selected_date && selected.contains(&entry.balance))
        .cloned()
        .collect();

    let totals: Vec<BalanceTotal> = totals_by_balance(&filtered)
        .into_iter()
        .map(|(balance, total)| BalanceTotal {
            label: balance_label(&balance).to_string(),
            balance,
            total,
        })
        .collect();
    let total = total_value(&filtered);
    let latest = filtered.last().cloned();

    let composition_slices = composition(&entries, selected_date);
    let averages = daily_averages(&entries, selected_date, AVERAGE_WINDOW_DAYS);

    debug!(
        entradas = filtered.len(),
        date = %selected_date,
        "balance dashboard rendered"
    );

    HttpResponse::Ok().json(BalanceDashboardView {
        ok: true,
        config_missing: false,
        date: Some(selected_date.format("%Y-%m-%d").to_string()),
        dates: dates
            .iter()
            .map(|date| date.format("%Y-%m-%d").to_string())
            .collect(),
        balances: names
            .iter()
            .map(|name| BalanceOption {
                balance: name.clone(),
                label: balance_label(name).to_string(),
                selected: selected.contains(name),
            })
            .collect(),
        entries: filtered,
        total,
        totals,
        latest,
        composition: composition_slices,
        averages,
    })
}
