//! Production-scale readings for the weighing dashboard.
//!
//! Scale records arrive through the same ingest pipe as route telemetry but
//! carry their own tag grammar: the tag embeds one of the known scale names
//! and the payload brings an hourly production figure. Everything here works
//! on wall-clock time as reported by the scales.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::model::IngestRecord;

/// Known scale names, probed in this order inside the tag text.
pub const BALANCE_NAMES: [&str; 5] = ["LIMBL01", "CLABL01", "CLABL02", "SECBL01", "SECBL02"];

/// How many records back the scale dashboard looks.
pub const BALANCE_RECENT_RECORDS: usize = 2000;

/// Trailing window for the daily averages table.
pub const AVERAGE_WINDOW_DAYS: i64 = 14;

/// Product label of a scale. Unknown scales show their raw name.
pub fn balance_label(name: &str) -> &str {
    match name {
        "LIMBL01" => "MILHO",
        "CLABL01" => "MIUDO",
        "CLABL02" => "GRAUDO",
        "SECBL01" => "GERMEN",
        "SECBL02" => "RESIDUO",
        other => other,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceEntry {
    pub balance: String,
    pub label: String,
    pub datetime: NaiveDateTime,
    pub date: NaiveDate,
    pub hora: String,
    pub value: Option<f64>,
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a scale timestamp, keeping the wall clock as written and dropping
/// any offset. A trailing `Z` is tolerated.
pub fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let normalized = text.replace('Z', "+00:00");
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.naive_local());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    None
}

/// First known scale name contained in the tag text, case-insensitively.
pub fn extract_balance_name(tag: &str) -> Option<&'static str> {
    let upper = tag.to_uppercase();
    BALANCE_NAMES.into_iter().find(|name| upper.contains(name))
}

fn first_truthy_str<'a>(payload: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    for key in keys {
        if let Some(Value::String(text)) = payload.get(*key)
            && !text.is_empty()
        {
            return Some(text);
        }
    }
    None
}

fn to_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse scale entries out of raw records, dropping anything that does not
/// carry a recognizable scale tag and a parseable timestamp. The result is
/// ordered by (date, hora).
pub fn entries_from_records(records: &[IngestRecord]) -> Vec<BalanceEntry> {
    let mut entries = Vec::new();
    for record in records {
        let Some(payload) = record.payload.as_object() else {
            continue;
        };
        let Some(tag) = first_truthy_str(payload, &["TagName", "tagname"]) else {
            continue;
        };
        let Some(balance) = extract_balance_name(tag) else {
            continue;
        };
        let Some(raw_time) = first_truthy_str(payload, &["Hora", "DataHoraBase", "datahora"])
        else {
            continue;
        };
        let Some(datetime) = parse_iso_datetime(raw_time) else {
            continue;
        };

        // hourly production wins; a null reading falls back to the delta
        let raw_value = match payload.get("ProducaoHora") {
            Some(value) if !value.is_null() => Some(value),
            _ => payload.get("Delta"),
        };

        entries.push(BalanceEntry {
            balance: balance.to_string(),
            label: balance_label(balance).to_string(),
            date: datetime.date(),
            hora: datetime.format("%H:%M").to_string(),
            datetime,
            value: raw_value.and_then(to_float),
        });
    }
    entries.sort_by(|a, b| (a.date, a.hora.as_str()).cmp(&(b.date, b.hora.as_str())));
    entries
}

/// Distinct dates present, ascending.
pub fn balance_dates(entries: &[BalanceEntry]) -> Vec<NaiveDate> {
    let set: BTreeSet<NaiveDate> = entries.iter().map(|e| e.date).collect();
    set.into_iter().collect()
}

/// Distinct scale names present, ascending.
pub fn balance_names(entries: &[BalanceEntry]) -> Vec<String> {
    let set: BTreeSet<String> = entries.iter().map(|e| e.balance.clone()).collect();
    set.into_iter().collect()
}

/// Sum of readings per scale, skipping missing values.
pub fn totals_by_balance(entries: &[BalanceEntry]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for entry in entries {
        if let Some(value) = entry.value {
            *totals.entry(entry.balance.clone()).or_insert(0.0) += value;
        }
    }
    totals
}

/// Sum of every reading in the slice.
pub fn total_value(entries: &[BalanceEntry]) -> f64 {
    entries.iter().filter_map(|e| e.value).sum()
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositionSlice {
    pub balance: String,
    pub label: String,
    pub total: f64,
    pub percent: f64,
    pub percent_display: String,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Share of each output scale in one day's production.
///
/// The raw-input scale LIMBL01 is excluded, scales whose day total is not
/// positive are dropped, and the last slice takes whatever remains to 100.0
/// so the rounded shares always add up exactly.
pub fn composition(entries: &[BalanceEntry], date: NaiveDate) -> Vec<CompositionSlice> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for entry in entries {
        if entry.date != date || entry.balance == "LIMBL01" {
            continue;
        }
        if let Some(value) = entry.value {
            *totals.entry(entry.balance.as_str()).or_insert(0.0) += value;
        }
    }
    totals.retain(|_, total| *total > 0.0);

    let comp_total: f64 = totals.values().sum();
    if comp_total <= 0.0 {
        return Vec::new();
    }

    let count = totals.len();
    let mut running = 0.0;
    totals
        .into_iter()
        .enumerate()
        .map(|(index, (balance, total))| {
            let percent = if index + 1 == count {
                round1(100.0 - running)
            } else {
                let share = round1(total / comp_total * 100.0);
                running += share;
                share
            };
            CompositionSlice {
                balance: balance.to_string(),
                label: balance_label(balance).to_string(),
                total,
                percent,
                percent_display: format!("{percent:.1}"),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceAverage {
    pub balance: String,
    pub label: String,
    pub average: f64,
    pub days: usize,
}

/// Average daily production per scale over the trailing window ending at
/// `end_date`. Only days with a nonzero total count; scales with no such
/// day are omitted.
pub fn daily_averages(entries: &[BalanceEntry], end_date: NaiveDate, days: i64) -> Vec<BalanceAverage> {
    let start_date = end_date - Duration::days(days.max(1) - 1);
    let mut per_day: BTreeMap<(&str, NaiveDate), f64> = BTreeMap::new();
    for entry in entries {
        if entry.date < start_date || entry.date > end_date {
            continue;
        }
        if let Some(value) = entry.value {
            *per_day.entry((entry.balance.as_str(), entry.date)).or_insert(0.0) += value;
        }
    }

    let names: BTreeSet<&str> = per_day.keys().map(|(name, _)| *name).collect();
    let mut averages = Vec::new();
    for name in names {
        let day_totals: Vec<f64> = per_day
            .iter()
            .filter(|((balance, _), total)| *balance == name && **total != 0.0)
            .map(|(_, total)| *total)
            .collect();
        if day_totals.is_empty() {
            continue;
        }
        let sum: f64 = day_totals.iter().sum();
        averages.push(BalanceAverage {
            balance: name.to_string(),
            label: balance_label(name).to_string(),
            average: sum / day_totals.len() as f64,
            days: day_totals.len(),
        });
    }
    averages
}
