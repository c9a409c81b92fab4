//! Tolerant extraction of typed route events from raw ingest payloads.
//!
//! Field agents disagree on key names, timestamp shapes and value types, so
//! every lookup probes an ordered list of candidate keys and classification
//! failures skip the record instead of erroring. The accepted tag grammar is
//! `<PREFIX>_<SUFFIX>` where the suffix selects the attribute.

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::model::{Attribute, Event, IngestRecord, SkipReason};
use crate::value::{ScalarValue, coerce_value};

/// Payload keys probed for the tag name, in priority order.
pub const TAG_KEYS: [&str; 5] = ["Name", "TagName", "tagname", "tag", "nome_tag"];

/// Payload keys probed for the reading value, in priority order.
pub const VALUE_KEYS: [&str; 4] = ["Value", "value", "valor", "status"];

/// Payload keys probed for the event timestamp, in priority order.
pub const TIMESTAMP_KEYS: [&str; 5] = ["TimestampUtc", "Hora", "DataHoraBase", "datahora", "timestamp"];

/// Tag suffixes and the attribute each classifies to, checked in order.
/// `_DESLIGAR` must come before `_LIGAR` because it ends with it, and
/// `_DESTIN` is a known upstream misspelling of `_DESTINO`.
pub const ROTA_SUFFIXES: [(&str, Attribute); 6] = [
    ("_DESLIGAR", Attribute::Desligar),
    ("_LIGADA", Attribute::Ligada),
    ("_LIGAR", Attribute::Ligar),
    ("_ORIGEM", Attribute::Origem),
    ("_DESTINO", Attribute::Destino),
    ("_DESTIN", Attribute::Destino),
];

/// Tag announcing agent liveness rather than a route reading.
pub const LIFEBIT_TAG_NAME: &str = "LIFEBIT";

/// Seconds after the last lifebit before the agent counts as disconnected.
pub const LIFEBIT_TIMEOUT_SECONDS: i64 = 30;

/// A timestamp parsed from a payload, before timezone resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedDateTime {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601-ish datetime, keeping track of whether the text
/// carried an offset.
pub fn parse_datetime(text: &str) -> Option<ParsedDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(ParsedDateTime::Aware(dt));
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ParsedDateTime::Aware(dt));
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ParsedDateTime::Naive(dt));
        }
    }
    None
}

// Python-style truthiness over JSON values: empty strings, zero numbers and
// empty containers are falsy. Key probes skip falsy values.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First truthy tag-key value, stringified and trimmed. Empty when absent.
pub fn extract_tag(payload: &Map<String, Value>) -> String {
    for key in TAG_KEYS {
        if let Some(value) = payload.get(key)
            && is_truthy(value)
        {
            return value_text(value).trim().to_string();
        }
    }
    String::new()
}

/// Coerced value of the first *present* value key. Presence wins over
/// truthiness here: an explicit null reading still stops the probe.
pub fn extract_value(payload: &Map<String, Value>) -> Option<ScalarValue> {
    for key in VALUE_KEYS {
        if let Some(value) = payload.get(key) {
            return coerce_value(value);
        }
    }
    None
}

/// Event timestamp from the payload, falling back to the record's storage
/// time when nothing parses.
///
/// Naive values under `TimestampUtc` are taken as UTC; any other naive value
/// is interpreted in the site timezone given by `offset`. Keys whose value
/// fails to parse do not stop the probe.
pub fn extract_timestamp(
    payload: &Map<String, Value>,
    fallback: DateTime<Utc>,
    offset: FixedOffset,
) -> DateTime<Utc> {
    for key in TIMESTAMP_KEYS {
        let Some(raw) = payload.get(key) else {
            continue;
        };
        if !is_truthy(raw) {
            continue;
        }
        let text = value_text(raw);
        let Some(parsed) = parse_datetime(text.trim()) else {
            continue;
        };
        match parsed {
            ParsedDateTime::Aware(dt) => return dt.with_timezone(&Utc),
            ParsedDateTime::Naive(naive) => {
                if key == "TimestampUtc" {
                    return Utc.from_utc_datetime(&naive);
                }
                match naive.and_local_timezone(offset) {
                    LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                        return dt.with_timezone(&Utc);
                    }
                    LocalResult::None => continue,
                }
            }
        }
    }
    fallback
}

/// Split a tag into (prefix, attribute) by its suffix.
pub fn classify_tag(tag: &str) -> Result<(String, Attribute), SkipReason> {
    let tag = tag.trim().to_uppercase();
    if tag.is_empty() {
        return Err(SkipReason::MissingTag);
    }
    for (suffix, atributo) in ROTA_SUFFIXES {
        if !tag.ends_with(suffix) {
            continue;
        }
        let prefixo = tag[..tag.len() - suffix.len()].trim_matches('_');
        if prefixo.is_empty() {
            return Err(SkipReason::EmptyPrefix);
        }
        return Ok((prefixo.to_string(), atributo));
    }
    Err(SkipReason::UnknownTag)
}

/// Derive the event carried by one record.
pub fn build_event(record: &IngestRecord, offset: FixedOffset) -> Result<Event, SkipReason> {
    let payload = record.payload.as_object().ok_or(SkipReason::NotAnObject)?;
    let tag = extract_tag(payload);
    let (prefixo, atributo) = classify_tag(&tag)?;
    let timestamp = extract_timestamp(payload, record.effective_time(), offset);

    Ok(Event {
        prefixo,
        atributo,
        tag,
        valor: extract_value(payload),
        timestamp,
        ingest_timestamp: record.effective_time(),
        source_id: record.source_id.clone(),
    })
}

/// Extract, filter and order the events of a record set.
///
/// Skipped records are dropped silently; the result is sorted by
/// (timestamp, prefix, attribute) so folds get a stable tie-break order.
pub fn events_from_records(
    records: &[IngestRecord],
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    prefixo: Option<&str>,
    offset: FixedOffset,
) -> Vec<Event> {
    let prefixo_upper = prefixo
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty());

    let mut events = Vec::new();
    for record in records {
        let event = match build_event(record, offset) {
            Ok(event) => event,
            Err(reason) => {
                tracing::trace!(
                    source_id = %record.source_id,
                    reason = reason.as_str(),
                    "record skipped during extraction"
                );
                continue;
            }
        };
        if let Some(wanted) = &prefixo_upper
            && event.prefixo != *wanted
        {
            continue;
        }
        if let Some((start, end_exclusive)) = window {
            if event.timestamp < start || event.timestamp >= end_exclusive {
                continue;
            }
        }
        events.push(event);
    }
    events.sort_by(|a, b| {
        (a.timestamp, &a.prefixo, a.atributo.as_str())
            .cmp(&(b.timestamp, &b.prefixo, b.atributo.as_str()))
    });
    events
}

/// Whether a record is an agent lifebit announcement.
pub fn is_lifebit(record: &IngestRecord) -> bool {
    let Some(payload) = record.payload.as_object() else {
        return false;
    };
    TAG_KEYS.iter().any(|key| {
        payload
            .get(*key)
            .and_then(Value::as_str)
            .map(|s| s.eq_ignore_ascii_case(LIFEBIT_TAG_NAME))
            .unwrap_or(false)
    })
}

/// Whether a lifebit seen at `last_seen` still counts as connected at `now`.
pub fn lifebit_fresh(last_seen: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    (now - last_seen).num_seconds() <= LIFEBIT_TIMEOUT_SECONDS
}
