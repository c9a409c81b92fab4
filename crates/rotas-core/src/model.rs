//! Core domain types for route telemetry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::ScalarValue;

/// Most records scanned when rendering the multi-route dashboard.
pub const MAX_DASHBOARD_RECORDS: usize = 8000;

/// Most records scanned when rendering a single route detail.
pub const MAX_ROUTE_RECORDS: usize = 16000;

/// Most records scanned when seeding baseline state before a window.
pub const BASELINE_RECORDS_LIMIT: usize = 12000;

/// Page size of the dashboard recent-events feed.
pub const RECENT_EVENTS_PAGE_SIZE: u64 = 10;

/// Cap of the dashboard recent-events feed before pagination.
pub const RECENT_EVENTS_LIMIT: usize = 200;

/// Page size of the route-detail change log.
pub const ROUTE_EVENTS_PAGE_SIZE: u64 = 12;

/// Cap of the route-detail change log before pagination.
pub const ROUTE_CHANGE_LOG_LIMIT: usize = 120;

/// A deduplicated telemetry fact, keyed by `source_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRecord {
    pub source_id: String,
    pub client_id: String,
    pub agent_id: String,
    pub source: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IngestRecord {
    /// Storage time used for windowing and as the event-time fallback.
    pub fn effective_time(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// One validated item of an ingest batch.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestItem {
    pub source_id: String,
    pub client_id: String,
    pub agent_id: String,
    pub source: String,
    pub payload: Value,
}

/// Route attribute kinds carried by tag suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Attribute {
    Ligar,
    Desligar,
    Ligada,
    Origem,
    Destino,
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Ligar => "LIGAR",
            Attribute::Desligar => "DESLIGAR",
            Attribute::Ligada => "LIGADA",
            Attribute::Origem => "ORIGEM",
            Attribute::Destino => "DESTINO",
        }
    }

    pub fn parse(text: &str) -> Option<Attribute> {
        match text {
            "LIGAR" => Some(Attribute::Ligar),
            "DESLIGAR" => Some(Attribute::Desligar),
            "LIGADA" => Some(Attribute::Ligada),
            "ORIGEM" => Some(Attribute::Origem),
            "DESTINO" => Some(Attribute::Destino),
            _ => None,
        }
    }

    /// Tag suffixes that classify to this attribute. DESTINO also accepts
    /// the `_DESTIN` misspelling shipped by some field agents.
    pub fn tag_suffixes(&self) -> &'static [&'static str] {
        match self {
            Attribute::Ligar => &["_LIGAR"],
            Attribute::Desligar => &["_DESLIGAR"],
            Attribute::Ligada => &["_LIGADA"],
            Attribute::Origem => &["_ORIGEM"],
            Attribute::Destino => &["_DESTINO", "_DESTIN"],
        }
    }
}

/// Kind of a code-to-name mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MapTipo {
    Origem,
    Destino,
}

impl MapTipo {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapTipo::Origem => "ORIGEM",
            MapTipo::Destino => "DESTINO",
        }
    }

    pub fn parse(text: &str) -> Option<MapTipo> {
        match text {
            "ORIGEM" => Some(MapTipo::Origem),
            "DESTINO" => Some(MapTipo::Destino),
            _ => None,
        }
    }
}

/// One attribute observation on one route, derived from a single record.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub prefixo: String,
    pub atributo: Attribute,
    pub tag: String,
    pub valor: Option<ScalarValue>,
    pub timestamp: DateTime<Utc>,
    pub ingest_timestamp: DateTime<Utc>,
    pub source_id: String,
}

/// Why a record yielded no event. Discarded by aggregation, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAnObject,
    MissingTag,
    UnknownTag,
    EmptyPrefix,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotAnObject => "not_an_object",
            SkipReason::MissingTag => "missing_tag",
            SkipReason::UnknownTag => "unknown_tag",
            SkipReason::EmptyPrefix => "empty_prefix",
        }
    }
}

/// Last-known value of each of the five route attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttrValues {
    #[serde(rename = "LIGAR")]
    pub ligar: Option<ScalarValue>,
    #[serde(rename = "DESLIGAR")]
    pub desligar: Option<ScalarValue>,
    #[serde(rename = "LIGADA")]
    pub ligada: Option<ScalarValue>,
    #[serde(rename = "ORIGEM")]
    pub origem: Option<ScalarValue>,
    #[serde(rename = "DESTINO")]
    pub destino: Option<ScalarValue>,
}

impl AttrValues {
    pub fn get(&self, atributo: Attribute) -> Option<&ScalarValue> {
        match atributo {
            Attribute::Ligar => self.ligar.as_ref(),
            Attribute::Desligar => self.desligar.as_ref(),
            Attribute::Ligada => self.ligada.as_ref(),
            Attribute::Origem => self.origem.as_ref(),
            Attribute::Destino => self.destino.as_ref(),
        }
    }

    pub fn set(&mut self, atributo: Attribute, valor: Option<ScalarValue>) {
        match atributo {
            Attribute::Ligar => self.ligar = valor,
            Attribute::Desligar => self.desligar = valor,
            Attribute::Ligada => self.ligada = valor,
            Attribute::Origem => self.origem = valor,
            Attribute::Destino => self.destino = valor,
        }
    }
}

/// Reconstructed snapshot of one route at a chosen instant.
#[derive(Debug, Clone, Default)]
pub struct RouteState {
    pub prefixo: String,
    pub attrs: AttrValues,
    pub last_update: Option<DateTime<Utc>>,
}

impl RouteState {
    pub fn new(prefixo: impl Into<String>) -> Self {
        RouteState {
            prefixo: prefixo.into(),
            ..Default::default()
        }
    }
}

/// Operator-assigned display name and ordering for one route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub app: String,
    pub prefixo: String,
    pub nome_exibicao: String,
    pub ordem: i64,
    pub ativo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

/// Numeric origin/destination code mapped to a friendly name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteMap {
    pub id: u64,
    pub app: String,
    pub tipo: MapTipo,
    pub codigo: i64,
    pub nome: String,
    pub ativo: bool,
    pub criado_em: DateTime<Utc>,
}

/// Ingest scope of one dashboard application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub slug: String,
    pub nome: String,
    pub client_id: String,
    pub agent_id: String,
    /// Accepted feed names. Empty means any source.
    pub sources: Vec<String>,
    pub ativo: bool,
}

impl AppConfig {
    /// An app without a client/agent scope renders the explicit
    /// "not configured" state instead of querying records.
    pub fn config_missing(&self) -> bool {
        self.client_id.is_empty() || self.agent_id.is_empty()
    }
}

/// One authenticated request, kept for operator auditing.
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub token_name: String,
    pub module: String,
    pub timestamp: DateTime<Utc>,
}
