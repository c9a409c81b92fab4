//! Route state folding and the derived dashboard views.
//!
//! Route state is a pure fold over ordered events: each event overwrites one
//! attribute of its route. Cards, the per-route change log and the ligada
//! intervals are all read off that fold at a selected instant, so scrubbing
//! the timeline never mutates anything.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::model::{
    Attribute, Event, ROUTE_CHANGE_LOG_LIMIT, RouteConfig, RouteState,
};
use crate::value::{ScalarValue, binary_state, format_value, is_active, value_to_int};

/// Routes with no explicit order sort after every ordered route.
const UNORDERED_SORT_KEY: i64 = 999_999;

/// Fold every event into per-route states, keyed by prefix.
pub fn seed_states(events: &[Event]) -> HashMap<String, RouteState> {
    let mut states: HashMap<String, RouteState> = HashMap::new();
    for event in events {
        let state = states
            .entry(event.prefixo.clone())
            .or_insert_with(|| RouteState::new(event.prefixo.clone()));
        state.attrs.set(event.atributo, event.valor.clone());
        state.last_update = Some(event.timestamp);
    }
    states
}

/// Human label for the command/feedback combination of a route.
pub fn context_status_label(
    ligar: Option<&ScalarValue>,
    desligar: Option<&ScalarValue>,
    ligada: Option<&ScalarValue>,
) -> &'static str {
    let (Some(ligar), Some(desligar), Some(ligada)) = (
        binary_state(ligar),
        binary_state(desligar),
        binary_state(ligada),
    ) else {
        return "Estado indefinido";
    };
    match (ligar, desligar, ligada) {
        (0, 0, 0) => "Linha parada",
        (1, 0, 0) => "Linha ligando",
        (1, 0, 1) => "Linha ligada",
        (1, 1, 0) => "Linha desligando",
        _ => "Estado indefinido",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteStatus {
    pub play_blink: bool,
    pub play_on: bool,
    pub pause_on: bool,
}

impl RouteStatus {
    pub fn is_inactive(&self) -> bool {
        !(self.play_blink || self.play_on || self.pause_on)
    }
}

/// Indicator flags for a route. A stop command always wins over run state.
pub fn route_status(attrs: &crate::model::AttrValues) -> RouteStatus {
    let ligar_on = is_active(attrs.get(Attribute::Ligar));
    let desligar_on = is_active(attrs.get(Attribute::Desligar));
    let ligada_on = is_active(attrs.get(Attribute::Ligada));
    RouteStatus {
        play_blink: ligar_on && !ligada_on && !desligar_on,
        play_on: ligar_on && ligada_on && !desligar_on,
        pause_on: desligar_on,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteCard {
    pub prefixo: String,
    pub nome_exibicao: String,
    pub titulo: String,
    pub ordem: i64,
    pub origem_codigo: Option<i64>,
    pub origem_display: String,
    pub destino_codigo: Option<i64>,
    pub destino_display: String,
    pub play_blink: bool,
    pub play_on: bool,
    pub pause_on: bool,
    pub context_status: String,
    pub is_inactive: bool,
    pub last_update: Option<String>,
    pub last_update_display: String,
}

fn endpoint_display(code: Option<i64>, names: &HashMap<i64, String>) -> String {
    match code {
        Some(code) => match names.get(&code) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => code.to_string(),
        },
        None => "--".to_string(),
    }
}

/// Short timestamp used on cards and event rows.
pub fn local_display_short(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset).format("%d/%m %H:%M:%S").to_string()
}

/// Full timestamp used on detail rows and labels.
pub fn local_display_full(ts: DateTime<Utc>, offset: FixedOffset) -> String {
    ts.with_timezone(&offset)
        .format("%d/%m/%Y %H:%M:%S")
        .to_string()
}

/// Build one card per visible route as of `selected_at`.
///
/// `events` must be ascending by timestamp; the fold stops at the first
/// event past `selected_at`. Routes configured inactive are omitted
/// entirely, routes without events still get a card from their config.
#[allow(clippy::too_many_arguments)]
pub fn build_route_cards(
    events: &[Event],
    selected_at: DateTime<Utc>,
    origem_names: &HashMap<i64, String>,
    destino_names: &HashMap<i64, String>,
    initial_states: &HashMap<String, RouteState>,
    known_prefixes: &HashSet<String>,
    route_configs: &HashMap<String, RouteConfig>,
    offset: FixedOffset,
) -> Vec<RouteCard> {
    let mut states: HashMap<String, RouteState> = initial_states.clone();
    let mut prefixes: BTreeSet<String> = known_prefixes.iter().cloned().collect();

    for event in events {
        if event.timestamp > selected_at {
            break;
        }
        prefixes.insert(event.prefixo.clone());
        let state = states
            .entry(event.prefixo.clone())
            .or_insert_with(|| RouteState::new(event.prefixo.clone()));
        state.attrs.set(event.atributo, event.valor.clone());
        state.last_update = Some(event.timestamp);
    }

    let empty = RouteState::default();
    let mut cards = Vec::new();
    for prefixo in prefixes {
        let config = route_configs.get(&prefixo);
        if let Some(config) = config
            && !config.ativo
        {
            continue;
        }

        let state = states.get(&prefixo).unwrap_or(&empty);
        let status = route_status(&state.attrs);
        let origem_codigo = value_to_int(state.attrs.get(Attribute::Origem));
        let destino_codigo = value_to_int(state.attrs.get(Attribute::Destino));

        let nome_exibicao = config
            .map(|c| c.nome_exibicao.trim().to_string())
            .unwrap_or_default();
        let titulo = if nome_exibicao.is_empty() {
            prefixo.clone()
        } else {
            nome_exibicao.clone()
        };

        cards.push(RouteCard {
            titulo,
            nome_exibicao,
            ordem: config.map(|c| c.ordem).unwrap_or(0),
            origem_display: endpoint_display(origem_codigo, origem_names),
            destino_display: endpoint_display(destino_codigo, destino_names),
            origem_codigo,
            destino_codigo,
            play_blink: status.play_blink,
            play_on: status.play_on,
            pause_on: status.pause_on,
            context_status: context_status_label(
                state.attrs.get(Attribute::Ligar),
                state.attrs.get(Attribute::Desligar),
                state.attrs.get(Attribute::Ligada),
            )
            .to_string(),
            is_inactive: status.is_inactive(),
            last_update: state
                .last_update
                .map(|ts| ts.with_timezone(&offset).to_rfc3339()),
            last_update_display: state
                .last_update
                .map(|ts| local_display_short(ts, offset))
                .unwrap_or_else(|| "-".to_string()),
            prefixo,
        });
    }

    cards.sort_by(|a, b| {
        let ka = if a.ordem > 0 { a.ordem } else { UNORDERED_SORT_KEY };
        let kb = if b.ordem > 0 { b.ordem } else { UNORDERED_SORT_KEY };
        (ka, &a.prefixo).cmp(&(kb, &b.prefixo))
    });
    cards
}

/// Apply the card filters: search terms are comma-separated alternatives
/// matched case-insensitively against prefix and endpoint names, and
/// inactive cards show only on request.
pub fn filter_cards(cards: Vec<RouteCard>, busca: &str, mostrar_inativas: bool) -> Vec<RouteCard> {
    let terms: Vec<String> = busca
        .split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect();

    cards
        .into_iter()
        .filter(|card| mostrar_inativas || !card.is_inactive)
        .filter(|card| {
            if terms.is_empty() {
                return true;
            }
            let haystacks = [
                card.prefixo.to_lowercase(),
                card.origem_display.to_lowercase(),
                card.destino_display.to_lowercase(),
            ];
            terms
                .iter()
                .any(|term| haystacks.iter().any(|hay| hay.contains(term.as_str())))
        })
        .collect()
}

/// Fold prefix-filtered events up to `selected_at` on top of a seed state.
pub fn fold_attrs(
    seed: Option<&RouteState>,
    events: &[Event],
    selected_at: DateTime<Utc>,
) -> (crate::model::AttrValues, Option<DateTime<Utc>>) {
    let mut attrs = seed.map(|s| s.attrs.clone()).unwrap_or_default();
    let mut last_update = seed.and_then(|s| s.last_update);
    for event in events {
        if event.timestamp > selected_at {
            break;
        }
        attrs.set(event.atributo, event.valor.clone());
        last_update = Some(event.timestamp);
    }
    (attrs, last_update)
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeLogRow {
    pub timestamp_display: String,
    pub atributo: String,
    pub valor_display: String,
    pub changed: bool,
    pub is_command: bool,
}

/// Newest-first change log of a route.
///
/// `changed` flags rows whose value differs from the more recent one of the
/// same attribute, so the table highlights where a value flipped.
pub fn build_change_log(
    day_events: &[Event],
    selected_at: DateTime<Utc>,
    origem_names: &HashMap<i64, String>,
    destino_names: &HashMap<i64, String>,
    offset: FixedOffset,
) -> Vec<ChangeLogRow> {
    let mut rows = Vec::new();
    let mut previous: HashMap<Attribute, Option<ScalarValue>> = HashMap::new();

    for event in day_events.iter().rev() {
        if event.timestamp > selected_at {
            continue;
        }
        let changed = previous.get(&event.atributo).cloned().flatten() != event.valor;
        previous.insert(event.atributo, event.valor.clone());

        let valor_display = match event.atributo {
            Attribute::Origem | Attribute::Destino => {
                let names = if event.atributo == Attribute::Origem {
                    origem_names
                } else {
                    destino_names
                };
                match value_to_int(event.valor.as_ref()) {
                    Some(code) => match names.get(&code) {
                        Some(name) if !name.is_empty() => format!("{name} ({code})"),
                        _ => code.to_string(),
                    },
                    None => format_value(event.valor.as_ref()),
                }
            }
            _ => format_value(event.valor.as_ref()),
        };

        rows.push(ChangeLogRow {
            timestamp_display: local_display_full(event.timestamp, offset),
            atributo: event.atributo.as_str().to_string(),
            valor_display,
            changed,
            is_command: matches!(
                event.atributo,
                Attribute::Ligar | Attribute::Desligar | Attribute::Ligada
            ),
        });
        if rows.len() >= ROUTE_CHANGE_LOG_LIMIT {
            break;
        }
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LigadaInterval {
    pub inicio: DateTime<Utc>,
    pub fim: DateTime<Utc>,
}

/// Periods in `[start, end]` where one route's LIGADA feedback was on.
///
/// `initial_on` carries the state from before the window; an interval still
/// open at the end closes at `end`.
pub fn build_ligada_intervals(
    events: &[Event],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    initial_on: bool,
) -> Vec<LigadaInterval> {
    let mut intervals = Vec::new();
    let mut ligada_on = initial_on;
    let mut current_start = if ligada_on { Some(start) } else { None };

    for event in events {
        if event.atributo != Attribute::Ligada {
            continue;
        }
        if event.timestamp < start || event.timestamp > end {
            continue;
        }
        let new_on = is_active(event.valor.as_ref());
        if new_on && !ligada_on {
            current_start = Some(event.timestamp);
        } else if !new_on
            && ligada_on
            && let Some(inicio) = current_start.take()
        {
            intervals.push(LigadaInterval {
                inicio,
                fim: event.timestamp,
            });
        }
        ligada_on = new_on;
    }

    if let Some(inicio) = current_start
        && inicio < end
    {
        intervals.push(LigadaInterval { inicio, fim: end });
    }
    intervals
}

/// Periods in `[start, end]` where at least one route was on.
pub fn build_global_ligada_intervals(
    events: &[Event],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    initial_on: &HashSet<String>,
) -> Vec<LigadaInterval> {
    let mut on_prefixes: HashSet<String> = initial_on.clone();
    let mut intervals = Vec::new();
    let mut current_start = if on_prefixes.is_empty() {
        None
    } else {
        Some(start)
    };

    for event in events {
        if event.atributo != Attribute::Ligada {
            continue;
        }
        if event.timestamp < start || event.timestamp > end {
            continue;
        }
        let was_any = !on_prefixes.is_empty();
        if is_active(event.valor.as_ref()) {
            on_prefixes.insert(event.prefixo.clone());
        } else {
            on_prefixes.remove(&event.prefixo);
        }
        let is_any = !on_prefixes.is_empty();
        if is_any && !was_any {
            current_start = Some(event.timestamp);
        } else if was_any
            && !is_any
            && let Some(inicio) = current_start.take()
        {
            intervals.push(LigadaInterval {
                inicio,
                fim: event.timestamp,
            });
        }
    }

    if let Some(inicio) = current_start
        && inicio < end
    {
        intervals.push(LigadaInterval { inicio, fim: end });
    }
    intervals
}
