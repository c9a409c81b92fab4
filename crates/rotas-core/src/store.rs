//! In-memory ingest store keyed by source id.
//!
//! Each telemetry point keeps exactly one record per `source_id`; repeated
//! ingests overwrite the payload in place so the store holds the latest
//! reading of every point instead of an unbounded history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::extract::is_lifebit;
use crate::model::{AppConfig, IngestItem, IngestRecord};

#[derive(Debug, Clone, Default)]
pub struct IngestStore {
    records: Arc<DashMap<String, IngestRecord>>,
}

impl IngestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Upsert a validated batch, in order. Later items win over earlier ones
    /// with the same `source_id`. Returns the number of items applied.
    pub fn apply_batch(&self, items: &[IngestItem], now: DateTime<Utc>) -> usize {
        for item in items {
            match self.records.get_mut(&item.source_id) {
                Some(mut existing) => {
                    existing.client_id = item.client_id.clone();
                    existing.agent_id = item.agent_id.clone();
                    existing.source = item.source.clone();
                    existing.payload = item.payload.clone();
                    existing.updated_at = Some(now);
                }
                None => {
                    self.records.insert(
                        item.source_id.clone(),
                        IngestRecord {
                            source_id: item.source_id.clone(),
                            client_id: item.client_id.clone(),
                            agent_id: item.agent_id.clone(),
                            source: item.source.clone(),
                            payload: item.payload.clone(),
                            created_at: now,
                            updated_at: None,
                        },
                    );
                }
            }
        }
        items.len()
    }

    fn scope_matches(record: &IngestRecord, app: &AppConfig) -> bool {
        record.client_id == app.client_id
            && record.agent_id == app.agent_id
            && (app.sources.is_empty() || app.sources.iter().any(|s| *s == record.source))
    }

    fn sorted_desc(mut records: Vec<IngestRecord>) -> Vec<IngestRecord> {
        records.sort_by(|a, b| {
            (b.effective_time(), b.created_at).cmp(&(a.effective_time(), a.created_at))
        });
        records
    }

    /// Records of an app whose effective time falls in `[start, end_exclusive)`,
    /// newest first, capped at `limit`.
    pub fn records_in_window(
        &self,
        app: &AppConfig,
        start: DateTime<Utc>,
        end_exclusive: DateTime<Utc>,
        limit: usize,
    ) -> Vec<IngestRecord> {
        let matching = self
            .records
            .iter()
            .filter(|entry| Self::scope_matches(entry.value(), app))
            .filter(|entry| {
                let at = entry.value().effective_time();
                at >= start && at < end_exclusive
            })
            .map(|entry| entry.value().clone())
            .collect();
        let mut records = Self::sorted_desc(matching);
        records.truncate(limit);
        records
    }

    /// Records of an app strictly before `cutoff`, newest first, capped at
    /// `limit`. Used to seed route states with history older than a window.
    pub fn records_before(
        &self,
        app: &AppConfig,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Vec<IngestRecord> {
        let matching = self
            .records
            .iter()
            .filter(|entry| Self::scope_matches(entry.value(), app))
            .filter(|entry| entry.value().effective_time() < cutoff)
            .map(|entry| entry.value().clone())
            .collect();
        let mut records = Self::sorted_desc(matching);
        records.truncate(limit);
        records
    }

    /// The freshest lifebit record of an app, if any agent ever announced one.
    pub fn latest_lifebit(&self, app: &AppConfig) -> Option<IngestRecord> {
        self.records
            .iter()
            .filter(|entry| Self::scope_matches(entry.value(), app))
            .filter(|entry| is_lifebit(entry.value()))
            .map(|entry| entry.value().clone())
            .max_by_key(|record| (record.effective_time(), record.created_at))
    }

    /// Lifebit records of an app, newest first, capped at `limit`.
    pub fn lifebit_records(&self, app: &AppConfig, limit: usize) -> Vec<IngestRecord> {
        let matching = self
            .records
            .iter()
            .filter(|entry| Self::scope_matches(entry.value(), app))
            .filter(|entry| is_lifebit(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        let mut records = Self::sorted_desc(matching);
        records.truncate(limit);
        records
    }

    /// Every record of a client/agent pair regardless of source, newest first.
    pub fn scoped_records(&self, client_id: &str, agent_id: &str) -> Vec<IngestRecord> {
        let matching = self
            .records
            .iter()
            .filter(|entry| {
                entry.value().client_id == client_id && entry.value().agent_id == agent_id
            })
            .map(|entry| entry.value().clone())
            .collect();
        Self::sorted_desc(matching)
    }

    /// Records of an app ordered by storage time descending, capped at `limit`.
    pub fn recent_by_created(&self, app: &AppConfig, limit: usize) -> Vec<IngestRecord> {
        let mut records: Vec<IngestRecord> = self
            .records
            .iter()
            .filter(|entry| Self::scope_matches(entry.value(), app))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        records
    }

    /// Drop every record, returning how many were held.
    pub fn clear(&self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }
}
