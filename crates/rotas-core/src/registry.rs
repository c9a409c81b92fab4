//! Registries for configuration that operators edit at runtime: app scopes,
//! per-route display settings, endpoint code maps and the access log.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rotas_common::RotasError;

use crate::model::{AccessLogEntry, AppConfig, MapTipo, RouteConfig, RouteMap};

/// Access log entries older than this are pruned on write.
pub const ACCESS_LOG_RETENTION_DAYS: i64 = 90;

/// Apps known to this deployment, keyed by slug.
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    inner: Arc<RwLock<HashMap<String, AppConfig>>>,
}

impl AppRegistry {
    pub fn seed(&self, apps: Vec<AppConfig>) {
        let mut inner = self.inner.write();
        for app in apps {
            inner.insert(app.slug.clone(), app);
        }
    }

    pub fn get(&self, slug: &str) -> Option<AppConfig> {
        self.inner.read().get(slug).cloned()
    }

    /// Only apps flagged active are reachable through the dashboards.
    pub fn get_active(&self, slug: &str) -> Option<AppConfig> {
        self.get(slug).filter(|app| app.ativo)
    }
}

/// Display name, order and visibility of each route, keyed by app and
/// uppercased prefix.
#[derive(Debug, Clone, Default)]
pub struct RouteConfigRegistry {
    inner: Arc<RwLock<HashMap<(String, String), RouteConfig>>>,
}

impl RouteConfigRegistry {
    pub fn get(&self, app: &str, prefixo: &str) -> Option<RouteConfig> {
        let key = (app.to_string(), prefixo.trim().to_uppercase());
        self.inner.read().get(&key).cloned()
    }

    /// Every config of an app, keyed by prefix.
    pub fn for_app(&self, app: &str) -> HashMap<String, RouteConfig> {
        self.inner
            .read()
            .iter()
            .filter(|((owner, _), _)| owner == app)
            .map(|((_, prefixo), config)| (prefixo.clone(), config.clone()))
            .collect()
    }

    /// Create or update one route's config. The update stamp moves only
    /// when something actually changed.
    pub fn save(
        &self,
        app: &str,
        prefixo: &str,
        nome_exibicao: &str,
        ordem: i64,
        ativo: bool,
        now: DateTime<Utc>,
    ) -> RouteConfig {
        let prefixo = prefixo.trim().to_uppercase();
        let nome = nome_exibicao.trim().to_string();
        let key = (app.to_string(), prefixo.clone());

        let mut inner = self.inner.write();
        match inner.get_mut(&key) {
            Some(existing) => {
                if existing.nome_exibicao != nome
                    || existing.ordem != ordem
                    || existing.ativo != ativo
                {
                    existing.nome_exibicao = nome;
                    existing.ordem = ordem;
                    existing.ativo = ativo;
                    existing.atualizado_em = now;
                }
                existing.clone()
            }
            None => {
                let config = RouteConfig {
                    app: app.to_string(),
                    prefixo,
                    nome_exibicao: nome,
                    ordem,
                    ativo,
                    criado_em: now,
                    atualizado_em: now,
                };
                inner.insert(key, config.clone());
                config
            }
        }
    }

    /// Assign 1-based order following the given prefix sequence, creating
    /// configs for prefixes seen for the first time. Returns how many
    /// configs were created or moved.
    pub fn reorder(
        &self,
        app: &str,
        prefixos: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64, RotasError> {
        if prefixos.is_empty() {
            return Err(RotasError::EmptyPrefixList);
        }
        let mut inner = self.inner.write();
        let mut changed = 0u64;
        for (position, prefixo) in prefixos.iter().enumerate() {
            let ordem = (position + 1) as i64;
            let key = (app.to_string(), prefixo.clone());
            match inner.get_mut(&key) {
                Some(existing) => {
                    if existing.ordem != ordem {
                        existing.ordem = ordem;
                        existing.atualizado_em = now;
                        changed += 1;
                    }
                }
                None => {
                    inner.insert(
                        key,
                        RouteConfig {
                            app: app.to_string(),
                            prefixo: prefixo.clone(),
                            nome_exibicao: String::new(),
                            ordem,
                            ativo: true,
                            criado_em: now,
                            atualizado_em: now,
                        },
                    );
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}

#[derive(Debug, Default)]
struct MapsInner {
    items: Vec<RouteMap>,
    next_id: u64,
}

/// Friendly names for numeric origin/destination codes, unique per
/// (app, tipo, codigo).
#[derive(Debug, Clone, Default)]
pub struct MapRegistry {
    inner: Arc<RwLock<MapsInner>>,
}

impl MapRegistry {
    /// Create a map, or update one by id.
    pub fn save(
        &self,
        app: &str,
        id: Option<u64>,
        tipo: MapTipo,
        codigo: i64,
        nome: &str,
        ativo: bool,
        now: DateTime<Utc>,
    ) -> Result<RouteMap, RotasError> {
        let mut inner = self.inner.write();
        let duplicate = inner.items.iter().any(|item| {
            item.app == app && item.tipo == tipo && item.codigo == codigo && Some(item.id) != id
        });
        if duplicate {
            return Err(RotasError::DuplicateMap(format!(
                "{app}/{}/{codigo}",
                tipo.as_str()
            )));
        }
        match id {
            Some(id) => {
                let Some(item) = inner
                    .items
                    .iter_mut()
                    .find(|item| item.app == app && item.id == id)
                else {
                    return Err(RotasError::NotFound(format!("mapeamento {id}")));
                };
                item.tipo = tipo;
                item.codigo = codigo;
                item.nome = nome.to_string();
                item.ativo = ativo;
                Ok(item.clone())
            }
            None => {
                inner.next_id += 1;
                let item = RouteMap {
                    id: inner.next_id,
                    app: app.to_string(),
                    tipo,
                    codigo,
                    nome: nome.to_string(),
                    ativo,
                    criado_em: now,
                };
                inner.items.push(item.clone());
                Ok(item)
            }
        }
    }

    pub fn delete(&self, app: &str, id: u64) -> Result<(), RotasError> {
        let mut inner = self.inner.write();
        let before = inner.items.len();
        inner.items.retain(|item| !(item.app == app && item.id == id));
        if inner.items.len() == before {
            return Err(RotasError::NotFound(format!("mapeamento {id}")));
        }
        Ok(())
    }

    /// Maps of an app, inactive ones included, ordered by (tipo, codigo).
    pub fn list(&self, app: &str, tipo: Option<MapTipo>) -> Vec<RouteMap> {
        let inner = self.inner.read();
        let mut items: Vec<RouteMap> = inner
            .items
            .iter()
            .filter(|item| item.app == app)
            .filter(|item| tipo.map(|t| item.tipo == t).unwrap_or(true))
            .cloned()
            .collect();
        items.sort_by(|a, b| (a.tipo.as_str(), a.codigo).cmp(&(b.tipo.as_str(), b.codigo)));
        items
    }

    /// Code-to-name lookup used by the dashboards. Inactive maps do not
    /// resolve.
    pub fn name_lookup(&self, app: &str, tipo: MapTipo) -> HashMap<i64, String> {
        self.inner
            .read()
            .items
            .iter()
            .filter(|item| item.app == app && item.tipo == tipo && item.ativo)
            .map(|item| (item.codigo, item.nome.clone()))
            .collect()
    }
}

/// Rolling log of authenticated module accesses.
#[derive(Debug, Clone, Default)]
pub struct AccessLogRegistry {
    inner: Arc<RwLock<VecDeque<AccessLogEntry>>>,
}

impl AccessLogRegistry {
    /// Entries arrive in time order; anything older than the retention
    /// window is pruned on the way in.
    pub fn log(&self, token_name: &str, module: &str, now: DateTime<Utc>) {
        let cutoff = now - Duration::days(ACCESS_LOG_RETENTION_DAYS);
        let mut inner = self.inner.write();
        while inner
            .front()
            .map(|entry| entry.timestamp < cutoff)
            .unwrap_or(false)
        {
            inner.pop_front();
        }
        inner.push_back(AccessLogEntry {
            token_name: token_name.to_string(),
            module: module.to_string(),
            timestamp: now,
        });
    }

    /// Newest entries first.
    pub fn recent(&self, limit: usize) -> Vec<AccessLogEntry> {
        self.inner.read().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
