//! Shared application state and per-request authentication context.

use chrono::FixedOffset;
use rotas_core::registry::{AccessLogRegistry, AppRegistry, MapRegistry, RouteConfigRegistry};
use rotas_core::store::IngestStore;

use super::config::Configuration;

/// A bearer token recognized by the panel API, with its access scope.
#[derive(Debug, Clone, Default)]
pub struct TokenDef {
    pub token: String,
    pub name: String,
    pub staff: bool,
    /// App slugs this token may read. Empty means every app.
    pub apps: Vec<String>,
}

/// Identity resolved by the authentication middleware for one request.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub token: Option<String>,
    pub name: Option<String>,
    pub staff: bool,
    pub apps: Vec<String>,
    /// Whether any token was presented at all, valid or not.
    pub token_provided: bool,
}

impl AuthContext {
    pub fn authenticated(&self) -> bool {
        self.name.is_some()
    }

    pub fn can_access(&self, app: &str) -> bool {
        self.authenticated() && (self.apps.is_empty() || self.apps.iter().any(|a| a == app))
    }
}

/// Process-wide state shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: IngestStore,
    pub apps: AppRegistry,
    pub route_configs: RouteConfigRegistry,
    pub maps: MapRegistry,
    pub access_log: AccessLogRegistry,
    pub tokens: Vec<TokenDef>,
    pub ingest_token: String,
    pub site_offset: FixedOffset,
    pub timeline_limit: usize,
}

impl AppState {
    pub fn from_configuration(configuration: &Configuration) -> Self {
        let apps = AppRegistry::default();
        apps.seed(configuration.apps());

        AppState {
            store: IngestStore::new(),
            apps,
            route_configs: RouteConfigRegistry::default(),
            maps: MapRegistry::default(),
            access_log: AccessLogRegistry::default(),
            tokens: configuration.auth_tokens(),
            ingest_token: configuration.ingest_token(),
            site_offset: configuration.site_offset(),
            timeline_limit: configuration.timeline_limit(),
        }
    }

    pub fn resolve_token(&self, token: &str) -> Option<&TokenDef> {
        self.tokens.iter().find(|def| def.token == token)
    }
}
