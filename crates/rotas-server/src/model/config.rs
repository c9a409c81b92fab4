use chrono::FixedOffset;
use clap::Parser;
use config::{Config, Environment, Map, Value};
use rotas_core::model::AppConfig;
use rotas_core::timeline::DEFAULT_TIMELINE_LIMIT;

use super::common::TokenDef;
use crate::startup::logging::LoggingConfig;

/// Command line arguments for the server
#[derive(Debug, Parser)]
#[command()]
struct Cli {
    #[arg(short, long)]
    address: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    #[arg(short, long, env = "ROTAS_CONFIG")]
    config: Option<String>,

    #[arg(long, env = "ROTAS_INGEST_TOKEN")]
    ingest_token: Option<String>,
}

/// Application configuration loaded from config files and environment
#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn new() -> Self {
        let args = Cli::parse();

        let config_file = args
            .config
            .unwrap_or_else(|| "conf/rotas.yml".to_string());

        let mut config_builder = Config::builder()
            .add_source(
                Environment::with_prefix("rotas")
                    .separator(".")
                    .try_parsing(true),
            )
            .add_source(config::File::with_name(&config_file));

        if let Some(address) = args.address {
            config_builder = config_builder
                .set_override("rotas.server.address", address)
                .expect("Failed to set server address override");
        }

        if let Some(port) = args.port {
            config_builder = config_builder
                .set_override("rotas.server.port", port as i64)
                .expect("Failed to set server port override");
        }

        if let Some(token) = args.ingest_token {
            config_builder = config_builder
                .set_override("rotas.ingest.token", token)
                .expect("Failed to set ingest token override");
        }

        let app_config = config_builder
            .build()
            .expect("Failed to build configuration - check conf/rotas.yml");

        Configuration { config: app_config }
    }

    // ============================================================================
    // Server Configuration
    // ============================================================================

    pub fn server_address(&self) -> String {
        self.config
            .get_string("rotas.server.address")
            .unwrap_or("0.0.0.0".to_string())
    }

    pub fn server_port(&self) -> u16 {
        self.config.get_int("rotas.server.port").unwrap_or(8080) as u16
    }

    pub fn context_path(&self) -> String {
        self.config
            .get_string("rotas.server.context_path")
            .unwrap_or_default()
    }

    // ============================================================================
    // Site Configuration
    // ============================================================================

    pub fn site_offset(&self) -> FixedOffset {
        let hours = self
            .config
            .get_int("rotas.site.utc_offset_hours")
            .unwrap_or(-3)
            .clamp(-23, 23) as i32;

        FixedOffset::east_opt(hours * 3600)
            .or_else(|| FixedOffset::east_opt(0))
            .expect("Failed to build site UTC offset")
    }

    pub fn timeline_limit(&self) -> usize {
        self.config
            .get_int("rotas.dashboard.timeline_limit")
            .unwrap_or(DEFAULT_TIMELINE_LIMIT as i64)
            .max(1) as usize
    }

    // ============================================================================
    // Ingest Configuration
    // ============================================================================

    pub fn ingest_token(&self) -> String {
        self.config
            .get_string("rotas.ingest.token")
            .unwrap_or_default()
    }

    // ============================================================================
    // Auth Configuration
    // ============================================================================

    pub fn auth_tokens(&self) -> Vec<TokenDef> {
        self.config
            .get_array("rotas.auth.tokens")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| value.into_table().ok())
            .map(|table| TokenDef {
                token: table_string(&table, "token"),
                name: table_string(&table, "name"),
                staff: table_bool(&table, "staff", false),
                apps: table_string_list(&table, "apps"),
            })
            .filter(|def| !def.token.is_empty())
            .collect()
    }

    // ============================================================================
    // App Configuration
    // ============================================================================

    pub fn apps(&self) -> Vec<AppConfig> {
        self.config
            .get_array("rotas.apps")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| value.into_table().ok())
            .map(|table| AppConfig {
                slug: table_string(&table, "slug"),
                nome: table_string(&table, "nome"),
                client_id: table_string(&table, "client_id"),
                agent_id: table_string(&table, "agent_id"),
                sources: table_string_list(&table, "sources"),
                ativo: table_bool(&table, "ativo", true),
            })
            .filter(|app| !app.slug.is_empty())
            .collect()
    }

    // ============================================================================
    // Logging Configuration
    // ============================================================================

    pub fn logging_dir(&self) -> Option<String> {
        self.config.get_string("rotas.logging.dir").ok()
    }

    pub fn logging_console(&self) -> bool {
        self.config
            .get_bool("rotas.logging.console")
            .unwrap_or(true)
    }

    pub fn logging_console_level(&self) -> String {
        self.config
            .get_string("rotas.logging.console_level")
            .unwrap_or("info".to_string())
    }

    pub fn logging_file(&self) -> bool {
        self.config.get_bool("rotas.logging.file").unwrap_or(true)
    }

    pub fn logging_file_level(&self) -> String {
        self.config
            .get_string("rotas.logging.file_level")
            .unwrap_or("info".to_string())
    }

    pub fn logging_rotation(&self) -> String {
        self.config
            .get_string("rotas.logging.rotation")
            .unwrap_or("daily".to_string())
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.logging_dir(),
            self.logging_console(),
            self.logging_file(),
            self.logging_console_level(),
            self.logging_file_level(),
            self.logging_rotation(),
        )
    }
}

fn table_string(table: &Map<String, Value>, key: &str) -> String {
    table
        .get(key)
        .cloned()
        .and_then(|value| value.into_string().ok())
        .unwrap_or_default()
}

fn table_bool(table: &Map<String, Value>, key: &str, default: bool) -> bool {
    table
        .get(key)
        .cloned()
        .and_then(|value| value.into_bool().ok())
        .unwrap_or(default)
}

fn table_string_list(table: &Map<String, Value>, key: &str) -> Vec<String> {
    table
        .get(key)
        .cloned()
        .and_then(|value| value.into_array().ok())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| value.into_string().ok())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        let configuration = Configuration::default();

        assert_eq!(configuration.server_address(), "0.0.0.0");
        assert_eq!(configuration.server_port(), 8080);
        assert_eq!(configuration.context_path(), "");
        assert_eq!(configuration.site_offset().local_minus_utc(), -3 * 3600);
        assert_eq!(configuration.timeline_limit(), DEFAULT_TIMELINE_LIMIT);
        assert_eq!(configuration.ingest_token(), "");
        assert!(configuration.auth_tokens().is_empty());
        assert!(configuration.apps().is_empty());
        assert_eq!(configuration.logging_rotation(), "daily");
    }

    #[test]
    fn test_tokens_and_apps_parsing() {
        let yaml = r#"
rotas:
  auth:
    tokens:
      - token: "painel-token"
        name: "painel"
        staff: true
        apps: []
      - token: "reader-token"
        name: "reader"
        apps: ["approtas"]
  apps:
    - slug: "approtas"
      nome: "Painel de Rotas"
      client_id: "site-01"
      agent_id: "plc-rotas"
      sources: []
    - slug: "appmilhaobla"
      nome: "Balanca do Milhao"
      client_id: "site-01"
      agent_id: "plc-balanca"
      sources: ["balanca_acumulado_hora", "balanca_acumulado"]
"#;
        let config = Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .expect("failed to build test configuration");
        let configuration = Configuration { config };

        let tokens = configuration.auth_tokens();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].name, "painel");
        assert!(tokens[0].staff);
        assert!(tokens[0].apps.is_empty());
        assert!(!tokens[1].staff);
        assert_eq!(tokens[1].apps, vec!["approtas".to_string()]);

        let apps = configuration.apps();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].slug, "approtas");
        assert!(apps[0].ativo);
        assert!(apps[0].sources.is_empty());
        assert_eq!(apps[1].sources.len(), 2);
    }
}
