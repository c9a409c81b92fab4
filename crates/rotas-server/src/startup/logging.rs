//! Logging initialization.
//!
//! Builds the tracing subscriber from the logging section of the
//! configuration: an optional console layer plus rolling file output with
//! per-component files for the ingest and dashboard paths.

use std::fs;
use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Targets, fmt, layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Component log files and the module targets they capture.
const COMPONENT_LOGS: &[(&str, &[&str])] = &[
    (
        "ingest.log",
        &["rotas_server::api::ingest", "rotas_core::store"],
    ),
    (
        "dashboard.log",
        &["rotas_server::api::rotas", "rotas_server::api::balance"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

impl LogRotation {
    /// Unrecognized values fall back to daily rotation.
    pub fn parse(text: &str) -> LogRotation {
        match text.trim().to_lowercase().as_str() {
            "hourly" => LogRotation::Hourly,
            "never" => LogRotation::Never,
            _ => LogRotation::Daily,
        }
    }
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub console_output: bool,
    pub console_level: Level,
    pub file_logging: bool,
    pub file_level: Level,
    pub rotation: LogRotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_dir: PathBuf::from("logs"),
            console_output: true,
            console_level: Level::INFO,
            file_logging: true,
            file_level: Level::INFO,
            rotation: LogRotation::Daily,
        }
    }
}

impl LoggingConfig {
    pub fn from_config(
        log_dir: Option<String>,
        console_output: bool,
        file_logging: bool,
        console_level: String,
        file_level: String,
        rotation: String,
    ) -> Self {
        let defaults = LoggingConfig::default();
        LoggingConfig {
            log_dir: log_dir.map(PathBuf::from).unwrap_or(defaults.log_dir),
            console_output,
            console_level: console_level.parse().unwrap_or(Level::INFO),
            file_logging,
            file_level: file_level.parse().unwrap_or(Level::INFO),
            rotation: LogRotation::parse(&rotation),
        }
    }
}

/// Keeps the non-blocking appender workers alive. Dropping the guard
/// flushes and stops file logging.
pub struct LoggingGuard {
    _file_guards: Vec<WorkerGuard>,
}

pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, Box<dyn std::error::Error>> {
    let mut file_guards = Vec::new();
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if config.console_output {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(config.console_level.to_string())),
            );
        layers.push(Box::new(console_layer));
    }

    if config.file_logging {
        fs::create_dir_all(&config.log_dir)?;

        let root_appender =
            RollingFileAppender::new(config.rotation.into(), &config.log_dir, "rotas.log");
        let (root_writer, root_guard) = tracing_appender::non_blocking(root_appender);
        file_guards.push(root_guard);

        let root_layer = fmt::layer()
            .with_writer(root_writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_filter(EnvFilter::new(config.file_level.to_string()));
        layers.push(Box::new(root_layer));

        for (file_name, targets) in COMPONENT_LOGS {
            let appender =
                RollingFileAppender::new(config.rotation.into(), &config.log_dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_guards.push(guard);

            let mut filter = Targets::new();
            for target in *targets {
                filter = filter.with_target(*target, config.file_level);
            }

            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(filter);
            layers.push(Box::new(layer));
        }
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    tracing::info!(
        console = config.console_output,
        file = config.file_logging,
        log_dir = %config.log_dir.display(),
        "logging initialized"
    );

    Ok(LoggingGuard {
        _file_guards: file_guards,
    })
}
