pub mod http;
pub mod logging;

pub use http::api_server;
pub use logging::{LoggingConfig, LoggingGuard, init_logging};
