pub mod common;
pub mod config;
pub mod response;

pub use common::{AppState, AuthContext, TokenDef};
pub use config::Configuration;
pub use response::ErrorResult;
