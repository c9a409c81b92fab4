use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};

use crate::api;
use crate::middleware::Authentication;
use crate::model::common::AppState;

/// Builds and binds the API server. The returned [`Server`] runs until
/// shutdown.
pub fn api_server(
    app_state: Arc<AppState>,
    context_path: String,
    address: String,
    port: u16,
) -> Result<Server, std::io::Error> {
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Authentication)
            .app_data(web::Data::from(app_state.clone()))
            .service(web::scope(&context_path).service(api::routes()))
    })
    .bind((address, port))?
    .run())
}
