mod artifact;
mod config;
mod database;
mod error;
mod handlers;
mod middleware;
mod routes;
mod spreadsheet;
mod types;

use actix_web::{web, App, HttpServer};
use log::info;

use crate::config::{ExportSettings, ServerConfig};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env()?;
    let settings = web::Data::new(ExportSettings::from(&config));
    info!("Temporary exports go to {}", config.temp_dir.display());

    let bind_addr = config.bind_addr();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::request_logger())
            .wrap(middleware::build_cors())
            .app_data(settings.clone())
            .configure(routes::configure_routes)
    })
    .bind(&bind_addr)?;

    info!("Server started on {}", bind_addr);
    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}
