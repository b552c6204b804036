use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

mod config;
mod dates;
mod db;
mod error;
mod grid;
mod handlers;
mod images;
mod models;
mod resolve;
mod schema;
mod slots;
mod store;

use handlers::AppState;
use store::PgStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = config::AppConfig::load()?;
    log::info!("Loaded config: {:?}", config);

    let host: IpAddr = config.host.parse()?;
    let addr = SocketAddr::new(host, config.port);

    let pool = db::establish_pool(&config).map_err(|e| format!("Failed to connect to database: {}", e))?;
    let state = AppState::new(Arc::new(PgStore::new(pool)), config.slots_per_kind);

    log::info!("Starting server on {}", addr);
    let app = handlers::router(state);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app.into_make_service()).await?;

    Ok(())
}
