// src/main.rs
use env_logger::Builder;
use log::{error, info, LevelFilter};
use std::sync::Arc;
use stock_trader::{api, config::Config, db, quote};
use tokio::sync::Mutex;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    Builder::new()
        .filter_level(LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            return;
        }
    };

    let conn = match db::open(&config.database) {
        Ok(conn) => Arc::new(Mutex::new(conn)),
        Err(e) => {
            error!("Failed to initialize database: {:#}", e);
            return;
        }
    };
    info!("Connected to database...");

    let client = match quote::http_client() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {:#}", e);
            return;
        }
    };

    let routes = api::routes(conn, client, config.clone());

    info!("Server running on http://{}", config.bind);
    warp::serve(routes).run(config.bind).await;
}
