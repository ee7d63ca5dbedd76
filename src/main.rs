use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use chrono::Duration;
use std::io;
use std::sync::Arc;

use savory_bliss::api::{self, AppState};
use savory_bliss::auth::AuthService;
use savory_bliss::config::Config;
use savory_bliss::store::Store;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();

    // Initialize store
    let store = Arc::new(Store::new(&config.database_path).map_err(|e| {
        log::error!("Failed to initialize database: {}", e);
        io::Error::other(e.to_string())
    })?);

    let auth_service = Arc::new(
        AuthService::new(config.jwt_secret.clone(), config.jwt_refresh_secret.clone()).with_ttls(
            Duration::minutes(config.access_token_ttl_minutes),
            Duration::days(config.refresh_token_ttl_days),
        ),
    );

    let state = web::Data::new(
        AppState::new(store, auth_service).with_body_limit(config.max_payload_bytes),
    );

    log::info!("Database: {}", config.database_path);
    log::info!("Starting savory-bliss server on port {}", config.port);

    let max_payload = config.max_payload_bytes;
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(max_payload))
            .app_data(web::JsonConfig::default().limit(max_payload))
            .configure(api::configure_routes)
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}
