mod config;
mod db;
mod inference;
mod models;
mod remedies;
mod report;
mod routes;

use std::fs;

use actix_session::SessionMiddleware;
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::Key;
use actix_web::{App, HttpServer, web};
use sha2::{Digest, Sha512};

use config::AppConfig;
use db::users::UserStore;
use inference::classifier::Classifier;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = std::env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = AppConfig::from_env();
    fs::create_dir_all(&config.upload_dir)?;
    fs::create_dir_all(&config.report_dir)?;

    let classifier =
        Classifier::load(&config.model_path, &config.labels_path).map_err(|e| {
            log::error!("Failed to load classifier at startup: {e}");
            std::io::Error::other(format!("classifier loading failed: {e}"))
        })?;

    let users = UserStore::connect(&config.database_url).await.map_err(|e| {
        log::error!("Failed to open user database: {e}");
        std::io::Error::other(format!("user database failed: {e}"))
    })?;

    // The cookie signing key wants 64 bytes; stretch the configured secret.
    let session_key = Key::from(Sha512::digest(config.session_secret.as_bytes()).as_slice());

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting server on {}", bind_address);

    let classifier = web::Data::new(classifier);
    let users = web::Data::new(users);
    let static_dir = config.static_dir.clone();
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_secure(false)
                    .build(),
            )
            .app_data(classifier.clone())
            .app_data(users.clone())
            .app_data(config.clone())
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
