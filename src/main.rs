mod db;
mod handlers;
mod middlewares;
mod models;
mod routes;
mod scan;
mod state;
mod structs;
mod utils;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, http, middleware::Logger, web};
use db::mongodb::{MongoCodeStore, get_database};
use dotenv::dotenv;
use env_logger::Env;
use routes::init_routes;
use scan::ScanService;
use state::app_state::AppState;
use state::config::AppConfig;
use utils::geo::{GeoLocator, HttpGeoLocator, NoopGeoLocator};

fn build_geolocator(config: &AppConfig) -> Arc<dyn GeoLocator> {
    match &config.geoip_url {
        Some(url) => match HttpGeoLocator::new(url.clone(), config.geoip_timeout) {
            Ok(geo) => {
                log::info!("Geolocation lookups via {}", url);
                Arc::new(geo)
            }
            Err(e) => {
                log::warn!("Geolocation disabled, client setup failed: {}", e);
                Arc::new(NoopGeoLocator)
            }
        },
        None => {
            log::info!("GEOIP_URL not set, scans will be recorded with unknown location");
            Arc::new(NoopGeoLocator)
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize the database connection
    let db = match get_database(&config).await {
        Ok(db) => db,
        Err(e) => {
            log::error!("Error connecting to the database: {:#}", e);
            std::process::exit(1);
        }
    };

    let scans = ScanService::new(Arc::new(MongoCodeStore::new(db)), build_geolocator(&config));
    let bind = (config.bind_address.clone(), config.port);
    let cors_origins = config.cors_origins.clone();

    // Create shared state
    let app_state = web::Data::new(AppState { scans, config });

    log::info!("Listening on {}:{}", bind.0, bind.1);
    HttpServer::new(move || {
        let logger = Logger::new("%a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %D ms");
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![http::header::AUTHORIZATION, http::header::ACCEPT])
            .allowed_header(http::header::CONTENT_TYPE)
            .max_age(3600);
        App::new()
            .wrap(logger)
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(init_routes)
    })
    .bind(bind)?
    .run()
    .await
}
