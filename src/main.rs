mod config;
mod core;
mod models;
mod routes;
mod services;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use config::Settings;
use core::MatchEngine;
use models::FactorWeights;
use routes::matches::AppState;
use services::{Cache, InMemoryCache, ProcSystemInfo, RedisCache, ResourceManager};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting UniMatch service...");

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // Initialize cache (optional - ranking works without it)
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);
    let l1_ttl = settings.cache.l1_ttl_secs.unwrap_or(300);

    let cache: Arc<dyn Cache> =
        match RedisCache::new(&settings.cache.redis_url, l1_cache_size, l1_ttl).await {
            Ok(c) => {
                info!("Redis cache initialized (L1: {} entries, L1 TTL: {}s)", l1_cache_size, l1_ttl);
                Arc::new(c)
            }
            Err(e) => {
                // Cache failures must never block ranking; fall back to
                // the in-process cache and keep serving
                warn!("Failed to connect to Redis ({}), falling back to in-memory cache", e);
                Arc::new(InMemoryCache::new(l1_cache_size))
            }
        };

    // Initialize matching engine with configured weights
    let weights = FactorWeights {
        academic: settings.scoring.weights.academic,
        interest: settings.scoring.weights.interest,
        location: settings.scoring.weights.location,
        financial: settings.scoring.weights.financial,
        cultural: settings.scoring.weights.cultural,
    };

    let engine = Arc::new(
        MatchEngine::new(weights)
            .unwrap_or_else(|e| {
                error!("Invalid scoring weights: {}", e);
                panic!("Configuration error: {}", e);
            })
            .with_cache(Arc::clone(&cache)),
    );

    info!("Match engine initialized with weights: {:?}", weights);

    // Initialize resource manager and its idle-eviction sweep
    let resources = Arc::new(ResourceManager::new(
        Arc::new(ProcSystemInfo),
        settings.resources.memory_budget_mb,
        Duration::from_secs(settings.resources.load_timeout_secs),
    ));

    let _sweep = resources.start_eviction_sweep(
        Duration::from_secs(settings.resources.sweep_interval_secs),
        Duration::from_secs(settings.resources.max_idle_secs),
    );

    info!(
        "Resource manager initialized (budget: {}MB, idle eviction after {}s)",
        settings.resources.memory_budget_mb, settings.resources.max_idle_secs
    );

    // Build application state
    let app_state = AppState { engine, resources };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
