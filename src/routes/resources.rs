use crate::models::{ErrorResponse, LoadResourceRequest};
use crate::routes::matches::AppState;
use crate::services::ResourceError;
use actix_web::{web, HttpResponse, Responder};

/// Configure resource lifecycle routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/resources/status", web::get().to(resource_status))
        .route("/resources/memory", web::get().to(memory_usage))
        .route("/resources/{name}/load", web::post().to(load_resource))
        .route("/resources/{name}/reload", web::post().to(reload_resource))
        .route("/resources/{name}", web::delete().to(unload_resource));
}

fn resource_error_response(error: ResourceError) -> HttpResponse {
    let (status, code) = match &error {
        ResourceError::AlreadyLoaded(_) => (409, "already_loaded"),
        ResourceError::InsufficientMemory { .. } => (503, "insufficient_memory"),
        ResourceError::UnsupportedKind(_) => (400, "unsupported_kind"),
        ResourceError::ConstructionFailed { .. } => (500, "construction_failed"),
        ResourceError::NotFound(_) => (404, "resource_not_found"),
    };

    HttpResponse::build(
        actix_web::http::StatusCode::from_u16(status)
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
    )
    .json(ErrorResponse {
        error: code.to_string(),
        message: error.to_string(),
        status_code: status,
    })
}

/// Load a named scoring resource
///
/// POST /api/v1/resources/{name}/load
async fn load_resource(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<LoadResourceRequest>,
) -> impl Responder {
    let name = path.into_inner();

    match state
        .resources
        .load_resource(&name, req.into_inner().config)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"loaded": name})),
        Err(e) => resource_error_response(e),
    }
}

/// Reload a resource with its stored config
///
/// POST /api/v1/resources/{name}/reload
async fn reload_resource(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let name = path.into_inner();

    match state.resources.reload(&name).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"reloaded": name})),
        Err(e) => resource_error_response(e),
    }
}

/// Unload a resource
///
/// DELETE /api/v1/resources/{name}
async fn unload_resource(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let name = path.into_inner();

    match state.resources.unload_resource(&name).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({"unloaded": name})),
        Err(e) => resource_error_response(e),
    }
}

/// Snapshot of loaded resources
///
/// GET /api/v1/resources/status
async fn resource_status(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.resources.status().await)
}

/// System memory statistics
///
/// GET /api/v1/resources/memory
async fn memory_usage(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.resources.memory_usage())
}
