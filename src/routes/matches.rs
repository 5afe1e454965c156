use crate::core::{MatchEngine, MatchError};
use crate::models::{
    BuildIndexRequest, BuildIndexResponse, ErrorResponse, FindMatchesRequest, FindMatchesResponse,
    HealthResponse, SimilarQuery, SimilarResponse,
};
use crate::services::ResourceManager;
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
    pub resources: Arc<ResourceManager>,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/index/build", web::post().to(build_index))
        .route("/matches/find", web::post().to(find_matches))
        .route("/matches/similar/{candidateId}", web::get().to(get_similar));
}

fn match_error_response(error: MatchError) -> HttpResponse {
    match error {
        MatchError::NotInitialized => HttpResponse::ServiceUnavailable().json(ErrorResponse {
            error: "index_not_initialized".to_string(),
            message: "Candidate index not built; POST /api/v1/index/build first".to_string(),
            status_code: 503,
        }),
        MatchError::Validation(message) => HttpResponse::BadRequest().json(ErrorResponse {
            error: "validation_failed".to_string(),
            message,
            status_code: 400,
        }),
        MatchError::NotFound(id) => HttpResponse::NotFound().json(ErrorResponse {
            error: "candidate_not_found".to_string(),
            message: format!("No candidate with id '{}'", id),
            status_code: 404,
        }),
    }
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let status = if state.engine.is_initialized() {
        "healthy"
    } else {
        "degraded"
    };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Build the candidate index from a caller-supplied catalog
///
/// POST /api/v1/index/build
async fn build_index(
    state: web::Data<AppState>,
    req: web::Json<BuildIndexRequest>,
) -> impl Responder {
    let candidates = req.into_inner().candidates;
    tracing::info!("Building index for {} candidates", candidates.len());

    let (indexed, vocabulary_size) = state.engine.build_index(candidates);

    HttpResponse::Ok().json(BuildIndexResponse {
        indexed,
        vocabulary_size,
    })
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "profile": { "id": "string", "gpa": 3.8, ... },
///   "maxResults": 20,
///   "filters": { "categories": ["safety"], "minMatchPercentage": 50 }
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "validation_failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let total_candidates = match state.engine.catalog_size() {
        Some(size) => size,
        None => return match_error_response(MatchError::NotInitialized),
    };

    tracing::info!(
        "Finding matches for student {}, maxResults: {}",
        req.profile.id,
        req.max_results
    );

    match state
        .engine
        .find_matches(&req.profile, req.max_results, req.filters.as_ref())
        .await
    {
        Ok(matches) => {
            tracing::info!(
                "Returning {} matches for student {}",
                matches.len(),
                req.profile.id
            );
            HttpResponse::Ok().json(FindMatchesResponse {
                total_candidates,
                matches,
            })
        }
        Err(e) => match_error_response(e),
    }
}

/// Similarity lookup endpoint
///
/// GET /api/v1/matches/similar/{candidateId}?limit=5
async fn get_similar(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<SimilarQuery>,
) -> impl Responder {
    let candidate_id = path.into_inner();
    let limit = query.limit.clamp(1, 100);

    match state.engine.get_similar(&candidate_id, limit) {
        Ok(similar) => HttpResponse::Ok().json(SimilarResponse { similar }),
        Err(e) => match_error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_response() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(response.status, "healthy");
    }

    #[test]
    fn test_match_error_mapping() {
        let resp = match_error_response(MatchError::NotInitialized);
        assert_eq!(resp.status(), actix_web::http::StatusCode::SERVICE_UNAVAILABLE);

        let resp = match_error_response(MatchError::Validation("bad gpa".to_string()));
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);

        let resp = match_error_response(MatchError::NotFound("c1".to_string()));
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }
}
