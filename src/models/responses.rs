use crate::models::domain::{MatchResult, SimilarCandidate};
use serde::{Deserialize, Serialize};

/// Response for find matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesResponse {
    pub matches: Vec<MatchResult>,
    pub total_candidates: usize,
}

/// Response for similarity lookup endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarResponse {
    pub similar: Vec<SimilarCandidate>,
}

/// Response for index build endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildIndexResponse {
    pub indexed: usize,
    pub vocabulary_size: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
