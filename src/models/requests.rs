use crate::models::{MatchFilters, StudentProfile};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to find matches for a student profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    pub profile: StudentProfile,
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_max_results")]
    #[serde(alias = "max_results", rename = "maxResults")]
    pub max_results: usize,
    #[serde(default)]
    pub filters: Option<MatchFilters>,
}

fn default_max_results() -> usize {
    20
}

/// Request to (re)build the candidate index from a caller-supplied catalog
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BuildIndexRequest {
    #[serde(default)]
    pub candidates: Vec<crate::models::Candidate>,
}

/// Query parameters for similarity lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarQuery {
    #[serde(default = "default_similar_limit")]
    pub limit: usize,
}

fn default_similar_limit() -> usize {
    5
}

/// Request to load a named scoring resource
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoadResourceRequest {
    pub config: crate::services::ResourceConfig,
}
