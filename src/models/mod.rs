// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AdmissionRequirements, Candidate, CandidateMetadata, EstimatedCost, Factor, FactorScore,
    FactorWeights, FinancialConstraints, Location, MatchCategory, MatchFilters, MatchResult,
    Program, Ranking, SimilarCandidate, StudentProfile, TestScore, TestScoreRange,
};
pub use requests::{BuildIndexRequest, FindMatchesRequest, LoadResourceRequest, SimilarQuery};
pub use responses::{
    BuildIndexResponse, ErrorResponse, FindMatchesResponse, HealthResponse, SimilarResponse,
};
