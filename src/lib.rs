//! Uni Match - University matching and recommendation service
//!
//! This library provides the candidate-ranking engine behind the UniMatch
//! service: a five-factor weighted scorer over a caller-supplied catalog,
//! content-vector similarity search, and a memory-bounded manager for
//! named scoring backends.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{MatchEngine, MatchError};
pub use models::{
    Candidate, FactorWeights, MatchCategory, MatchFilters, MatchResult, SimilarCandidate,
    StudentProfile,
};
pub use services::{ResourceConfig, ResourceError, ResourceKind, ResourceManager};
