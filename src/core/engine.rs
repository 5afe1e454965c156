use crate::core::factors;
use crate::core::index::CandidateIndex;
use crate::core::similarity;
use crate::models::{
    Candidate, EstimatedCost, Factor, FactorScore, FactorWeights, MatchCategory, MatchFilters,
    MatchResult, SimilarCandidate, StudentProfile,
};
use crate::services::cache::{Cache, CacheKey, MATCHES_TTL_SECS};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors surfaced by the matching engine
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("candidate index not initialized")]
    NotInitialized,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("candidate not found: {0}")]
    NotFound(String),
}

/// Candidate-ranking engine.
///
/// Scoring is a stateless read over an immutable, fully-built index. The
/// index is published with build-then-publish semantics: a rebuild
/// constructs the new index completely before swapping it in, so no
/// reader ever observes a partial build.
pub struct MatchEngine {
    index: RwLock<Option<Arc<CandidateIndex>>>,
    weights: FactorWeights,
    cache: Option<Arc<dyn Cache>>,
}

impl MatchEngine {
    pub fn new(weights: FactorWeights) -> Result<Self, MatchError> {
        if !weights.is_normalized() {
            return Err(MatchError::Validation(format!(
                "factor weights must sum to 1.0, got {}",
                weights.sum()
            )));
        }

        Ok(Self {
            index: RwLock::new(None),
            weights,
            cache: None,
        })
    }

    pub fn with_default_weights() -> Self {
        Self::new(FactorWeights::default()).expect("default weights are normalized")
    }

    /// Attach a cache facade for result memoization. Cache failures are
    /// absorbed; the engine works identically without one.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn weights(&self) -> FactorWeights {
        self.weights
    }

    /// Build and publish a fresh index for a caller-supplied catalog.
    /// Returns (candidate count, vocabulary size).
    pub fn build_index(&self, candidates: Vec<Candidate>) -> (usize, usize) {
        let index = CandidateIndex::build(candidates);
        let stats = (index.len(), index.vocabulary_size());

        let mut slot = self.index.write().expect("index lock poisoned");
        *slot = Some(Arc::new(index));

        stats
    }

    fn index_snapshot(&self) -> Result<Arc<CandidateIndex>, MatchError> {
        self.index
            .read()
            .expect("index lock poisoned")
            .clone()
            .ok_or(MatchError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.index.read().expect("index lock poisoned").is_some()
    }

    /// Size of the published catalog, if an index exists
    pub fn catalog_size(&self) -> Option<usize> {
        self.index
            .read()
            .expect("index lock poisoned")
            .as_ref()
            .map(|index| index.len())
    }

    /// Find ranked matches for a student profile.
    ///
    /// Results are ordered by descending match percentage (stable, so ties
    /// keep the original candidate order), filtered post-score, and capped
    /// at `max_results`. An index that filters down to nothing returns an
    /// empty list, not an error.
    pub async fn find_matches(
        &self,
        profile: &StudentProfile,
        max_results: usize,
        filters: Option<&MatchFilters>,
    ) -> Result<Vec<MatchResult>, MatchError> {
        if let Some(gpa) = profile.gpa {
            if !(0.0..=4.0).contains(&gpa) {
                return Err(MatchError::Validation(format!(
                    "gpa must be within [0, 4], got {}",
                    gpa
                )));
            }
        }
        if max_results == 0 || max_results > 100 {
            return Err(MatchError::Validation(format!(
                "maxResults must be within [1, 100], got {}",
                max_results
            )));
        }

        let index = self.index_snapshot()?;

        let cache_key = self
            .cache
            .as_ref()
            .map(|_| CacheKey::matches(&profile.id, &request_hash(profile, max_results, filters)));

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            if let Some(results) = read_cached_matches(cache.as_ref(), key).await {
                tracing::debug!("Returning {} cached matches for {}", results.len(), profile.id);
                return Ok(results);
            }
        }

        let mut results: Vec<MatchResult> = index
            .candidates()
            .iter()
            .map(|candidate| self.score_candidate(profile, candidate))
            .collect();

        if let Some(filters) = filters {
            results.retain(|m| passes_filters(m, filters));
        }

        // Stable sort keeps original candidate order on equal percentages
        results.sort_by(|a, b| {
            b.match_percentage
                .partial_cmp(&a.match_percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(max_results);

        if let (Some(cache), Some(key)) = (&self.cache, &cache_key) {
            write_cached_matches(cache.as_ref(), key, &results).await;
        }

        tracing::debug!(
            "Scored {} candidates for {}, returning {}",
            index.len(),
            profile.id,
            results.len()
        );

        Ok(results)
    }

    /// Score one candidate against a profile
    fn score_candidate(&self, profile: &StudentProfile, candidate: &Candidate) -> MatchResult {
        let scores = [
            factors::academic_fit(profile, candidate),
            factors::interest_alignment(profile, candidate),
            factors::location_preference(profile, candidate),
            factors::financial_fit(profile, candidate),
            factors::cultural_fit(profile, candidate),
        ];

        let weighted: f64 = Factor::ALL
            .iter()
            .zip(scores.iter())
            .map(|(factor, score)| score * self.weights.get(*factor))
            .sum();
        let match_percentage = (weighted * 100.0).clamp(0.0, 100.0);

        let confidence = confidence(profile, candidate, &scores);
        let category = categorize(match_percentage, candidate.acceptance_rate());

        let factor_breakdown = Factor::ALL
            .iter()
            .zip(scores.iter())
            .map(|(factor, score)| FactorScore {
                factor: *factor,
                score: score * 100.0,
                weight: self.weights.get(*factor),
            })
            .collect();

        let reasoning: HashMap<String, String> = Factor::ALL
            .iter()
            .zip(scores.iter())
            .map(|(factor, score)| {
                (
                    factor.as_str().to_string(),
                    factors::reasoning_for(*factor, *score).to_string(),
                )
            })
            .collect();

        MatchResult {
            candidate_id: candidate.id.clone(),
            candidate_name: candidate.name.clone(),
            match_percentage,
            confidence,
            category,
            factors: factor_breakdown,
            reasoning,
            programs: candidate.programs.clone(),
            estimated_cost: estimate_cost(candidate, profile),
        }
    }

    /// Find candidates most similar to a known candidate by content vector
    pub fn get_similar(
        &self,
        candidate_id: &str,
        limit: usize,
    ) -> Result<Vec<SimilarCandidate>, MatchError> {
        let index = self.index_snapshot()?;
        similarity::find_similar(&index, candidate_id, limit)
    }
}

/// Confidence (0-100) from data completeness and score consistency.
///
/// Lopsided-but-correct profiles are penalized the same as noisy ones by
/// the consistency factor; preserved as specified pending product
/// clarification.
fn confidence(profile: &StudentProfile, candidate: &Candidate, scores: &[f64; 5]) -> f64 {
    let mut student_completeness = 0.0;
    if profile.gpa.is_some() {
        student_completeness += 0.3;
    }
    if !profile.test_scores.is_empty() {
        student_completeness += 0.3;
    }
    if !profile.academic_interests.is_empty() {
        student_completeness += 0.2;
    }
    if !profile.extracurriculars.is_empty() {
        student_completeness += 0.2;
    }

    let mut candidate_completeness = 0.0;
    if candidate.admission_requirements.is_some() {
        candidate_completeness += 0.4;
    }
    if !candidate.programs.is_empty() {
        candidate_completeness += 0.3;
    }
    if candidate.metadata.is_some() {
        candidate_completeness += 0.3;
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
    let consistency_factor = (1.0 - variance).max(0.5);

    let confidence = (student_completeness + candidate_completeness) / 2.0 * consistency_factor;
    (confidence * 100.0).clamp(0.0, 100.0)
}

/// Classify a blended score into safety/target/reach.
///
/// Thresholds act on the blended match percentage, not a pure
/// admissibility score; extreme financial/cultural components can shift
/// the label (flagged upstream, not resolved here).
fn categorize(match_percentage: f64, acceptance_rate: f64) -> MatchCategory {
    if match_percentage >= 80.0 && acceptance_rate >= 0.3 {
        MatchCategory::Safety
    } else if match_percentage >= 60.0 && acceptance_rate >= 0.15 {
        MatchCategory::Target
    } else {
        MatchCategory::Reach
    }
}

/// Estimate annual cost of attendance with merit-aid offsets
fn estimate_cost(candidate: &Candidate, profile: &StudentProfile) -> EstimatedCost {
    let tuition = candidate.tuition();
    let room_board = tuition * 0.3;
    let books_supplies = 2_000.0;
    let personal_expenses = 3_000.0;
    let total_cost = tuition + room_board + books_supplies + personal_expenses;

    let gpa = profile.gpa.unwrap_or(3.0);
    let estimated_aid = if gpa >= 3.8 {
        total_cost * 0.3
    } else if gpa >= 3.5 {
        total_cost * 0.2
    } else {
        0.0
    };

    EstimatedCost {
        tuition,
        room_board,
        books_supplies,
        personal_expenses,
        total_cost,
        estimated_aid,
        net_cost: (total_cost - estimated_aid).max(0.0),
    }
}

/// AND-combined post-score filters
fn passes_filters(result: &MatchResult, filters: &MatchFilters) -> bool {
    if let Some(categories) = &filters.categories {
        if !categories.contains(&result.category) {
            return false;
        }
    }

    if let Some(min_percentage) = filters.min_match_percentage {
        if result.match_percentage < min_percentage {
            return false;
        }
    }

    if let Some(max_cost) = filters.max_cost {
        if result.estimated_cost.net_cost > max_cost {
            return false;
        }
    }

    true
}

/// Hash of the full request shape, so distinct filter/limit combinations
/// memoize under distinct keys. JSON is the one serialization contract for
/// the matches namespace.
fn request_hash(profile: &StudentProfile, max_results: usize, filters: Option<&MatchFilters>) -> String {
    let payload = serde_json::json!({
        "profile": profile,
        "maxResults": max_results,
        "filters": filters,
    });
    let serialized = serde_json::to_vec(&payload).unwrap_or_default();
    blake3::hash(&serialized).to_hex().to_string()
}

async fn read_cached_matches(cache: &dyn Cache, key: &str) -> Option<Vec<MatchResult>> {
    match cache.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(results) => Some(results),
            Err(e) => {
                tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            // A cache failure is indistinguishable from a miss
            tracing::warn!("Cache read failed for {}: {}", key, e);
            None
        }
    }
}

async fn write_cached_matches(cache: &dyn Cache, key: &str, results: &[MatchResult]) {
    let bytes = match serde_json::to_vec(results) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to serialize matches for cache: {}", e);
            return;
        }
    };

    if let Err(e) = cache.set_with_ttl(key, bytes, MATCHES_TTL_SECS).await {
        // A failed cache write never fails the originating request
        tracing::warn!("Cache write failed for {}: {}", key, e);
    }
}
