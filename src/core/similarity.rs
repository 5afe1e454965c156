use crate::core::engine::MatchError;
use crate::core::index::CandidateIndex;
use crate::models::SimilarCandidate;

/// Find the candidates most similar to a known candidate.
///
/// Similarity is the cosine of the content vectors, which are
/// L2-normalized at build time, so the score is a plain dot product.
/// The query candidate is never part of the result; an index holding
/// only the query candidate yields an empty list.
pub fn find_similar(
    index: &CandidateIndex,
    candidate_id: &str,
    limit: usize,
) -> Result<Vec<SimilarCandidate>, MatchError> {
    let target_idx = index
        .position(candidate_id)
        .ok_or_else(|| MatchError::NotFound(candidate_id.to_string()))?;

    let target_vector = index
        .content_vector(target_idx)
        .ok_or_else(|| MatchError::NotFound(candidate_id.to_string()))?;

    let mut scored: Vec<(usize, f64)> = (0..index.len())
        .filter(|&i| i != target_idx)
        .map(|i| {
            let score = index
                .content_vector(i)
                .map(|v| target_vector.dot(v))
                .unwrap_or(0.0);
            (i, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);

    Ok(scored
        .into_iter()
        .filter_map(|(i, score)| {
            index.get(i).map(|candidate| SimilarCandidate {
                candidate_id: candidate.id.clone(),
                name: candidate.name.clone(),
                similarity_score: score,
                programs: candidate.programs.clone(),
                location: candidate.location.clone(),
            })
        })
        .collect())
}
