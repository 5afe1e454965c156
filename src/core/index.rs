use crate::models::Candidate;
use std::collections::HashMap;

/// Maximum vocabulary size for the descriptor vectors
const MAX_FEATURES: usize = 1000;

/// Common English terms excluded from descriptor vocabularies
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it",
    "its", "of", "on", "or", "that", "the", "to", "was", "were", "will", "with",
];

/// Sparse term-weighted vector, L2-normalized at build time.
/// Entries are sorted by term id so dot products run as a linear merge.
#[derive(Debug, Clone, Default)]
pub struct SparseVector {
    entries: Vec<(u32, f64)>,
}

impl SparseVector {
    /// Dot product of two L2-normalized vectors, i.e. their cosine similarity
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let mut sum = 0.0;
        let (mut i, mut j) = (0, 0);
        while i < self.entries.len() && j < other.entries.len() {
            let (ta, va) = self.entries[i];
            let (tb, vb) = other.entries[j];
            if ta == tb {
                sum += va * vb;
                i += 1;
                j += 1;
            } else if ta < tb {
                i += 1;
            } else {
                j += 1;
            }
        }
        sum
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only derived view of a candidate catalog.
///
/// Term statistics are corpus-wide, so any membership change invalidates
/// every vector; the index is built once and never mutated. Rebuilds
/// construct a fresh instance which the engine publishes atomically.
#[derive(Debug, Default)]
pub struct CandidateIndex {
    candidates: Vec<Candidate>,
    by_id: HashMap<String, usize>,
    content_vectors: Vec<SparseVector>,
    numeric_vectors: Vec<[f64; 4]>,
    vocabulary_size: usize,
}

impl CandidateIndex {
    /// Build the index for a candidate catalog.
    ///
    /// An empty catalog yields an empty, queryable index.
    pub fn build(candidates: Vec<Candidate>) -> Self {
        let descriptors: Vec<String> = candidates.iter().map(build_descriptor).collect();
        let content_vectors = tfidf_vectors(&descriptors);
        let numeric_vectors = zscore_vectors(&candidates);
        let vocabulary_size = vocabulary_size(&content_vectors);

        let by_id = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();

        Self {
            candidates,
            by_id,
            content_vectors,
            numeric_vectors,
            vocabulary_size,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn position(&self, candidate_id: &str) -> Option<usize> {
        self.by_id.get(candidate_id).copied()
    }

    pub fn content_vector(&self, index: usize) -> Option<&SparseVector> {
        self.content_vectors.get(index)
    }

    pub fn numeric_vector(&self, index: usize) -> Option<&[f64; 4]> {
        self.numeric_vectors.get(index)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }
}

/// Build the textual descriptor used for content-based similarity:
/// name + city + state + program tokens + a ranking-bucket token.
fn build_descriptor(candidate: &Candidate) -> String {
    let mut text = format!(
        "{} {} {}",
        candidate.name, candidate.location.city, candidate.location.state
    );

    for program in &candidate.programs {
        text.push(' ');
        text.push_str(&program.name);
        text.push(' ');
        text.push_str(&program.department);
    }

    // Ranking bucketed to tiers of 10 so nearby ranks share a token
    let bucket = (candidate.overall_ranking() / 10.0).floor() as i64 * 10;
    text.push_str(&format!(" ranking_{}", bucket));

    text
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() > 1 && !STOP_WORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

/// Compute TF-IDF vectors jointly over all descriptors.
///
/// Vocabulary is capped at MAX_FEATURES terms, selected by document
/// frequency (ties broken alphabetically for determinism). Uses smoothed
/// idf = ln((1+n)/(1+df)) + 1; vectors are L2-normalized.
fn tfidf_vectors(descriptors: &[String]) -> Vec<SparseVector> {
    if descriptors.is_empty() {
        return Vec::new();
    }

    let tokenized: Vec<Vec<String>> = descriptors.iter().map(|d| tokenize(d)).collect();

    // Document frequency per term
    let mut doc_freq: HashMap<&str, usize> = HashMap::new();
    for tokens in &tokenized {
        let mut seen: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();
        seen.sort_unstable();
        seen.dedup();
        for term in seen {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }

    // Cap the vocabulary by document frequency
    let mut terms: Vec<(&str, usize)> = doc_freq.iter().map(|(t, df)| (*t, *df)).collect();
    terms.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    terms.truncate(MAX_FEATURES);

    let vocabulary: HashMap<&str, u32> = terms
        .iter()
        .enumerate()
        .map(|(id, (term, _))| (*term, id as u32))
        .collect();

    let n = descriptors.len() as f64;
    let idf: HashMap<u32, f64> = terms
        .iter()
        .map(|(term, df)| {
            let id = vocabulary[term];
            (id, ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
        })
        .collect();

    tokenized
        .iter()
        .map(|tokens| {
            let mut counts: HashMap<u32, f64> = HashMap::new();
            for token in tokens {
                if let Some(&id) = vocabulary.get(token.as_str()) {
                    *counts.entry(id).or_insert(0.0) += 1.0;
                }
            }

            let mut entries: Vec<(u32, f64)> = counts
                .into_iter()
                .map(|(id, tf)| (id, tf * idf[&id]))
                .collect();
            entries.sort_unstable_by_key(|(id, _)| *id);

            let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (_, v) in entries.iter_mut() {
                    *v /= norm;
                }
            }

            SparseVector { entries }
        })
        .collect()
}

/// Z-score normalize the numeric tuples [ranking, acceptance_rate, tuition,
/// student_count] over the current candidate set. A zero standard deviation
/// (fewer than 2 candidates or a constant feature) normalizes against 1.
fn zscore_vectors(candidates: &[Candidate]) -> Vec<[f64; 4]> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let raw: Vec<[f64; 4]> = candidates
        .iter()
        .map(|c| {
            [
                c.overall_ranking(),
                c.acceptance_rate(),
                c.tuition(),
                c.student_count() as f64,
            ]
        })
        .collect();

    let n = raw.len() as f64;
    let mut mean = [0.0; 4];
    for row in &raw {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v / n;
        }
    }

    let mut std_dev = [0.0; 4];
    for row in &raw {
        for k in 0..4 {
            std_dev[k] += (row[k] - mean[k]).powi(2) / n;
        }
    }
    for s in std_dev.iter_mut() {
        *s = s.sqrt();
        if *s == 0.0 {
            *s = 1.0;
        }
    }

    raw.iter()
        .map(|row| {
            let mut out = [0.0; 4];
            for k in 0..4 {
                out[k] = (row[k] - mean[k]) / std_dev[k];
            }
            out
        })
        .collect()
}

fn vocabulary_size(vectors: &[SparseVector]) -> usize {
    let mut ids: Vec<u32> = vectors
        .iter()
        .flat_map(|v| v.entries.iter().map(|(id, _)| *id))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}
