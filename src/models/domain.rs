use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Neutral defaults applied when a candidate record is missing a field.
/// Scoring must stay available on incomplete catalogs, so every accessor
/// below substitutes a default instead of failing.
const DEFAULT_MIN_GPA: f64 = 3.0;
const DEFAULT_TUITION: f64 = 50_000.0;
const DEFAULT_ACCEPTANCE_RATE: f64 = 0.5;
const DEFAULT_STUDENT_COUNT: u64 = 10_000;
const DEFAULT_OVERALL_RANKING: f64 = 100.0;

/// An institution entry in the catalog being ranked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub ranking: Option<Ranking>,
    #[serde(rename = "admissionRequirements", alias = "admission_requirements", default)]
    pub admission_requirements: Option<AdmissionRequirements>,
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub metadata: Option<CandidateMetadata>,
}

impl Candidate {
    pub fn min_gpa(&self) -> f64 {
        self.admission_requirements
            .as_ref()
            .and_then(|r| r.min_gpa)
            .unwrap_or(DEFAULT_MIN_GPA)
    }

    pub fn tuition(&self) -> f64 {
        self.metadata
            .as_ref()
            .and_then(|m| m.tuition)
            .unwrap_or(DEFAULT_TUITION)
    }

    pub fn acceptance_rate(&self) -> f64 {
        self.metadata
            .as_ref()
            .and_then(|m| m.acceptance_rate)
            .unwrap_or(DEFAULT_ACCEPTANCE_RATE)
    }

    pub fn student_count(&self) -> u64 {
        self.metadata
            .as_ref()
            .and_then(|m| m.student_count)
            .unwrap_or(DEFAULT_STUDENT_COUNT)
    }

    pub fn overall_ranking(&self) -> f64 {
        self.ranking
            .as_ref()
            .and_then(|r| r.overall)
            .unwrap_or(DEFAULT_OVERALL_RANKING)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    #[serde(default)]
    pub overall: Option<f64>,
}

/// Minimum admission bar published by an institution.
/// Test score requirements are keyed by test name (e.g. "SAT", "GRE").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionRequirements {
    #[serde(rename = "minGPA", alias = "min_gpa", default)]
    pub min_gpa: Option<f64>,
    #[serde(rename = "testScores", alias = "test_scores", default)]
    pub test_scores: HashMap<String, TestScoreRange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestScoreRange {
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub department: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateMetadata {
    #[serde(rename = "acceptanceRate", alias = "acceptance_rate", default)]
    pub acceptance_rate: Option<f64>,
    #[serde(default)]
    pub tuition: Option<f64>,
    #[serde(rename = "studentCount", alias = "student_count", default)]
    pub student_count: Option<u64>,
}

/// Requester profile. Request-scoped; nothing here is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: String,
    #[serde(default)]
    pub gpa: Option<f64>,
    #[serde(rename = "testScores", alias = "test_scores", default)]
    pub test_scores: HashMap<String, TestScore>,
    #[serde(rename = "academicInterests", alias = "academic_interests", default)]
    pub academic_interests: Vec<String>,
    #[serde(rename = "targetPrograms", alias = "target_programs", default)]
    pub target_programs: Vec<String>,
    #[serde(rename = "locationPreferences", alias = "location_preferences", default)]
    pub location_preferences: Vec<String>,
    #[serde(rename = "financialConstraints", alias = "financial_constraints", default)]
    pub financial_constraints: Option<FinancialConstraints>,
    #[serde(default)]
    pub extracurriculars: Vec<String>,
    #[serde(rename = "careerGoals", alias = "career_goals", default)]
    pub career_goals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestScore {
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialConstraints {
    #[serde(rename = "maxAnnualCost", alias = "max_annual_cost", default)]
    pub max_annual_cost: Option<f64>,
}

/// One of the five independent scoring dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    AcademicFit,
    InterestAlignment,
    LocationPreference,
    FinancialFit,
    CulturalFit,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::AcademicFit,
        Factor::InterestAlignment,
        Factor::LocationPreference,
        Factor::FinancialFit,
        Factor::CulturalFit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::AcademicFit => "academic_fit",
            Factor::InterestAlignment => "interest_alignment",
            Factor::LocationPreference => "location_preference",
            Factor::FinancialFit => "financial_fit",
            Factor::CulturalFit => "cultural_fit",
        }
    }
}

/// Safety/target/reach classification of a scored candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchCategory {
    Safety,
    Target,
    Reach,
}

/// Per-factor contribution to the blended score.
/// `score` is reported on the 0-100 scale for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorScore {
    pub factor: Factor,
    pub score: f64,
    pub weight: f64,
}

/// Estimated annual cost of attendance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatedCost {
    pub tuition: f64,
    #[serde(rename = "roomBoard")]
    pub room_board: f64,
    #[serde(rename = "booksSupplies")]
    pub books_supplies: f64,
    #[serde(rename = "personalExpenses")]
    pub personal_expenses: f64,
    #[serde(rename = "totalCost")]
    pub total_cost: f64,
    #[serde(rename = "estimatedAid")]
    pub estimated_aid: f64,
    #[serde(rename = "netCost")]
    pub net_cost: f64,
}

/// Scored match produced per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    #[serde(rename = "candidateName")]
    pub candidate_name: String,
    #[serde(rename = "matchPercentage")]
    pub match_percentage: f64,
    pub confidence: f64,
    pub category: MatchCategory,
    pub factors: Vec<FactorScore>,
    pub reasoning: HashMap<String, String>,
    pub programs: Vec<Program>,
    #[serde(rename = "estimatedCost")]
    pub estimated_cost: EstimatedCost,
}

/// Nearest-neighbour entry returned by similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarCandidate {
    #[serde(rename = "candidateId")]
    pub candidate_id: String,
    pub name: String,
    #[serde(rename = "similarityScore")]
    pub similarity_score: f64,
    pub programs: Vec<Program>,
    pub location: Location,
}

/// Post-score result filters, AND-combined. Unknown keys in the incoming
/// JSON are ignored by serde, matching the documented filter contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchFilters {
    #[serde(default)]
    pub categories: Option<Vec<MatchCategory>>,
    #[serde(rename = "minMatchPercentage", alias = "min_match_percentage", default)]
    pub min_match_percentage: Option<f64>,
    #[serde(rename = "maxCost", alias = "max_cost", default)]
    pub max_cost: Option<f64>,
}

impl MatchFilters {
    pub fn is_empty(&self) -> bool {
        self.categories.is_none() && self.min_match_percentage.is_none() && self.max_cost.is_none()
    }
}

/// Factor weights for the blended score
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FactorWeights {
    pub academic: f64,
    pub interest: f64,
    pub location: f64,
    pub financial: f64,
    pub cultural: f64,
}

impl FactorWeights {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::AcademicFit => self.academic,
            Factor::InterestAlignment => self.interest,
            Factor::LocationPreference => self.location,
            Factor::FinancialFit => self.financial,
            Factor::CulturalFit => self.cultural,
        }
    }

    pub fn sum(&self) -> f64 {
        self.academic + self.interest + self.location + self.financial + self.cultural
    }

    /// Weights must sum to 1.0 for the blended score to stay on the 0-100 scale
    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() < 1e-9
    }
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            academic: 0.35,
            interest: 0.25,
            location: 0.15,
            financial: 0.15,
            cultural: 0.10,
        }
    }
}
