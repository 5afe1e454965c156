use crate::models::{Candidate, Factor, StudentProfile};

/// Neutral score used by several factors when a side supplies no data.
/// Ranking availability must not depend on data completeness, so every
/// factor returns a documented default instead of an error.
const NEUTRAL_SCORE: f64 = 0.7;

fn clamp01(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

/// Calculate academic fit (0-1) from GPA and test scores.
///
/// GPA sub-score carries 0.6 of the academic budget, test scores 0.4.
/// When no test is present in both the profile and the requirements the
/// GPA sub-score alone is rescaled to the full range.
pub fn academic_fit(profile: &StudentProfile, candidate: &Candidate) -> f64 {
    let gpa = profile.gpa.unwrap_or(3.0);
    let min_gpa = candidate.min_gpa();

    let gpa_score = if min_gpa <= 0.0 {
        // A zero bar admits any GPA
        1.0
    } else if gpa >= min_gpa {
        (gpa / min_gpa).min(1.0)
    } else {
        // Penalty for being below the published minimum
        (gpa / min_gpa) * 0.5
    };

    let mut score = gpa_score * 0.6;
    let mut budget = 0.6;

    // Average over tests present in both the profile and the requirements
    if let Some(requirements) = &candidate.admission_requirements {
        let mut test_score = 0.0;
        let mut test_count = 0;

        for (test, range) in &requirements.test_scores {
            if let Some(student_score) = profile.test_scores.get(test) {
                let sub = if range.min > 0.0 {
                    (student_score.total / range.min).min(1.0)
                } else {
                    0.8
                };
                test_score += sub;
                test_count += 1;
            }
        }

        if test_count > 0 {
            score += (test_score / test_count as f64) * 0.4;
            budget += 0.4;
        }
    }

    clamp01(score / budget)
}

/// Calculate interest alignment (0-1) by substring-matching the student's
/// interests and target programs against the candidate's program catalog.
///
/// Returns 0.5 when the student supplies no interests and 0.3 when the
/// candidate lists no programs.
pub fn interest_alignment(profile: &StudentProfile, candidate: &Candidate) -> f64 {
    let terms: Vec<&String> = profile
        .academic_interests
        .iter()
        .chain(profile.target_programs.iter())
        .collect();

    if terms.is_empty() {
        return 0.5;
    }

    if candidate.programs.is_empty() {
        return 0.3;
    }

    let program_text = candidate
        .programs
        .iter()
        .flat_map(|p| [p.name.as_str(), p.department.as_str()])
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let matches = terms
        .iter()
        .filter(|term| program_text.contains(&term.to_lowercase()))
        .count();

    clamp01(matches as f64 / terms.len() as f64)
}

/// Calculate location preference (0-1).
///
/// Any substring match against city/state/country scores 1.0; a broad
/// country-level preference matching the candidate's country earns 0.6
/// partial credit; anything else floors at 0.3. No preference is neutral.
pub fn location_preference(profile: &StudentProfile, candidate: &Candidate) -> f64 {
    if profile.location_preferences.is_empty() {
        return NEUTRAL_SCORE;
    }

    let city = candidate.location.city.to_lowercase();
    let state = candidate.location.state.to_lowercase();
    let country = candidate.location.country.to_lowercase();

    for pref in &profile.location_preferences {
        let pref = pref.to_lowercase();
        if city.contains(&pref) || state.contains(&pref) || country.contains(&pref) {
            return 1.0;
        }
    }

    // Partial credit for a country-level region preference
    for pref in &profile.location_preferences {
        let pref = pref.to_lowercase();
        if (pref.contains("usa") || pref.contains("united states")) && country == "usa" {
            return 0.6;
        }
    }

    0.3
}

/// Calculate financial fit (0-1) against the student's budget ceiling.
///
/// Under budget scores higher the cheaper the tuition; over budget decays
/// with the overshoot but never below 0.1. No constraint is neutral.
pub fn financial_fit(profile: &StudentProfile, candidate: &Candidate) -> f64 {
    let max_budget = match profile
        .financial_constraints
        .as_ref()
        .and_then(|c| c.max_annual_cost)
    {
        Some(budget) if budget > 0.0 => budget,
        _ => return NEUTRAL_SCORE,
    };

    let tuition = candidate.tuition();

    let score = if tuition <= max_budget {
        1.0 - (tuition / max_budget) * 0.3
    } else {
        (max_budget / tuition).max(0.1)
    };

    clamp01(score)
}

/// Calculate cultural fit (0-1), bucketed by campus size.
/// Heuristic proxy documented as replaceable.
pub fn cultural_fit(_profile: &StudentProfile, candidate: &Candidate) -> f64 {
    match candidate.student_count() {
        count if count < 5_000 => 0.8,
        count if count < 20_000 => 0.9,
        _ => 0.7,
    }
}

/// Map a factor score to one of three canned explanatory strings.
/// Tiers are >= 0.8, >= 0.6 and below; the vocabulary is fixed per factor.
pub fn reasoning_for(factor: Factor, score: f64) -> &'static str {
    match factor {
        Factor::AcademicFit => {
            if score >= 0.8 {
                "Your academic credentials align well with this university's standards"
            } else if score >= 0.6 {
                "Your academic profile meets the basic requirements"
            } else {
                "Your academic credentials are below the typical admitted student profile"
            }
        }
        Factor::InterestAlignment => {
            if score >= 0.8 {
                "Strong alignment between your interests and available programs"
            } else if score >= 0.6 {
                "Good match with several programs offered"
            } else {
                "Limited alignment with your stated interests"
            }
        }
        Factor::LocationPreference => {
            if score >= 0.8 {
                "Located in your preferred area"
            } else if score >= 0.6 {
                "Reasonable location match"
            } else {
                "Not in your preferred location"
            }
        }
        Factor::FinancialFit => {
            if score >= 0.8 {
                "Well within your budget constraints"
            } else if score >= 0.6 {
                "Manageable cost with potential financial aid"
            } else {
                "May require significant financial aid"
            }
        }
        Factor::CulturalFit => {
            if score >= 0.8 {
                "Campus size and community match your profile well"
            } else if score >= 0.6 {
                "Campus environment is a reasonable fit"
            } else {
                "Campus environment may take some adjustment"
            }
        }
    }
}
