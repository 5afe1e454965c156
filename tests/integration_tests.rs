// Integration tests for UniMatch

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uni_match::models::{
    AdmissionRequirements, CandidateMetadata, FinancialConstraints, Location, Program, Ranking,
};
use uni_match::services::{FixedSystemInfo, InMemoryCache, ResourceKind};
use uni_match::{
    Candidate, MatchCategory, MatchEngine, MatchFilters, ResourceConfig, ResourceError,
    ResourceManager, StudentProfile,
};

fn create_candidate(
    id: &str,
    city: &str,
    program: &str,
    acceptance_rate: f64,
    tuition: f64,
) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: format!("University {}", id),
        location: Location {
            city: city.to_string(),
            state: "California".to_string(),
            country: "USA".to_string(),
        },
        ranking: Some(Ranking { overall: Some(50.0) }),
        admission_requirements: Some(AdmissionRequirements {
            min_gpa: Some(3.0),
            test_scores: HashMap::new(),
        }),
        programs: vec![Program {
            name: program.to_string(),
            degree: "BS".to_string(),
            department: program.to_string(),
        }],
        metadata: Some(CandidateMetadata {
            acceptance_rate: Some(acceptance_rate),
            tuition: Some(tuition),
            student_count: Some(12_000),
        }),
    }
}

fn create_profile(id: &str, gpa: f64) -> StudentProfile {
    StudentProfile {
        id: id.to_string(),
        gpa: Some(gpa),
        test_scores: HashMap::new(),
        academic_interests: vec!["computer science".to_string()],
        target_programs: vec![],
        location_preferences: vec![],
        financial_constraints: None,
        extracurriculars: vec!["robotics club".to_string()],
        career_goals: vec![],
    }
}

fn catalog() -> Vec<Candidate> {
    vec![
        create_candidate("cs-1", "Palo Alto", "Computer Science", 0.5, 20_000.0),
        create_candidate("cs-2", "Berkeley", "Computer Science", 0.4, 25_000.0),
        create_candidate("arts-1", "Santa Fe", "Fine Arts", 0.6, 30_000.0),
        create_candidate("elite-1", "Cambridge", "Computer Science", 0.05, 60_000.0),
        create_candidate("med-1", "Houston", "Medicine", 0.1, 55_000.0),
        create_candidate("bio-1", "San Diego", "Biology", 0.2, 35_000.0),
    ]
}

#[tokio::test]
async fn test_end_to_end_matching() {
    let engine = MatchEngine::with_default_weights();
    engine.build_index(catalog());

    let matches = engine
        .find_matches(&create_profile("s1", 3.8), 20, None)
        .await
        .unwrap();

    assert_eq!(matches.len(), 6);
    for pair in matches.windows(2) {
        assert!(pair[0].match_percentage >= pair[1].match_percentage);
    }

    // A CS-aligned profile ranks CS schools above the arts school
    let first = &matches[0];
    assert!(first.candidate_id.starts_with("cs-"));
    assert_eq!(first.factors.len(), 5);
    assert_eq!(first.reasoning.len(), 5);
}

#[tokio::test]
async fn test_category_filter_returns_exactly_matching_entries() {
    let engine = MatchEngine::with_default_weights();
    engine.build_index(catalog());
    let profile = create_profile("s1", 3.8);

    // Establish the full category distribution first
    let all = engine.find_matches(&profile, 20, None).await.unwrap();
    let safety_ids: Vec<String> = all
        .iter()
        .filter(|m| m.category == MatchCategory::Safety)
        .map(|m| m.candidate_id.clone())
        .collect();
    assert!(!safety_ids.is_empty());

    let filters = MatchFilters {
        categories: Some(vec![MatchCategory::Safety]),
        ..Default::default()
    };
    let filtered = engine.find_matches(&profile, 20, Some(&filters)).await.unwrap();

    let filtered_ids: Vec<String> = filtered.iter().map(|m| m.candidate_id.clone()).collect();
    assert_eq!(filtered_ids, safety_ids);
}

#[tokio::test]
async fn test_zero_candidate_index_returns_empty() {
    let engine = MatchEngine::with_default_weights();
    engine.build_index(vec![]);

    let matches = engine
        .find_matches(&create_profile("s1", 3.5), 20, None)
        .await
        .unwrap();
    assert!(matches.is_empty());
}

#[tokio::test]
async fn test_max_results_and_min_percentage_filters() {
    let engine = MatchEngine::with_default_weights();
    engine.build_index(catalog());
    let profile = create_profile("s1", 3.8);

    let limited = engine.find_matches(&profile, 3, None).await.unwrap();
    assert_eq!(limited.len(), 3);

    let filters = MatchFilters {
        min_match_percentage: Some(70.0),
        ..Default::default()
    };
    let strong = engine.find_matches(&profile, 20, Some(&filters)).await.unwrap();
    assert!(strong.iter().all(|m| m.match_percentage >= 70.0));
}

#[tokio::test]
async fn test_budget_constrained_profile_prefers_affordable_schools() {
    let engine = MatchEngine::with_default_weights();
    engine.build_index(catalog());

    let mut profile = create_profile("s1", 3.8);
    profile.financial_constraints = Some(FinancialConstraints {
        max_annual_cost: Some(30_000.0),
    });

    let matches = engine.find_matches(&profile, 20, None).await.unwrap();
    let cheap_pos = matches.iter().position(|m| m.candidate_id == "cs-1").unwrap();
    let pricey_pos = matches.iter().position(|m| m.candidate_id == "elite-1").unwrap();
    assert!(cheap_pos < pricey_pos);
}

#[tokio::test]
async fn test_memoized_results_served_from_cache() {
    let cache = Arc::new(InMemoryCache::default());
    let engine = MatchEngine::with_default_weights().with_cache(cache.clone());
    engine.build_index(catalog());
    let profile = create_profile("cached-student", 3.8);

    let first = engine.find_matches(&profile, 5, None).await.unwrap();

    // Rebuild with an empty catalog; the memoized entry still answers
    // the identical request shape within its TTL
    engine.build_index(vec![]);
    let second = engine.find_matches(&profile, 5, None).await.unwrap();

    assert_eq!(first.len(), second.len());
    let first_ids: Vec<&str> = first.iter().map(|m| m.candidate_id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|m| m.candidate_id.as_str()).collect();
    assert_eq!(first_ids, second_ids);

    // A different request shape misses the cache
    let fresh = engine.find_matches(&profile, 4, None).await.unwrap();
    assert!(fresh.is_empty());
}

#[tokio::test]
async fn test_similarity_search_end_to_end() {
    let engine = MatchEngine::with_default_weights();
    engine.build_index(catalog());

    let similar = engine.get_similar("cs-1", 3).unwrap();
    assert!(similar.len() <= 3);
    assert!(similar.iter().all(|s| s.candidate_id != "cs-1"));
    // The other CS school shares program tokens and tops the list
    assert_eq!(similar[0].candidate_id, "cs-2");

    assert!(matches!(
        engine.get_similar("nope", 3),
        Err(uni_match::MatchError::NotFound(_))
    ));
}

fn test_manager() -> ResourceManager {
    ResourceManager::new(
        Arc::new(FixedSystemInfo {
            available_mb: 8_192,
            total_mb: 16_384,
        }),
        2_048,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn test_resource_lifecycle_end_to_end() {
    let manager = test_manager();

    manager
        .load_resource(
            "university_matcher",
            ResourceConfig::collaborative_filtering(&["gpa", "academic_interests"]),
        )
        .await
        .unwrap();
    manager
        .load_resource(
            "admission_predictor",
            ResourceConfig::gradient_boosting(&["gpa", "test_scores"], "admitted"),
        )
        .await
        .unwrap();

    let lease = manager.get_resource("university_matcher").await.unwrap();
    assert_eq!(lease.kind(), ResourceKind::CollaborativeFiltering);
    drop(lease);

    let status = manager.status().await;
    assert_eq!(status.len(), 2);
    assert_eq!(status["university_matcher"].usage_count, 1);

    manager.unload_resource("admission_predictor").await.unwrap();
    assert_eq!(manager.loaded_count().await, 1);

    let stats = manager.memory_usage();
    assert_eq!(stats.total_mb, 16_384);
}

#[tokio::test]
async fn test_unsupported_kind_leaves_count_unchanged() {
    let manager = test_manager();

    let mut config = ResourceConfig::collaborative_filtering(&["gpa"]);
    config.kind = "unsupported".to_string();

    let result = manager.load_resource("bogus", config).await;
    assert!(matches!(result, Err(ResourceError::UnsupportedKind(_))));
    assert_eq!(manager.loaded_count().await, 0);
}

#[tokio::test]
async fn test_concurrent_loads_produce_one_resource() {
    let manager = Arc::new(test_manager());

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                manager
                    .load_resource(
                        "university_matcher",
                        ResourceConfig::collaborative_filtering(&["gpa"]),
                    )
                    .await
            })
        })
        .collect();

    for task in tasks {
        let _ = task.await.unwrap();
    }

    assert_eq!(manager.loaded_count().await, 1);
}

#[tokio::test]
async fn test_leased_resource_survives_idle_sweep() {
    let manager = test_manager();
    manager
        .load_resource(
            "university_matcher",
            ResourceConfig::collaborative_filtering(&["gpa"]),
        )
        .await
        .unwrap();

    let lease = manager.get_resource("university_matcher").await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(manager.evict_idle(Duration::ZERO).await.is_empty());
    assert_eq!(manager.loaded_count().await, 1);

    drop(lease);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(manager.evict_idle(Duration::ZERO).await.len(), 1);
    assert_eq!(manager.loaded_count().await, 0);
}

#[tokio::test]
async fn test_admission_rejection_preserves_prior_state() {
    let constrained = ResourceManager::new(
        Arc::new(FixedSystemInfo {
            available_mb: 1_024,
            total_mb: 16_384,
        }),
        2_048,
        Duration::from_secs(5),
    );

    let result = constrained
        .load_resource(
            "university_matcher",
            ResourceConfig::collaborative_filtering(&["gpa"]),
        )
        .await;

    assert!(matches!(
        result,
        Err(ResourceError::InsufficientMemory { .. })
    ));
    assert!(constrained.status().await.is_empty());
}
