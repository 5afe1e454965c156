// Criterion benchmarks for UniMatch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;
use uni_match::core::CandidateIndex;
use uni_match::models::{
    AdmissionRequirements, CandidateMetadata, Location, Program, Ranking,
};
use uni_match::{Candidate, MatchEngine, StudentProfile};

fn create_candidate(id: usize) -> Candidate {
    let programs = ["Computer Science", "Biology", "Economics", "Fine Arts", "Medicine"];
    Candidate {
        id: id.to_string(),
        name: format!("University {}", id),
        location: Location {
            city: format!("City {}", id % 50),
            state: "California".to_string(),
            country: "USA".to_string(),
        },
        ranking: Some(Ranking {
            overall: Some((id % 200) as f64 + 1.0),
        }),
        admission_requirements: Some(AdmissionRequirements {
            min_gpa: Some(2.5 + (id % 15) as f64 * 0.1),
            test_scores: HashMap::new(),
        }),
        programs: vec![Program {
            name: programs[id % programs.len()].to_string(),
            degree: "BS".to_string(),
            department: programs[(id + 1) % programs.len()].to_string(),
        }],
        metadata: Some(CandidateMetadata {
            acceptance_rate: Some(0.05 + (id % 20) as f64 * 0.04),
            tuition: Some(10_000.0 + (id % 60) as f64 * 1_000.0),
            student_count: Some(2_000 + (id as u64 % 50) * 1_000),
        }),
    }
}

fn create_profile() -> StudentProfile {
    StudentProfile {
        id: "bench-student".to_string(),
        gpa: Some(3.7),
        test_scores: HashMap::new(),
        academic_interests: vec!["computer science".to_string(), "economics".to_string()],
        target_programs: vec![],
        location_preferences: vec!["California".to_string()],
        financial_constraints: None,
        extracurriculars: vec!["debate".to_string()],
        career_goals: vec![],
    }
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");

    for candidate_count in [100, 1000].iter() {
        let candidates: Vec<Candidate> = (0..*candidate_count).map(create_candidate).collect();

        group.bench_with_input(
            BenchmarkId::new("build", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| CandidateIndex::build(black_box(candidates.clone())));
            },
        );
    }

    group.finish();
}

fn bench_matching(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let profile = create_profile();

    let mut group = c.benchmark_group("matching");

    for candidate_count in [10, 50, 100, 500, 1000].iter() {
        let engine = MatchEngine::with_default_weights();
        engine.build_index((0..*candidate_count).map(create_candidate).collect());

        group.bench_with_input(
            BenchmarkId::new("find_matches", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| {
                    runtime
                        .block_on(engine.find_matches(black_box(&profile), black_box(20), None))
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_similarity(c: &mut Criterion) {
    let engine = MatchEngine::with_default_weights();
    engine.build_index((0..500).map(create_candidate).collect());

    c.bench_function("get_similar_500_candidates", |b| {
        b.iter(|| engine.get_similar(black_box("42"), black_box(5)).unwrap());
    });
}

criterion_group!(benches, bench_index_build, bench_matching, bench_similarity);
criterion_main!(benches);
