//! Tests for result consolidation

use backend_sdk::{BackendAnalysis, BackendIdentity};

use crate::aggregate::consolidate;

fn result(
    backend: BackendIdentity,
    findings: &[&str],
    confidence: f64,
    sentiment: Option<&str>,
    category: Option<&str>,
) -> (BackendIdentity, BackendAnalysis) {
    (
        backend,
        BackendAnalysis {
            summary: format!("{backend} summary"),
            key_findings: findings.iter().map(|f| f.to_string()).collect(),
            confidence,
            sentiment: sentiment.map(String::from),
            category: category.map(String::from),
        },
    )
}

#[test]
fn findings_are_deduplicated_case_insensitively() {
    let merged = consolidate(&[
        result(
            BackendIdentity::OpenAi,
            &["Strong thesis", "weak citations"],
            0.8,
            None,
            None,
        ),
        result(
            BackendIdentity::Anthropic,
            &["strong thesis", "Good structure"],
            0.9,
            None,
            None,
        ),
    ]);

    assert_eq!(
        merged.common_findings,
        vec!["Strong thesis", "weak citations", "Good structure"]
    );
}

#[test]
fn findings_are_capped_at_five() {
    let merged = consolidate(&[
        result(
            BackendIdentity::OpenAi,
            &["a", "b", "c", "d"],
            0.8,
            None,
            None,
        ),
        result(
            BackendIdentity::Anthropic,
            &["e", "f", "g"],
            0.8,
            None,
            None,
        ),
    ]);

    assert_eq!(merged.common_findings, vec!["a", "b", "c", "d", "e"]);
}

#[test]
fn confidence_is_the_mean_across_backends() {
    let merged = consolidate(&[
        result(BackendIdentity::OpenAi, &[], 0.6, None, None),
        result(BackendIdentity::Gemini, &[], 0.9, None, None),
    ]);

    assert!((merged.confidence - 0.75).abs() < f64::EPSILON);
    assert_eq!(
        merged.sources,
        vec![BackendIdentity::OpenAi, BackendIdentity::Gemini]
    );
}

#[test]
fn disagreeing_sentiments_surface_as_a_conflict() {
    let merged = consolidate(&[
        result(BackendIdentity::OpenAi, &[], 0.8, Some("positive"), Some("essay")),
        result(BackendIdentity::Gemini, &[], 0.8, Some("negative"), Some("essay")),
    ]);

    assert_eq!(merged.conflicts.len(), 1);
    assert!(merged.conflicts[0].contains("sentiment"));
    assert!(merged.conflicts[0].contains("openai=positive"));
    assert!(merged.conflicts[0].contains("gemini=negative"));
}

#[test]
fn agreement_and_missing_fields_produce_no_conflicts() {
    let merged = consolidate(&[
        result(BackendIdentity::OpenAi, &[], 0.8, Some("neutral"), None),
        result(BackendIdentity::Gemini, &[], 0.8, Some("neutral"), Some("essay")),
        result(BackendIdentity::Mistral, &[], 0.8, None, Some("essay")),
    ]);

    assert!(merged.conflicts.is_empty());
}

#[test]
fn low_confidence_backends_earn_a_caution_note() {
    let merged = consolidate(&[
        result(BackendIdentity::OpenAi, &[], 0.3, None, None),
        result(BackendIdentity::Anthropic, &[], 0.9, None, None),
    ]);

    assert_eq!(merged.recommended_actions.len(), 4);
    let caution = merged.recommended_actions.last().unwrap();
    assert!(caution.contains("openai"));
    assert!(caution.contains("0.30"));
}

#[test]
fn confident_results_keep_only_the_generic_actions() {
    let merged = consolidate(&[result(BackendIdentity::OpenAi, &[], 0.9, None, None)]);
    assert_eq!(merged.recommended_actions.len(), 3);
}
