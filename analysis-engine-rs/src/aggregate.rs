//! Result aggregation
//!
//! Merges the successful per-backend analyses of one job into a single
//! `ConsolidatedResult`.

use std::collections::HashSet;

use backend_sdk::{BackendAnalysis, BackendIdentity};

use crate::job::ConsolidatedResult;

/// Findings kept in the consolidated view
const MAX_FINDINGS: usize = 5;

/// Below this confidence a backend's result earns a caution note
const LOW_CONFIDENCE: f64 = 0.5;

/// Generic next steps attached to every consolidated result
const GENERIC_ACTIONS: [&str; 3] = [
    "Review the consolidated findings before sharing them with students",
    "Compare the individual backend reports for nuance the summary may miss",
    "Re-run the analysis after revising the content",
];

/// Merge successful backend results into one consolidated result
///
/// Callers guarantee at least one entry; an empty slice yields an empty
/// result with zero confidence.
pub fn consolidate(results: &[(BackendIdentity, BackendAnalysis)]) -> ConsolidatedResult {
    let sources: Vec<BackendIdentity> = results.iter().map(|(identity, _)| *identity).collect();

    // Concatenate findings in backend order, de-duplicate case-insensitively,
    // keep at most MAX_FINDINGS.
    let mut seen = HashSet::new();
    let mut common_findings = Vec::new();
    for (_, analysis) in results {
        for finding in &analysis.key_findings {
            let normalized = finding.trim().to_lowercase();
            if normalized.is_empty() || !seen.insert(normalized) {
                continue;
            }
            common_findings.push(finding.trim().to_string());
            if common_findings.len() == MAX_FINDINGS {
                break;
            }
        }
        if common_findings.len() == MAX_FINDINGS {
            break;
        }
    }

    let confidence = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|(_, a)| a.confidence).sum::<f64>() / results.len() as f64
    };

    let mut conflicts = Vec::new();
    conflicts.extend(field_conflict(results, "sentiment", |a| {
        a.sentiment.as_deref()
    }));
    conflicts.extend(field_conflict(results, "category", |a| {
        a.category.as_deref()
    }));

    let mut recommended_actions: Vec<String> =
        GENERIC_ACTIONS.iter().map(|s| s.to_string()).collect();
    for (identity, analysis) in results {
        if analysis.confidence < LOW_CONFIDENCE {
            recommended_actions.push(format!(
                "Treat the {} result with caution (confidence {:.2})",
                identity, analysis.confidence
            ));
        }
    }

    let summary = format!(
        "Consolidated analysis from {} backend(s) ({}), mean confidence {:.2}",
        results.len(),
        sources
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        confidence
    );

    ConsolidatedResult {
        summary,
        common_findings,
        confidence,
        conflicts,
        recommended_actions,
        sources,
    }
}

/// Equality check across one field of the backend results
///
/// Anything richer than backend-by-backend equality (semantic closeness,
/// weighting by confidence) is deliberately left out; the conflicts field is
/// the stable surface.
fn field_conflict<'a, F>(
    results: &'a [(BackendIdentity, BackendAnalysis)],
    field: &str,
    extract: F,
) -> Option<String>
where
    F: Fn(&'a BackendAnalysis) -> Option<&'a str>,
{
    let reported: Vec<(BackendIdentity, &str)> = results
        .iter()
        .filter_map(|(identity, analysis)| extract(analysis).map(|v| (*identity, v)))
        .collect();
    let distinct: HashSet<&str> = reported.iter().map(|(_, v)| *v).collect();
    if distinct.len() <= 1 {
        return None;
    }
    let detail = reported
        .iter()
        .map(|(identity, value)| format!("{}={}", identity, value))
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("Backends disagree on {}: {}", field, detail))
}
