//! Tests for the backend registry and fallback selection

use std::sync::Arc;

use backend_sdk::BackendIdentity;

use crate::error::EngineError;
use crate::registry::BackendRegistry;
use crate::tests::support::{guard, ScriptedBackend};

fn registry() -> BackendRegistry {
    BackendRegistry::new(
        vec![
            guard(ScriptedBackend::succeeding(BackendIdentity::OpenAi, 0.9)),
            guard(ScriptedBackend::succeeding(BackendIdentity::Anthropic, 0.9)),
            guard(ScriptedBackend::succeeding(BackendIdentity::Gemini, 0.9)),
        ],
        BackendIdentity::OpenAi,
        vec![
            BackendIdentity::OpenAi,
            BackendIdentity::Anthropic,
            BackendIdentity::Gemini,
            // Configured in the chain but not enabled
            BackendIdentity::Mistral,
        ],
    )
}

#[test]
fn resolve_rejects_an_empty_selection() {
    let registry = registry();
    assert_eq!(
        registry.resolve(&[]).unwrap_err(),
        EngineError::NoBackendsSelected
    );
}

#[test]
fn resolve_rejects_backends_that_are_not_enabled() {
    let registry = registry();
    assert_eq!(
        registry
            .resolve(&[BackendIdentity::OpenAi, BackendIdentity::Mistral])
            .unwrap_err(),
        EngineError::NoSuchBackend(BackendIdentity::Mistral)
    );
}

#[test]
fn resolve_preserves_the_requested_order() {
    let registry = registry();
    let guards = registry
        .resolve(&[BackendIdentity::Gemini, BackendIdentity::OpenAi])
        .unwrap();
    let identities: Vec<_> = guards.iter().map(|g| g.identity()).collect();
    assert_eq!(
        identities,
        vec![BackendIdentity::Gemini, BackendIdentity::OpenAi]
    );
}

#[test]
fn candidates_start_with_the_primary_and_skip_disabled_entries() {
    let registry = registry();
    let candidates = registry.candidates(BackendIdentity::Anthropic);
    let identities: Vec<_> = candidates.iter().map(|g| g.identity()).collect();
    // Primary first, then the chain minus the primary; Mistral is in the
    // chain but not enabled, so it never appears.
    assert_eq!(
        identities,
        vec![
            BackendIdentity::Anthropic,
            BackendIdentity::OpenAi,
            BackendIdentity::Gemini,
        ]
    );
}

#[test]
fn enabled_lists_backends_in_identity_order() {
    let registry = registry();
    assert_eq!(
        registry.enabled(),
        vec![
            BackendIdentity::OpenAi,
            BackendIdentity::Anthropic,
            BackendIdentity::Gemini,
        ]
    );
    assert_eq!(registry.default_backend(), BackendIdentity::OpenAi);
}

#[test]
fn reload_swaps_affected_guards_and_keeps_the_rest() {
    let registry = registry();
    let before_openai = registry.get(BackendIdentity::OpenAi).unwrap();
    let before_gemini = registry.get(BackendIdentity::Gemini).unwrap();

    registry.reload(vec![guard(ScriptedBackend::succeeding(
        BackendIdentity::OpenAi,
        0.5,
    ))]);

    let after_openai = registry.get(BackendIdentity::OpenAi).unwrap();
    let after_gemini = registry.get(BackendIdentity::Gemini).unwrap();
    assert!(!Arc::ptr_eq(&before_openai, &after_openai));
    assert!(Arc::ptr_eq(&before_gemini, &after_gemini));
}

#[test]
fn replace_all_installs_a_new_default_and_chain() {
    let registry = registry();
    registry.replace_all(
        vec![guard(ScriptedBackend::succeeding(
            BackendIdentity::Mistral,
            0.9,
        ))],
        BackendIdentity::Mistral,
        vec![BackendIdentity::Mistral],
    );

    assert_eq!(registry.default_backend(), BackendIdentity::Mistral);
    assert_eq!(registry.enabled(), vec![BackendIdentity::Mistral]);
    assert!(registry.get(BackendIdentity::OpenAi).is_none());
}
