// tests/expansion_tests.rs
//
// Expansion rules and selector matching over in-memory declarations.

mod common;

use common::{count_only, explicit, marks};
use dut_cases::{
    expand, filter, Case, CollectMode, CollectionSelector, ErrorKind, ExpansionRule,
};

fn targets(case: &Case) -> Vec<&str> {
    case.targets().iter().map(|t| t.as_str()).collect()
}

// ---
// Expansion
// ---

#[test]
fn test_marks_only_one_case_per_mark() {
    let cases = expand("test_single", &marks(&["esp32", "esp32s2", "esp32c3"]), &[]).unwrap();
    assert_eq!(cases.len(), 3);
    assert_eq!(targets(&cases[0]), vec!["esp32"]);
    assert_eq!(targets(&cases[1]), vec!["esp32s2"]);
    assert_eq!(targets(&cases[2]), vec!["esp32c3"]);
    assert!(cases.iter().all(|c| c.name() == "test_single"));
    assert!(cases.iter().all(|c| c.rule() == ExpansionRule::SimpleMark));
}

#[test]
fn test_explicit_declarations_verbatim_in_order() {
    let declarations = vec![
        explicit(2, "esp32s2|esp32"),
        explicit(3, "esp32s2|esp32s2|esp32s3"),
    ];
    let cases = expand("test_multi", &[], &declarations).unwrap();
    assert_eq!(cases.len(), 2);
    assert_eq!(targets(&cases[0]), vec!["esp32s2", "esp32"]);
    assert_eq!(targets(&cases[1]), vec!["esp32s2", "esp32s2", "esp32s3"]);
    assert!(cases
        .iter()
        .all(|c| c.rule() == ExpansionRule::ExplicitMultiplicity));
}

#[test]
fn test_explicit_declarations_ignore_marks() {
    let cases = expand(
        "test_multi",
        &marks(&["esp32c6"]),
        &[explicit(2, "esp32|esp32")],
    )
    .unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(targets(&cases[0]), vec!["esp32", "esp32"]);
}

#[test]
fn test_mark_repeated_by_single_count() {
    let cases = expand(
        "test_pair",
        &marks(&["esp32", "esp32s2"]),
        &[count_only(3)],
    )
    .unwrap();
    assert_eq!(cases.len(), 2);
    assert_eq!(targets(&cases[0]), vec!["esp32", "esp32", "esp32"]);
    assert_eq!(targets(&cases[1]), vec!["esp32s2", "esp32s2", "esp32s2"]);
    assert!(cases.iter().all(|c| c.rule() == ExpansionRule::MarkRepeated));
}

#[test]
fn test_mark_repeated_iterates_marks_then_declarations() {
    let cases = expand(
        "test_pair",
        &marks(&["esp32", "esp32s2"]),
        &[count_only(2), count_only(3)],
    )
    .unwrap();
    let lens: Vec<(String, usize)> = cases
        .iter()
        .map(|c| (c.targets().as_slice()[0].to_string(), c.targets().len()))
        .collect();
    assert_eq!(
        lens,
        vec![
            ("esp32".to_string(), 2),
            ("esp32".to_string(), 3),
            ("esp32s2".to_string(), 2),
            ("esp32s2".to_string(), 3),
        ]
    );
}

#[test]
fn test_nothing_declared_expands_to_nothing() {
    let cases = expand("test_host_only", &[], &[]).unwrap();
    assert!(cases.is_empty());
}

#[test]
fn test_mixed_declarations_are_ambiguous() {
    let err = expand(
        "test_mixed",
        &marks(&["esp32"]),
        &[explicit(2, "esp32|esp32s2"), count_only(2)],
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmbiguousDeclaration);
}

#[test]
fn test_spec_length_must_equal_count() {
    let err = expand("test_multi", &[], &[explicit(3, "esp32|esp32s2")]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeclarationLengthMismatch);
}

// ---
// Filtering
// ---

fn sample_cases() -> Vec<Case> {
    let mut cases = expand(
        "test_multi",
        &[],
        &[explicit(2, "esp32|esp32s2"), explicit(3, "a|a|b")],
    )
    .unwrap();
    cases.extend(expand("test_pair", &marks(&["esp32"]), &[count_only(2)]).unwrap());
    cases.extend(expand("test_single", &marks(&["esp32", "esp32s2"]), &[]).unwrap());
    cases
}

#[test]
fn test_all_returns_everything_in_order() {
    let cases = sample_cases();
    let selected = filter(&cases, &CollectionSelector::Mode(CollectMode::All));
    assert_eq!(selected, cases);
}

#[test]
fn test_multi_all_with_param_filters_by_provenance() {
    let selected = filter(&sample_cases(), &CollectMode::MultiAllWithParam.into());
    assert_eq!(selected.len(), 2);
    assert!(selected.iter().all(|c| c.name() == "test_multi"));
}

#[test]
fn test_selector_matches_multiset_not_order() {
    let selector = CollectionSelector::targets("b,a,a").unwrap();
    let selected = filter(&sample_cases(), &selector);
    assert_eq!(selected.len(), 1);
    assert_eq!(targets(&selected[0]), vec!["a", "a", "b"]);
}

#[test]
fn test_single_selector_only_matches_single_dut_cases() {
    let selector = CollectionSelector::targets("esp32").unwrap();
    let selected = filter(&sample_cases(), &selector);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].name(), "test_single");
    assert!(selected[0].is_single_dut());
}

#[test]
fn test_count_repeated_cases_match_explicit_selector() {
    let selector = CollectionSelector::targets("esp32, esp32").unwrap();
    let selected = filter(&sample_cases(), &selector);
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].name(), "test_pair");
}

#[test]
fn test_no_match_is_empty_not_error() {
    let selector = CollectionSelector::targets("esp32p4").unwrap();
    assert!(filter(&sample_cases(), &selector).is_empty());
}

#[test]
fn test_filter_is_idempotent() {
    let cases = sample_cases();
    for selector in [
        CollectionSelector::Mode(CollectMode::All),
        CollectionSelector::Mode(CollectMode::MultiAllWithParam),
        CollectionSelector::targets("esp32,esp32s2").unwrap(),
    ] {
        let once = filter(&cases, &selector);
        assert_eq!(filter(&cases, &selector), once);
        assert_eq!(filter(&once, &selector), once);
    }
}
