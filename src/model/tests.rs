//! Tests for the model module.

use super::*;

#[test]
fn test_query_builder_normalizes_empty_globs() {
    let query = SearchQuery::new("TODO").include("").exclude("target/**");

    assert_eq!(query.include_pattern, None);
    assert_eq!(query.exclude_pattern.as_deref(), Some("target/**"));
}

#[test]
fn test_query_equivalence_ignores_empty_vs_absent() {
    let mut with_empty = SearchQuery::new("foo").regex(true);
    with_empty.include_pattern = Some(String::new());
    let without = SearchQuery::new("foo").regex(true);

    assert!(with_empty.is_equivalent(&without));
    assert_ne!(with_empty, without);

    let other = SearchQuery::new("foo").regex(true).whole_word(true);
    assert!(!other.is_equivalent(&without));
}

#[test]
fn test_span_explicit_when_offsets_valid() {
    let m = SearchMatch::new(3, 5, "let foo = 1;").with_span(4, 7);
    assert_eq!(m.span(), MatchSpan::Explicit { start: 4, end: 7 });

    // Equal offsets are still explicit; the highlighter decides what to do with them
    let empty = SearchMatch::new(3, 1, "abc").with_span(1, 1);
    assert_eq!(empty.span(), MatchSpan::Explicit { start: 1, end: 1 });
}

#[test]
fn test_span_derived_when_offsets_missing_or_invalid() {
    assert_eq!(SearchMatch::new(1, 1, "abc").span(), MatchSpan::Derived);

    let mut only_start = SearchMatch::new(1, 1, "abc");
    only_start.match_start = Some(1);
    assert_eq!(only_start.span(), MatchSpan::Derived);

    assert_eq!(
        SearchMatch::new(1, 1, "abc").with_span(2, 1).span(),
        MatchSpan::Derived
    );
    assert_eq!(
        SearchMatch::new(1, 1, "abc").with_span(0, 10).span(),
        MatchSpan::Derived
    );

    // "é" is two bytes; offset 1 splits it
    assert_eq!(
        SearchMatch::new(1, 1, "é").with_span(1, 2).span(),
        MatchSpan::Derived
    );
}

#[test]
fn test_total_matches() {
    let results = vec![
        SearchResultEntry::new("a.rs", vec![SearchMatch::new(1, 1, "a")]),
        SearchResultEntry::new(
            "b.rs",
            vec![SearchMatch::new(1, 1, "b"), SearchMatch::new(2, 1, "b")],
        ),
    ];
    assert_eq!(total_matches(&results), 3);
    assert_eq!(total_matches(&[]), 0);
}
