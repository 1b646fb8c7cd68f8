//! Tests for the grouping module.

use super::*;

fn entry(file: &str, count: u64) -> SearchResultEntry {
    let matches = (1..=count)
        .map(|line| SearchMatch::new(line, 1, format!("TODO {}", line)))
        .collect();
    SearchResultEntry::new(file, matches)
}

#[test]
fn test_reconcile_defaults_by_match_count() {
    let results = vec![entry("a.ts", 12), entry("b.ts", 3), entry("c.ts", 10)];
    let state = reconcile(&FileGroupState::new(), &results);

    assert!(!state.is_expanded("a.ts"));
    assert!(state.is_expanded("b.ts"));
    assert!(state.is_expanded("c.ts"), "exactly 10 matches stays expanded");
    assert_eq!(state.len(), 3);
}

#[test]
fn test_reconcile_keeps_previous_decisions() {
    let results = vec![entry("a.ts", 12), entry("b.ts", 3)];
    let initial = reconcile(&FileGroupState::new(), &results);
    let toggled = toggle(&toggle(&initial, "a.ts"), "b.ts");

    let rerun = reconcile(&toggled, &results);
    assert!(rerun.is_expanded("a.ts"));
    assert!(!rerun.is_expanded("b.ts"));
}

#[test]
fn test_reconcile_is_idempotent() {
    let results = vec![entry("a.ts", 12), entry("b.ts", 3), entry("c.ts", 40)];
    let seeded = toggle(&FileGroupState::new(), "c.ts");

    let once = reconcile(&seeded, &results);
    let twice = reconcile(&once, &results);
    assert_eq!(once, twice);
}

#[test]
fn test_reconcile_drops_missing_files() {
    let state = reconcile(&FileGroupState::new(), &[entry("old.ts", 1)]);
    assert!(state.is_expanded("old.ts"));

    let state = reconcile(&state, &[entry("new.ts", 2)]);
    assert!(!state.is_expanded("old.ts"));
    assert_eq!(state.get("old.ts"), None);
    assert_eq!(state.len(), 1);
}

#[test]
fn test_reconcile_with_custom_threshold() {
    let state = reconcile_with_threshold(&FileGroupState::new(), &[entry("a.ts", 3)], 2);
    assert!(!state.is_expanded("a.ts"));
}

#[test]
fn test_toggle_flips_exactly_one_file() {
    let state = expand_all(["a.ts", "b.ts", "c.ts"]);
    let next = toggle(&state, "b.ts");

    assert!(next.is_expanded("a.ts"));
    assert!(!next.is_expanded("b.ts"));
    assert!(next.is_expanded("c.ts"));
    // The input is left untouched
    assert!(state.is_expanded("b.ts"));

    // Unknown files count as collapsed
    let unknown = toggle(&FileGroupState::new(), "d.ts");
    assert!(unknown.is_expanded("d.ts"));
}

#[test]
fn test_expand_and_collapse_all() {
    let files = vec!["a.ts".to_string(), "b.ts".to_string()];

    let expanded = expand_all(&files);
    assert!(files.iter().all(|f| expanded.is_expanded(f)));

    let collapsed = collapse_all(&files);
    assert!(files.iter().all(|f| !collapsed.is_expanded(f)));
    assert_eq!(collapsed.len(), 2);
}

#[test]
fn test_group_matches_preserves_first_seen_order() {
    let flat = vec![
        ("b.rs", SearchMatch::new(7, 1, "b7")),
        ("a.rs", SearchMatch::new(2, 1, "a2")),
        ("b.rs", SearchMatch::new(3, 4, "b3")),
        ("a.rs", SearchMatch::new(1, 1, "a1")),
    ];
    let grouped = group_matches(flat);

    let files: Vec<&str> = grouped.iter().map(|e| e.file.as_str()).collect();
    assert_eq!(files, vec!["b.rs", "a.rs"]);

    let b_lines: Vec<u64> = grouped[0].matches.iter().map(|m| m.line).collect();
    assert_eq!(b_lines, vec![3, 7]);
    let a_lines: Vec<u64> = grouped[1].matches.iter().map(|m| m.line).collect();
    assert_eq!(a_lines, vec![1, 2]);
}

#[test]
fn test_normalize_entries_merges_and_drops_empty() {
    let entries = vec![
        entry("a.rs", 2),
        SearchResultEntry::new("empty.rs", Vec::new()),
        entry("b.rs", 1),
        SearchResultEntry::new("a.rs", vec![SearchMatch::new(9, 2, "later")]),
    ];
    let normalized = normalize_entries(entries);

    let files: Vec<&str> = normalized.iter().map(|e| e.file.as_str()).collect();
    assert_eq!(files, vec!["a.rs", "b.rs"]);
    assert_eq!(normalized[0].match_count(), 3);
    assert_eq!(normalized[0].matches[2].text, "later");
}
