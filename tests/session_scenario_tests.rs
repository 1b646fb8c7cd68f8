use anyhow::Result;
use codesearch::error::SessionError;
use codesearch::grouping::{FileGroupState, reconcile, toggle};
use codesearch::highlight::{Highlight, highlight};
use codesearch::model::{SearchMatch, SearchQuery, SearchResultEntry};
use codesearch::search::FsSearchProvider;
use codesearch::session::{CopyOptions, SearchOutcome, SearchSession, SessionOptions, SessionStatus};
use codesearch::store::FileStore;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

use test_helpers::{MemoryClipboard, RecordingEditor, collaborators, create_project, entry};

#[test]
fn test_scenario_a_initial_expansion() {
    let results = vec![entry("a.ts", 12), entry("b.ts", 3)];
    let state = reconcile(&FileGroupState::new(), &results);

    assert!(!state.is_expanded("a.ts"));
    assert!(state.is_expanded("b.ts"));
}

#[test]
fn test_scenario_b_toggle_survives_noop_rerun() {
    let results = vec![entry("a.ts", 12), entry("b.ts", 3)];
    let state = reconcile(&FileGroupState::new(), &results);
    let state = toggle(&state, "a.ts");

    let rerun = reconcile(&state, &results);
    assert!(rerun.is_expanded("a.ts"));
    assert_eq!(rerun, reconcile(&rerun, &results));
}

#[test]
fn test_scenario_c_first_occurrence_highlight() {
    let m = SearchMatch::new(1, 1, "foo bar foo");
    assert_eq!(
        highlight(&m, "foo", false, false),
        Highlight {
            before: "",
            highlighted: "foo",
            after: " bar foo",
        }
    );
}

#[test]
#[serial]
fn test_scenario_d_save_then_clear() -> Result<()> {
    let dir = tempdir()?;
    create_project(dir.path())?;
    let editor = RecordingEditor::default();
    let clipboard = MemoryClipboard::default();

    let mut session = SearchSession::new(
        "tab-1",
        collaborators(FileStore::in_directory(dir.path().join("saved")), &editor, &clipboard),
    );
    session.run_search(
        &FsSearchProvider::new(dir.path()),
        SearchQuery::new("TODO").case_sensitive(true),
    )?;

    let saved = session.save()?.unwrap();
    assert_eq!(saved, dir.path().join("saved/todo.code-search"));
    assert!(!session.is_dirty());
    assert!(session.is_persisted());

    session.clear_results();
    assert!(session.is_dirty());
    assert!(session.is_persisted());
    Ok(())
}

#[test]
fn test_scenario_e_invalid_header_aborts_open() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("broken.code-search");
    fs::write(&path, "# Flags: RegExp\n\na.ts:\n  1,1: TODO\n")?;

    let result = SearchSession::open(
        "tab-2",
        &path,
        collaborators(
            FileStore::to_file(&path),
            &RecordingEditor::default(),
            &MemoryClipboard::default(),
        ),
        SessionOptions::default(),
    );
    assert!(matches!(result, Err(SessionError::Parse(_))));
    Ok(())
}

#[test]
#[serial]
fn test_search_save_open_round_trip_on_disk() -> Result<()> {
    let dir = tempdir()?;
    create_project(dir.path())?;
    let editor = RecordingEditor::default();
    let clipboard = MemoryClipboard::default();
    let provider = FsSearchProvider::new(dir.path());

    let mut session = SearchSession::new(
        "tab-1",
        collaborators(FileStore::in_directory(dir.path()), &editor, &clipboard),
    );
    let query = SearchQuery::new("todo").include("src/**");
    assert_eq!(session.run_search(&provider, query.clone())?, SearchOutcome::Applied);

    let files: Vec<&str> = session.results().iter().map(|e| e.file.as_str()).collect();
    assert_eq!(files, vec!["src/a.ts", "src/b.ts"]);
    assert_eq!(session.results()[0].match_count(), 12);
    assert_eq!(session.results()[1].match_count(), 3);
    assert!(!session.is_expanded("src/a.ts"));
    assert!(session.is_expanded("src/b.ts"));

    let path = session.save()?.unwrap();
    let reopened = SearchSession::open(
        "tab-2",
        &path,
        collaborators(FileStore::to_file(&path), &editor, &clipboard),
        SessionOptions::default(),
    )?;

    assert_eq!(reopened.status(), SessionStatus::Ready);
    assert!(reopened.query().is_equivalent(&query));
    assert_eq!(reopened.results(), session.results());
    assert_eq!(reopened.file_path(), Some(path.as_path()));
    assert!(!reopened.is_dirty());
    assert!(!reopened.is_expanded("src/a.ts"));
    Ok(())
}

#[test]
#[serial]
fn test_rerun_after_source_change_marks_dirty() -> Result<()> {
    let dir = tempdir()?;
    let saves = tempdir()?;
    create_project(dir.path())?;
    let editor = RecordingEditor::default();
    let clipboard = MemoryClipboard::default();
    let provider = FsSearchProvider::new(dir.path());

    let mut session = SearchSession::new(
        "tab-1",
        collaborators(FileStore::in_directory(saves.path()), &editor, &clipboard),
    );
    session.run_search(&provider, SearchQuery::new("TODO").case_sensitive(true))?;
    session.toggle_file("src/a.ts");
    session.save()?;

    fs::write(dir.path().join("notes.md"), "TODO: new note\n")?;
    session.rerun(&provider)?;

    assert!(session.is_dirty());
    assert!(session.is_expanded("src/a.ts"), "user toggle survives a re-run");
    assert!(session.is_expanded("notes.md"));
    assert_eq!(session.results().len(), 3);
    Ok(())
}

#[test]
fn test_copy_all_results_is_stable() -> Result<()> {
    let editor = RecordingEditor::default();
    let clipboard = MemoryClipboard::default();
    let mut session = SearchSession::new(
        "tab-1",
        collaborators(FileStore::in_directory("."), &editor, &clipboard),
    );

    let results = vec![entry("src/b.ts", 2), entry("src/a.ts", 1)];
    let options = CopyOptions::default();
    session.copy_all_results(&results, &options)?;
    session.copy_all_results(&results, &options)?;

    let written = clipboard.written.borrow();
    assert_eq!(written[0], written[1]);
    assert_eq!(
        written[0],
        "src/b.ts\n  1: // TODO step 1\n  2: // TODO step 2\n\nsrc/a.ts\n  1: // TODO step 1\n"
    );
    Ok(())
}

#[test]
fn test_clipboard_failure_is_non_fatal() {
    let editor = RecordingEditor::default();
    let clipboard = MemoryClipboard::default();
    *clipboard.fail.borrow_mut() = true;
    let mut session = SearchSession::new(
        "tab-1",
        collaborators(FileStore::in_directory("."), &editor, &clipboard),
    );

    let m = SearchMatch::new(1, 1, "x");
    assert!(matches!(
        session.copy_match(&m),
        Err(SessionError::Persistence { .. })
    ));
    assert!(!session.is_dirty());
    assert!(!session.is_persisted());
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[test]
fn test_open_file_is_pure_delegation() {
    let editor = RecordingEditor::default();
    let clipboard = MemoryClipboard::default();
    let mut session = SearchSession::new(
        "tab-1",
        collaborators(FileStore::in_directory("."), &editor, &clipboard),
    );

    session.open_file("src/a.ts", 3, Some(4));
    assert_eq!(
        *editor.opened.borrow(),
        vec![("src/a.ts".to_string(), 3, Some(4))]
    );
    assert!(!session.is_dirty());
}

#[test]
#[serial]
fn test_failed_save_keeps_flags() -> Result<()> {
    let dir = tempdir()?;
    // A regular file where the store expects a directory
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory")?;

    let mut session = SearchSession::new(
        "tab-1",
        collaborators(
            FileStore::in_directory(blocker.join("nested")),
            &RecordingEditor::default(),
            &MemoryClipboard::default(),
        ),
    );
    let ticket = session.begin_search(SearchQuery::new("TODO"));
    session.complete_search(ticket, vec![entry("a.ts", 1)]);

    assert!(matches!(
        session.save(),
        Err(SessionError::Persistence { operation: "save", .. })
    ));
    assert!(!session.is_persisted());
    assert!(!session.is_dirty());
    assert_eq!(session.file_path(), None);
    Ok(())
}

#[test]
#[serial]
fn test_saved_file_with_unusable_offsets_reopens() -> Result<()> {
    let dir = tempdir()?;
    let editor = RecordingEditor::default();
    let clipboard = MemoryClipboard::default();

    let mut session = SearchSession::new(
        "tab-1",
        collaborators(FileStore::in_directory(dir.path()), &editor, &clipboard),
    );
    let mut one_sided = SearchMatch::new(2, 1, "abc");
    one_sided.match_end = Some(2);
    let ticket = session.begin_search(SearchQuery::new("abc"));
    session.complete_search(
        ticket,
        vec![SearchResultEntry::new(
            "a.rs",
            vec![SearchMatch::new(1, 1, "abc").with_span(2, 1), one_sided],
        )],
    );

    let path = session.save()?.unwrap();
    let reopened = SearchSession::open(
        "tab-2",
        &path,
        collaborators(FileStore::to_file(&path), &editor, &clipboard),
        SessionOptions::default(),
    )?;

    let matches = &reopened.results()[0].matches;
    assert_eq!(matches.len(), 2);
    assert_eq!(
        highlight(&matches[0], "abc", false, false),
        highlight(&session.results()[0].matches[0], "abc", false, false)
    );
    assert!(matches.iter().all(|m| m.match_start.is_none() && m.match_end.is_none()));
    Ok(())
}
