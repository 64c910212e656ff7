use pretty_assertions::assert_eq;
use wikiassist_engine::editing::{EditingMode, Notification, ReviewSession, SessionError};
use wikiassist_engine::models::{FeedbackStatus, IssueType, ReviewResponse, Severity};
use wikiassist_engine::render::html;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!(
        "{}/tests/fixtures/{name}",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap()
}

fn loaded_session() -> ReviewSession {
    let mut session = ReviewSession::from_markdown(&fixture("paris.md"));
    let response = ReviewResponse::from_json(&fixture("paris.review.json")).unwrap();
    session.load_review(response);
    session
}

#[test]
fn review_response_is_taken_in_with_lenient_fields() {
    let session = loaded_session();
    let records = session.feedback().records();

    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.status == FeedbackStatus::Pending));
    assert_eq!(records[0].issue_type, IssueType::Npov);
    assert_eq!(records[3].issue_type, IssueType::Style);
    assert_eq!(records[3].severity, Severity::Medium);
    assert_eq!(session.overview().unwrap().overall_score, 41);
}

#[test]
fn overlapping_record_is_skipped_but_stays_pending() {
    let session = loaded_session();
    let painted: Vec<_> = session.overlay().iter().map(|m| m.feedback_id).collect();
    let records = session.feedback().records();

    assert_eq!(painted, vec![records[0].id, records[1].id, records[2].id]);
    assert!(records[3].is_pending());
}

#[test]
fn markers_cover_the_reported_text() {
    let session = loaded_session();
    let flat = session.index().flat_text();
    for marker in session.overlay() {
        let record = session.feedback().get(marker.feedback_id).unwrap();
        let text: String = flat
            .chars()
            .skip(marker.flat.start)
            .take(marker.flat.len())
            .collect();
        assert_eq!(text, record.original_sentence);
    }
}

#[test]
fn repeated_refresh_paints_the_same_overlay() {
    let mut session = loaded_session();
    let before = session.overlay().to_vec();

    let diff = session.notify(wikiassist_engine::editing::SessionEvent::FeedbackSetChanged);

    assert!(diff.is_empty());
    assert_eq!(session.overlay(), before.as_slice());
}

#[test]
fn accepting_in_sequence_survives_shifted_offsets() {
    let mut session = loaded_session();
    let ids: Vec<_> = session.feedback().records().iter().map(|r| r.id).collect();

    session.accept(ids[0]).unwrap();
    // the second record's offsets are now two characters off; accept relocates by content
    let notification = session.accept(ids[1]).unwrap();
    assert!(matches!(notification, Notification::Accepted(ref r) if r.id == ids[1]));
    session.reject(ids[2]).unwrap();

    assert_eq!(
        session.document().text(),
        "Paris\n\
         Paris is the capital of France. It has a population of about 2.1 million (2023 census).\n\
         The city has many world famous museums, and everyone agrees it is the most romantic place on Earth.\n\
         The Louvre is the most visited museum.\n\
         Notre-Dame is a cathedral."
    );
    let summary = session.feedback().summary();
    assert_eq!((summary.pending, summary.accepted, summary.rejected), (1, 2, 1));
    assert!(session.index().is_current(session.document()));
}

#[test]
fn accept_across_formatting_replaces_every_run() {
    let mut session = loaded_session();
    let id = session.feedback().records()[3].id;

    session.accept(id).unwrap();

    assert!(session.markdown().contains("The city has many museums, and everyone agrees"));
    assert!(!session.markdown().contains("**"));
}

#[test]
fn resolved_records_are_refused() {
    let mut session = loaded_session();
    let id = session.feedback().records()[0].id;
    session.accept(id).unwrap();

    assert!(matches!(session.accept(id), Err(SessionError::NotPending(_))));
    assert_eq!(
        session.feedback().get(id).unwrap().status,
        FeedbackStatus::Accepted
    );
}

#[test]
fn html_rendering_wraps_marked_text() {
    let session = loaded_session();
    let first = session.feedback().records()[0].id;

    let rendered = html::render(session.document(), session.overlay());

    assert!(rendered.starts_with("<h1>Paris</h1><p>"));
    assert!(rendered.contains(&format!(
        "<mark class=\"highlight-high\" data-feedback-id=\"{first}\">Paris is obviously the best city.</mark>"
    )));
    assert!(rendered.contains("<strong>world famous</strong>"));
    assert_eq!(rendered.matches("<mark ").count(), 3);
}

#[test]
fn flattened_round_trip_preserves_structure() {
    let mut session = loaded_session();
    let before = session.document().clone();

    session.set_mode(EditingMode::Flattened);
    let markdown = session.markdown();
    assert!(markdown.starts_with("# Paris\n\n"));
    assert!(markdown.contains("**world famous**"));
    assert!(markdown.contains("- The Louvre is the most visited museum.\n- Notre-Dame"));
    assert!(session.overlay().is_empty());

    session.set_mode(EditingMode::Structured);
    assert_eq!(session.document(), &before);
    assert_eq!(session.overlay().len(), 3);
}
