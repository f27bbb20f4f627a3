use std::sync::Arc;

use super::common::RecordingNotifier;
use crate::workflows::registration::notify::{
    NotificationKind, NotificationRecord, OutcomeNotifier,
};

fn recipients(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn record(student: &str, parent1: &str, parent2: &str, code: &str) -> NotificationRecord {
    NotificationRecord {
        student_name: student.to_string(),
        parent1_email: parent1.to_string(),
        parent2_email: parent2.to_string(),
        code: code.to_string(),
    }
}

#[test]
fn an_identical_outcome_is_sent_once() {
    let transport = Arc::new(RecordingNotifier::default());
    let mut notifier = OutcomeNotifier::new(Arc::clone(&transport));
    let to = recipients(&["ana.kim@example.org"]);

    let first = notifier
        .notify_once(NotificationKind::Welcome, &to, "Noa Kim", "21123")
        .expect("send succeeds");
    let second = notifier
        .notify_once(NotificationKind::Welcome, &to, "Noa Kim", "21123")
        .expect("send succeeds");

    assert!(first);
    assert!(!second);
    assert_eq!(transport.events().len(), 1);
    assert_eq!(notifier.pending().len(), 1);
}

#[test]
fn seeded_log_entries_suppress_resends() {
    let transport = Arc::new(RecordingNotifier::default());
    let mut notifier = OutcomeNotifier::new(Arc::clone(&transport));
    notifier.seed(
        NotificationKind::Welcome,
        vec![record("Noa Kim", "ana.kim@example.org", "", "21123")],
    );

    let sent = notifier
        .notify_once(
            NotificationKind::Welcome,
            &recipients(&["ana.kim@example.org"]),
            "Noa Kim",
            "21123",
        )
        .expect("send succeeds");

    assert!(!sent);
    assert!(transport.events().is_empty());
    assert!(notifier.pending().is_empty());
}

#[test]
fn kinds_are_logged_independently() {
    let transport = Arc::new(RecordingNotifier::default());
    let mut notifier = OutcomeNotifier::new(Arc::clone(&transport));
    let to = recipients(&["ana.kim@example.org"]);

    assert!(notifier
        .notify_once(NotificationKind::ClassFull, &to, "Noa Kim", "21123")
        .expect("send succeeds"));
    assert!(notifier
        .notify_once(NotificationKind::Welcome, &to, "Noa Kim", "21123")
        .expect("send succeeds"));

    let events = transport.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, NotificationKind::ClassFull);
    assert_eq!(events[1].kind, NotificationKind::Welcome);
}

#[test]
fn any_shared_recipient_counts_as_already_notified() {
    let transport = Arc::new(RecordingNotifier::default());
    let mut notifier = OutcomeNotifier::new(Arc::clone(&transport));
    notifier.seed(
        NotificationKind::ClassFull,
        vec![record("Noa Kim", "ana.kim@example.org", "", "21123")],
    );

    // The second parent is new, but parent one already heard about this.
    let overlapping = notifier
        .notify_once(
            NotificationKind::ClassFull,
            &recipients(&["lee.kim@example.org", "ana.kim@example.org"]),
            "Noa Kim",
            "21123",
        )
        .expect("send succeeds");
    assert!(!overlapping);

    // A fully different family contact for the same name and code does send.
    let disjoint = notifier
        .notify_once(
            NotificationKind::ClassFull,
            &recipients(&["other@example.org"]),
            "Noa Kim",
            "21123",
        )
        .expect("send succeeds");
    assert!(disjoint);
    assert_eq!(transport.events().len(), 1);
}

#[test]
fn drain_pending_empties_the_flush_buffer() {
    let transport = Arc::new(RecordingNotifier::default());
    let mut notifier = OutcomeNotifier::new(transport);
    let to = recipients(&["ana.kim@example.org"]);

    notifier
        .notify_once(NotificationKind::InvalidCode, &to, "Noa Kim", "99999")
        .expect("send succeeds");

    let drained = notifier.drain_pending();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].0, NotificationKind::InvalidCode);
    assert_eq!(
        drained[0].1.to_row(),
        vec!["Noa Kim", "ana.kim@example.org", "", "99999"]
    );
    assert!(notifier.pending().is_empty());

    // Drained entries stay in the sent log.
    let resent = notifier
        .notify_once(NotificationKind::InvalidCode, &to, "Noa Kim", "99999")
        .expect("send succeeds");
    assert!(!resent);
}
