//! Idempotent outcome notification.
//!
//! Every user-visible effect of a run flows through [`OutcomeNotifier`]. A
//! durable per-kind log of (student, recipients, code) triples guarantees a
//! family is notified at most once per distinct outcome, even when the whole
//! submission feed is replayed across restarts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Outcome categories with user-visible notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    Welcome,
    ClassFull,
    InvalidCode,
}

impl NotificationKind {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationKind::Welcome => "welcome",
            NotificationKind::ClassFull => "class_full",
            NotificationKind::InvalidCode => "invalid_code",
        }
    }

    /// Ledger sheet holding this kind's durable log.
    pub const fn sheet_name(self) -> &'static str {
        match self {
            NotificationKind::Welcome => super::sheets::WELCOME_LOG,
            NotificationKind::ClassFull => super::sheets::FULL_CLASS_LOG,
            NotificationKind::InvalidCode => super::sheets::INVALID_CODE_LOG,
        }
    }

    pub const fn all() -> [NotificationKind; 3] {
        [
            NotificationKind::Welcome,
            NotificationKind::ClassFull,
            NotificationKind::InvalidCode,
        ]
    }
}

/// Outbound dispatch seam. Implementations must treat sends as
/// fire-and-forget; delivery guarantees live in the log, not the transport.
pub trait Notifier: Send + Sync {
    fn send(
        &self,
        kind: NotificationKind,
        recipients: &[String],
        student_name: &str,
        code: &str,
    ) -> Result<(), NotifyError>;
}

/// Notification transport failure.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// One durable log entry recording a dispatched notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub student_name: String,
    pub parent1_email: String,
    pub parent2_email: String,
    pub code: String,
}

impl NotificationRecord {
    fn new(student_name: &str, recipients: &[String], code: &str) -> Self {
        Self {
            student_name: student_name.to_string(),
            parent1_email: recipients.first().cloned().unwrap_or_default(),
            parent2_email: recipients.get(1).cloned().unwrap_or_default(),
            code: code.to_string(),
        }
    }

    /// A logged entry suppresses a send when the student and code match and
    /// any logged recipient is among the current recipients.
    fn matches(&self, student_name: &str, recipients: &[String], code: &str) -> bool {
        if self.student_name != student_name || self.code != code {
            return false;
        }
        recipients
            .iter()
            .any(|recipient| recipient == &self.parent1_email || recipient == &self.parent2_email)
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.student_name.clone(),
            self.parent1_email.clone(),
            self.parent2_email.clone(),
            self.code.clone(),
        ]
    }
}

/// At-most-once notification dispatch over a [`Notifier`] transport.
///
/// Previously-sent triples are seeded from the per-kind log sheets at load
/// time; entries for sends fired during the pass are buffered and flushed to
/// the same sheets by the run orchestrator.
pub struct OutcomeNotifier<N> {
    transport: Arc<N>,
    sent: [Vec<NotificationRecord>; 3],
    pending: Vec<(NotificationKind, NotificationRecord)>,
}

impl<N: Notifier> OutcomeNotifier<N> {
    pub fn new(transport: Arc<N>) -> Self {
        Self {
            transport,
            sent: [Vec::new(), Vec::new(), Vec::new()],
            pending: Vec::new(),
        }
    }

    fn slot(kind: NotificationKind) -> usize {
        match kind {
            NotificationKind::Welcome => 0,
            NotificationKind::ClassFull => 1,
            NotificationKind::InvalidCode => 2,
        }
    }

    /// Seed the already-notified log for one kind from its ledger sheet.
    pub fn seed(&mut self, kind: NotificationKind, records: Vec<NotificationRecord>) {
        self.sent[Self::slot(kind)].extend(records);
    }

    /// Fire the underlying notification unless an identical outcome was
    /// already notified. Returns whether a send happened.
    pub fn notify_once(
        &mut self,
        kind: NotificationKind,
        recipients: &[String],
        student_name: &str,
        code: &str,
    ) -> Result<bool, NotifyError> {
        let already_sent = self.sent[Self::slot(kind)]
            .iter()
            .any(|record| record.matches(student_name, recipients, code));
        if already_sent {
            return Ok(false);
        }

        self.transport.send(kind, recipients, student_name, code)?;

        let record = NotificationRecord::new(student_name, recipients, code);
        self.sent[Self::slot(kind)].push(record.clone());
        self.pending.push((kind, record));
        Ok(true)
    }

    /// New log entries awaiting flush, in send order.
    pub fn pending(&self) -> &[(NotificationKind, NotificationRecord)] {
        &self.pending
    }

    pub fn drain_pending(&mut self) -> Vec<(NotificationKind, NotificationRecord)> {
        std::mem::take(&mut self.pending)
    }
}

/// Transport that reports sends through the process log. Stands in for the
/// SMTP adapter in environments without outbound mail.
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn send(
        &self,
        kind: NotificationKind,
        recipients: &[String],
        student_name: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            kind = kind.label(),
            student = student_name,
            code,
            recipients = recipients.join(", "),
            "notification dispatched"
        );
        Ok(())
    }
}
