//! The run orchestrator: one full reconciliation pass over the ledger.
//!
//! A run moves through `Loading → Resolving → Allocating → Notifying →
//! Persisting → Done` with no state skipped. Every mutation is buffered in
//! memory and flushed in the persisting phase, so a failure before that
//! point leaves external storage untouched; the caller retries the whole
//! run, which is safe because identity resolution and notification are both
//! idempotent.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::storage::{Table, TableError};

use super::codes::ClassCode;
use super::domain::{
    Class, FormResponse, Parent, ParentBlock, ParentId, Person, StudentId, Teacher, TeacherId,
};
use super::notify::{NotificationKind, NotificationRecord, Notifier, NotifyError, OutcomeNotifier};
use super::placement::{self, Placement};
use super::registry::IdentityRegistry;
use super::roster::{ClassRoster, RosterSnapshot, SeatRecord};
use super::sheets;

/// Progress through one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Loading,
    Resolving,
    Allocating,
    Notifying,
    Persisting,
    Done,
}

impl RunState {
    pub const fn label(self) -> &'static str {
        match self {
            RunState::Loading => "loading",
            RunState::Resolving => "resolving",
            RunState::Allocating => "allocating",
            RunState::Notifying => "notifying",
            RunState::Persisting => "persisting",
            RunState::Done => "done",
        }
    }
}

/// Failure that aborts the run. Nothing has been persisted unless the
/// failure occurred inside the persisting phase itself.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Storage(#[from] TableError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Operator-facing tallies for one completed run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub responses: usize,
    pub duplicates_skipped: usize,
    pub placements: usize,
    pub new_roster_rows: usize,
    pub full: usize,
    pub invalid: usize,
    pub limit_errors: usize,
    pub notifications_sent: usize,
}

/// Everything the notifying and persisting phases need about one processed
/// submission.
#[derive(Debug)]
struct StudentOutcome {
    student_id: StudentId,
    full_name: String,
    recipients: Vec<String>,
    placement: Placement,
    /// Accepted codes that are not an existing seat and therefore need a new
    /// roster row and a welcome notification.
    new_codes: Vec<ClassCode>,
}

pub struct RunOrchestrator<T, N> {
    table: Arc<T>,
    notifier: OutcomeNotifier<N>,
    default_capacity: usize,
    state: RunState,
    registry: IdentityRegistry,
    snapshot: RosterSnapshot,
    classes: BTreeMap<ClassCode, Class>,
    persisted_parents: HashSet<ParentId>,
    response_rows: Vec<Vec<String>>,
    resolved: Vec<(StudentId, FormResponse)>,
    outcomes: Vec<StudentOutcome>,
    summary: RunSummary,
}

impl<T, N> RunOrchestrator<T, N>
where
    T: Table,
    N: Notifier,
{
    pub fn new(table: Arc<T>, transport: Arc<N>, default_capacity: usize) -> Self {
        Self {
            table,
            notifier: OutcomeNotifier::new(transport),
            default_capacity,
            state: RunState::Loading,
            registry: IdentityRegistry::new(),
            snapshot: RosterSnapshot::new(),
            classes: BTreeMap::new(),
            persisted_parents: HashSet::new(),
            response_rows: Vec::new(),
            resolved: Vec::new(),
            outcomes: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    /// Drive the pass to completion. All-or-nothing up to the persisting
    /// phase; no mid-run resumption is supported.
    pub fn execute(mut self) -> Result<RunSummary, RunError> {
        self.load()?;
        self.resolve();
        self.allocate()?;
        self.notify_outcomes()?;
        self.persist()?;

        self.state = RunState::Done;
        info!(
            placements = self.summary.placements,
            new_rows = self.summary.new_roster_rows,
            full = self.summary.full,
            invalid = self.summary.invalid,
            notifications = self.summary.notifications_sent,
            "run complete"
        );
        Ok(self.summary)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn load(&mut self) -> Result<(), RunError> {
        self.state = RunState::Loading;

        self.load_teachers()?;
        self.load_parents()?;
        self.load_classes()?;
        self.load_rosters()?;
        self.load_notification_logs()?;

        self.response_rows = match self.table.read_all(sheets::FORM_RESPONSES) {
            Ok(rows) => rows,
            Err(TableError::MissingSheet(_)) => {
                warn!("form responses sheet missing; nothing to place");
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            classes = self.classes.len(),
            responses = self.response_rows.len().saturating_sub(1),
            "ledger snapshot loaded"
        );
        Ok(())
    }

    fn load_teachers(&mut self) -> Result<(), RunError> {
        let rows = match self.table.read_all(sheets::TEACHERS) {
            Ok(rows) => rows,
            Err(TableError::MissingSheet(_)) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        for row in rows.iter().skip(1) {
            if row.len() < 5 || cell(row, 0).is_empty() {
                continue;
            }
            let teacher = Teacher {
                id: TeacherId(cell(row, 0).to_string()),
                person: Person::new(cell(row, 1), cell(row, 2), Some(cell(row, 3))),
                phone: cell(row, 4).to_string(),
                classes: Vec::new(),
            };
            self.registry.seed_teacher(teacher);
        }
        Ok(())
    }

    fn load_parents(&mut self) -> Result<(), RunError> {
        let rows = match self.table.read_all(sheets::PARENTS) {
            Ok(rows) => rows,
            Err(TableError::MissingSheet(_)) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        for row in rows.iter().skip(1) {
            if row.len() < 3 || cell(row, 0).is_empty() {
                continue;
            }
            let parent = Parent {
                id: ParentId(cell(row, 0).to_string()),
                person: Person::new(cell(row, 1), cell(row, 2), Some(cell(row, 3))),
                children: Vec::new(),
            };
            self.persisted_parents.insert(parent.id.clone());
            self.registry.seed_parent(parent);
        }
        Ok(())
    }

    fn load_classes(&mut self) -> Result<(), RunError> {
        let rows = self.table.read_all(sheets::CLASSES)?;
        for row in rows.iter().skip(1) {
            let raw_code = cell(row, 0);
            if raw_code.is_empty() {
                continue;
            }
            let code = match ClassCode::parse(raw_code) {
                Ok(code) => code,
                Err(err) => {
                    warn!(code = raw_code, %err, "skipping class with unrecognized code");
                    continue;
                }
            };
            let capacity = cell(row, 8)
                .parse::<usize>()
                .ok()
                .filter(|cap| *cap > 0)
                .unwrap_or(self.default_capacity);

            let mut class = Class::new(code.clone(), cell(row, 7), capacity);
            for index in [5, 6] {
                let teacher_id = cell(row, index);
                if teacher_id.is_empty() {
                    continue;
                }
                let teacher_id = TeacherId(teacher_id.to_string());
                if let Err(err) = class.add_teacher(teacher_id.clone()) {
                    warn!(code = %code, %err, "class teacher list rejected");
                    continue;
                }
                match self.registry.teacher_mut(&teacher_id) {
                    Some(teacher) => {
                        if let Err(err) = teacher.assign_class(code.clone()) {
                            warn!(code = %code, %err, "teacher back-reference rejected");
                        }
                    }
                    None => warn!(code = %code, teacher = teacher_id.0, "class references unknown teacher"),
                }
            }
            self.classes.insert(code, class);
        }
        Ok(())
    }

    fn load_rosters(&mut self) -> Result<(), RunError> {
        for (code, class) in &self.classes {
            let rows = match self.table.read_all(code.as_str()) {
                Ok(rows) => rows,
                Err(TableError::MissingSheet(_)) => {
                    warn!(code = %code, "roster sheet missing; treating as empty");
                    Vec::new()
                }
                Err(err) => return Err(err.into()),
            };

            let mut seats = Vec::new();
            for row in rows.iter().skip(1) {
                if row.len() < 4 || cell(row, 1).is_empty() {
                    continue;
                }
                seats.push(SeatRecord {
                    student_id: StudentId(cell(row, 1).to_string()),
                    first: cell(row, 2).to_string(),
                    last: cell(row, 3).to_string(),
                    email: optional(cell(row, 4)),
                    note: optional(cell(row, 5)),
                    parent1: optional(cell(row, 6)).map(ParentId),
                    parent2: optional(cell(row, 7)).map(ParentId),
                });
            }
            self.snapshot
                .insert(ClassRoster::new(code.clone(), class.capacity, seats));
        }
        Ok(())
    }

    fn load_notification_logs(&mut self) -> Result<(), RunError> {
        for kind in NotificationKind::all() {
            let rows = match self.table.read_all(kind.sheet_name()) {
                Ok(rows) => rows,
                Err(TableError::MissingSheet(_)) => continue,
                Err(err) => return Err(err.into()),
            };
            let records = rows
                .iter()
                .skip(1)
                .filter(|row| !cell(row, 0).is_empty())
                .map(|row| NotificationRecord {
                    student_name: cell(row, 0).to_string(),
                    parent1_email: cell(row, 1).to_string(),
                    parent2_email: cell(row, 2).to_string(),
                    code: cell(row, 3).to_string(),
                })
                .collect();
            self.notifier.seed(kind, records);
        }
        Ok(())
    }

    /// Parse the response feed, suppress duplicate submissions, and resolve
    /// each remaining submission's student identity against the registry.
    fn resolve(&mut self) {
        self.state = RunState::Resolving;

        let rows = std::mem::take(&mut self.response_rows);
        let mut seen = HashSet::new();
        for row in rows.iter().skip(1) {
            let Some(response) = parse_response(row) else {
                continue;
            };
            self.summary.responses += 1;
            if !seen.insert(response.dedup_key()) {
                self.summary.duplicates_skipped += 1;
                continue;
            }
            let student_id = self.registry.resolve_student(
                &response.student_first,
                &response.student_last,
                response.student_email.as_deref(),
                response.note.as_deref(),
            );
            self.resolved.push((student_id, response));
        }
    }

    fn allocate(&mut self) -> Result<(), RunError> {
        self.state = RunState::Allocating;

        let resolved = std::mem::take(&mut self.resolved);
        for (student_id, response) in &resolved {
            let mut student = match self.registry.take_student(student_id) {
                Some(student) => student,
                None => {
                    // An earlier submission in this feed rebound the student
                    // to a pre-existing roster identifier; resolve again to
                    // find the entry it now lives under.
                    let rebound = self.registry.resolve_student(
                        &response.student_first,
                        &response.student_last,
                        response.student_email.as_deref(),
                        response.note.as_deref(),
                    );
                    match self.registry.take_student(&rebound) {
                        Some(student) => student,
                        None => continue,
                    }
                }
            };
            let full_name = student.person.full_name();

            let placed = placement::place(
                &mut student,
                response.parent1.first.trim(),
                response.parent1.last.trim(),
                &response.choices,
                &mut self.snapshot,
                &self.registry,
            );

            let final_id = student.id.clone();
            self.registry.restore_student(student);

            let placement = match placed {
                Ok(placement) => placement,
                Err(err) => {
                    warn!(student = full_name, %err, "enrollment limit exceeded; skipping student");
                    self.summary.limit_errors += 1;
                    continue;
                }
            };

            if !placement.accepted.is_empty() {
                self.link_parents(&final_id, response);
            }

            let new_codes = placement
                .accepted
                .iter()
                .filter(|code| {
                    self.snapshot
                        .get(code.as_str())
                        .is_some_and(|roster| !roster.is_seated(&final_id))
                })
                .cloned()
                .collect();

            self.summary.placements += placement.accepted.len();
            self.summary.full += placement.full.len();
            self.summary.invalid += placement.invalid.len();

            self.outcomes.push(StudentOutcome {
                student_id: final_id,
                full_name,
                recipients: response.recipients(),
                placement,
                new_codes,
            });
        }

        Ok(())
    }

    /// Attach the form's parent blocks to a placed student, resolving each
    /// parent through the registry so resubmissions reuse the same entity.
    fn link_parents(&mut self, student_id: &StudentId, response: &FormResponse) {
        let mut blocks = vec![&response.parent1];
        if let Some(parent2) = &response.parent2 {
            blocks.push(parent2);
        }

        for block in blocks {
            let ParentBlock { first, last, email } = block;
            if first.trim().is_empty() {
                continue;
            }
            let parent_id = self.registry.resolve_parent(first, last, email);
            if let Some(parent) = self.registry.parent_mut(&parent_id) {
                if !parent.children.contains(student_id) {
                    parent.children.push(student_id.clone());
                }
            }
            if let Some(student) = self.registry.student_mut(student_id) {
                if let Err(err) = student.add_parent(parent_id) {
                    warn!(student = student.person.full_name(), %err, "parent link rejected");
                }
            }
        }
    }

    fn notify_outcomes(&mut self) -> Result<(), RunError> {
        self.state = RunState::Notifying;

        for outcome in &self.outcomes {
            for code in &outcome.placement.invalid {
                if self.notifier.notify_once(
                    NotificationKind::InvalidCode,
                    &outcome.recipients,
                    &outcome.full_name,
                    code,
                )? {
                    self.summary.notifications_sent += 1;
                }
            }
            for code in &outcome.placement.full {
                if self.notifier.notify_once(
                    NotificationKind::ClassFull,
                    &outcome.recipients,
                    &outcome.full_name,
                    code.as_str(),
                )? {
                    self.summary.notifications_sent += 1;
                }
            }
            for code in &outcome.new_codes {
                if self.notifier.notify_once(
                    NotificationKind::Welcome,
                    &outcome.recipients,
                    &outcome.full_name,
                    code.as_str(),
                )? {
                    self.summary.notifications_sent += 1;
                }
            }
        }

        Ok(())
    }

    fn persist(&mut self) -> Result<(), RunError> {
        self.state = RunState::Persisting;

        self.flush_roster_rows()?;
        self.flush_parents()?;
        self.flush_notification_logs()?;

        Ok(())
    }

    /// One batch write per class roster, never per student.
    fn flush_roster_rows(&mut self) -> Result<(), RunError> {
        let mut per_class: BTreeMap<ClassCode, Vec<StudentId>> = BTreeMap::new();
        for outcome in &self.outcomes {
            for code in &outcome.new_codes {
                per_class
                    .entry(code.clone())
                    .or_default()
                    .push(outcome.student_id.clone());
            }
        }

        for (code, student_ids) in per_class {
            let base = self
                .snapshot
                .get(code.as_str())
                .map(|roster| roster.seats().len())
                .unwrap_or(0);

            let mut rows = Vec::with_capacity(student_ids.len());
            for (offset, student_id) in student_ids.iter().enumerate() {
                let Some(student) = self.registry.student(student_id) else {
                    continue;
                };
                rows.push(vec![
                    (base + offset + 1).to_string(),
                    student.id.0.clone(),
                    student.person.first.clone(),
                    student.person.last.clone(),
                    student.person.email.clone().unwrap_or_default(),
                    student.note.clone().unwrap_or_default(),
                    student.parents.first().map(|id| id.0.clone()).unwrap_or_default(),
                    student.parents.get(1).map(|id| id.0.clone()).unwrap_or_default(),
                ]);
            }

            self.summary.new_roster_rows += rows.len();
            self.table.batch_append(code.as_str(), &rows)?;
        }

        Ok(())
    }

    fn flush_parents(&mut self) -> Result<(), RunError> {
        let rows: Vec<Vec<String>> = self
            .registry
            .parents()
            .filter(|parent| !self.persisted_parents.contains(&parent.id))
            .filter(|parent| !parent.children.is_empty())
            .map(|parent| {
                vec![
                    parent.id.0.clone(),
                    parent.person.first.clone(),
                    parent.person.last.clone(),
                    parent.person.email.clone().unwrap_or_default(),
                ]
            })
            .collect();

        if rows.is_empty() {
            return Ok(());
        }
        if !self.table.sheet_exists(sheets::PARENTS)? {
            self.table
                .create_sheet(sheets::PARENTS, &header(&["UUID", "First Name", "Last Name", "Email"]))?;
        }
        self.table.batch_append(sheets::PARENTS, &rows)?;
        Ok(())
    }

    fn flush_notification_logs(&mut self) -> Result<(), RunError> {
        let mut per_kind: BTreeMap<&'static str, Vec<Vec<String>>> = BTreeMap::new();
        for (kind, record) in self.notifier.drain_pending() {
            per_kind
                .entry(kind.sheet_name())
                .or_default()
                .push(record.to_row());
        }

        for (sheet, rows) in per_kind {
            if !self.table.sheet_exists(sheet)? {
                self.table
                    .create_sheet(sheet, &header(&sheets::NOTIFICATION_LOG_HEADER))?;
            }
            self.table.batch_append(sheet, &rows)?;
        }
        Ok(())
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|value| value.trim()).unwrap_or("")
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn header(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

/// Parse one `Form Responses` row. Rows without a student name are noise
/// (trailing blanks, partial edits) and are skipped.
fn parse_response(row: &[String]) -> Option<FormResponse> {
    let student_first = cell(row, 1);
    let student_last = cell(row, 2);
    if student_first.is_empty() && student_last.is_empty() {
        return None;
    }

    let parent2 = {
        let first = cell(row, 7);
        if first.is_empty() {
            None
        } else {
            Some(ParentBlock {
                first: first.to_string(),
                last: cell(row, 8).to_string(),
                email: cell(row, 9).to_string(),
            })
        }
    };

    let choices = (11..14)
        .map(|index| cell(row, index).to_string())
        .filter(|choice| !choice.is_empty())
        .collect();

    Some(FormResponse {
        submitted_at: NaiveDateTime::parse_from_str(cell(row, 0), "%m/%d/%Y %H:%M:%S").ok(),
        student_first: student_first.to_string(),
        student_last: student_last.to_string(),
        student_email: optional(cell(row, 3)),
        note: optional(cell(row, 10)),
        parent1: ParentBlock {
            first: cell(row, 4).to_string(),
            last: cell(row, 5).to_string(),
            email: cell(row, 6).to_string(),
        },
        parent2,
        choices,
    })
}
