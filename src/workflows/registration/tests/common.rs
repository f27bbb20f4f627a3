use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::storage::{Table, TableError};
use crate::workflows::registration::codes::ClassCode;
use crate::workflows::registration::domain::{Person, Student};
use crate::workflows::registration::notify::{NotificationKind, Notifier, NotifyError};
use crate::workflows::registration::roster::{ClassRoster, SeatRecord};
use crate::workflows::registration::{sheets, ParentId, StudentId};

/// In-memory [`Table`] double with spreadsheet-like append semantics.
#[derive(Default, Clone)]
pub(super) struct MemoryTable {
    sheets: Arc<Mutex<BTreeMap<String, Vec<Vec<String>>>>>,
}

impl MemoryTable {
    pub(super) fn seed(&self, sheet: &str, rows: Vec<Vec<String>>) {
        self.sheets
            .lock()
            .expect("table mutex poisoned")
            .insert(sheet.to_string(), rows);
    }

    pub(super) fn sheet(&self, sheet: &str) -> Vec<Vec<String>> {
        self.sheets
            .lock()
            .expect("table mutex poisoned")
            .get(sheet)
            .cloned()
            .unwrap_or_default()
    }

    pub(super) fn has_sheet(&self, sheet: &str) -> bool {
        self.sheets
            .lock()
            .expect("table mutex poisoned")
            .contains_key(sheet)
    }
}

impl Table for MemoryTable {
    fn read_all(&self, sheet: &str) -> Result<Vec<Vec<String>>, TableError> {
        self.sheets
            .lock()
            .expect("table mutex poisoned")
            .get(sheet)
            .cloned()
            .ok_or_else(|| TableError::MissingSheet(sheet.to_string()))
    }

    fn write_rows(
        &self,
        sheet: &str,
        rows: &[Vec<String>],
        start_index: usize,
    ) -> Result<(), TableError> {
        let mut guard = self.sheets.lock().expect("table mutex poisoned");
        let existing = guard.entry(sheet.to_string()).or_default();
        if existing.len() < start_index {
            existing.resize(start_index, Vec::new());
        }
        for (offset, row) in rows.iter().enumerate() {
            let index = start_index + offset;
            if index < existing.len() {
                existing[index] = row.clone();
            } else {
                existing.push(row.clone());
            }
        }
        Ok(())
    }

    fn batch_append(&self, sheet: &str, rows: &[Vec<String>]) -> Result<(), TableError> {
        let mut guard = self.sheets.lock().expect("table mutex poisoned");
        guard
            .entry(sheet.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(())
    }

    fn create_sheet(&self, sheet: &str, header: &[String]) -> Result<(), TableError> {
        let mut guard = self.sheets.lock().expect("table mutex poisoned");
        guard
            .entry(sheet.to_string())
            .or_insert_with(|| vec![header.to_vec()]);
        Ok(())
    }

    fn sheet_exists(&self, sheet: &str) -> Result<bool, TableError> {
        Ok(self
            .sheets
            .lock()
            .expect("table mutex poisoned")
            .contains_key(sheet))
    }
}

/// [`Table`] double that is permanently offline.
pub(super) struct UnavailableTable;

impl Table for UnavailableTable {
    fn read_all(&self, _sheet: &str) -> Result<Vec<Vec<String>>, TableError> {
        Err(TableError::Unavailable("ledger offline".to_string()))
    }

    fn write_rows(
        &self,
        _sheet: &str,
        _rows: &[Vec<String>],
        _start_index: usize,
    ) -> Result<(), TableError> {
        Err(TableError::Unavailable("ledger offline".to_string()))
    }

    fn batch_append(&self, _sheet: &str, _rows: &[Vec<String>]) -> Result<(), TableError> {
        Err(TableError::Unavailable("ledger offline".to_string()))
    }

    fn create_sheet(&self, _sheet: &str, _header: &[String]) -> Result<(), TableError> {
        Err(TableError::Unavailable("ledger offline".to_string()))
    }

    fn sheet_exists(&self, _sheet: &str) -> Result<bool, TableError> {
        Err(TableError::Unavailable("ledger offline".to_string()))
    }
}

/// Captured outbound notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SentNotification {
    pub(super) kind: NotificationKind,
    pub(super) recipients: Vec<String>,
    pub(super) student_name: String,
    pub(super) code: String,
}

/// [`Notifier`] double recording every send.
#[derive(Default, Clone)]
pub(super) struct RecordingNotifier {
    events: Arc<Mutex<Vec<SentNotification>>>,
}

impl RecordingNotifier {
    pub(super) fn events(&self) -> Vec<SentNotification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(
        &self,
        kind: NotificationKind,
        recipients: &[String],
        student_name: &str,
        code: &str,
    ) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(SentNotification {
                kind,
                recipients: recipients.to_vec(),
                student_name: student_name.to_string(),
                code: code.to_string(),
            });
        Ok(())
    }
}

pub(super) fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}

pub(super) fn code(raw: &str) -> ClassCode {
    ClassCode::parse(raw).expect("valid class code")
}

pub(super) fn draft(first: &str, last: &str) -> Student {
    Student::new(Person::new(first, last, None), None)
}

pub(super) fn seat(uuid: &str, first: &str, last: &str, parent1: Option<&str>) -> SeatRecord {
    SeatRecord {
        student_id: StudentId(uuid.to_string()),
        first: first.to_string(),
        last: last.to_string(),
        email: None,
        note: None,
        parent1: parent1.map(|id| ParentId(id.to_string())),
        parent2: None,
    }
}

pub(super) fn roster(raw: &str, capacity: usize, seats: Vec<SeatRecord>) -> ClassRoster {
    ClassRoster::new(code(raw), capacity, seats)
}

/// A minimal consistent ledger: two Python sections, one teacher, one
/// already-seated returning student with a persisted parent.
pub(super) fn seeded_ledger() -> MemoryTable {
    let table = MemoryTable::default();

    table.seed(
        sheets::TEACHERS,
        vec![
            row(&["UUID", "First Name", "Last Name", "Email", "Phone"]),
            row(&[
                "t-1",
                "Maya",
                "Chen",
                "maya.chen@example.org",
                "555-0101",
            ]),
        ],
    );

    table.seed(
        sheets::PARENTS,
        vec![
            row(&["UUID", "First Name", "Last Name", "Email"]),
            row(&["p-1", "Dana", "Reyes", "dana.reyes@example.org"]),
        ],
    );

    table.seed(
        sheets::CLASSES,
        vec![
            row(&[
                "Class Code",
                "Course",
                "Level",
                "Days",
                "Time",
                "Teacher 1 UUID",
                "Teacher 2 UUID",
                "Location",
                "Cap",
            ]),
            row(&[
                "21123",
                "Python",
                "Beginner",
                "Mon & Wed",
                "2-3 PM Pacific Time",
                "t-1",
                "",
                "Room A",
                "2",
            ]),
            row(&[
                "21224",
                "Python",
                "Intermediate",
                "Tue & Thur",
                "2-3 PM Pacific Time",
                "t-1",
                "",
                "Room B",
                "15",
            ]),
        ],
    );

    table.seed(
        "21123",
        vec![
            row(&sheets::ROSTER_HEADER),
            row(&[
                "1",
                "s-1",
                "Ivo",
                "Reyes",
                "",
                "",
                "p-1",
                "",
            ]),
        ],
    );
    table.seed("21224", vec![row(&sheets::ROSTER_HEADER)]);

    table
}

/// One form-responses sheet with the given data rows appended to the header.
pub(super) fn responses_sheet(data_rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut rows = vec![row(&[
        "Timestamp",
        "Student First",
        "Student Last",
        "Student Email",
        "Parent 1 First",
        "Parent 1 Last",
        "Parent 1 Email",
        "Parent 2 First",
        "Parent 2 Last",
        "Parent 2 Email",
        "Note",
        "Choice 1",
        "Choice 2",
        "Choice 3",
    ])];
    rows.extend(data_rows);
    rows
}

/// A response row for a brand-new student with one parent.
pub(super) fn response_row(
    first: &str,
    last: &str,
    parent_first: &str,
    parent_last: &str,
    parent_email: &str,
    choices: [&str; 3],
) -> Vec<String> {
    row(&[
        "1/15/2026 09:30:00",
        first,
        last,
        "",
        parent_first,
        parent_last,
        parent_email,
        "",
        "",
        "",
        "",
        choices[0],
        choices[1],
        choices[2],
    ])
}
