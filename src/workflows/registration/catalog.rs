//! Class-catalog sync: imports new class definitions and their teachers from
//! the upstream catalog sheet into the ledger.
//!
//! Existing classes are never updated; the sync only adds classes whose code
//! is not yet on the `Classes` sheet, creating an empty roster sheet for
//! each. Rows with a code that fails to decode are skipped with a warning
//! and the run proceeds with the remaining classes.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::storage::{Table, TableError};

use super::codes::ClassCode;
use super::domain::{Person, Teacher, TeacherId};
use super::registry::IdentityRegistry;
use super::sheets;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Storage(#[from] TableError),
}

/// Tallies for one catalog sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogReport {
    pub classes_added: usize,
    pub teachers_added: usize,
    /// Catalog codes skipped because they failed to decode.
    pub skipped: Vec<String>,
}

pub struct CatalogSync<T> {
    table: Arc<T>,
    default_capacity: usize,
}

impl<T: Table> CatalogSync<T> {
    pub fn new(table: Arc<T>, default_capacity: usize) -> Self {
        Self {
            table,
            default_capacity,
        }
    }

    pub fn sync(&self) -> Result<CatalogReport, CatalogError> {
        let mut report = CatalogReport::default();

        let catalog_rows = match self.table.read_all(sheets::CLASS_CATALOG) {
            Ok(rows) => rows,
            Err(TableError::MissingSheet(_)) => {
                warn!("class catalog sheet missing; nothing to import");
                return Ok(report);
            }
            Err(err) => return Err(err.into()),
        };

        let mut registry = IdentityRegistry::new();
        let persisted_teachers = self.seed_teachers(&mut registry)?;
        let existing_codes = self.existing_codes()?;

        let mut class_rows = Vec::new();
        let mut new_roster_sheets = Vec::new();

        for row in catalog_rows.iter().skip(1) {
            let raw_code = cell(row, 0);
            if raw_code.is_empty() || existing_codes.contains(raw_code) {
                continue;
            }

            let code = match ClassCode::parse(raw_code) {
                Ok(code) => code,
                Err(err) => {
                    warn!(code = raw_code, %err, "skipping catalog row with unrecognized code");
                    report.skipped.push(raw_code.to_string());
                    continue;
                }
            };
            let schedule = code.schedule();

            let teacher1 = self.resolve_block(&mut registry, row, 1);
            let teacher2 = self.resolve_block(&mut registry, row, 4);

            let capacity = cell(row, 8)
                .parse::<usize>()
                .ok()
                .filter(|cap| *cap > 0)
                .unwrap_or(self.default_capacity);

            class_rows.push(vec![
                code.as_str().to_string(),
                schedule.course.to_string(),
                schedule.level.to_string(),
                schedule.days.to_string(),
                schedule.time.to_string(),
                teacher1.map(|id| id.0).unwrap_or_default(),
                teacher2.map(|id| id.0).unwrap_or_default(),
                cell(row, 7).to_string(),
                capacity.to_string(),
            ]);
            new_roster_sheets.push(code);
        }

        let teacher_rows: Vec<Vec<String>> = registry
            .teachers()
            .filter(|teacher| !persisted_teachers.contains(&teacher.id))
            .map(|teacher| {
                vec![
                    teacher.id.0.clone(),
                    teacher.person.first.clone(),
                    teacher.person.last.clone(),
                    teacher.person.email.clone().unwrap_or_default(),
                    teacher.phone.clone(),
                ]
            })
            .collect();

        report.classes_added = class_rows.len();
        report.teachers_added = teacher_rows.len();

        if !class_rows.is_empty() {
            if !self.table.sheet_exists(sheets::CLASSES)? {
                self.table.create_sheet(
                    sheets::CLASSES,
                    &header(&[
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
                )?;
            }
            self.table.batch_append(sheets::CLASSES, &class_rows)?;
        }

        if !teacher_rows.is_empty() {
            if !self.table.sheet_exists(sheets::TEACHERS)? {
                self.table.create_sheet(
                    sheets::TEACHERS,
                    &header(&["UUID", "First Name", "Last Name", "Email", "Phone"]),
                )?;
            }
            self.table.batch_append(sheets::TEACHERS, &teacher_rows)?;
        }

        for code in &new_roster_sheets {
            self.table
                .create_sheet(code.as_str(), &header(&sheets::ROSTER_HEADER))?;
        }

        info!(
            classes = report.classes_added,
            teachers = report.teachers_added,
            skipped = report.skipped.len(),
            "catalog sync complete"
        );
        Ok(report)
    }

    fn seed_teachers(
        &self,
        registry: &mut IdentityRegistry,
    ) -> Result<HashSet<TeacherId>, CatalogError> {
        let mut persisted = HashSet::new();
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
            persisted.insert(teacher.id.clone());
            registry.seed_teacher(teacher);
        }
        Ok(persisted)
    }

    fn existing_codes(&self) -> Result<HashSet<String>, CatalogError> {
        let rows = match self.table.read_all(sheets::CLASSES) {
            Ok(rows) => rows,
            Err(TableError::MissingSheet(_)) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(rows
            .iter()
            .skip(1)
            .map(|row| cell(row, 0).to_string())
            .filter(|code| !code.is_empty())
            .collect())
    }

    /// Resolve one teacher block (name, email, phone) starting at `start`.
    fn resolve_block(
        &self,
        registry: &mut IdentityRegistry,
        row: &[String],
        start: usize,
    ) -> Option<TeacherId> {
        let name = cell(row, start);
        if name.is_empty() {
            return None;
        }
        Some(registry.resolve_teacher(name, cell(row, start + 1), cell(row, start + 2)))
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|value| value.trim()).unwrap_or("")
}

fn header(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}
