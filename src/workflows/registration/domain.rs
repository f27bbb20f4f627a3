//! Domain records for the registration workflow.
//!
//! One flat [`Person`] record carries the shared identity fields; the role
//! types (`Student`, `Parent`, `Teacher`) compose it alongside role-specific
//! attributes, and role invariants are validation methods rather than
//! overridable behavior.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::codes::{self, ClassCode};

/// A student may appear in at most this many distinct session groups.
pub const MAX_ENROLLMENTS: usize = 3;
/// A student submits at most two parent identity blocks.
pub const MAX_PARENTS: usize = 2;
/// A class is led by at most two teachers.
pub const MAX_TEACHERS_PER_CLASS: usize = 2;
/// A teacher leads at most this many classes.
pub const MAX_CLASSES_PER_TEACHER: usize = 3;

/// Stable student identifier, assigned once and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Stable parent identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParentId(pub String);

/// Stable teacher identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeacherId(pub String);

impl StudentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl ParentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl TeacherId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Shared identity fields. Names are stored trimmed; emails trimmed and
/// lowercased, so natural-key comparison is plain equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub first: String,
    pub last: String,
    pub email: Option<String>,
}

impl Person {
    pub fn new(first: &str, last: &str, email: Option<&str>) -> Self {
        let email = email
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());
        Self {
            first: first.trim().to_string(),
            last: last.trim().to_string(),
            email,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

/// A registering student: identity plus enrollment state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub person: Person,
    pub note: Option<String>,
    pub parents: Vec<ParentId>,
    pub classes: Vec<ClassCode>,
}

impl Student {
    pub fn new(person: Person, note: Option<String>) -> Self {
        Self {
            id: StudentId::generate(),
            person,
            note,
            parents: Vec::new(),
            classes: Vec::new(),
        }
    }

    /// Whether the student already holds a code session-equivalent to `raw`.
    pub fn holds_session_equivalent(&self, raw: &str) -> bool {
        self.classes
            .iter()
            .any(|held| codes::session_equivalent_raw(held.as_str(), raw))
    }

    /// Add a class from a new session group.
    ///
    /// The caller is expected to have skipped session-equivalent duplicates;
    /// a fourth distinct group indicates inconsistent upstream data and fails
    /// hard rather than silently dropping the code.
    pub fn enroll(&mut self, code: ClassCode) -> Result<(), EnrollmentLimitExceeded> {
        if self.classes.len() >= MAX_ENROLLMENTS {
            return Err(EnrollmentLimitExceeded {
                student: self.person.full_name(),
                attempted: code,
            });
        }
        self.classes.push(code);
        Ok(())
    }

    pub fn add_parent(&mut self, id: ParentId) -> Result<(), DomainError> {
        if self.parents.contains(&id) {
            return Ok(());
        }
        if self.parents.len() >= MAX_PARENTS {
            return Err(DomainError::TooManyParents {
                student: self.person.full_name(),
            });
        }
        self.parents.push(id);
        Ok(())
    }
}

/// A parent or guardian. `children` is a back-reference list, not ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
    pub id: ParentId,
    pub person: Person,
    pub children: Vec<StudentId>,
}

impl Parent {
    pub fn new(person: Person) -> Self {
        Self {
            id: ParentId::generate(),
            person,
            children: Vec::new(),
        }
    }
}

/// A teacher. `classes` is maintained by the run orchestrator and catalog
/// sync, not by the placement engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub person: Person,
    pub phone: String,
    pub classes: Vec<ClassCode>,
}

impl Teacher {
    pub fn new(person: Person, phone: &str) -> Self {
        Self {
            id: TeacherId::generate(),
            person,
            phone: phone.trim().to_string(),
            classes: Vec::new(),
        }
    }

    pub fn assign_class(&mut self, code: ClassCode) -> Result<(), DomainError> {
        if self.classes.contains(&code) {
            return Ok(());
        }
        if self.classes.len() >= MAX_CLASSES_PER_TEACHER {
            return Err(DomainError::TooManyClasses {
                teacher: self.person.full_name(),
            });
        }
        self.classes.push(code);
        Ok(())
    }
}

/// One class section as defined by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub code: ClassCode,
    pub location: String,
    pub capacity: usize,
    pub teachers: Vec<TeacherId>,
    pub students: Vec<StudentId>,
}

impl Class {
    pub fn new(code: ClassCode, location: &str, capacity: usize) -> Self {
        Self {
            code,
            location: location.trim().to_string(),
            capacity,
            teachers: Vec::new(),
            students: Vec::new(),
        }
    }

    pub fn add_teacher(&mut self, id: TeacherId) -> Result<(), DomainError> {
        if self.teachers.contains(&id) {
            return Ok(());
        }
        if self.teachers.len() >= MAX_TEACHERS_PER_CLASS {
            return Err(DomainError::TooManyTeachers {
                code: self.code.clone(),
            });
        }
        self.teachers.push(id);
        Ok(())
    }

    /// Seat a student, rejecting the insertion before any mutation if the
    /// class is at capacity.
    pub fn seat(&mut self, id: StudentId) -> Result<(), ClassFull> {
        if self.students.contains(&id) {
            return Ok(());
        }
        if self.students.len() >= self.capacity {
            return Err(ClassFull {
                code: self.code.clone(),
                capacity: self.capacity,
            });
        }
        self.students.push(id);
        Ok(())
    }
}

/// One registration form submission. Consumed once by the placement engine,
/// never persisted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormResponse {
    pub submitted_at: Option<NaiveDateTime>,
    pub student_first: String,
    pub student_last: String,
    pub student_email: Option<String>,
    pub note: Option<String>,
    pub parent1: ParentBlock,
    pub parent2: Option<ParentBlock>,
    /// Requested class codes, priority order. At most three.
    pub choices: Vec<String>,
}

/// Parent identity fields as captured on the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentBlock {
    pub first: String,
    pub last: String,
    pub email: String,
}

impl FormResponse {
    /// Duplicate-submission key: a family resubmitting the same form within
    /// a run is processed once.
    pub fn dedup_key(&self) -> (String, String, String, String) {
        (
            self.student_first.trim().to_string(),
            self.student_last.trim().to_string(),
            self.parent1.first.trim().to_string(),
            self.parent1.last.trim().to_string(),
        )
    }

    /// Notification recipients: every parent email on the form.
    pub fn recipients(&self) -> Vec<String> {
        let mut recipients = vec![self.parent1.email.trim().to_string()];
        if let Some(parent2) = &self.parent2 {
            let email = parent2.email.trim().to_string();
            if !email.is_empty() {
                recipients.push(email);
            }
        }
        recipients
    }
}

/// Hard per-student failure: a fourth distinct session group was attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("student {student} already holds {MAX_ENROLLMENTS} session groups; cannot add '{attempted}'")]
pub struct EnrollmentLimitExceeded {
    pub student: String,
    pub attempted: ClassCode,
}

/// Capacity invariant violation guard on [`Class::seat`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("class {code} is full ({capacity} seats)")]
pub struct ClassFull {
    pub code: ClassCode,
    pub capacity: usize,
}

/// Role-invariant violations.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("student {student} cannot have more than {MAX_PARENTS} parents")]
    TooManyParents { student: String },
    #[error("class {code} cannot have more than {MAX_TEACHERS_PER_CLASS} teachers")]
    TooManyTeachers { code: ClassCode },
    #[error("teacher {teacher} cannot lead more than {MAX_CLASSES_PER_TEACHER} classes")]
    TooManyClasses { teacher: String },
    #[error(transparent)]
    EnrollmentLimit(#[from] EnrollmentLimitExceeded),
    #[error(transparent)]
    ClassFull(#[from] ClassFull),
}
