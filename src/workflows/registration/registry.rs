//! Append-only identity registry.
//!
//! Natural-key resolution is what makes repeated runs idempotent: resolving
//! the same (first, last, email) twice returns the same identifier and never
//! creates a duplicate entity. Identity equality everywhere else is by
//! identifier; the natural key exists only to decide which identifier to
//! reuse.

use std::collections::BTreeMap;

use super::domain::{Parent, ParentId, Person, Student, StudentId, Teacher, TeacherId};

#[derive(Debug, Default)]
pub struct IdentityRegistry {
    students: BTreeMap<StudentId, Student>,
    parents: BTreeMap<ParentId, Parent>,
    teachers: BTreeMap<TeacherId, Teacher>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a student by natural key, creating an entry on first sight.
    pub fn resolve_student(
        &mut self,
        first: &str,
        last: &str,
        email: Option<&str>,
        note: Option<&str>,
    ) -> StudentId {
        let person = Person::new(first, last, email);
        if let Some(existing) = self
            .students
            .values()
            .find(|student| student.person == person)
        {
            return existing.id.clone();
        }

        let note = note
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let student = Student::new(person, note);
        let id = student.id.clone();
        self.students.insert(id.clone(), student);
        id
    }

    /// Resolve a parent by natural key, creating an entry on first sight.
    pub fn resolve_parent(&mut self, first: &str, last: &str, email: &str) -> ParentId {
        let person = Person::new(first, last, Some(email));
        if let Some(existing) = self.parents.values().find(|parent| parent.person == person) {
            return existing.id.clone();
        }

        let parent = Parent::new(person);
        let id = parent.id.clone();
        self.parents.insert(id.clone(), parent);
        id
    }

    /// Resolve a teacher by full name, email, and phone.
    pub fn resolve_teacher(&mut self, full_name: &str, email: &str, phone: &str) -> TeacherId {
        let phone = phone.trim();
        let email_normalized = email.trim().to_lowercase();
        if let Some(existing) = self.teachers.values().find(|teacher| {
            teacher.person.full_name().eq_ignore_ascii_case(full_name.trim())
                && teacher.person.email.as_deref().unwrap_or("") == email_normalized
                && teacher.phone == phone
        }) {
            return existing.id.clone();
        }

        // The catalog carries one name field; the final token is the surname.
        let trimmed = full_name.trim();
        let (first, last) = match trimmed.rsplit_once(' ') {
            Some((first, last)) => (first, last),
            None => (trimmed, ""),
        };
        let teacher = Teacher::new(Person::new(first, last, Some(email)), phone);
        let id = teacher.id.clone();
        self.teachers.insert(id.clone(), teacher);
        id
    }

    /// Seed a parent loaded from the ledger, preserving its identifier.
    pub fn seed_parent(&mut self, parent: Parent) {
        self.parents.insert(parent.id.clone(), parent);
    }

    /// Seed a teacher loaded from the ledger, preserving its identifier.
    pub fn seed_teacher(&mut self, teacher: Teacher) {
        self.teachers.insert(teacher.id.clone(), teacher);
    }

    /// Detach a student so the placement engine can mutate it while the
    /// registry is read for parent corroboration.
    pub fn take_student(&mut self, id: &StudentId) -> Option<Student> {
        self.students.remove(id)
    }

    /// Re-attach a student under its current identifier, which may have been
    /// rebound to a pre-existing roster identifier during placement.
    pub fn restore_student(&mut self, student: Student) {
        self.students.insert(student.id.clone(), student);
    }

    pub fn student(&self, id: &StudentId) -> Option<&Student> {
        self.students.get(id)
    }

    pub fn student_mut(&mut self, id: &StudentId) -> Option<&mut Student> {
        self.students.get_mut(id)
    }

    pub fn parent(&self, id: &ParentId) -> Option<&Parent> {
        self.parents.get(id)
    }

    pub fn parent_mut(&mut self, id: &ParentId) -> Option<&mut Parent> {
        self.parents.get_mut(id)
    }

    pub fn teacher(&self, id: &TeacherId) -> Option<&Teacher> {
        self.teachers.get(id)
    }

    pub fn teacher_mut(&mut self, id: &TeacherId) -> Option<&mut Teacher> {
        self.teachers.get_mut(id)
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }

    pub fn parents(&self) -> impl Iterator<Item = &Parent> {
        self.parents.values()
    }

    pub fn teachers(&self) -> impl Iterator<Item = &Teacher> {
        self.teachers.values()
    }
}
