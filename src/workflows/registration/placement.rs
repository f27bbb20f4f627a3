//! The placement allocation engine.
//!
//! One call places one submission: every requested code is classified in
//! priority order as accepted, full, or invalid, and the roster snapshot's
//! batch offsets are advanced so the next submission in the pass sees the
//! updated occupancy. The engine performs no I/O.

use serde::Serialize;

use super::codes::ClassCode;
use super::domain::{EnrollmentLimitExceeded, Student, StudentId};
use super::registry::IdentityRegistry;
use super::roster::RosterSnapshot;

/// Per-submission placement decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Codes the student now holds, in the order they were won.
    pub accepted: Vec<ClassCode>,
    /// Valid codes whose class had no open seat.
    pub full: Vec<ClassCode>,
    /// Requested codes naming no known class, as submitted.
    pub invalid: Vec<String>,
    /// Set when the student was recognized on an existing roster and rebound
    /// to their pre-existing identifier.
    pub reseated: Option<StudentId>,
}

/// Place one student against the roster snapshot, honoring choice priority.
///
/// Choices are processed strictly in the order given: the first choice has
/// first claim on the last open seat, and a later choice can still succeed
/// on a different class after an earlier one failed. A returning student
/// found on a roster by natural key is re-accepted regardless of occupancy —
/// existing members are never bumped.
///
/// The only hard failure is [`EnrollmentLimitExceeded`]; it halts processing
/// of the student's remaining choices and is propagated to the caller. The
/// caller discards the partial placement, so before returning the error every
/// effect of this call is rolled back: enrolled codes, an identifier rebind,
/// and any offsets reserved by earlier acceptances in the same submission.
pub fn place(
    student: &mut Student,
    parent1_first: &str,
    parent1_last: &str,
    choices: &[String],
    snapshot: &mut RosterSnapshot,
    registry: &IdentityRegistry,
) -> Result<Placement, EnrollmentLimitExceeded> {
    let mut placement = Placement::default();
    let original_id = student.id.clone();
    let held_before = student.classes.len();
    let mut reserved: Vec<ClassCode> = Vec::new();

    for raw in choices {
        let requested = raw.trim();
        if requested.is_empty() {
            continue;
        }

        // No duplicate session enrollment: not a rejection, just skipped.
        if student.holds_session_equivalent(requested) {
            continue;
        }

        let (code, returning, open) = match snapshot.get(requested) {
            Some(roster) => (
                roster.code().clone(),
                roster
                    .find_returning(
                        &student.person.first,
                        &student.person.last,
                        parent1_first,
                        parent1_last,
                        registry,
                    )
                    .map(|seat| seat.student_id.clone()),
                roster.has_space(),
            ),
            None => {
                placement.invalid.push(requested.to_string());
                continue;
            }
        };

        match returning {
            Some(existing_id) => {
                // Re-affirming an existing seat never fails and consumes no
                // offset; the student keeps their pre-existing identifier.
                if let Err(err) = student.enroll(code.clone()) {
                    unwind(student, held_before, &original_id, &reserved, snapshot);
                    return Err(err);
                }
                student.id = existing_id.clone();
                placement.reseated = Some(existing_id);
                placement.accepted.push(code);
            }
            None if open => {
                if let Err(err) = student.enroll(code.clone()) {
                    unwind(student, held_before, &original_id, &reserved, snapshot);
                    return Err(err);
                }
                if let Some(roster) = snapshot.get_mut(code.as_str()) {
                    roster.reserve();
                }
                reserved.push(code.clone());
                placement.accepted.push(code);
            }
            None => placement.full.push(code),
        }
    }

    Ok(placement)
}

/// Put the student and snapshot back the way the call found them.
fn unwind(
    student: &mut Student,
    held_before: usize,
    original_id: &StudentId,
    reserved: &[ClassCode],
    snapshot: &mut RosterSnapshot,
) {
    student.classes.truncate(held_before);
    student.id = original_id.clone();
    for code in reserved {
        if let Some(roster) = snapshot.get_mut(code.as_str()) {
            roster.release();
        }
    }
}
