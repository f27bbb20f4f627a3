//! Single-read-consistent view of all class occupancy for one allocation
//! pass.
//!
//! Rosters are loaded once per run in a bulk read. Seats consumed during the
//! pass are tracked as per-code batch offsets so later submissions in the
//! same batch see updated occupancy without a storage round-trip; because
//! offsets are applied strictly in submission order, no two submissions can
//! oversubscribe a class.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::codes::ClassCode;
use super::domain::{ParentId, StudentId};
use super::registry::IdentityRegistry;

/// One already-seated row from a roster table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatRecord {
    pub student_id: StudentId,
    pub first: String,
    pub last: String,
    pub email: Option<String>,
    pub note: Option<String>,
    pub parent1: Option<ParentId>,
    pub parent2: Option<ParentId>,
}

/// Roster state for one class code within the current pass.
#[derive(Debug, Clone)]
pub struct ClassRoster {
    code: ClassCode,
    capacity: usize,
    seats: Vec<SeatRecord>,
    /// Seats provisionally consumed by this pass, ahead of any flush.
    offset: usize,
}

impl ClassRoster {
    pub fn new(code: ClassCode, capacity: usize, seats: Vec<SeatRecord>) -> Self {
        Self {
            code,
            capacity,
            seats,
            offset: 0,
        }
    }

    pub fn code(&self) -> &ClassCode {
        &self.code
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn seats(&self) -> &[SeatRecord] {
        &self.seats
    }

    /// Already-listed count plus this batch's running offset.
    pub fn occupancy(&self) -> usize {
        self.seats.len() + self.offset
    }

    pub fn has_space(&self) -> bool {
        self.occupancy() < self.capacity
    }

    /// Consume one seat for the remainder of the pass.
    pub fn reserve(&mut self) {
        self.offset += 1;
    }

    /// Return a seat consumed by [`reserve`](Self::reserve) earlier in the
    /// pass, when the placement that held it is discarded.
    pub fn release(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }

    pub fn is_seated(&self, id: &StudentId) -> bool {
        self.seats.iter().any(|seat| &seat.student_id == id)
    }

    /// Natural-key search for a returning student: the student's own name
    /// must match a seat, corroborated by the linked parent-1 name resolved
    /// through the registry. Seats whose parent link cannot be resolved never
    /// match.
    pub fn find_returning(
        &self,
        first: &str,
        last: &str,
        parent1_first: &str,
        parent1_last: &str,
        registry: &IdentityRegistry,
    ) -> Option<&SeatRecord> {
        self.seats.iter().find(|seat| {
            if seat.first != first || seat.last != last {
                return false;
            }
            let Some(parent_id) = &seat.parent1 else {
                return false;
            };
            let Some(parent) = registry.parent(parent_id) else {
                return false;
            };
            parent.person.first == parent1_first && parent.person.last == parent1_last
        })
    }
}

/// All class rosters for one allocation pass, keyed by class code.
#[derive(Debug, Default)]
pub struct RosterSnapshot {
    rosters: BTreeMap<ClassCode, ClassRoster>,
}

impl RosterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, roster: ClassRoster) {
        self.rosters.insert(roster.code().clone(), roster);
    }

    /// Look up a roster by raw code text. Codes with no roster do not name a
    /// class and classify as invalid.
    pub fn get(&self, raw: &str) -> Option<&ClassRoster> {
        self.rosters.get(raw)
    }

    pub fn get_mut(&mut self, raw: &str) -> Option<&mut ClassRoster> {
        self.rosters.get_mut(raw)
    }

    pub fn codes(&self) -> impl Iterator<Item = &ClassCode> {
        self.rosters.keys()
    }

    pub fn len(&self) -> usize {
        self.rosters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rosters.is_empty()
    }
}
