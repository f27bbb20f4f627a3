//! Class-registration reconciliation: code decoding, identity resolution,
//! capacity-respecting placement, idempotent notification, and the run
//! orchestrator that drives one full pass over the ledger.

pub mod catalog;
pub mod codes;
pub mod domain;
pub mod notify;
pub mod orchestrator;
pub mod placement;
pub mod registry;
pub mod roster;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, CatalogReport, CatalogSync};
pub use codes::{decode, ClassCode, ClassSchedule, UnknownCode};
pub use domain::{
    Class, ClassFull, DomainError, EnrollmentLimitExceeded, FormResponse, Parent, ParentBlock,
    ParentId, Person, Student, StudentId, Teacher, TeacherId,
};
pub use notify::{NotificationKind, NotificationRecord, Notifier, NotifyError, OutcomeNotifier};
pub use orchestrator::{RunError, RunOrchestrator, RunState, RunSummary};
pub use placement::{place, Placement};
pub use registry::IdentityRegistry;
pub use roster::{ClassRoster, RosterSnapshot, SeatRecord};

/// Sheet names of the persisted ledger layout.
pub mod sheets {
    pub const CLASSES: &str = "Classes";
    pub const TEACHERS: &str = "Teachers";
    pub const PARENTS: &str = "Parents";
    pub const FORM_RESPONSES: &str = "Form Responses";
    pub const CLASS_CATALOG: &str = "Class Catalog";
    pub const INVALID_CODE_LOG: &str = "Invalid Code Emails";
    pub const FULL_CLASS_LOG: &str = "Full Class Emails";
    pub const WELCOME_LOG: &str = "Welcome Emails";

    /// Header row written to each per-class roster sheet.
    pub const ROSTER_HEADER: [&str; 8] = [
        "#",
        "UUID",
        "First Name",
        "Last Name",
        "Email",
        "Note",
        "Parent 1 UUID",
        "Parent 2 UUID",
    ];

    /// Header row for the per-kind notification log sheets.
    pub const NOTIFICATION_LOG_HEADER: [&str; 4] =
        ["Student", "Parent 1 Email", "Parent 2 Email", "Class Code"];
}
