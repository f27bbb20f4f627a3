//! Row/column-oriented view of the external ledger.
//!
//! The run logic never talks to a spreadsheet API directly; it sees a set of
//! named sheets of string rows through [`Table`]. The header row is data like
//! any other row and sits at index 0.

mod csv_table;

pub use csv_table::CsvTable;

/// Abstract row-major table store backing one spreadsheet ledger.
///
/// `read_all` returns a consistent snapshot of a sheet; callers must not
/// assume writes become visible to `read_all` within the same run.
pub trait Table: Send + Sync {
    /// Every row of the named sheet, header row included at index 0.
    fn read_all(&self, sheet: &str) -> Result<Vec<Vec<String>>, TableError>;

    /// Overwrite rows starting at `start_index`, extending the sheet if needed.
    fn write_rows(
        &self,
        sheet: &str,
        rows: &[Vec<String>],
        start_index: usize,
    ) -> Result<(), TableError>;

    /// Append rows after the last existing row of the sheet.
    fn batch_append(&self, sheet: &str, rows: &[Vec<String>]) -> Result<(), TableError>;

    /// Create an empty sheet with the given header row. Existing sheets are
    /// left untouched.
    fn create_sheet(&self, sheet: &str, header: &[String]) -> Result<(), TableError>;

    fn sheet_exists(&self, sheet: &str) -> Result<bool, TableError>;
}

/// Storage failures surfaced to the run orchestrator. Any of these aborts the
/// run before the persisting phase.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("sheet '{0}' not found")]
    MissingSheet(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("malformed table data in sheet '{sheet}': {detail}")]
    Malformed { sheet: String, detail: String },
}
