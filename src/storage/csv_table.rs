use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use super::{Table, TableError};

/// Directory-of-CSV-files implementation of [`Table`].
///
/// Each sheet maps to `<dir>/<sheet>.csv`. Rows are kept flexible: short rows
/// are preserved as-is rather than padded, mirroring how a spreadsheet range
/// read omits trailing empty cells.
#[derive(Debug, Clone)]
pub struct CsvTable {
    dir: PathBuf,
}

impl CsvTable {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{sheet}.csv"))
    }

    fn read_rows(path: &Path, sheet: &str) -> Result<Vec<Vec<String>>, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|err| TableError::Unavailable(err.to_string()))?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| TableError::Malformed {
                sheet: sheet.to_string(),
                detail: err.to_string(),
            })?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    fn write_all(&self, sheet: &str, rows: &[Vec<String>]) -> Result<(), TableError> {
        fs::create_dir_all(&self.dir).map_err(|err| TableError::Unavailable(err.to_string()))?;
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(self.sheet_path(sheet))
            .map_err(|err| TableError::Unavailable(err.to_string()))?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|err| TableError::Unavailable(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| TableError::Unavailable(err.to_string()))
    }
}

impl Table for CsvTable {
    fn read_all(&self, sheet: &str) -> Result<Vec<Vec<String>>, TableError> {
        let path = self.sheet_path(sheet);
        if !path.exists() {
            return Err(TableError::MissingSheet(sheet.to_string()));
        }
        Self::read_rows(&path, sheet)
    }

    fn write_rows(
        &self,
        sheet: &str,
        rows: &[Vec<String>],
        start_index: usize,
    ) -> Result<(), TableError> {
        let path = self.sheet_path(sheet);
        let mut existing = if path.exists() {
            Self::read_rows(&path, sheet)?
        } else {
            Vec::new()
        };

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

        self.write_all(sheet, &existing)
    }

    fn batch_append(&self, sheet: &str, rows: &[Vec<String>]) -> Result<(), TableError> {
        if rows.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir).map_err(|err| TableError::Unavailable(err.to_string()))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.sheet_path(sheet))
            .map_err(|err| TableError::Unavailable(err.to_string()))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        for row in rows {
            writer
                .write_record(row)
                .map_err(|err| TableError::Unavailable(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| TableError::Unavailable(err.to_string()))
    }

    fn create_sheet(&self, sheet: &str, header: &[String]) -> Result<(), TableError> {
        if self.sheet_path(sheet).exists() {
            return Ok(());
        }
        self.write_all(sheet, &[header.to_vec()])
    }

    fn sheet_exists(&self, sheet: &str) -> Result<bool, TableError> {
        Ok(self.sheet_path(sheet).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn scratch_dir(label: &str) -> PathBuf {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let suffix = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "classflow-csv-{label}-{}-{suffix}",
            std::process::id()
        ))
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    #[test]
    fn append_then_read_round_trips() {
        let dir = scratch_dir("append");
        let table = CsvTable::new(&dir);

        table
            .create_sheet("Parents", &row(&["uuid", "first", "last", "email"]))
            .expect("create sheet");
        table
            .batch_append(
                "Parents",
                &[row(&["p-1", "Dana", "Reyes", "dana@example.org"])],
            )
            .expect("append");

        let rows = table.read_all("Parents").expect("read");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], "Dana");

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_sheet_is_distinguished_from_io_failure() {
        let dir = scratch_dir("missing");
        let table = CsvTable::new(&dir);
        let err = table.read_all("Nope").expect_err("sheet absent");
        assert!(matches!(err, TableError::MissingSheet(name) if name == "Nope"));
    }

    #[test]
    fn write_rows_extends_and_overwrites() {
        let dir = scratch_dir("write");
        let table = CsvTable::new(&dir);

        table
            .create_sheet("Log", &row(&["name", "code"]))
            .expect("create");
        table
            .write_rows("Log", &[row(&["Ada Li", "21123"])], 1)
            .expect("write at 1");
        table
            .write_rows("Log", &[row(&["Ada Li", "21224"])], 1)
            .expect("overwrite at 1");

        let rows = table.read_all("Log").expect("read");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], row(&["Ada Li", "21224"]));

        fs::remove_dir_all(dir).ok();
    }
}
