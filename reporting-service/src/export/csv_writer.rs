use std::{
    fs, io,
    path::{Path, PathBuf},
};

use super::{Sheet, TabularWriter, Workbook};
use crate::error::ServiceError;

/// Writes a workbook as a directory holding one CSV file per sheet.
///
/// Every write stages into its own hidden temporary directory, which is moved
/// into place only once every sheet is on disk.
pub struct CsvWorkbookWriter {
    root: PathBuf,
}

fn io_error(action: &str, path: &Path, e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Store(format!("failed to {action} '{}': {e}", path.display()))
}

impl CsvWorkbookWriter {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    fn write_sheet(dir: &Path, sheet: &Sheet) -> Result<(), ServiceError> {
        let path = dir.join(format!("{}.csv", sheet.name));
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| io_error("create", &path, e))?;

        for row in &sheet.rows {
            let res = if row.is_empty() {
                wtr.write_record([""])
            } else {
                wtr.write_record(row.iter().map(|c| c.render()))
            };
            res.map_err(|e| io_error("write", &path, e))?;
        }

        wtr.flush().map_err(|e| io_error("flush", &path, e))
    }

    /// Create the first free directory of `name`, `name_1`, `name_2`, ...
    ///
    /// `create_dir` fails on an existing path, so concurrent writers never
    /// claim the same target.
    fn claim_target(&self, name: &str) -> Result<PathBuf, ServiceError> {
        let mut n = 0;
        loop {
            let target = match n {
                0 => self.root.join(name),
                n => self.root.join(format!("{name}_{n}")),
            };
            match fs::create_dir(&target) {
                Ok(()) => return Ok(target),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(io_error("create", &target, e)),
            }
        }
    }
}

impl TabularWriter for CsvWorkbookWriter {
    fn write(&self, workbook: &Workbook) -> Result<PathBuf, ServiceError> {
        fs::create_dir_all(&self.root).map_err(|e| io_error("create", &self.root, e))?;

        // Removed on drop unless it has been moved into place.
        let staging = tempfile::Builder::new()
            .prefix(".export-")
            .tempdir_in(&self.root)
            .map_err(|e| io_error("create staging directory in", &self.root, e))?;

        for sheet in &workbook.sheets {
            Self::write_sheet(staging.path(), sheet)?;
        }

        let target = self.claim_target(&workbook.name)?;
        // Renaming onto the freshly claimed, empty directory replaces it.
        if let Err(e) = fs::rename(staging.path(), &target) {
            if let Err(cleanup) = fs::remove_dir(&target) {
                tracing::warn!(
                    error = %cleanup,
                    path = %target.display(),
                    "failed to release export target"
                );
            }
            return Err(io_error("move workbook to", &target, e));
        }

        tracing::info!(
            path = %target.display(),
            sheets = workbook.sheets.len(),
            "workbook written"
        );
        Ok(target)
    }
}
