//! Concatenation of exported workbooks into one combined dataset.
//!
//! Every export from the site carries two sheets: the first holds the
//! data records, the second the per-record logs. Files that do not match
//! that shape are skipped with a warning; they never abort the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use calamine::{Data, Range, Reader, open_workbook_auto};
use tracing::{info, warn};

use harvester_shared::{HarvestError, Result};

use crate::table::Table;

/// The concatenated contents of all qualifying export files.
#[derive(Debug, Clone, Default)]
pub struct CombinedDataset {
    /// First-sheet rows across all files, in input order.
    pub data: Table,
    /// Second-sheet rows across all files, in input order.
    pub logs: Table,
}

/// Summary of a completed combine operation.
#[derive(Debug, Clone, Default)]
pub struct CombineSummary {
    /// Files whose sheets contributed to the combined dataset.
    pub files_combined: usize,
    /// Files skipped, with reasons (too few sheets, unreadable).
    pub files_skipped: Vec<(PathBuf, String)>,
    /// Rows in the combined data sheet.
    pub data_rows: usize,
    /// Rows in the combined logs sheet.
    pub log_rows: usize,
    /// Total elapsed time.
    pub duration: Duration,
}

/// Outcome of [`combine`].
///
/// "Nothing to combine" is an explicit non-error outcome, distinct from a
/// failure: the caller must not produce an empty output file for it.
#[derive(Debug)]
pub enum CombineOutcome {
    /// At least one file qualified; the dataset is ready to write.
    Combined {
        dataset: CombinedDataset,
        summary: CombineSummary,
    },
    /// No file had the required two sheets (or no files were given).
    NothingToCombine {
        /// Files that were considered but skipped, with reasons.
        files_skipped: Vec<(PathBuf, String)>,
    },
}

/// Read each export file's first two sheets and concatenate them, in input
/// order, into one combined dataset.
///
/// Per-file failures are isolated; zero qualifying files yields
/// [`CombineOutcome::NothingToCombine`].
pub fn combine(files: &[PathBuf]) -> Result<CombineOutcome> {
    let start = std::time::Instant::now();
    let mut dataset = CombinedDataset::default();
    let mut summary = CombineSummary::default();

    for file in files {
        match read_export(file) {
            Ok((data, logs)) => {
                dataset.data.append(&data);
                dataset.logs.append(&logs);
                summary.files_combined += 1;
                info!(
                    file = %file.display(),
                    data_rows = data.row_count(),
                    log_rows = logs.row_count(),
                    "export file read"
                );
            }
            Err(e) => {
                warn!(file = %file.display(), error = %e, "skipping export file");
                summary.files_skipped.push((file.clone(), e.to_string()));
            }
        }
    }

    if summary.files_combined == 0 {
        info!(considered = files.len(), "nothing to combine");
        return Ok(CombineOutcome::NothingToCombine {
            files_skipped: summary.files_skipped,
        });
    }

    summary.data_rows = dataset.data.row_count();
    summary.log_rows = dataset.logs.row_count();
    summary.duration = start.elapsed();

    info!(
        files = summary.files_combined,
        skipped = summary.files_skipped.len(),
        data_rows = summary.data_rows,
        log_rows = summary.log_rows,
        "combine complete"
    );

    Ok(CombineOutcome::Combined { dataset, summary })
}

/// Read one export file: sheet 0 as data, sheet 1 as logs.
fn read_export(path: &Path) -> Result<(Table, Table)> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| HarvestError::Workbook(format!("{}: {e}", path.display())))?;

    let sheet_count = workbook.sheet_names().len();
    if sheet_count < 2 {
        return Err(HarvestError::Workbook(format!(
            "{}: has {sheet_count} sheet(s), need at least 2 (data + logs)",
            path.display()
        )));
    }

    let data = sheet_to_table(path, &mut workbook, 0)?;
    let logs = sheet_to_table(path, &mut workbook, 1)?;
    Ok((data, logs))
}

fn sheet_to_table(
    path: &Path,
    workbook: &mut calamine::Sheets<std::io::BufReader<std::fs::File>>,
    index: usize,
) -> Result<Table> {
    let range: Range<Data> = workbook
        .worksheet_range_at(index)
        .ok_or_else(|| {
            HarvestError::Workbook(format!("{}: sheet {index} missing", path.display()))
        })?
        .map_err(|e| HarvestError::Workbook(format!("{}: sheet {index}: {e}", path.display())))?;

    let mut rows = range.rows();

    let Some(header_row) = rows.next() else {
        return Ok(Table::new());
    };

    let mut table = Table::with_columns(header_row.iter().map(cell_to_string));
    for row in rows {
        table.push_row(row.iter().map(cell_to_string).collect());
    }
    Ok(table)
}

/// Render a cell as a string. Whole floats lose their trailing `.0` so a
/// record id written as `4.0` reads back as `4`.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}
