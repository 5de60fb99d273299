//! Emit the combined dataset as a two-sheet workbook.

use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use harvester_shared::{HarvestError, Result};

use crate::combine::CombinedDataset;

/// Write the combined dataset to `path` with the data records on the first
/// sheet and the logs on the second, headers in row 0, no index column.
pub fn write_workbook(dataset: &CombinedDataset, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    write_table(sheet, "Data Records", &dataset.data).map_err(xlsx_err)?;

    let sheet = workbook.add_worksheet();
    write_table(sheet, "Logs", &dataset.logs).map_err(xlsx_err)?;

    workbook.save(path).map_err(xlsx_err)?;

    info!(
        path = %path.display(),
        data_rows = dataset.data.row_count(),
        log_rows = dataset.logs.row_count(),
        "combined workbook written"
    );
    Ok(())
}

fn write_table(
    sheet: &mut Worksheet,
    name: &str,
    table: &crate::table::Table,
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    sheet.set_name(name)?;
    for (col, header) in table.columns.iter().enumerate() {
        sheet.write_string(0, col as u16, header)?;
    }
    for (row, cells) in table.rows.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            sheet.write_string(row as u32 + 1, col as u16, cell)?;
        }
    }
    Ok(())
}

fn xlsx_err(e: rust_xlsxwriter::XlsxError) -> HarvestError {
    HarvestError::Workbook(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use calamine::{Reader, open_workbook_auto};

    #[test]
    fn written_workbook_reads_back_with_named_tabs() {
        let mut data = Table::with_columns(["RecordId", "Temperature"]);
        data.push_row(vec!["S1".into(), "10".into()]);
        data.push_row(vec!["S2".into(), "12.5".into()]);

        let mut logs = Table::with_columns(["Message"]);
        logs.push_row(vec!["page 1 exported".into()]);

        let dataset = CombinedDataset { data, logs };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.xlsx");
        write_workbook(&dataset, &path).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let names = workbook.sheet_names().to_vec();
        assert_eq!(names, ["Data Records", "Logs"]);

        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let first_row: Vec<String> = range
            .rows()
            .next()
            .unwrap()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(first_row, ["RecordId", "Temperature"]);
        // header plus two data rows, no index column
        assert_eq!(range.rows().count(), 3);
        assert_eq!(range.rows().next().unwrap().len(), 2);
    }

    #[test]
    fn unwritable_destination_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // Parent directory does not exist, so the save cannot create the file.
        let path = dir.path().join("missing").join("combined.xlsx");

        let err = write_workbook(&CombinedDataset::default(), &path).unwrap_err();
        assert!(matches!(err, HarvestError::Workbook(_)));
    }

    #[test]
    fn empty_dataset_still_produces_both_tabs() {
        let dataset = CombinedDataset::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.xlsx");
        write_workbook(&dataset, &path).unwrap();

        let workbook = open_workbook_auto(&path).unwrap();
        assert_eq!(workbook.sheet_names().len(), 2);
    }
}
