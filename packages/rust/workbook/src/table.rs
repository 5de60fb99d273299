//! In-memory string table with header-named columns.
//!
//! Concatenation across files aligns columns by name: the combined schema
//! is the union of all seen headers in first-seen order, and cells absent
//! from a contributing file are left empty. Schema reconciliation beyond
//! that is deliberately not attempted.

/// A rectangular table of cell strings under named column headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column headers in first-seen order.
    pub columns: Vec<String>,
    /// Rows, each as wide as `columns`.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from explicit headers and rows (used by tests and readers).
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Push a row, padding or truncating to the current column count.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// Append another table, unioning column schemas by header name.
    ///
    /// New columns are added at the end; previously appended rows are
    /// back-filled with empty cells for them.
    pub fn append(&mut self, other: &Table) {
        // Map each incoming column to its position in the union schema.
        let mut index_map = Vec::with_capacity(other.columns.len());
        for column in &other.columns {
            let pos = match self.columns.iter().position(|c| c == column) {
                Some(pos) => pos,
                None => {
                    self.columns.push(column.clone());
                    for row in &mut self.rows {
                        row.push(String::new());
                    }
                    self.columns.len() - 1
                }
            };
            index_map.push(pos);
        }

        for row in &other.rows {
            let mut merged = vec![String::new(); self.columns.len()];
            for (i, cell) in row.iter().enumerate() {
                if let Some(&pos) = index_map.get(i) {
                    merged[pos] = cell.clone();
                }
            }
            self.rows.push(merged);
        }
    }

    /// Lookup a cell by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}
