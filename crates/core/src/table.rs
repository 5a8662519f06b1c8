//! Free-form score table with editable headers and per-column totals.

use crate::{
    error::SnapshotError,
    mirror::{Persisted, StoredValues},
    numeric::{is_over_threshold, parse_int, saturating_sum},
};

/// Storage key for the column headers.
pub const COLUMN_NAMES_KEY: &str = "columnNames";
/// Storage key for the cell grid.
pub const TABLE_DATA_KEY: &str = "tableData";

/// Rows in a freshly created table.
pub const DEFAULT_ROWS: usize = 7;
/// Columns in a freshly created table.
pub const DEFAULT_COLUMNS: usize = 2;

/// Grid of free-text cells under a row of headers.
///
/// Every row holds exactly one cell per header. The grid keeps one blank row
/// ahead of the data: writing a non-empty value into the last row appends a
/// new empty row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreTable {
    column_names: Vec<String>,
    grid: Vec<Vec<String>>,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLUMNS)
    }
}

impl ScoreTable {
    /// Create a blank table with default headers. At least one row is kept.
    pub fn new(rows: usize, columns: usize) -> Self {
        let column_names = (1..=columns).map(default_column_name).collect();
        Self {
            column_names,
            grid: vec![vec![String::new(); columns]; rows.max(1)],
        }
    }

    /// Column headers in order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Rows of cells.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.grid
    }

    /// Number of rows, including the trailing blank one.
    pub fn row_count(&self) -> usize {
        self.grid.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Cell text at `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.grid
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(String::as_str)
    }

    /// Overwrite one cell. Out-of-range positions are ignored.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) -> bool {
        let value = value.into();
        let Some(cell) = self.grid.get_mut(row).and_then(|cells| cells.get_mut(col)) else {
            return false;
        };
        let filled = !value.is_empty();
        *cell = value;
        self.extend_after_write(row, filled);
        true
    }

    /// Keep one blank row below the last row that received data.
    fn extend_after_write(&mut self, row: usize, filled: bool) {
        if filled && row + 1 == self.grid.len() {
            self.grid.push(vec![String::new(); self.column_names.len()]);
        }
    }

    /// Append a column named after its position.
    pub fn add_column(&mut self) -> bool {
        let name = default_column_name(self.column_names.len() + 1);
        self.column_names.push(name);
        for row in &mut self.grid {
            row.push(String::new());
        }
        true
    }

    /// Remove a column and its cells.
    pub fn delete_column(&mut self, index: usize) -> bool {
        if index >= self.column_names.len() {
            return false;
        }
        self.column_names.remove(index);
        for row in &mut self.grid {
            row.remove(index);
        }
        true
    }

    /// Replace a column header.
    pub fn rename_column(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.column_names.get_mut(index) {
            Some(current) => {
                *current = name.into();
                true
            }
            None => false,
        }
    }

    /// Blank every cell, keeping the headers and the table's dimensions.
    pub fn reset_table(&mut self) -> bool {
        for cell in self.grid.iter_mut().flatten() {
            cell.clear();
        }
        true
    }

    /// Sum of the leading integers of each column's cells.
    pub fn column_totals(&self) -> Vec<i64> {
        (0..self.column_names.len())
            .map(|col| {
                saturating_sum(
                    self.grid
                        .iter()
                        .filter_map(|row| row.get(col))
                        .map(|cell| parse_int(cell).unwrap_or(0)),
                )
            })
            .collect()
    }

    /// Whether a column total has reached the threshold.
    pub fn is_over_threshold(total: i64) -> bool {
        is_over_threshold(total)
    }
}

fn default_column_name(position: usize) -> String {
    format!("Column {position}")
}

impl Persisted for ScoreTable {
    const KEYS: &'static [&'static str] = &[COLUMN_NAMES_KEY, TABLE_DATA_KEY];

    fn encode(&self) -> Result<Vec<(&'static str, String)>, SnapshotError> {
        let names =
            serde_json::to_string(&self.column_names).map_err(|source| SnapshotError::Encode {
                key: COLUMN_NAMES_KEY,
                source,
            })?;
        let grid = serde_json::to_string(&self.grid).map_err(|source| SnapshotError::Encode {
            key: TABLE_DATA_KEY,
            source,
        })?;
        Ok(vec![(COLUMN_NAMES_KEY, names), (TABLE_DATA_KEY, grid)])
    }

    fn decode(values: &StoredValues) -> Result<Self, SnapshotError> {
        let names = values.parse::<Vec<String>>(COLUMN_NAMES_KEY)?;
        let grid = values.parse::<Vec<Vec<String>>>(TABLE_DATA_KEY)?;

        let (column_names, grid) = match (names, grid) {
            (Some(names), Some(grid)) => (names, grid),
            (Some(names), None) => {
                let width = names.len();
                (names, vec![vec![String::new(); width]; DEFAULT_ROWS])
            }
            (None, Some(grid)) => {
                let width = grid.first().map(Vec::len).unwrap_or(DEFAULT_COLUMNS);
                ((1..=width).map(default_column_name).collect(), grid)
            }
            (None, None) => return Ok(Self::default()),
        };

        if grid.is_empty() {
            return Err(SnapshotError::Inconsistent("table has no rows".to_string()));
        }
        if let Some((index, row)) = grid
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != column_names.len())
        {
            return Err(SnapshotError::Inconsistent(format!(
                "row {index} has {} cells but there are {} columns",
                row.len(),
                column_names.len()
            )));
        }

        Ok(Self { column_names, grid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mirror::Mirror,
        store::{KeyValueStore, MemoryStore},
    };

    #[test]
    fn default_table_is_seven_by_two() {
        let table = ScoreTable::default();
        assert_eq!(table.row_count(), 7);
        assert_eq!(table.column_names(), ["Column 1", "Column 2"]);
        assert!(table.rows().iter().flatten().all(String::is_empty));
        assert_eq!(table.column_totals(), vec![0, 0]);
    }

    #[test]
    fn writing_last_row_appends_blank_row() {
        let mut table = ScoreTable::default();
        assert!(table.set_cell(6, 1, "12"));
        assert_eq!(table.row_count(), 8);
        assert_eq!(table.rows()[7], vec![String::new(), String::new()]);

        assert!(table.set_cell(6, 0, "3"));
        assert_eq!(table.row_count(), 8);
    }

    #[test]
    fn blank_writes_and_inner_rows_do_not_grow() {
        let mut table = ScoreTable::default();
        table.set_cell(2, 0, "5");
        table.set_cell(6, 0, "");
        assert_eq!(table.row_count(), 7);
    }

    #[test]
    fn grid_never_shrinks() {
        let mut table = ScoreTable::default();
        table.set_cell(6, 0, "5");
        table.set_cell(6, 0, "");
        assert_eq!(table.row_count(), 8);
    }

    #[test]
    fn new_rows_match_column_count() {
        let mut table = ScoreTable::default();
        table.add_column();
        table.set_cell(6, 2, "x");
        assert_eq!(table.rows()[7].len(), 3);
    }

    #[test]
    fn out_of_range_writes_are_ignored() {
        let mut table = ScoreTable::default();
        assert!(!table.set_cell(7, 0, "1"));
        assert!(!table.set_cell(0, 2, "1"));
        assert!(!table.rename_column(2, "Nope"));
        assert!(!table.delete_column(2));
        assert_eq!(table, ScoreTable::default());
    }

    #[test]
    fn add_column_names_by_position() {
        let mut table = ScoreTable::default();
        table.add_column();
        assert_eq!(table.column_names()[2], "Column 3");
        assert!(table.rows().iter().all(|row| row.len() == 3));
    }

    #[test]
    fn delete_column_preserves_order() {
        let mut table = ScoreTable::default();
        table.add_column();
        table.set_cell(0, 0, "a");
        table.set_cell(0, 1, "b");
        table.set_cell(0, 2, "c");

        assert!(table.delete_column(1));
        assert_eq!(table.column_names(), ["Column 1", "Column 3"]);
        assert_eq!(table.rows()[0], vec!["a".to_string(), "c".to_string()]);
        assert!(table.rows().iter().all(|row| row.len() == 2));
    }

    #[test]
    fn rename_column_accepts_any_label() {
        let mut table = ScoreTable::default();
        assert!(table.rename_column(0, "Them"));
        assert!(table.rename_column(1, ""));
        assert_eq!(table.column_names(), ["Them", ""]);
    }

    #[test]
    fn reset_keeps_dimensions_and_headers() {
        let mut table = ScoreTable::default();
        table.rename_column(0, "Us");
        table.set_cell(6, 0, "90");
        table.reset_table();
        assert_eq!(table.row_count(), 8);
        assert_eq!(table.column_names(), ["Us", "Column 2"]);
        assert!(table.rows().iter().flatten().all(String::is_empty));
    }

    #[test]
    fn totals_ignore_non_numeric_cells() {
        let mut table = ScoreTable::default();
        table.set_cell(0, 0, "120");
        table.set_cell(1, 0, "81 bonus");
        table.set_cell(2, 0, "n/a");
        table.set_cell(0, 1, "-15");
        let totals = table.column_totals();
        assert_eq!(totals, vec![201, -15]);
        assert!(ScoreTable::is_over_threshold(totals[0]));
        assert!(!ScoreTable::is_over_threshold(totals[1]));
    }

    #[test]
    fn totals_read_cells_as_decimal() {
        let mut table = ScoreTable::default();
        table.set_cell(0, 0, "0x1A");
        table.set_cell(1, 0, "007");
        assert_eq!(table.column_totals(), vec![7, 0]);
    }

    #[test]
    fn decode_fills_missing_headers() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.set(TABLE_DATA_KEY, r#"[["1","2","3"]]"#)?;
        let restored = Mirror::restore(store, ScoreTable::default())?;
        assert_eq!(
            restored.state().column_names(),
            ["Column 1", "Column 2", "Column 3"]
        );
        assert_eq!(restored.state().column_totals(), vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn decode_fills_missing_grid() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.set(COLUMN_NAMES_KEY, r#"["Us","Them","Bank"]"#)?;
        let restored = Mirror::restore(store, ScoreTable::default())?;
        assert_eq!(restored.state().row_count(), DEFAULT_ROWS);
        assert!(restored.state().rows().iter().all(|row| row.len() == 3));
        Ok(())
    }
}
