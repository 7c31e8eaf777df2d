use std::fmt;
use std::ops::Index;

use crate::error::{Error, Result};

/// A single spreadsheet value.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell. Text is parsed leniently, the way spreadsheets
    /// often hold numbers typed as text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) if s.trim().is_empty() => None,
            other => Some(other.to_string().trim().to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            // Whole numbers such as ids and frequencies read back without the ".0".
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Cell {
        Cell::Number(n)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Cell {
        Cell::Text(s)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(x: Option<T>) -> Cell {
        x.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// A header row plus data rows, all padded to the header width.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        Table {
            header,
            rows: Vec::new(),
        }
    }

    /// Builds a table whose first row is the header. Trailing empty rows are dropped.
    pub fn from_grid(mut grid: Vec<Vec<Cell>>) -> Self {
        if grid.is_empty() {
            return Table::default();
        }
        let header = grid
            .remove(0)
            .into_iter()
            .map(|c| c.text().unwrap_or_default())
            .collect::<Vec<_>>();
        while grid.last().map_or(false, |r| r.iter().all(Cell::is_empty)) {
            grid.pop();
        }
        let mut table = Table::new(header);
        for row in grid {
            table.push_row(row);
        }
        table
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.trim() == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
        })
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.header.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn rows(&self) -> RowIter<'_> {
        RowIter {
            table: self,
            next: 0,
        }
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|cells| Row {
            table: self,
            index,
            cells,
        })
    }
}

pub struct RowIter<'a> {
    table: &'a Table,
    next: usize,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.table.row(self.next)?;
        self.next += 1;
        Some(row)
    }
}

/// A borrowed data row with access by column name.
#[derive(Clone, Copy, Debug)]
pub struct Row<'a> {
    table: &'a Table,
    index: usize,
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    /// Zero-based position among the data rows.
    pub fn index(&self) -> usize {
        self.index
    }

    /// One-based sheet row number, counting the header, for messages.
    pub fn sheet_row(&self) -> usize {
        self.index + 2
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    pub fn get(&self, column: &str) -> &'a Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.table
            .column(column)
            .and_then(|i| self.cells.get(i))
            .unwrap_or(EMPTY)
    }

    pub fn named_cells(&self) -> impl Iterator<Item = (&'a str, &'a Cell)> {
        self.table
            .header
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter())
    }
}

impl<'a> Index<usize> for Row<'a> {
    type Output = Cell;

    fn index(&self, i: usize) -> &Self::Output {
        &self.cells[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<Vec<Cell>> {
        vec![
            vec!["STN_NAME".into(), " FREQ ".into()],
            vec!["Padang".into(), 7450.0.into()],
            vec!["Bukittinggi".into()],
            vec![Cell::Empty, "".into()],
        ]
    }

    #[test]
    fn first_row_is_header() {
        let table = Table::from_grid(grid());
        assert_eq!(table.header(), &["STN_NAME".to_string(), "FREQ".to_string()]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("FREQ"), Some(1));
        assert!(table.require_column("APPL_ID").is_err());
    }

    #[test]
    fn short_rows_are_padded() {
        let table = Table::from_grid(grid());
        let row = table.row(1).unwrap();
        assert_eq!(row.get("FREQ"), &Cell::Empty);
        assert_eq!(row.get("NOPE"), &Cell::Empty);
        assert_eq!(row.sheet_row(), 3);
        assert_eq!(row[0], Cell::Text("Bukittinggi".to_string()));
    }

    #[test]
    fn cell_views() {
        assert_eq!(Cell::Text(" 12,5 ".into()).as_f64(), Some(12.5));
        assert_eq!(Cell::Number(7450.0).text().as_deref(), Some("7450"));
        assert_eq!(Cell::Number(0.25).to_string(), "0.25");
        assert_eq!(Cell::Text("  ".into()).text(), None);
        assert!(Cell::Text(" ".into()).is_empty());
    }
}
