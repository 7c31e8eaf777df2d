use itertools::Itertools;
use log::{debug, warn};

use crate::columns;
use crate::error::{CoordError, Error, Result};
use crate::record::LinkRecord;
use crate::table::{Cell, Table};

/// A sheet row that could not be turned into a link.
#[derive(Debug)]
pub struct RejectedRow {
    /// One-based sheet row number.
    pub row: usize,
    pub error: Error,
    /// The row as read, so it can be written back for fixing.
    pub cells: Vec<Cell>,
}

/// The working set of links, owned by whoever drives the session.
#[derive(Debug, Default)]
pub struct LinkDataset {
    header: Vec<String>,
    records: Vec<LinkRecord>,
    rejected: Vec<RejectedRow>,
}

impl LinkDataset {
    /// Parses every row of `table`. Bad rows are collected, not fatal; only a
    /// sheet missing one of the contract columns is refused outright.
    pub fn from_table(table: &Table) -> Result<LinkDataset> {
        for column in columns::required() {
            table.require_column(column)?;
        }

        let mut dataset = LinkDataset {
            header: table.header().iter().map(|h| h.trim().to_string()).collect(),
            ..LinkDataset::default()
        };
        for row in table.rows() {
            match LinkRecord::from_row(&row) {
                Ok(record) => dataset.records.push(record),
                Err(error) => {
                    warn!("Row {}: {}, skipping", row.sheet_row(), error);
                    dataset.rejected.push(RejectedRow {
                        row: row.sheet_row(),
                        error,
                        cells: row.cells().to_vec(),
                    });
                }
            }
        }
        debug!(
            "Loaded {} links, rejected {} rows",
            dataset.records.len(),
            dataset.rejected.len()
        );
        Ok(dataset)
    }

    pub fn records(&self) -> &[LinkRecord] {
        &self.records
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose geometry is currently derived.
    pub fn valid_records(&self) -> impl Iterator<Item = &LinkRecord> {
        self.records.iter().filter(|r| r.geometry().is_some())
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut LinkRecord> {
        self.records.get_mut(index)
    }

    /// Adds a record, deriving its geometry first.
    pub fn push(&mut self, mut record: LinkRecord) -> std::result::Result<(), CoordError> {
        let derived = record.derive_geometry().map(|_| ());
        self.records.push(record);
        derived
    }

    pub fn remove(&mut self, index: usize) -> Option<LinkRecord> {
        if index < self.records.len() {
            Some(self.records.remove(index))
        } else {
            None
        }
    }

    /// Re-derives every record after edits. Returns (index, error) for each record
    /// that no longer derives; those keep no geometry until fixed.
    pub fn rederive(&mut self) -> Vec<(usize, CoordError)> {
        let failures = self
            .records
            .iter_mut()
            .enumerate()
            .filter_map(|(i, r)| r.derive_geometry().err().map(|e| (i, e)))
            .collect::<Vec<_>>();
        for (i, e) in &failures {
            warn!("Link {} ({}): {}", i, self.records[*i].station_name, e);
        }
        failures
    }

    /// The records as a sheet: the loaded column order first, derived columns
    /// overwritten in place or appended.
    pub fn to_table(&self) -> Table {
        self.table_of(self.records.iter())
    }

    pub fn table_of<'a, I>(&self, records: I) -> Table
    where
        I: IntoIterator<Item = &'a LinkRecord>,
    {
        let header = self.export_header();
        let mut table = Table::new(header.clone());
        for record in records {
            table.push_row(header.iter().map(|h| record.cell(h)).collect());
        }
        table
    }

    /// Every row of the loaded sheet in its original order, rejected rows as
    /// they were read with their derived cells left blank. An added record
    /// follows the row it was copied from, or comes last.
    pub fn to_table_with_rejected(&self) -> Table {
        let header = self.export_header();
        let derived = columns::DERIVED
            .iter()
            .filter_map(|c| header.iter().position(|h| h == c))
            .collect::<Vec<_>>();

        let records = self.records.iter().map(|r| {
            let cells = header.iter().map(|h| r.cell(h)).collect::<Vec<_>>();
            (r.sheet_row(), cells)
        });
        let rejected = self.rejected.iter().map(|r| {
            let mut cells = r.cells.clone();
            cells.resize(header.len(), Cell::Empty);
            for &i in &derived {
                cells[i] = Cell::Empty;
            }
            (Some(r.row), cells)
        });
        let rows = records
            .chain(rejected)
            .sorted_by_key(|(row, _)| row.unwrap_or(usize::MAX));

        let mut table = Table::new(header);
        for (_, cells) in rows {
            table.push_row(cells);
        }
        table
    }

    /// The loaded column order with any missing derived column appended.
    fn export_header(&self) -> Vec<String> {
        let mut header = if self.header.is_empty() {
            default_header()
        } else {
            self.header.clone()
        };
        for column in columns::DERIVED.iter() {
            if !header.iter().any(|h| h == column) {
                header.push(column.to_string());
            }
        }
        header
    }
}

fn default_header() -> Vec<String> {
    let mut header = vec![
        columns::APPL_ID,
        columns::STN_NAME,
        columns::STASIUN_LAWAN,
        columns::FREQ,
        columns::FREQ_PAIR,
        columns::MASA_LAKU,
    ];
    header.extend(columns::required().into_iter().skip(2));
    header.into_iter().map(String::from).collect()
}
