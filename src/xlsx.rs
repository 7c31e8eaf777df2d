//! Office Open XML workbooks: just enough to read one worksheet into a
//! [`Table`](crate::table::Table) and to write a table back out.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::Result;
use crate::table::Table;

pub mod read;
pub mod write;

pub use read::read_sheet;
pub use write::write_workbook;

pub fn open_sheet<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<Table> {
    let file = BufReader::new(File::open(path)?);
    read_sheet(file, sheet)
}

pub fn save<P: AsRef<Path>>(path: P, sheet: &str, table: &Table) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    write_workbook(file, sheet, table)?;
    Ok(())
}

/// Converts a 1900-system serial day number to a date.
///
/// Serials before 1900-03-01 are off by one because of the phantom
/// 1900-02-29; link licenses do not reach back that far.
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Splits a cell reference such as `AB12` into zero-based (row, column).
pub fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    lazy_static! {
        static ref CELL_REF: Regex = Regex::new(r"^\$?([A-Za-z]{1,3})\$?(\d+)$").unwrap();
    }

    let cap = CELL_REF.captures(r.trim())?;
    let col = cap[1]
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize);
    let row: usize = cap[2].parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

/// Zero-based column index to spreadsheet letters (`0` is `A`, `27` is `AB`).
pub fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

pub fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", column_letters(col), row + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_references() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("AB12"), Some((11, 27)));
        assert_eq!(parse_cell_ref("$C$7"), Some((6, 2)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("12"), None);
        for &col in [0usize, 25, 26, 27, 701, 702].iter() {
            assert_eq!(parse_cell_ref(&cell_ref(4, col)), Some((4, col)));
        }
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn serial_dates() {
        assert_eq!(date_from_serial(45292.0), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(date_from_serial(45292.75), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(date_from_serial(0.0), None);
        assert_eq!(date_from_serial(f64::NAN), None);
    }
}
