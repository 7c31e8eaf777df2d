use std::path::Path;

use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::error::{Error, Result};
use crate::table::{Cell, Table};

fn check_table_name(name: &str) -> Result<()> {
    lazy_static! {
        static ref IDENT: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").unwrap();
    }

    if IDENT.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidTableName {
            name: name.to_string(),
        })
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_names(table: &Table) -> Vec<String> {
    table
        .header()
        .iter()
        .enumerate()
        .map(|(i, h)| match h.trim() {
            "" => format!("Unnamed: {}", i),
            h => h.to_string(),
        })
        .collect()
}

/// `REAL` when every filled cell of the column is a number, `TEXT` otherwise.
fn column_types(table: &Table) -> Vec<&'static str> {
    (0..table.header().len())
        .map(|col| {
            let mut cells = table.rows().map(|r| &r.cells()[col]).filter(|c| !c.is_empty()).peekable();
            if cells.peek().is_some() && cells.all(|c| matches!(c, Cell::Number(_))) {
                "REAL"
            } else {
                "TEXT"
            }
        })
        .collect()
}

fn to_sql(cell: &Cell) -> Value {
    match cell {
        Cell::Number(n) if n.is_finite() => Value::Real(*n),
        Cell::Bool(b) => Value::Integer(*b as i64),
        c if c.is_empty() => Value::Null,
        Cell::Text(s) => Value::Text(s.clone()),
        _ => Value::Null,
    }
}

/// Replaces `name` with the contents of `table`. Returns the number of rows written.
pub fn write_table(conn: &mut Connection, name: &str, table: &Table) -> Result<usize> {
    check_table_name(name)?;
    let columns = column_names(table);
    if columns.is_empty() {
        return Err(Error::MissingColumn {
            column: "*".to_string(),
        });
    }
    let types = column_types(table);

    let definition = columns
        .iter()
        .zip(types.iter())
        .map(|(c, t)| format!("{} {}", quote(c), t))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({definition});",
        table = quote(name),
        definition = definition
    ))?;
    {
        let mut insert = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({})",
            quote(name),
            placeholders
        ))?;
        for row in table.rows() {
            insert.execute(params_from_iter(row.cells().iter().map(to_sql)))?;
        }
    }
    tx.commit()?;
    Ok(table.len())
}

pub fn export_sqlite<P: AsRef<Path>>(path: P, name: &str, table: &Table) -> Result<usize> {
    let mut conn = Connection::open(path.as_ref())?;
    let written = write_table(&mut conn, name, table)?;
    info!(
        "Wrote {} rows to table '{}' in {}",
        written,
        name,
        path.as_ref().display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let mut t = Table::new(vec!["STN_NAME".into(), "CIRCUIT_LEN".into(), "".into()]);
        t.push_row(vec!["Padang".into(), 0.031.into(), "x".into()]);
        t.push_row(vec!["Solok \"Selatan\"".into(), Cell::Empty, 2.0.into()]);
        t
    }

    fn count(conn: &Connection, name: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", name), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn creates_typed_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(write_table(&mut conn, "balmon_links", &table()).unwrap(), 2);

        let mut stmt = conn.prepare("PRAGMA table_info(balmon_links)").unwrap();
        let cols = stmt
            .query_map([], |r| Ok((r.get::<_, String>(1)?, r.get::<_, String>(2)?)))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            cols,
            vec![
                ("STN_NAME".to_string(), "TEXT".to_string()),
                ("CIRCUIT_LEN".to_string(), "REAL".to_string()),
                ("Unnamed: 2".to_string(), "TEXT".to_string()),
            ]
        );

        let len: Option<f64> = conn
            .query_row(
                "SELECT CIRCUIT_LEN FROM balmon_links WHERE STN_NAME = ?1",
                ["Solok \"Selatan\""],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(len, None);
    }

    #[test]
    fn second_export_replaces_rows() {
        let mut conn = Connection::open_in_memory().unwrap();
        write_table(&mut conn, "links", &table()).unwrap();
        let mut smaller = Table::new(vec!["STN_NAME".into()]);
        smaller.push_row(vec!["Painan".into()]);
        write_table(&mut conn, "links", &smaller).unwrap();
        assert_eq!(count(&conn, "links"), 1);
    }

    #[test]
    fn rejects_odd_table_names() {
        let mut conn = Connection::open_in_memory().unwrap();
        for name in ["", "1links", "links; DROP TABLE x", "balmon-links"].iter() {
            assert!(matches!(
                write_table(&mut conn, name, &table()),
                Err(Error::InvalidTableName { .. })
            ));
        }
    }
}
