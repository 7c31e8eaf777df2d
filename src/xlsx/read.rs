use std::io::{BufRead, Read, Seek};

use log::debug;
use quick_xml::events::*;
use quick_xml::Reader;
use zip::ZipArchive;

use super::parse_cell_ref;
use crate::error::{Error, Result};
use crate::table::{Cell, Table};
use crate::zip_util::entry_to_pseudofile;

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";

/// Loads one worksheet, or the first one when `sheet` is `None`. The first row
/// of the sheet becomes the table header.
pub fn read_sheet<R: Read + Seek>(reader: R, sheet: Option<&str>) -> Result<Table> {
    let mut archive = ZipArchive::new(reader)?;

    let workbook = entry_to_pseudofile(&mut archive, WORKBOOK)?.ok_or_else(|| Error::NotAWorkbook {
        member: WORKBOOK.to_string(),
    })?;
    let sheets = get_sheets(&mut Reader::from_reader(workbook))?;
    let (name, id) = match sheet {
        Some(wanted) => sheets.into_iter().find(|(name, _)| name == wanted),
        None => sheets.into_iter().next(),
    }
    .ok_or_else(|| Error::MissingSheet {
        name: sheet.unwrap_or_default().to_string(),
    })?;

    let rels = entry_to_pseudofile(&mut archive, WORKBOOK_RELS)?.ok_or_else(|| Error::NotAWorkbook {
        member: WORKBOOK_RELS.to_string(),
    })?;
    let target = get_relationship_target(&mut Reader::from_reader(rels), &id)?
        .map(|t| resolve_target(&t))
        .ok_or_else(|| Error::MissingSheet { name: name.clone() })?;
    debug!("Sheet '{}' lives in {}", name, target);

    let shared = match entry_to_pseudofile(&mut archive, SHARED_STRINGS)? {
        Some(file) => get_shared_strings(&mut Reader::from_reader(file))?,
        None => Vec::new(),
    };
    debug!("{} shared strings", shared.len());

    let data = entry_to_pseudofile(&mut archive, &target)?
        .ok_or_else(|| Error::MissingSheet { name: name.clone() })?;
    let grid = get_sheet_rows(&mut Reader::from_reader(data), &shared)?;
    Ok(Table::from_grid(grid))
}

fn local(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

fn get_attribute<B: BufRead>(
    reader: &Reader<B>,
    tag: &BytesStart,
    attr: &str,
) -> Result<Option<String>> {
    tag.attributes()
        .flatten()
        .find(|a| local(a.key) == attr.as_bytes())
        .map(|a| a.unescape_and_decode_value(reader))
        .transpose()
        .map_err(|e| e.into())
}

/// (name, relationship id) of every sheet, in workbook order.
fn get_sheets<B: BufRead>(reader: &mut Reader<B>) -> Result<Vec<(String, String)>> {
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(ref event) | Event::Empty(ref event) if event.local_name() == b"sheet" => {
                let name = get_attribute(reader, event, "name")?;
                let id = get_attribute(reader, event, "id")?;
                if let (Some(name), Some(id)) = (name, id) {
                    sheets.push((name, id));
                }
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    Ok(sheets)
}

fn get_relationship_target<B: BufRead>(reader: &mut Reader<B>, id: &str) -> Result<Option<String>> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(ref event) | Event::Empty(ref event)
                if event.local_name() == b"Relationship" =>
            {
                if get_attribute(reader, event, "Id")?.as_deref() == Some(id) {
                    return get_attribute(reader, event, "Target");
                }
            }
            Event::Eof => return Ok(None),
            _ => (),
        }
        buf.clear();
    }
}

/// Targets are relative to `xl/` unless they start at the package root.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn get_shared_strings<B: BufRead>(reader: &mut Reader<B>) -> Result<Vec<String>> {
    let mut buf = Vec::new();
    let mut inner = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    // Phonetic runs repeat the text in another script.
    let mut in_phonetic = false;
    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(ref event) if event.local_name() == b"si" => current.clear(),
            Event::End(ref event) if event.local_name() == b"si" => {
                strings.push(std::mem::take(&mut current));
            }
            Event::Start(ref event) if event.local_name() == b"rPh" => in_phonetic = true,
            Event::End(ref event) if event.local_name() == b"rPh" => in_phonetic = false,
            Event::Start(ref event) if event.local_name() == b"t" => {
                let name = event.name().to_vec();
                let text = reader.read_text(&name, &mut inner)?;
                inner.clear();
                if !in_phonetic {
                    current.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    Ok(strings)
}

#[derive(Default)]
struct PendingCell {
    col: usize,
    ty: Option<String>,
    value: Option<String>,
    inline: Option<String>,
}

impl PendingCell {
    fn into_cell(self, shared: &[String]) -> Cell {
        let value = self.value.unwrap_or_default();
        match self.ty.as_deref() {
            Some("s") => value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i))
                .map(|s| Cell::Text(s.clone()))
                .unwrap_or(Cell::Empty),
            Some("inlineStr") => self.inline.map(Cell::Text).unwrap_or(Cell::Empty),
            Some("b") => Cell::Bool(value.trim() == "1"),
            Some("e") => Cell::Empty,
            Some("str") | Some("d") => Cell::Text(value),
            _ if value.trim().is_empty() => Cell::Empty,
            _ => match value.trim().parse() {
                Ok(n) => Cell::Number(n),
                Err(_) => Cell::Text(value),
            },
        }
    }
}

fn get_cell_column<B: BufRead>(reader: &Reader<B>, tag: &BytesStart, next_col: usize) -> Result<usize> {
    Ok(get_attribute(reader, tag, "r")?
        .and_then(|r| parse_cell_ref(&r))
        .map(|(_, col)| col)
        .unwrap_or(next_col))
}

fn get_sheet_rows<B: BufRead>(reader: &mut Reader<B>, shared: &[String]) -> Result<Vec<Vec<Cell>>> {
    let mut buf = Vec::new();
    let mut inner = Vec::new();
    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut row: Vec<Cell> = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut next_col = 0;

    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(ref event) | Event::Empty(ref event) if event.local_name() == b"row" => {
                // Blank rows may be left out of the file; keep them so row numbers line up.
                let r = get_attribute(reader, event, "r")?.and_then(|r| r.parse::<usize>().ok());
                if let Some(r) = r {
                    while rows.len() + 1 < r {
                        rows.push(Vec::new());
                    }
                }
                row.clear();
                next_col = 0;
            }
            Event::End(ref event) if event.local_name() == b"row" => {
                rows.push(std::mem::take(&mut row));
            }
            Event::Start(ref event) if event.local_name() == b"c" => {
                let col = get_cell_column(reader, event, next_col)?;
                next_col = col + 1;
                cell = Some(PendingCell {
                    col,
                    ty: get_attribute(reader, event, "t")?,
                    ..PendingCell::default()
                });
            }
            Event::Empty(ref event) if event.local_name() == b"c" => {
                next_col = get_cell_column(reader, event, next_col)? + 1;
            }
            Event::End(ref event) if event.local_name() == b"c" => {
                if let Some(pending) = cell.take() {
                    let col = pending.col;
                    if row.len() <= col {
                        row.resize(col + 1, Cell::Empty);
                    }
                    row[col] = pending.into_cell(shared);
                }
            }
            Event::Start(ref event) if event.local_name() == b"v" => {
                let name = event.name().to_vec();
                let text = reader.read_text(&name, &mut inner)?;
                inner.clear();
                if let Some(c) = cell.as_mut() {
                    c.value = Some(text);
                }
            }
            Event::Start(ref event) if event.local_name() == b"t" => {
                let name = event.name().to_vec();
                let text = reader.read_text(&name, &mut inner)?;
                inner.clear();
                if let Some(c) = cell.as_mut() {
                    c.inline.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::{FileOptions, ZipWriter};

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="D1" t="inlineStr"><is><t>NOTE</t></is></c></row>
<row r="3"><c r="A3" t="s"><v>2</v></c><c r="B3"><v>7450.5</v></c><c r="C3" t="b"><v>1</v></c><c r="D3" t="e"><v>#N/A</v></c></row>
<row r="4"><c r="B4" t="str"><v>x &amp; y</v></c></row>
</sheetData>
</worksheet>"#;

    const SHARED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
<si><t>STN_NAME</t></si>
<si><t>FREQ</t></si>
<si><r><t>Padang </t></r><r><t>Barat</t></r><rPh><t>ぱだん</t></rPh></si>
</sst>"#;

    const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/><sheet name="Sheet2" sheetId="2" r:id="rId2"/></sheets>
</workbook>"#;

    const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/data.xml"/>
</Relationships>"#;

    fn workbook() -> Cursor<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let parts = [
            (WORKBOOK, WORKBOOK_XML),
            (WORKBOOK_RELS, RELS_XML),
            (SHARED_STRINGS, SHARED),
            ("xl/worksheets/sheet1.xml", "<worksheet><sheetData/></worksheet>"),
            ("xl/worksheets/data.xml", SHEET),
        ];
        for &(name, body) in parts.iter() {
            zip.start_file(name, FileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap()
    }

    #[test]
    fn reads_named_sheet() {
        let table = read_sheet(workbook(), Some("Sheet2")).unwrap();
        assert_eq!(table.header(), &["STN_NAME", "FREQ", "", "NOTE"]);
        // Row 2 is absent from the file and comes back blank.
        assert_eq!(table.len(), 3);
        assert!(table.row(0).unwrap().get("STN_NAME").is_empty());

        let row = table.row(1).unwrap();
        assert_eq!(row.get("STN_NAME"), &Cell::Text("Padang Barat".into()));
        assert_eq!(row.get("FREQ"), &Cell::Number(7450.5));
        assert_eq!(row[2], Cell::Bool(true));
        assert_eq!(row.get("NOTE"), &Cell::Empty);

        let row = table.row(2).unwrap();
        assert_eq!(row.get("FREQ"), &Cell::Text("x & y".into()));
    }

    #[test]
    fn first_sheet_by_default() {
        let table = read_sheet(workbook(), None).unwrap();
        assert!(table.header().is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn unknown_sheet_is_an_error() {
        assert!(matches!(
            read_sheet(workbook(), Some("Sheet9")),
            Err(Error::MissingSheet { .. })
        ));
    }

    #[test]
    fn targets_resolve_from_xl() {
        assert_eq!(resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("/xl/worksheets/a.xml"), "xl/worksheets/a.xml");
    }
}
