use std::io::{Cursor, Seek, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use super::cell_ref;
use crate::error::Result;
use crate::table::{Cell, Table};

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn start_document() -> Result<XmlWriter> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(BytesDecl::new(b"1.0", Some(b"UTF-8"), Some(b"yes"))))?;
    Ok(w)
}

fn workbook_xml(sheet: &str) -> Result<Vec<u8>> {
    let mut w = start_document()?;
    let mut workbook = BytesStart::borrowed_name(b"workbook");
    workbook.push_attribute(("xmlns", NS_MAIN));
    workbook.push_attribute(("xmlns:r", NS_REL));
    w.write_event(Event::Start(workbook))?;
    w.write_event(Event::Start(BytesStart::borrowed_name(b"sheets")))?;
    let mut entry = BytesStart::borrowed_name(b"sheet");
    entry.push_attribute(("name", sheet));
    entry.push_attribute(("sheetId", "1"));
    entry.push_attribute(("r:id", "rId1"));
    w.write_event(Event::Empty(entry))?;
    w.write_event(Event::End(BytesEnd::borrowed(b"sheets")))?;
    w.write_event(Event::End(BytesEnd::borrowed(b"workbook")))?;
    Ok(w.into_inner().into_inner())
}

fn write_cell(w: &mut XmlWriter, row: usize, col: usize, cell: &Cell) -> Result<()> {
    let (ty, value) = match cell {
        Cell::Empty => return Ok(()),
        Cell::Number(n) if !n.is_finite() => return Ok(()),
        Cell::Number(n) => (None, n.to_string()),
        Cell::Bool(b) => (Some("b"), if *b { "1" } else { "0" }.to_string()),
        Cell::Text(s) => (Some("inlineStr"), s.clone()),
    };

    let reference = cell_ref(row, col);
    let mut c = BytesStart::borrowed_name(b"c");
    c.push_attribute(("r", reference.as_str()));
    if let Some(ty) = ty {
        c.push_attribute(("t", ty));
    }
    w.write_event(Event::Start(c))?;
    if ty == Some("inlineStr") {
        w.write_event(Event::Start(BytesStart::borrowed_name(b"is")))?;
        let mut t = BytesStart::borrowed_name(b"t");
        t.push_attribute(("xml:space", "preserve"));
        w.write_event(Event::Start(t))?;
        w.write_event(Event::Text(BytesText::from_plain_str(&value)))?;
        w.write_event(Event::End(BytesEnd::borrowed(b"t")))?;
        w.write_event(Event::End(BytesEnd::borrowed(b"is")))?;
    } else {
        w.write_event(Event::Start(BytesStart::borrowed_name(b"v")))?;
        w.write_event(Event::Text(BytesText::from_plain_str(&value)))?;
        w.write_event(Event::End(BytesEnd::borrowed(b"v")))?;
    }
    w.write_event(Event::End(BytesEnd::borrowed(b"c")))?;
    Ok(())
}

fn write_row<'a, I>(w: &mut XmlWriter, row: usize, cells: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Cell>,
{
    let r = (row + 1).to_string();
    let mut start = BytesStart::borrowed_name(b"row");
    start.push_attribute(("r", r.as_str()));
    w.write_event(Event::Start(start))?;
    for (col, cell) in cells.into_iter().enumerate() {
        write_cell(w, row, col, cell)?;
    }
    w.write_event(Event::End(BytesEnd::borrowed(b"row")))?;
    Ok(())
}

fn sheet_xml(table: &Table) -> Result<Vec<u8>> {
    let mut w = start_document()?;
    let mut worksheet = BytesStart::borrowed_name(b"worksheet");
    worksheet.push_attribute(("xmlns", NS_MAIN));
    w.write_event(Event::Start(worksheet))?;
    w.write_event(Event::Start(BytesStart::borrowed_name(b"sheetData")))?;

    let header = table
        .header()
        .iter()
        .map(|h| Cell::Text(h.clone()))
        .collect::<Vec<_>>();
    write_row(&mut w, 0, &header)?;
    for row in table.rows() {
        write_row(&mut w, row.index() + 1, row.cells())?;
    }

    w.write_event(Event::End(BytesEnd::borrowed(b"sheetData")))?;
    w.write_event(Event::End(BytesEnd::borrowed(b"worksheet")))?;
    Ok(w.into_inner().into_inner())
}

/// Writes `table` as the only sheet of a new workbook, header first.
pub fn write_workbook<W: Write + Seek>(writer: W, sheet: &str, table: &Table) -> Result<W> {
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes().to_vec()),
        ("xl/workbook.xml", workbook_xml(sheet)?),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.as_bytes().to_vec()),
        ("xl/worksheets/sheet1.xml", sheet_xml(table)?),
    ];
    for (name, body) in parts.iter() {
        zip.start_file(*name, options)?;
        zip.write_all(body)?;
    }
    Ok(zip.finish()?)
}
