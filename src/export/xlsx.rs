use super::{Cell, ExportError, HEADERS, record_cells};
use crate::models::KpiRecord;
use std::io::{Cursor, Write};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const RELATIONSHIP_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Single-sheet workbook. Text goes in as inline strings so no shared string
/// table is needed.
pub fn write_workbook(sheet_name: &str, rows: &[&KpiRecord]) -> Result<Vec<u8>, ExportError> {
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook_xml(sheet_name)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows)),
    ];

    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in parts {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        archive.start_file(name, options)?;
        archive.write_all(body.as_bytes())?;
    }
    Ok(archive.finish()?.into_inner())
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{SPREADSHEET_NS}" xmlns:r="{RELATIONSHIP_NS}"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape_xml(&clean_sheet_name(sheet_name))
    )
}

fn sheet_xml(rows: &[&KpiRecord]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{SPREADSHEET_NS}"><sheetData>"#
    );
    push_row(&mut xml, 1, HEADERS.map(Cell::Text));
    for (index, record) in rows.iter().enumerate() {
        push_row(&mut xml, index + 2, record_cells(record));
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_row<'a>(xml: &mut String, row: usize, cells: impl IntoIterator<Item = Cell<'a>>) {
    xml.push_str(&format!(r#"<row r="{row}">"#));
    for (column, cell) in cells.into_iter().enumerate() {
        let reference = format!("{}{row}", column_name(column));
        match cell {
            Cell::Number(value) => {
                xml.push_str(&format!(
                    r#"<c r="{reference}"><v>{}</v></c>"#,
                    super::format_number(value)
                ));
            }
            Cell::Text(text) => {
                xml.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    escape_xml(text)
                ));
            }
        }
    }
    xml.push_str("</row>");
}

/// Zero-based column index to spreadsheet letters: 0 -> A, 25 -> Z, 26 -> AA.
fn column_name(index: usize) -> String {
    let mut name = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        let offset = (remaining - 1) % 26;
        name.push(b'A' + offset as u8);
        remaining = (remaining - 1) / 26;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn clean_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(31)
        .collect();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(ch),
            ch if (ch as u32) < 0x20 => {}
            ch => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::{expected_table, sample_rows};
    use calamine::{Reader, Xlsx, open_workbook_from_rs};

    fn read_back(bytes: Vec<u8>) -> (Vec<String>, Vec<Vec<String>>) {
        let mut workbook: Xlsx<_> =
            open_workbook_from_rs(Cursor::new(bytes)).expect("workbook should open");
        let names = workbook.sheet_names().to_vec();
        let range = workbook
            .worksheet_range(&names[0])
            .expect("sheet should read");
        let table = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        (names, table)
    }

    #[test]
    fn workbook_round_trips_rows_in_order() {
        let rows = sample_rows();
        let subset: Vec<&KpiRecord> = rows.iter().collect();
        let bytes = write_workbook("2024-09", &subset).expect("export");

        let (names, table) = read_back(bytes);
        assert_eq!(names, vec!["2024-09"]);
        assert_eq!(table, expected_table(&subset));
        assert_eq!(table[2][3], "Systems & Parts");
        assert_eq!(table[1][1], "09");
    }

    #[test]
    fn empty_subset_still_has_header() {
        let bytes = write_workbook("2024-10", &[]).expect("export");
        let (_, table) = read_back(bytes);
        assert_eq!(table, expected_table(&[]));
    }

    #[test]
    fn column_names_roll_over() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(8), "I");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
    }

    #[test]
    fn sheet_names_drop_reserved_characters() {
        assert_eq!(clean_sheet_name("2024/09"), "2024_09");
        assert_eq!(clean_sheet_name(""), "Sheet1");
        assert_eq!(clean_sheet_name(&"x".repeat(40)).len(), 31);
    }
}
