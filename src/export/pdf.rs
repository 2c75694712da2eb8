use super::{Cell, HEADERS, record_cells};
use crate::models::KpiRecord;

// A4 landscape, in points.
const PAGE_WIDTH: f64 = 842.0;
const PAGE_HEIGHT: f64 = 595.0;
const MARGIN: f64 = 40.0;
const TITLE_SIZE: f64 = 12.0;
const FONT_SIZE: f64 = 8.0;
const ROW_HEIGHT: f64 = 14.0;
const LINE_HEIGHT: f64 = 10.0;
const TITLE_Y: f64 = PAGE_HEIGHT - MARGIN - TITLE_SIZE;
const HEADER_Y: f64 = TITLE_Y - 28.0;
const COLUMN_WIDTHS: [f64; 9] = [40.0, 36.0, 90.0, 100.0, 80.0, 80.0, 72.0, 72.0, 192.0];

/// One table row, or the part of it that landed on a page. `cells` holds the
/// wrapped lines of each column.
struct PlacedRow {
    top: f64,
    cells: Vec<Vec<String>>,
}

/// Uncompressed PDF 1.4 with the base-14 Helvetica fonts. The title sits on
/// the first page; the header row repeats on every page. Long cell text wraps
/// onto extra lines and the row grows to fit.
pub fn write_report(title: &str, rows: &[&KpiRecord]) -> Vec<u8> {
    let pages = layout(rows);

    // 1 catalog, 2 page tree, 3-4 fonts, then a page and its content per page.
    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(4 + pages.len() * 2);
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    let kids = (0..pages.len())
        .map(|index| format!("{} 0 R", 5 + index * 2))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", pages.len()).into_bytes());
    objects.push(font_object("Helvetica"));
    objects.push(font_object("Helvetica-Bold"));

    for (index, page) in pages.iter().enumerate() {
        let content_id = 6 + index * 2;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {content_id} 0 R >>"
            )
            .into_bytes(),
        );
        let stream = page_content((index == 0).then_some(title), page);
        let mut object = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        object.extend_from_slice(&stream);
        object.extend_from_slice(b"\nendstream");
        objects.push(object);
    }

    let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}

/// Places rows top to bottom, starting a new page when a row no longer fits.
/// A row taller than a whole page is split and continues on the next one.
fn layout(rows: &[&KpiRecord]) -> Vec<Vec<PlacedRow>> {
    let mut pages: Vec<Vec<PlacedRow>> = vec![Vec::new()];
    let mut cursor = HEADER_Y;
    for record in rows {
        let cells: Vec<Vec<String>> = record_cells(record)
            .into_iter()
            .zip(COLUMN_WIDTHS)
            .map(|(cell, width)| wrap(&Cell::to_text(cell), width))
            .collect();
        let height = cells.iter().map(Vec::len).max().unwrap_or(1);

        let page_has_rows = pages.last().is_some_and(|page| !page.is_empty());
        if page_has_rows && lines_below(cursor) < height && height <= lines_below(HEADER_Y) {
            pages.push(Vec::new());
            cursor = HEADER_Y;
        }

        let mut start = 0;
        while start < height {
            let room = lines_below(cursor);
            if room == 0 {
                pages.push(Vec::new());
                cursor = HEADER_Y;
                continue;
            }
            let take = room.min(height - start);
            let part = cells
                .iter()
                .map(|lines| lines.iter().skip(start).take(take).cloned().collect())
                .collect();
            if let Some(page) = pages.last_mut() {
                page.push(PlacedRow {
                    top: cursor - ROW_HEIGHT,
                    cells: part,
                });
            }
            cursor -= ROW_HEIGHT + (take - 1) as f64 * LINE_HEIGHT;
            start += take;
        }
    }
    pages
}

/// Text lines that fit between a row starting at `cursor` and the bottom margin.
fn lines_below(cursor: f64) -> usize {
    let first = cursor - ROW_HEIGHT;
    if first < MARGIN {
        0
    } else {
        ((first - MARGIN) / LINE_HEIGHT) as usize + 1
    }
}

fn font_object(base: &str) -> Vec<u8> {
    format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>")
        .into_bytes()
}

fn page_content(title: Option<&str>, rows: &[PlacedRow]) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(title) = title {
        push_text(&mut out, "F2", TITLE_SIZE, MARGIN, TITLE_Y, title);
    }

    let mut x = MARGIN;
    for (label, width) in HEADERS.iter().zip(COLUMN_WIDTHS) {
        push_text(&mut out, "F2", FONT_SIZE, x, HEADER_Y, label);
        x += width;
    }
    let rule_y = HEADER_Y - 4.0;
    out.extend_from_slice(
        format!("0.5 w {MARGIN} {rule_y} m {} {rule_y} l S\n", PAGE_WIDTH - MARGIN).as_bytes(),
    );

    for row in rows {
        let mut x = MARGIN;
        for (lines, width) in row.cells.iter().zip(COLUMN_WIDTHS) {
            for (index, line) in lines.iter().enumerate() {
                let y = row.top - LINE_HEIGHT * index as f64;
                push_text(&mut out, "F1", FONT_SIZE, x, y, line);
            }
            x += width;
        }
    }
    out
}

fn push_text(out: &mut Vec<u8>, font: &str, size: f64, x: f64, y: f64, text: &str) {
    out.extend_from_slice(format!("BT /{font} {size} Tf {x:.2} {y:.2} Td (").as_bytes());
    out.extend_from_slice(&encode_text(text));
    out.extend_from_slice(b") Tj ET\n");
}

/// Breaks text into lines that fit a column, using an average Helvetica glyph
/// width. Lines break after whitespace where possible; a word longer than the
/// column is split. The lines concatenate back to the original text.
fn wrap(text: &str, width: f64) -> Vec<String> {
    let max_chars = ((width / (FONT_SIZE * 0.55)) as usize).max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut count = 0;
    for word in text.split_inclusive(char::is_whitespace) {
        let visible = word.trim_end().chars().count();
        if count > 0 && count + visible > max_chars {
            lines.push(std::mem::take(&mut line));
            count = 0;
        }
        for ch in word.chars() {
            if count >= max_chars && !ch.is_whitespace() {
                lines.push(std::mem::take(&mut line));
                count = 0;
            }
            line.push(ch);
            count += 1;
        }
    }
    lines.push(line);
    lines
}

/// WinAnsi bytes for a PDF literal string. Latin-1 maps directly; anything
/// else prints as '?'.
fn encode_text(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let byte = match ch {
            '\t' | '\n' | '\r' => b' ',
            ' '..='~' => ch as u8,
            '\u{A0}'..='\u{FF}' => ch as u32 as u8,
            _ => b'?',
        };
        if matches!(byte, b'(' | b')' | b'\\') {
            bytes.push(b'\\');
        }
        bytes.push(byte);
    }
    bytes
}
