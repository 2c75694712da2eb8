use super::{Cell, ExportError, HEADERS, record_cells};
use crate::models::KpiRecord;

pub fn write_csv(rows: &[&KpiRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for record in rows {
        writer.write_record(record_cells(record).into_iter().map(Cell::to_text))?;
    }
    writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))
}
