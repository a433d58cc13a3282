use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use rust_xlsxwriter::{Format, Workbook};

use crate::error::ExtractError;
use crate::model::{TRANSACTION_COLUMNS, TransactionRecord};

const SHEET_NAME: &str = "Transactions";

fn write_records<W: Write>(
    writer: &mut csv::Writer<W>,
    records: &[TransactionRecord],
) -> Result<(), ExtractError> {
    writer.write_record(TRANSACTION_COLUMNS)?;
    for record in records {
        writer.write_record(record.export_cells())?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv(
    path: &Path,
    records: &[TransactionRecord],
    delimiter: u8,
) -> Result<(), ExtractError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_path(path)?;
    write_records(&mut writer, records)
}

pub fn write_csv_to_string(
    records: &[TransactionRecord],
    delimiter: u8,
) -> Result<String, ExtractError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::<u8>::new());
    write_records(&mut writer, records)?;

    let bytes = writer
        .into_inner()
        .map_err(|error| ExtractError::Io(error.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|error| ExtractError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}

fn build_workbook(records: &[TransactionRecord]) -> Result<Workbook, ExtractError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, title) in (0_u16..).zip(TRANSACTION_COLUMNS) {
        sheet.write_string_with_format(0, col, title, &header)?;
    }
    for (row, record) in (1_u32..).zip(records) {
        for (col, cell) in (0_u16..).zip(record.export_cells()) {
            if !cell.is_empty() {
                sheet.write_string(row, col, cell)?;
            }
        }
    }

    Ok(workbook)
}

/// Renders the transactions as an `.xlsx` workbook held in memory.
pub fn write_xlsx_to_buffer(records: &[TransactionRecord]) -> Result<Vec<u8>, ExtractError> {
    let mut workbook = build_workbook(records)?;
    Ok(workbook.save_to_buffer()?)
}

pub fn write_xlsx(path: &Path, records: &[TransactionRecord]) -> Result<(), ExtractError> {
    let mut workbook = build_workbook(records)?;
    workbook.save(path)?;
    Ok(())
}
