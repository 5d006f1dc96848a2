use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader as WorkbookReader};
use chrono::{Days, NaiveDate};
use log::{debug, info};

use crate::dates;
use crate::error::{MarketDashError, Result};
use crate::money;
use crate::schema::AdSpendPayload;

const DATE_ALIASES: [&str; 3] = ["data", "date", "dia"];
const SUBID_ALIASES: [&str; 4] = ["sub_id", "subid", "canal", "channel"];
const AMOUNT_ALIASES: [&str; 4] = ["valor", "value", "amount", "gasto"];

/// Outcome of a bulk ad-spend import. Rows that fail to yield a valid date
/// or a positive amount are dropped silently and only counted, so the UI
/// can report "N rows inserted".
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub payloads: Vec<AdSpendPayload>,
    pub skipped: usize,
}

impl ImportBatch {
    pub fn inserted(&self) -> usize {
        self.payloads.len()
    }

    fn push_row(&mut self, date: Option<&str>, sub_id: Option<&str>, amount: Option<&str>) {
        let date = date.and_then(dates::parse_flexible);
        let amount = amount.map(money::parse_amount_str).unwrap_or(0.0);

        match date {
            Some(date) if amount > 0.0 => {
                let sub_id = sub_id
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string);
                self.payloads.push(AdSpendPayload {
                    date,
                    amount,
                    sub_id,
                });
            }
            _ => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ColumnMap {
    date: Option<usize>,
    sub_id: Option<usize>,
    amount: Option<usize>,
}

fn map_headers(headers: &[String]) -> Result<ColumnMap> {
    let mut map = ColumnMap::default();
    for (i, header) in headers.iter().enumerate() {
        let name = header.trim().to_lowercase();
        if map.date.is_none() && DATE_ALIASES.contains(&name.as_str()) {
            map.date = Some(i);
        } else if map.sub_id.is_none() && SUBID_ALIASES.contains(&name.as_str()) {
            map.sub_id = Some(i);
        } else if map.amount.is_none() && AMOUNT_ALIASES.contains(&name.as_str()) {
            map.amount = Some(i);
        }
    }

    if map.date.is_none() || map.amount.is_none() {
        return Err(MarketDashError::ImportError(format!(
            "required columns not found (expected '{}' and '{}', got: {})",
            DATE_ALIASES[0],
            AMOUNT_ALIASES[0],
            headers.join(", ")
        )));
    }
    Ok(map)
}

/// Parses a three-column ad-spend CSV (`data`, `sub_id`, `valor`). Header
/// names are matched case-insensitively against the known aliases.
pub fn parse_ad_spend_csv<R: Read>(reader: R) -> Result<ImportBatch> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let map = map_headers(&headers)?;

    let mut batch = ImportBatch::default();
    for record in rdr.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                debug!("dropping malformed CSV record: {}", err);
                batch.skipped += 1;
                continue;
            }
        };
        batch.push_row(
            map.date.and_then(|i| record.get(i)),
            map.sub_id.and_then(|i| record.get(i)),
            map.amount.and_then(|i| record.get(i)),
        );
    }

    info!(
        "ad-spend CSV import: {} rows accepted, {} skipped",
        batch.inserted(),
        batch.skipped
    );
    Ok(batch)
}

// Excel serial 0 corresponds to 1899-12-30 in practice; that base already
// absorbs the phantom 1900-02-29 for every modern serial.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    let days = serial.floor();
    if days < 0.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_days(Days::new(days as u64))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(serial) => excel_serial_to_date(serial.as_f64())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// Parses the first sheet of an XLSX/ODS workbook with the same column
/// contract as the CSV path.
pub fn parse_ad_spend_workbook(path: &Path) -> Result<ImportBatch> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| MarketDashError::ImportError("workbook has no sheets".to_string()))?;
    let range = workbook.worksheet_range(&sheet)?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(cell_to_string).collect())
        .unwrap_or_default();
    let map = map_headers(&headers)?;

    let cell = |row: &[Data], idx: Option<usize>| -> Option<String> {
        idx.and_then(|i| row.get(i)).map(cell_to_string)
    };

    let mut batch = ImportBatch::default();
    for row in rows {
        batch.push_row(
            cell(row, map.date).as_deref(),
            cell(row, map.sub_id).as_deref(),
            cell(row, map.amount).as_deref(),
        );
    }

    info!(
        "ad-spend workbook import ({}): {} rows accepted, {} skipped",
        sheet,
        batch.inserted(),
        batch.skipped
    );
    Ok(batch)
}

/// Dispatches on the file extension: `.csv` goes through the CSV reader,
/// spreadsheet formats through calamine.
pub fn import_ad_spend_file(path: &Path) -> Result<ImportBatch> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => parse_ad_spend_csv(File::open(path)?),
        "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => parse_ad_spend_workbook(path),
        other => Err(MarketDashError::UnsupportedFormat(other.to_string())),
    }
}
