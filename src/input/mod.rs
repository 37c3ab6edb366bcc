//! Module defining the parsing logic converting uploaded lines into validated bank slips.

use std::str::FromStr;

use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::Decimal;
use tracing::warn;

use crate::domain::{BankSlip, BankSlipBatch, DebtId, FileId};
use crate::error::{RowError, invalid_value};


pub const FIELD_DELIMITER: u8 = b',';
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) const COLUMN_NAME: &str = "name";
pub(crate) const COLUMN_GOVERNMENT_ID: &str = "governmentId";
pub(crate) const COLUMN_EMAIL: &str = "email";
pub(crate) const COLUMN_DEBT_AMOUNT: &str = "debtAmount";
pub(crate) const COLUMN_DEBT_DUE_DATE: &str = "debtDueDate";
pub(crate) const COLUMN_DEBT_ID: &str = "debtId";

/// Parses one line against the header line of its file.
pub fn parse_row(file_id: &FileId, line: &str, header: &str) -> Result<BankSlip, RowError> {
    let layout = RowLayout::from_header(header)?;
    let record = match row_reader(line).records().next() {
        Some(result) => result.map_err(|e| RowError::Unreadable(e.to_string()))?,
        None => StringRecord::new(),
    };
    layout.parse(file_id, &record)
}

/// Parses every non-empty line of a chunk into a batch. Lines that fail to parse are reported through `on_error`
/// (together with their index inside the chunk) and left out of the batch.
pub fn parse_chunk(
    file_id: &FileId,
    data: &str,
    header: &str,
    mut on_error: impl FnMut(usize, RowError),
) -> BankSlipBatch {
    let layout = RowLayout::from_header(header);
    let mut batch = BankSlipBatch::new();

    for result in row_reader(data).records() {
        let parsed = match result {
            Ok(record) if is_blank(&record) => continue,
            Ok(record) => match &layout {
                Ok(layout) => layout.parse(file_id, &record).map_err(|e| (line_index(record.position()), e)),
                Err(e) => Err((line_index(record.position()), e.clone())),
            },
            Err(e) => Err((line_index(e.position()), RowError::Unreadable(e.to_string()))),
        };
        match parsed {
            Ok(slip) => {
                batch.insert(slip);
            }
            Err((idx, e)) => on_error(idx, e),
        }
    }

    batch
}

/// Reader splitting plain delimited lines. Quotes carry no meaning and rows may differ in length, the length is
/// checked against the header by [`RowLayout::parse`]. Empty lines are skipped by the reader itself.
fn row_reader(data: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .delimiter(FIELD_DELIMITER)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes())
}

// whitespace-only lines come out as a single empty field
fn is_blank(record: &StringRecord) -> bool {
    record.len() == 1 && record[0].is_empty()
}

fn line_index(position: Option<&csv::Position>) -> usize {
    position.map_or(0, |p| p.line().saturating_sub(1) as usize)
}

/// Logs every dropped line.
pub(crate) fn log_row_error(file_id: &FileId) -> impl FnMut(usize, RowError) + '_ {
    move |line, error| warn!(%file_id, line, "dropping row: {error}")
}

/// Positions of the six logical columns inside the header.
///
/// Columns are found by case-sensitive substring match, so `"debtAmount (BRL)"` still maps to the amount.
/// The first header token containing the column name wins: a header token such as `"debtIdName"` would be picked
/// for `name` if it comes before the real name column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowLayout {
    field_count: usize,
    name: usize,
    government_id: usize,
    email: usize,
    debt_amount: usize,
    debt_due_date: usize,
    debt_id: usize,
}

impl RowLayout {
    pub(crate) fn from_header(header: &str) -> Result<Self, RowError> {
        let tokens = row_reader(header)
            .records()
            .next()
            .and_then(Result::ok)
            .unwrap_or_default();
        let position = |column: &'static str| {
            tokens
                .iter()
                .position(|token| token.contains(column))
                .ok_or(RowError::MissingColumn { column })
        };

        Ok(Self {
            field_count: tokens.len(),
            name: position(COLUMN_NAME)?,
            government_id: position(COLUMN_GOVERNMENT_ID)?,
            email: position(COLUMN_EMAIL)?,
            debt_amount: position(COLUMN_DEBT_AMOUNT)?,
            debt_due_date: position(COLUMN_DEBT_DUE_DATE)?,
            debt_id: position(COLUMN_DEBT_ID)?,
        })
    }

    pub(crate) fn parse(&self, file_id: &FileId, fields: &StringRecord) -> Result<BankSlip, RowError> {
        if file_id.is_empty() {
            return Err(RowError::MissingFileId);
        }

        if fields.len() != self.field_count {
            return Err(RowError::LengthMismatch {
                file_id: file_id.to_string(),
                expected: self.field_count,
                found: fields.len(),
            });
        }

        let raw_government_id = &fields[self.government_id];
        let government_id = raw_government_id.parse::<i64>().map_err(|_| {
            invalid_value(
                file_id.as_str(),
                COLUMN_GOVERNMENT_ID,
                raw_government_id,
                self.government_id,
            )
        })?;

        let raw_amount = &fields[self.debt_amount];
        let debt_amount = Decimal::from_str(raw_amount).map_err(|_| {
            invalid_value(
                file_id.as_str(),
                COLUMN_DEBT_AMOUNT,
                raw_amount,
                self.debt_amount,
            )
        })?;

        let raw_due_date = &fields[self.debt_due_date];
        let debt_due_date =
            NaiveDate::parse_from_str(raw_due_date, DUE_DATE_FORMAT).map_err(|_| {
                invalid_value(
                    file_id.as_str(),
                    COLUMN_DEBT_DUE_DATE,
                    raw_due_date,
                    self.debt_due_date,
                )
            })?;

        Ok(BankSlip::new(
            DebtId::new(&fields[self.debt_id]),
            debt_amount,
            debt_due_date,
            government_id,
            &fields[self.name],
            &fields[self.email],
            file_id.clone(),
        ))
    }
}
