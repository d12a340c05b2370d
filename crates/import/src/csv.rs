use serde::{Deserialize, Serialize};
use std::io::Read;
use tally_core::{
    parse_date, ActivityRecord, ActivityRecordSet, AmountParseError, DateParseError, Money,
};
use thiserror::Error;

use crate::columns::{ColumnIndices, ColumnType};
use crate::sign::SignConvention;

#[derive(Error, Debug)]
pub enum ActivityError {
    #[error("The activity file contains no actionable data")]
    NoActionableData,
    #[error("No activity file was specified.")]
    NoFileSpecified,
    #[error("Unrecognized activity format: no '{column}' column could be identified")]
    UnrecognizedFormat {
        column: ColumnType,
        supported: Vec<String>,
    },
    #[error("Could not determine whether the activity reports payments as positive or negative")]
    AmbiguousSignConvention,
    #[error("Row {row} is missing the '{column}' field")]
    MissingField { row: usize, column: ColumnType },
    #[error("Row {row}: {source}")]
    InvalidDate { row: usize, source: DateParseError },
    #[error("Row {row}: {source}")]
    InvalidAmount { row: usize, source: AmountParseError },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActivityError {
    /// Failures to obtain the file at all, as opposed to failures to read it.
    pub fn is_loading_error(&self) -> bool {
        matches!(self, ActivityError::NoFileSpecified | ActivityError::Io(_))
    }

    /// Guidance suitable for showing to whoever supplied the file.
    pub fn user_message(&self) -> String {
        match self {
            ActivityError::UnrecognizedFormat { supported, .. } => format!(
                "The format of the activity file was not recognized. \
                 Currently supported formats include: {}.",
                supported.join(", ")
            ),
            other => other.to_string(),
        }
    }
}

/// Returns the value of `column` in a data row (0-based `row_index`).
pub(crate) fn field<S: AsRef<str>>(
    row: &[S],
    row_index: usize,
    column: ColumnType,
    index: usize,
) -> Result<&str, ActivityError> {
    row.get(index)
        .map(AsRef::as_ref)
        .ok_or(ActivityError::MissingField {
            row: row_index + 1,
            column,
        })
}

pub(crate) fn parse_row_amount<S: AsRef<str>>(
    row: &[S],
    row_index: usize,
    index: usize,
) -> Result<Money, ActivityError> {
    field(row, row_index, ColumnType::Total, index)?
        .parse::<Money>()
        .map_err(|source| ActivityError::InvalidAmount {
            row: row_index + 1,
            source,
        })
}

/// A header row plus data rows, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawActivityTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawActivityTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Reads a comma-delimited export whose first line is the header.
    pub fn read<R: Read>(data: R) -> Result<Self, ActivityError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(data);

        let header = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { header, rows })
    }
}

pub struct ActivityParser;

impl ActivityParser {
    /// Interprets a raw table as activity records in the ledger sign convention.
    ///
    /// Either every row is converted or an error is returned.
    pub fn parse_table(table: &RawActivityTable) -> Result<ActivityRecordSet, ActivityError> {
        if table.rows.is_empty() {
            return Err(ActivityError::NoActionableData);
        }

        let indices = ColumnIndices::from_header(&table.header)?;
        let convention = SignConvention::infer(&table.rows, &indices)?;

        let records = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| Self::parse_row(row, i, &indices, convention))
            .collect::<Result<ActivityRecordSet, _>>()?;

        tracing::info!(
            records = records.len(),
            payments_are_positive = convention.payments_are_positive(),
            "parsed activity"
        );
        Ok(records)
    }

    pub fn parse_reader<R: Read>(data: R) -> Result<ActivityRecordSet, ActivityError> {
        Self::parse_table(&RawActivityTable::read(data)?)
    }

    fn parse_row(
        row: &[String],
        row_index: usize,
        indices: &ColumnIndices,
        convention: SignConvention,
    ) -> Result<ActivityRecord, ActivityError> {
        let date_text = field(
            row,
            row_index,
            ColumnType::TransactionDate,
            indices.transaction_date,
        )?;
        let transaction_date =
            parse_date(date_text).map_err(|source| ActivityError::InvalidDate {
                row: row_index + 1,
                source,
            })?;
        let total = convention.normalize(parse_row_amount(row, row_index, indices.total)?);
        let description = field(row, row_index, ColumnType::Description, indices.description)?;

        Ok(ActivityRecord {
            transaction_date,
            total,
            description: description.to_string(),
        })
    }
}

pub fn import_activity_csv<R: Read>(data: R) -> Result<ActivityRecordSet, ActivityError> {
    ActivityParser::parse_reader(data)
}
