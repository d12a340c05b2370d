//! Header inference for issuer activity exports.
//!
//! Exports are not standardized, so each semantic column is located by a
//! recognizer that may answer "yes", "no", or "maybe". A lone "maybe" is
//! accepted by elimination.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::csv::ActivityError;

/// Issuer export formats known to parse.
pub const SUPPORTED_INSTITUTIONS: &[&str] = &["Chase", "Discover"];

pub fn supported_institutions() -> Vec<String> {
    SUPPORTED_INSTITUTIONS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    TransactionDate,
    Total,
    Description,
    Category,
    Type,
}

/// A recognizer's answer for a single column title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Ambiguous,
    NoMatch,
}

impl ColumnType {
    pub const ALL: [ColumnType; 5] = [
        ColumnType::TransactionDate,
        ColumnType::Total,
        ColumnType::Description,
        ColumnType::Category,
        ColumnType::Type,
    ];

    pub const MANDATORY: [ColumnType; 3] = [
        ColumnType::TransactionDate,
        ColumnType::Total,
        ColumnType::Description,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::TransactionDate => "transaction_date",
            ColumnType::Total => "total",
            ColumnType::Description => "description",
            ColumnType::Category => "category",
            ColumnType::Type => "type",
        }
    }

    /// Classifies an already standardized (trimmed, lower-cased) title.
    pub fn check(self, title: &str) -> Verdict {
        let definite = |matched: bool| if matched { Verdict::Match } else { Verdict::NoMatch };
        match self {
            ColumnType::TransactionDate => {
                if title == "transaction date" {
                    Verdict::Match
                } else if title.split_whitespace().any(|word| word == "date")
                    && title.contains("trans.")
                {
                    Verdict::Match
                } else if title == "date" || title == "posted date" {
                    Verdict::Ambiguous
                } else {
                    Verdict::NoMatch
                }
            }
            ColumnType::Total => definite(matches!(title, "amount" | "total")),
            ColumnType::Description => {
                definite(matches!(title, "description" | "desc." | "payee"))
            }
            ColumnType::Category => definite(title == "category"),
            ColumnType::Type => definite(title == "type"),
        }
    }

    /// Locates this column in `header`, or `None` if it cannot be resolved.
    pub fn determine_index<S: AsRef<str>>(self, header: &[S]) -> Option<usize> {
        let mut potential = Vec::new();
        for (index, title) in header.iter().enumerate() {
            let standardized = title.as_ref().trim().to_lowercase();
            match self.check(&standardized) {
                Verdict::Match => return Some(index),
                Verdict::Ambiguous => potential.push(index),
                Verdict::NoMatch => {}
            }
        }

        match potential.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved positions of the activity columns within a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnIndices {
    pub transaction_date: usize,
    pub total: usize,
    pub description: usize,
    pub category: Option<usize>,
    pub kind: Option<usize>,
}

impl ColumnIndices {
    /// Resolves every column, failing if a mandatory one is missing.
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Result<Self, ActivityError> {
        let require = |column: ColumnType| {
            column
                .determine_index(header)
                .ok_or_else(|| ActivityError::UnrecognizedFormat {
                    column,
                    supported: supported_institutions(),
                })
        };

        let indices = ColumnIndices {
            transaction_date: require(ColumnType::TransactionDate)?,
            total: require(ColumnType::Total)?,
            description: require(ColumnType::Description)?,
            category: ColumnType::Category.determine_index(header),
            kind: ColumnType::Type.determine_index(header),
        };
        tracing::debug!(?indices, "resolved activity columns");
        Ok(indices)
    }

    /// Indices of the columns that hint at whether a row is a payment.
    pub fn contextual(&self) -> Vec<usize> {
        [self.category, Some(self.description), self.kind]
            .into_iter()
            .flatten()
            .collect()
    }
}
