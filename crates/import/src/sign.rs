use serde::{Deserialize, Serialize};
use tally_core::Money;

use crate::columns::ColumnIndices;
use crate::csv::{parse_row_amount, ActivityError};

/// How an export signs its amounts.
///
/// The ledger convention is always charges positive, payments negative;
/// exports that report payments as positive are flipped on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignConvention {
    PaymentsPositive,
    PaymentsNegative,
}

impl SignConvention {
    pub fn payments_are_positive(self) -> bool {
        matches!(self, SignConvention::PaymentsPositive)
    }

    /// Converts a raw amount from the export into the ledger convention.
    pub fn normalize(self, raw: Money) -> Money {
        match self {
            SignConvention::PaymentsPositive => -raw,
            SignConvention::PaymentsNegative => raw,
        }
    }

    /// Infers the convention from the data rows.
    ///
    /// Rows whose contextual columns mention a payment decide it directly.
    /// Without any, the rows are assumed to be mostly charges and the
    /// majority sign wins; an even split is ambiguous.
    pub fn infer<S: AsRef<str>>(
        rows: &[Vec<S>],
        indices: &ColumnIndices,
    ) -> Result<Self, ActivityError> {
        let contextual = indices.contextual();
        let mut payment_amounts = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            if is_payment_row(row, &contextual) {
                payment_amounts.push(parse_row_amount(row, i, indices.total)?);
            }
        }

        let convention = if payment_amounts.is_empty() {
            let amounts = rows
                .iter()
                .enumerate()
                .map(|(i, row)| parse_row_amount(row, i, indices.total))
                .collect::<Result<Vec<_>, _>>()?;
            Self::from_assumed_charges(&amounts)
        } else {
            Self::from_payments(&payment_amounts)
        };

        let convention = convention.ok_or(ActivityError::AmbiguousSignConvention)?;
        tracing::debug!(
            ?convention,
            payment_rows = payment_amounts.len(),
            "inferred sign convention"
        );
        Ok(convention)
    }

    fn from_payments(amounts: &[Money]) -> Option<Self> {
        if amounts.iter().all(|amount| amount.is_positive()) {
            Some(SignConvention::PaymentsPositive)
        } else if !amounts.iter().any(|amount| amount.is_positive()) {
            Some(SignConvention::PaymentsNegative)
        } else {
            None
        }
    }

    fn from_assumed_charges(amounts: &[Money]) -> Option<Self> {
        let negative = amounts.iter().filter(|amount| amount.is_negative()).count();
        match (2 * negative).cmp(&amounts.len()) {
            std::cmp::Ordering::Equal => None,
            std::cmp::Ordering::Greater => Some(SignConvention::PaymentsPositive),
            std::cmp::Ordering::Less => Some(SignConvention::PaymentsNegative),
        }
    }
}

/// A row is a payment if any contextual value mentions one.
fn is_payment_row<S: AsRef<str>>(row: &[S], contextual: &[usize]) -> bool {
    contextual.iter().any(|&i| {
        row.get(i)
            .is_some_and(|value| value.as_ref().to_lowercase().contains("payment"))
    })
}
