use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

use super::money::Money;

/// A transaction already recorded in the ledger, as seen by reconciliation.
///
/// Totals use the same sign convention as [`ActivityRecord`](crate::ActivityRecord).
/// Identity is by [`id`](RecordedTransaction::id) alone.
pub trait RecordedTransaction {
    type Id: Clone + Eq + Hash + Debug;

    fn id(&self) -> Self::Id;
    fn transaction_date(&self) -> NaiveDate;
    fn total(&self) -> Money;
    fn merchant(&self) -> &str;
    fn notes(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: i64,
    pub transaction_date: NaiveDate,
    pub total: Money,
    pub merchant: String,
    #[serde(default)]
    pub notes: String,
}

impl LedgerTransaction {
    pub fn new(
        id: i64,
        transaction_date: NaiveDate,
        total: Money,
        merchant: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        LedgerTransaction {
            id,
            transaction_date,
            total,
            merchant: merchant.into(),
            notes: notes.into(),
        }
    }
}

impl RecordedTransaction for LedgerTransaction {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }

    fn transaction_date(&self) -> NaiveDate {
        self.transaction_date
    }

    fn total(&self) -> Money {
        self.total
    }

    fn merchant(&self) -> &str {
        &self.merchant
    }

    fn notes(&self) -> &str {
        &self.notes
    }
}

impl<T: RecordedTransaction> RecordedTransaction for &T {
    type Id = T::Id;

    fn id(&self) -> Self::Id {
        (**self).id()
    }

    fn transaction_date(&self) -> NaiveDate {
        (**self).transaction_date()
    }

    fn total(&self) -> Money {
        (**self).total()
    }

    fn merchant(&self) -> &str {
        (**self).merchant()
    }

    fn notes(&self) -> &str {
        (**self).notes()
    }
}
