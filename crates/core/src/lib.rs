pub mod activity;
pub mod date;
pub mod money;
pub mod transaction;

pub use activity::{ActivityGroup, ActivityGroupError, ActivityRecord, ActivityRecordSet};
pub use date::{parse_date, DateParseError, IntoActivityDate};
pub use money::{AmountParseError, Money};
pub use transaction::{LedgerTransaction, RecordedTransaction};
