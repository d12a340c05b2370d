pub mod columns;
pub mod config;
pub mod csv;
pub mod match_engine;
pub mod sign;
pub mod staging;
pub(crate) mod util;

pub use columns::{ColumnIndices, ColumnType, Verdict, SUPPORTED_INSTITUTIONS};
pub use config::{ConfigError, NearMatchTolerance, ReconcileConfig};
pub use csv::{ActivityError, ActivityParser, RawActivityTable};
pub use match_engine::{
    ActivityMatch, ActivityMatchmaker, BestMatch, BestMatches, MatchFinder, MatchKind,
    MatchReport, MatchSummary, MatchedActivity,
};
pub use sign::SignConvention;
pub use staging::{ActivityLoader, ActivitySource, ActivityUpload, BufferedUpload};

pub mod import {
    use crate::*;
    use std::path::Path;
    use tally_core::{ActivityRecordSet, RecordedTransaction};

    pub fn import_activity_csv<R: std::io::Read>(
        data: R,
    ) -> Result<ActivityRecordSet, crate::csv::ActivityError> {
        crate::csv::import_activity_csv(data)
    }

    pub fn parse_transaction_activity_file(
        source: ActivitySource<'_>,
        staging_dir: &Path,
    ) -> Result<Option<ActivityRecordSet>, ActivityError> {
        crate::staging::parse_transaction_activity_file(source, staging_dir)
    }

    pub fn reconcile<'a, T: RecordedTransaction>(
        transactions: &'a [T],
        activities: &'a ActivityRecordSet,
        config: &ReconcileConfig,
    ) -> MatchReport<'a, T> {
        ActivityMatchmaker::new(config.near_match).reconcile(transactions, activities)
    }
}
