use serde::Serialize;
use std::fmt;
use tally_core::{ActivityRecord, LedgerTransaction};
use tally_import::{BestMatch, MatchKind, MatchReport, MatchSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityOutput {
    pub transaction_date: String,
    pub total: String,
    pub description: String,
}

impl From<&ActivityRecord> for ActivityOutput {
    fn from(activity: &ActivityRecord) -> Self {
        ActivityOutput {
            transaction_date: activity.transaction_date.to_string(),
            total: activity.total.to_string(),
            description: activity.description.clone(),
        }
    }
}

impl fmt::Display for ActivityOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  {:>10}  {}",
            self.transaction_date, self.total, self.description
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionOutput {
    pub id: i64,
    pub transaction_date: String,
    pub total: String,
    pub merchant: String,
    pub notes: String,
}

impl From<&LedgerTransaction> for TransactionOutput {
    fn from(tx: &LedgerTransaction) -> Self {
        TransactionOutput {
            id: tx.id,
            transaction_date: tx.transaction_date.to_string(),
            total: tx.total.to_string(),
            merchant: tx.merchant.clone(),
            notes: tx.notes.clone(),
        }
    }
}

impl fmt::Display for TransactionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<5} {}  {:>10}  {}",
            self.id, self.transaction_date, self.total, self.merchant
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchOutput {
    pub transaction: TransactionOutput,
    pub kind: MatchKind,
    /// Recorded minus reported; only present when they differ.
    pub difference: Option<String>,
    pub activities: Vec<ActivityOutput>,
}

impl From<&BestMatch<'_, LedgerTransaction>> for MatchOutput {
    fn from(m: &BestMatch<'_, LedgerTransaction>) -> Self {
        MatchOutput {
            transaction: TransactionOutput::from(m.transaction),
            kind: m.kind,
            difference: m.is_discrepancy().then(|| m.difference().to_string()),
            activities: m.activity.records().into_iter().map(ActivityOutput::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutput {
    pub summary: MatchSummary,
    pub matches: Vec<MatchOutput>,
    pub unmatched_transactions: Vec<TransactionOutput>,
    pub unmatched_activities: Vec<ActivityOutput>,
}

impl ReconcileOutput {
    pub fn from_report(report: &MatchReport<'_, LedgerTransaction>) -> Self {
        ReconcileOutput {
            summary: report.summary(),
            matches: report.best_matches().iter().map(MatchOutput::from).collect(),
            unmatched_transactions: report
                .unmatched_transactions()
                .into_iter()
                .map(TransactionOutput::from)
                .collect(),
            unmatched_activities: report
                .unmatched_activities()
                .into_iter()
                .map(ActivityOutput::from)
                .collect(),
        }
    }
}

impl fmt::Display for ReconcileOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "━━━ Matched ({}) ━━━", self.matches.len())?;
        for m in &self.matches {
            write!(f, "{}  [{}", m.transaction, m.kind)?;
            if let Some(difference) = &m.difference {
                write!(f, ", off by {difference}")?;
            }
            writeln!(f, "]")?;
            for activity in &m.activities {
                writeln!(f, "    ↳ {activity}")?;
            }
        }

        if !self.unmatched_transactions.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "━━━ Unmatched transactions ({}) ━━━",
                self.unmatched_transactions.len()
            )?;
            for tx in &self.unmatched_transactions {
                writeln!(f, "{tx}")?;
            }
        }

        if !self.unmatched_activities.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "━━━ Unmatched activities ({}) ━━━",
                self.unmatched_activities.len()
            )?;
            for activity in &self.unmatched_activities {
                writeln!(f, "{activity}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{ActivityRecordSet, Money};
    use tally_import::ActivityMatchmaker;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 5, d).unwrap()
    }

    fn ledger() -> Vec<LedgerTransaction> {
        vec![
            LedgerTransaction::new(1, date(31), Money::from_cents(2687), "Water Works", "Water bill"),
            LedgerTransaction::new(2, date(20), Money::from_cents(4500), "Hardware Store", ""),
        ]
    }

    fn activities() -> ActivityRecordSet {
        ActivityRecordSet::from_rows([
            ("2020-05-30", Money::from_cents(2700), "THE WATER WORKS"),
            ("2020-05-25", Money::from_cents(1399), "NETFLIX.COM"),
        ])
        .unwrap()
    }

    #[test]
    fn report_output_lists_every_section() {
        let ledger = ledger();
        let activities = activities();
        let report = ActivityMatchmaker::default().reconcile(&ledger, &activities);
        let output = ReconcileOutput::from_report(&report);

        assert_eq!(output.matches.len(), 1);
        assert_eq!(output.matches[0].kind, MatchKind::Near);
        assert_eq!(output.matches[0].difference.as_deref(), Some("-$0.13"));
        assert_eq!(output.matches[0].activities[0].total, "$27.00");
        assert_eq!(output.unmatched_transactions[0].merchant, "Hardware Store");
        assert_eq!(output.unmatched_activities[0].description, "NETFLIX.COM");

        let text = output.to_string();
        assert!(text.contains("Matched (1)"));
        assert!(text.contains("[near, off by -$0.13]"));
        assert!(text.contains("Unmatched transactions (1)"));
        assert!(text.contains("NETFLIX.COM"));
        assert!(text.ends_with(&format!("{}\n", output.summary)));
    }

    #[test]
    fn report_serializes_to_json() {
        let ledger = ledger();
        let activities = activities();
        let report = ActivityMatchmaker::default().reconcile(&ledger, &activities);
        let json = serde_json::to_value(ReconcileOutput::from_report(&report)).unwrap();

        assert_eq!(json["summary"]["matched"], 1);
        assert_eq!(json["summary"]["discrepancies"], 1);
        assert_eq!(json["matches"][0]["kind"], "near");
        assert_eq!(json["matches"][0]["transaction"]["id"], 1);
        assert_eq!(json["unmatched_activities"][0]["transaction_date"], "2020-05-25");
    }

    #[test]
    fn activity_line() {
        let record = ActivityRecord::new("2020-05-30", Money::from_cents(-5000), "Payment").unwrap();
        assert_eq!(
            ActivityOutput::from(&record).to_string(),
            "2020-05-30     -$50.00  Payment"
        );
    }
}
