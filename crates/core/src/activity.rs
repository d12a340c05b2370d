use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::ops::Index;
use thiserror::Error;

use super::date::{DateParseError, IntoActivityDate};
use super::money::Money;

/// One line of transaction activity as reported by a card issuer.
///
/// Totals follow the ledger convention: charges are positive, payments and
/// credits are negative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub transaction_date: NaiveDate,
    pub total: Money,
    pub description: String,
}

impl ActivityRecord {
    pub fn new(
        transaction_date: impl IntoActivityDate,
        total: Money,
        description: impl Into<String>,
    ) -> Result<Self, DateParseError> {
        Ok(ActivityRecord {
            transaction_date: transaction_date.into_activity_date()?,
            total,
            description: description.into(),
        })
    }
}

/// An ordered batch of reported activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityRecordSet(Vec<ActivityRecord>);

impl ActivityRecordSet {
    pub fn new(records: Vec<ActivityRecord>) -> Self {
        ActivityRecordSet(records)
    }

    /// Builds a set from `(date, total, description)` rows; dates may be
    /// `NaiveDate` values or strings.
    pub fn from_rows<I, D, S>(rows: I) -> Result<Self, DateParseError>
    where
        I: IntoIterator<Item = (D, Money, S)>,
        D: IntoActivityDate,
        S: Into<String>,
    {
        rows.into_iter()
            .map(|(date, total, description)| ActivityRecord::new(date, total, description))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ActivityRecord> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActivityRecord> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ActivityRecord] {
        &self.0
    }

    /// The sum of every record's total.
    pub fn total(&self) -> Money {
        self.0.iter().map(|record| record.total).sum()
    }
}

impl Index<usize> for ActivityRecordSet {
    type Output = ActivityRecord;

    fn index(&self, index: usize) -> &ActivityRecord {
        &self.0[index]
    }
}

impl FromIterator<ActivityRecord> for ActivityRecordSet {
    fn from_iter<I: IntoIterator<Item = ActivityRecord>>(iter: I) -> Self {
        ActivityRecordSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ActivityRecordSet {
    type Item = &'a ActivityRecord;
    type IntoIter = std::slice::Iter<'a, ActivityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for ActivityRecordSet {
    type Item = ActivityRecord;
    type IntoIter = std::vec::IntoIter<ActivityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivityGroupError {
    #[error("An activity group must contain at least one activity")]
    Empty,
    #[error("Grouped activities must share a transaction date ({expected} != {found})")]
    MixedDates { expected: NaiveDate, found: NaiveDate },
    #[error("Grouped activities must share a description ('{expected}' != '{found}')")]
    MixedDescriptions { expected: String, found: String },
}

/// Several activity records that together represent one real-world
/// transaction, e.g. a merchant charge split across multiple lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityGroup {
    activities: Vec<ActivityRecord>,
}

impl ActivityGroup {
    pub fn new(
        activities: impl IntoIterator<Item = ActivityRecord>,
    ) -> Result<Self, ActivityGroupError> {
        let activities: Vec<ActivityRecord> = activities.into_iter().collect();
        let first = activities.first().ok_or(ActivityGroupError::Empty)?;

        for activity in &activities[1..] {
            if activity.transaction_date != first.transaction_date {
                return Err(ActivityGroupError::MixedDates {
                    expected: first.transaction_date,
                    found: activity.transaction_date,
                });
            }
            if activity.description != first.description {
                return Err(ActivityGroupError::MixedDescriptions {
                    expected: first.description.clone(),
                    found: activity.description.clone(),
                });
            }
        }

        Ok(ActivityGroup { activities })
    }

    pub fn transaction_date(&self) -> NaiveDate {
        self.activities[0].transaction_date
    }

    pub fn description(&self) -> &str {
        &self.activities[0].description
    }

    pub fn total(&self) -> Money {
        self.activities.iter().map(|activity| activity.total).sum()
    }

    pub fn contains(&self, activity: &ActivityRecord) -> bool {
        self.activities.contains(activity)
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActivityRecord> {
        self.activities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dollars(n: i64) -> Money {
        Money::from_cents(n * 100)
    }

    fn sample_rows() -> Vec<(NaiveDate, Money, &'static str)> {
        vec![
            (date(2020, 1, 1), dollars(100), "description0"),
            (date(2020, 2, 1), dollars(200), "description1"),
            (date(2020, 3, 1), dollars(300), "description2"),
        ]
    }

    #[test]
    fn record_set_preserves_row_order() {
        let rows = sample_rows();
        let activities = ActivityRecordSet::from_rows(rows.clone()).unwrap();
        assert_eq!(activities.len(), 3);
        for (activity, (date, total, description)) in activities.iter().zip(rows) {
            assert_eq!(activity.transaction_date, date);
            assert_eq!(activity.total, total);
            assert_eq!(activity.description, description);
        }
    }

    #[test]
    fn record_set_accepts_date_strings() {
        let rows = sample_rows();
        let activities = ActivityRecordSet::from_rows(
            rows.iter()
                .map(|(date, total, description)| (date.to_string(), *total, *description)),
        )
        .unwrap();
        for (activity, (date, _, _)) in activities.iter().zip(rows) {
            assert_eq!(activity.transaction_date, date);
        }
    }

    #[test]
    fn record_set_rejects_invalid_date() {
        let result = ActivityRecordSet::from_rows([("invalid", dollars(100), "description0")]);
        assert!(result.is_err());
    }

    #[test]
    fn record_set_total() {
        let activities = ActivityRecordSet::from_rows(sample_rows()).unwrap();
        assert_eq!(activities.total(), dollars(600));
        assert_eq!(ActivityRecordSet::default().total(), Money::zero());
    }

    fn group_rows() -> ActivityRecordSet {
        ActivityRecordSet::from_rows([
            ("2020-04-01", dollars(100), "description"),
            ("2020-04-01", dollars(200), "description"),
            ("2020-04-01", dollars(300), "description"),
            ("2020-05-05", dollars(250), "description"),
            ("2020-04-01", dollars(150), "other description"),
        ])
        .unwrap()
    }

    #[test]
    fn group_aggregates_members() {
        let activities = group_rows();
        let group = ActivityGroup::new(activities.as_slice()[..3].to_vec()).unwrap();
        assert_eq!(group.transaction_date(), date(2020, 4, 1));
        assert_eq!(group.total(), dollars(600));
        assert_eq!(group.description(), "description");
        assert_eq!(group.len(), 3);
        assert!(group.contains(&activities[1]));
        assert!(!group.contains(&activities[4]));
    }

    #[test]
    fn group_rejects_mixed_dates() {
        let activities = group_rows();
        let result = ActivityGroup::new(activities.as_slice()[1..4].to_vec());
        assert!(matches!(result, Err(ActivityGroupError::MixedDates { .. })));
    }

    #[test]
    fn group_rejects_mixed_descriptions() {
        let activities = group_rows();
        let result = ActivityGroup::new([
            activities[1].clone(),
            activities[2].clone(),
            activities[4].clone(),
        ]);
        assert!(matches!(result, Err(ActivityGroupError::MixedDescriptions { .. })));
    }

    #[test]
    fn group_rejects_empty() {
        let result = ActivityGroup::new(Vec::new());
        assert_eq!(result, Err(ActivityGroupError::Empty));
    }
}
