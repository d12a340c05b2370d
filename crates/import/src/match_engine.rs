//! Reconciliation of reported activity against recorded transactions.
//!
//! Matching runs in passes over the same accumulator: an exact pass, a near
//! pass seeded with the exact result, then a pass that looks for several
//! same-day, same-description activities adding up to one transaction.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use tally_core::{ActivityGroup, ActivityRecord, ActivityRecordSet, Money, RecordedTransaction};

use crate::config::NearMatchTolerance;
use crate::util::{combinations, jaccard_distance, tokenize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Near,
    Grouped,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchKind::Exact => "exact",
            MatchKind::Near => "near",
            MatchKind::Grouped => "grouped",
        })
    }
}

/// Decides whether a transaction and an activity could be the same event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchFinder {
    /// Same date and same total.
    Exact,
    Near(NearMatchTolerance),
}

impl MatchFinder {
    pub fn near() -> Self {
        MatchFinder::Near(NearMatchTolerance::default())
    }

    pub fn kind(&self) -> MatchKind {
        match self {
            MatchFinder::Exact => MatchKind::Exact,
            MatchFinder::Near(_) => MatchKind::Near,
        }
    }

    pub fn is_match<T: RecordedTransaction>(&self, transaction: &T, activity: &ActivityRecord) -> bool {
        let days_apart = (transaction.transaction_date() - activity.transaction_date)
            .num_days()
            .unsigned_abs();
        let same_total = transaction.total() == activity.total;

        match self {
            MatchFinder::Exact => days_apart == 0 && same_total,
            MatchFinder::Near(tolerance) => {
                (days_apart <= u64::from(tolerance.date_window_days)
                    && tolerance.amount_within_band(transaction.total(), activity.total))
                    || (days_apart <= u64::from(tolerance.exact_amount_window_days) && same_total)
            }
        }
    }

    /// Positions of every matching activity, in set order.
    pub fn find<T: RecordedTransaction>(
        &self,
        transaction: &T,
        activities: &ActivityRecordSet,
    ) -> Vec<usize> {
        activities
            .iter()
            .enumerate()
            .filter(|(_, activity)| self.is_match(transaction, activity))
            .map(|(i, _)| i)
            .collect()
    }
}

/// The activity (or activities) committed to a transaction, by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityMatch {
    Single(usize),
    Group {
        members: Vec<usize>,
        group: ActivityGroup,
    },
}

impl ActivityMatch {
    pub fn activity_indices(&self) -> &[usize] {
        match self {
            ActivityMatch::Single(index) => std::slice::from_ref(index),
            ActivityMatch::Group { members, .. } => members,
        }
    }
}

/// Matches committed so far, keyed by transaction position.
///
/// No transaction is matched twice and no activity is used twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BestMatches {
    by_transaction: BTreeMap<usize, (MatchKind, ActivityMatch)>,
    consumed: BTreeSet<usize>,
}

impl BestMatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_transaction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_transaction.is_empty()
    }

    pub fn get(&self, transaction: usize) -> Option<&ActivityMatch> {
        self.by_transaction.get(&transaction).map(|(_, m)| m)
    }

    pub fn kind(&self, transaction: usize) -> Option<MatchKind> {
        self.by_transaction.get(&transaction).map(|(kind, _)| *kind)
    }

    pub fn contains_transaction(&self, transaction: usize) -> bool {
        self.by_transaction.contains_key(&transaction)
    }

    pub fn is_consumed(&self, activity: usize) -> bool {
        self.consumed.contains(&activity)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, MatchKind, &ActivityMatch)> + '_ {
        self.by_transaction
            .iter()
            .map(|(&transaction, (kind, m))| (transaction, *kind, m))
    }

    fn commit(&mut self, transaction: usize, kind: MatchKind, activity: ActivityMatch) {
        debug_assert!(!self.contains_transaction(transaction));
        debug_assert!(activity.activity_indices().iter().all(|&i| !self.is_consumed(i)));
        self.consumed.extend(activity.activity_indices().iter().copied());
        self.by_transaction.insert(transaction, (kind, activity));
    }
}

struct ScoredPair {
    primary: f64,
    secondary: f64,
    transaction: usize,
    activity: usize,
}

impl ScoredPair {
    fn rank(&self, other: &Self) -> Ordering {
        self.primary
            .total_cmp(&other.primary)
            .then(self.secondary.total_cmp(&other.secondary))
            .then(self.transaction.cmp(&other.transaction))
            .then(self.activity.cmp(&other.activity))
    }
}

/// Runs one finder over everything `seed` has not already matched.
///
/// A transaction left with a single candidate is committed directly unless
/// another transaction is left with that same single candidate. Commits can
/// narrow other transactions down to one candidate, so this repeats until
/// nothing changes. What remains is ranked by how closely the merchant
/// (then the notes) resembles the activity description, and the closest
/// pairs are committed first.
pub fn match_pass<T: RecordedTransaction>(
    finder: &MatchFinder,
    transactions: &[T],
    activities: &ActivityRecordSet,
    seed: BestMatches,
) -> BestMatches {
    let mut matches = seed;
    let before = matches.len();
    let kind = finder.kind();

    let mut candidates: Vec<(usize, Vec<usize>)> = transactions
        .iter()
        .enumerate()
        .filter(|(t, _)| !matches.contains_transaction(*t))
        .map(|(t, transaction)| (t, finder.find(transaction, activities)))
        .collect();

    let contested = loop {
        candidates = candidates
            .into_iter()
            .filter(|(t, _)| !matches.contains_transaction(*t))
            .map(|(t, found)| {
                let found: Vec<usize> =
                    found.into_iter().filter(|&a| !matches.is_consumed(a)).collect();
                (t, found)
            })
            .filter(|(_, found)| !found.is_empty())
            .collect();

        let mut sole_claims: HashMap<usize, usize> = HashMap::new();
        for (_, found) in &candidates {
            if let [only] = found.as_slice() {
                *sole_claims.entry(*only).or_default() += 1;
            }
        }

        let mut committed = false;
        for (t, found) in &candidates {
            if let [only] = found.as_slice() {
                if sole_claims[only] == 1 {
                    matches.commit(*t, kind, ActivityMatch::Single(*only));
                    committed = true;
                }
            }
        }
        if !committed {
            break candidates;
        }
    };

    let mut scored = Vec::new();
    for (t, found) in &contested {
        let transaction = &transactions[*t];
        let merchant = tokenize(transaction.merchant());
        let notes = tokenize(transaction.notes());
        for &a in found {
            let description = tokenize(&activities[a].description);
            scored.push(ScoredPair {
                primary: jaccard_distance(&merchant, &description),
                secondary: jaccard_distance(&notes, &description),
                transaction: *t,
                activity: a,
            });
        }
    }
    scored.sort_by(ScoredPair::rank);

    for pair in scored {
        if matches.contains_transaction(pair.transaction) || matches.is_consumed(pair.activity) {
            continue;
        }
        matches.commit(pair.transaction, kind, ActivityMatch::Single(pair.activity));
    }

    tracing::debug!(pass = %kind, committed = matches.len() - before, "match pass complete");
    matches
}

/// Matches transactions to several same-day activities that share a
/// description and sum to the transaction total.
///
/// Larger subsets are tried first; the first exact sum wins.
pub fn group_pass<T: RecordedTransaction>(
    transactions: &[T],
    activities: &ActivityRecordSet,
    seed: BestMatches,
) -> BestMatches {
    let mut matches = seed;
    let before = matches.len();

    for (t, transaction) in transactions.iter().enumerate() {
        if matches.contains_transaction(t) {
            continue;
        }
        if let Some(found) = find_group(transaction, activities, &matches) {
            matches.commit(t, MatchKind::Grouped, found);
        }
    }

    tracing::debug!(
        pass = %MatchKind::Grouped,
        committed = matches.len() - before,
        "match pass complete"
    );
    matches
}

fn find_group<T: RecordedTransaction>(
    transaction: &T,
    activities: &ActivityRecordSet,
    matches: &BestMatches,
) -> Option<ActivityMatch> {
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for (i, activity) in activities.iter().enumerate() {
        if matches.is_consumed(i) || activity.transaction_date != transaction.transaction_date() {
            continue;
        }
        match groups
            .iter_mut()
            .find(|group| group.0 == activity.description.as_str())
        {
            Some(group) => group.1.push(i),
            None => groups.push((activity.description.as_str(), vec![i])),
        }
    }

    for (_, members) in groups.iter().filter(|group| group.1.len() > 1) {
        for size in (1..=members.len()).rev() {
            for combination in combinations(members.len(), size) {
                let subset: Vec<usize> = combination.iter().map(|&k| members[k]).collect();
                let total: Money = subset.iter().map(|&i| activities[i].total).sum();
                if total != transaction.total() {
                    continue;
                }
                if let [only] = subset.as_slice() {
                    return Some(ActivityMatch::Single(*only));
                }
                let group = ActivityGroup::new(subset.iter().map(|&i| activities[i].clone())).ok()?;
                return Some(ActivityMatch::Group {
                    members: subset,
                    group,
                });
            }
        }
    }
    None
}

/// The activity side of a committed match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedActivity<'r> {
    Single(&'r ActivityRecord),
    Group(&'r ActivityGroup),
}

impl<'r> MatchedActivity<'r> {
    pub fn total(&self) -> Money {
        match self {
            MatchedActivity::Single(activity) => activity.total,
            MatchedActivity::Group(group) => group.total(),
        }
    }

    pub fn description(&self) -> &'r str {
        match self {
            MatchedActivity::Single(activity) => &activity.description,
            MatchedActivity::Group(group) => group.description(),
        }
    }

    pub fn records(&self) -> Vec<&'r ActivityRecord> {
        match self {
            MatchedActivity::Single(activity) => vec![*activity],
            MatchedActivity::Group(group) => group.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BestMatch<'r, T> {
    pub transaction: &'r T,
    pub kind: MatchKind,
    pub activity: MatchedActivity<'r>,
}

impl<T: RecordedTransaction> BestMatch<'_, T> {
    pub fn is_discrepancy(&self) -> bool {
        self.transaction.total() != self.activity.total()
    }

    /// Recorded total minus reported total.
    pub fn difference(&self) -> Money {
        self.transaction.total() - self.activity.total()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub matched: usize,
    pub discrepancies: usize,
    pub grouped: usize,
    pub unmatched_transactions: usize,
    pub unmatched_activities: usize,
}

impl fmt::Display for MatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} matched ({} with discrepancies, {} grouped); \
             {} unmatched transactions; {} unmatched activities",
            self.matched,
            self.discrepancies,
            self.grouped,
            self.unmatched_transactions,
            self.unmatched_activities
        )
    }
}

/// Outcome of a reconciliation run, borrowing the inputs it was built from.
pub struct MatchReport<'a, T> {
    transactions: &'a [T],
    activities: &'a ActivityRecordSet,
    matches: BestMatches,
}

impl<'a, T: RecordedTransaction> MatchReport<'a, T> {
    pub fn new(transactions: &'a [T], activities: &'a ActivityRecordSet, matches: BestMatches) -> Self {
        Self {
            transactions,
            activities,
            matches,
        }
    }

    pub fn matches(&self) -> &BestMatches {
        &self.matches
    }

    /// Committed matches, in transaction order.
    pub fn best_matches(&self) -> Vec<BestMatch<'_, T>> {
        self.matches
            .iter()
            .map(|(t, kind, m)| BestMatch {
                transaction: &self.transactions[t],
                kind,
                activity: self.resolve(m),
            })
            .collect()
    }

    pub fn match_for(&self, id: &T::Id) -> Option<BestMatch<'_, T>> {
        self.best_matches()
            .into_iter()
            .find(|m| &m.transaction.id() == id)
    }

    /// Committed matches whose totals differ.
    pub fn match_discrepancies(&self) -> Vec<BestMatch<'_, T>> {
        self.best_matches()
            .into_iter()
            .filter(BestMatch::is_discrepancy)
            .collect()
    }

    pub fn unmatched_transactions(&self) -> Vec<&'a T> {
        self.transactions
            .iter()
            .enumerate()
            .filter(|(t, _)| !self.matches.contains_transaction(*t))
            .map(|(_, transaction)| transaction)
            .collect()
    }

    pub fn unmatched_activities(&self) -> Vec<&'a ActivityRecord> {
        self.activities
            .iter()
            .enumerate()
            .filter(|(a, _)| !self.matches.is_consumed(*a))
            .map(|(_, activity)| activity)
            .collect()
    }

    pub fn summary(&self) -> MatchSummary {
        let best = self.best_matches();
        MatchSummary {
            matched: best.len(),
            discrepancies: best.iter().filter(|m| m.is_discrepancy()).count(),
            grouped: best
                .iter()
                .filter(|m| matches!(m.activity, MatchedActivity::Group(_)))
                .count(),
            unmatched_transactions: self.transactions.len() - self.matches.len(),
            unmatched_activities: self.unmatched_activities().len(),
        }
    }

    fn resolve<'r>(&'r self, m: &'r ActivityMatch) -> MatchedActivity<'r> {
        match m {
            ActivityMatch::Single(a) => MatchedActivity::Single(&self.activities[*a]),
            ActivityMatch::Group { group, .. } => MatchedActivity::Group(group),
        }
    }
}

/// Runs the exact, near and grouped passes in order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityMatchmaker {
    tolerance: NearMatchTolerance,
}

impl ActivityMatchmaker {
    pub fn new(tolerance: NearMatchTolerance) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> &NearMatchTolerance {
        &self.tolerance
    }

    pub fn reconcile<'a, T: RecordedTransaction>(
        &self,
        transactions: &'a [T],
        activities: &'a ActivityRecordSet,
    ) -> MatchReport<'a, T> {
        let matches = match_pass(&MatchFinder::Exact, transactions, activities, BestMatches::new());
        let matches = match_pass(
            &MatchFinder::Near(self.tolerance),
            transactions,
            activities,
            matches,
        );
        let matches = group_pass(transactions, activities, matches);

        let report = MatchReport::new(transactions, activities, matches);
        tracing::info!(summary = %report.summary(), "reconciliation complete");
        report
    }
}
