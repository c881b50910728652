use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

use super::table::ResultTable;
use crate::align::Alignment;

/// One candidate that survived a search, with its distance to the query and
/// which of its peaks each query peak matched.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct MatchResult {
    candidate_id: String,
    distance: f64,
    matched_peak_count: usize,
    correspondence: Alignment,
}

impl MatchResult {
    pub(crate) fn new(candidate_id: String, distance: f64, correspondence: Alignment) -> Self {
        let matched_peak_count = correspondence.matched_count();
        Self {
            candidate_id,
            distance,
            matched_peak_count,
            correspondence,
        }
    }

    pub fn candidate_id(&self) -> &str {
        &self.candidate_id
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn matched_peak_count(&self) -> usize {
        self.matched_peak_count
    }

    pub fn correspondence(&self) -> &Alignment {
        &self.correspondence
    }

    /// Ascending distance, then more matched peaks first, then by identifier.
    /// Results still tied are ordered by their correspondence, so the order
    /// is total.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| other.matched_peak_count.cmp(&self.matched_peak_count))
            .then_with(|| self.candidate_id.cmp(&other.candidate_id))
            .then_with(|| {
                self.correspondence
                    .as_slice()
                    .cmp(other.correspondence.as_slice())
            })
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "MatchResult({}, {:.4}, {} matched)",
            self.candidate_id, self.distance, self.matched_peak_count
        )
    }
}

/// The ranked results of one search
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SearchOutput {
    query_peak_count: usize,
    results: Vec<MatchResult>,
}

impl SearchOutput {
    /// Rank `results` for a query of `query_peak_count` peaks
    pub(crate) fn ranked(query_peak_count: usize, mut results: Vec<MatchResult>) -> Self {
        results.sort_by(MatchResult::rank_cmp);
        Self {
            query_peak_count,
            results,
        }
    }

    pub fn query_peak_count(&self) -> usize {
        self.query_peak_count
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MatchResult> {
        self.results.get(index)
    }

    /// The most similar candidate
    pub fn best(&self) -> Option<&MatchResult> {
        self.results.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchResult> {
        self.results.iter()
    }

    pub fn as_slice(&self) -> &[MatchResult] {
        &self.results
    }

    /// Lay the results out as columns `id`, `dist` and one `P{n}` column per
    /// query peak
    pub fn to_table(&self) -> ResultTable {
        ResultTable::from_output(self)
    }
}

impl IntoIterator for SearchOutput {
    type Item = MatchResult;
    type IntoIter = std::vec::IntoIter<MatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a SearchOutput {
    type Item = &'a MatchResult;
    type IntoIter = std::slice::Iter<'a, MatchResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
