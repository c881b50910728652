//! Greedy one-to-one peak alignment between a query and a reference spectrum.
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::mass_error::Tolerance;
use crate::peaks::PeakList;

/// For each query peak, the index of the candidate peak it was matched to.
///
/// The mapping is injective: no candidate index appears twice.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alignment {
    pairs: Vec<Option<usize>>,
}

impl Alignment {
    /// An alignment of `n` query peaks in which nothing matched
    pub fn unmatched(n: usize) -> Self {
        Self {
            pairs: vec![None; n],
        }
    }

    pub(crate) fn from_pairs(pairs: Vec<Option<usize>>) -> Self {
        Self { pairs }
    }

    /// The number of query peaks covered, matched or not
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, query_index: usize) -> Option<usize> {
        self.pairs.get(query_index).copied().flatten()
    }

    pub fn matched_count(&self) -> usize {
        self.pairs.iter().filter(|p| p.is_some()).count()
    }

    /// `(query index, candidate index)` for every matched query peak
    pub fn iter_matched(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.pairs
            .iter()
            .enumerate()
            .filter_map(|(q, c)| c.map(|c| (q, c)))
    }

    pub fn as_slice(&self) -> &[Option<usize>] {
        &self.pairs
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Alignment(<{}/{} matched>)", self.matched_count(), self.len())
    }
}

/// Match `query` peaks to `candidate` peaks within `tolerance`.
///
/// Query peaks are visited in ascending mass order. Each takes the unused
/// candidate peak in its window (bounds included) that is closest in mass,
/// breaking ties by higher intensity and then by lower candidate index. A
/// candidate peak is never assigned twice.
///
/// An invalid (negative) tolerance produces an empty window for every peak.
pub fn align(query: &PeakList, candidate: &PeakList, tolerance: Tolerance) -> Alignment {
    let mut alignment = Alignment::unmatched(query.len());
    if query.is_empty() || candidate.is_empty() {
        return alignment;
    }

    let mut consumed = vec![false; candidate.len()];

    for &qi in query.mass_order() {
        let query_mass = query[qi].mass;
        let (low, high) = tolerance.matching_bounds(query_mass);

        let mut best: Option<(usize, f64)> = None;
        for &ci in candidate.indices_between(low, high) {
            if consumed[ci] {
                continue;
            }
            let err = (candidate[ci].mass - query_mass).abs();
            best = match best {
                None => Some((ci, err)),
                Some((bi, berr)) => {
                    if is_better(candidate, ci, err, bi, berr) {
                        Some((ci, err))
                    } else {
                        Some((bi, berr))
                    }
                }
            };
        }

        if let Some((ci, _)) = best {
            consumed[ci] = true;
            alignment.pairs[qi] = Some(ci);
        }
    }
    alignment
}

#[inline]
fn is_better(candidate: &PeakList, ci: usize, err: f64, bi: usize, berr: f64) -> bool {
    if err != berr {
        return err < berr;
    }
    let (inten, binten) = (candidate[ci].intensity, candidate[bi].intensity);
    if inten != binten {
        return inten > binten;
    }
    ci < bi
}
