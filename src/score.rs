//! Spectral distance functions over an [`Alignment`].
//!
//! Scoring is query-centric: the compared vectors have one entry per query
//! peak. A query peak contributes its own value paired with its matched
//! candidate peak's value, or with zero when it is unmatched. Candidate peaks
//! that no query peak matched do not participate.
//!
//! Both functions return a *distance* in `[0, 1]`, where `0` is identical and
//! `1` is maximally dissimilar.
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::align::Alignment;
use crate::peaks::{Peak, PeakList};

/// The exponents of the weighted cosine, each peak contributing
/// `mass ^ mz_power * intensity ^ intensity_power`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightedCosine {
    pub mz_power: f64,
    pub intensity_power: f64,
}

impl Default for WeightedCosine {
    fn default() -> Self {
        Self {
            mz_power: 0.0,
            intensity_power: 1.0,
        }
    }
}

impl WeightedCosine {
    pub fn new(mz_power: f64, intensity_power: f64) -> Self {
        Self {
            mz_power,
            intensity_power,
        }
    }

    #[inline]
    fn weigh(&self, peak: &Peak) -> f64 {
        let w = peak.weighted(self.mz_power, self.intensity_power);
        // A zero mass under a negative exponent has no usable weight
        if w.is_finite() {
            w
        } else {
            0.0
        }
    }
}

/// A selectable spectral distance
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScoringFunction {
    Cosine,
    WeightedCosine(WeightedCosine),
}

impl Default for ScoringFunction {
    fn default() -> Self {
        Self::Cosine
    }
}

impl ScoringFunction {
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::WeightedCosine(_) => "wcosine",
        }
    }

    /// The weighted cosine with its default exponents
    pub fn weighted() -> Self {
        Self::WeightedCosine(WeightedCosine::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported scoring function {0:?}, expected one of \"cosine\" or \"wcosine\"")]
pub struct UnsupportedScoringFunctionError(pub String);

impl FromStr for ScoringFunction {
    type Err = UnsupportedScoringFunctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "wcosine" => Ok(Self::weighted()),
            _ => Err(UnsupportedScoringFunctionError(s.to_string())),
        }
    }
}

impl Display for ScoringFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Compute the distance between `query` and `candidate` under `function`,
/// pairing peaks according to `alignment`.
///
/// When either weighted vector has zero norm the distance is `1.0`.
pub fn score(
    query: &PeakList,
    candidate: &PeakList,
    alignment: &Alignment,
    function: ScoringFunction,
) -> f64 {
    match function {
        ScoringFunction::Cosine => {
            cosine_distance(query, candidate, alignment, |p: &Peak| p.intensity)
        }
        ScoringFunction::WeightedCosine(weights) => {
            cosine_distance(query, candidate, alignment, |p: &Peak| weights.weigh(p))
        }
    }
}

fn cosine_distance<F: Fn(&Peak) -> f64>(
    query: &PeakList,
    candidate: &PeakList,
    alignment: &Alignment,
    weigh: F,
) -> f64 {
    let mut dot = 0.0;
    let mut query_norm = 0.0;
    let mut candidate_norm = 0.0;

    for (qi, qpeak) in query.iter().enumerate() {
        let q = weigh(qpeak);
        let c = alignment
            .get(qi)
            .and_then(|ci| candidate.get(ci))
            .map(&weigh)
            .unwrap_or(0.0);
        dot += q * c;
        query_norm += q * q;
        candidate_norm += c * c;
    }

    if query_norm == 0.0 || candidate_norm == 0.0 {
        return 1.0;
    }

    let similarity = dot / (query_norm.sqrt() * candidate_norm.sqrt());
    let distance = 1.0 - similarity;
    if distance.is_nan() {
        1.0
    } else {
        distance.clamp(0.0, 1.0)
    }
}
