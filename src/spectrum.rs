//! Reference spectra as supplied by a database backend.
use std::fmt;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use crate::peaks::Peak;
use crate::peaks::{PeakList, PeakListError};

/// The reasons a backend record cannot be used as a [`Candidate`]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandidateError {
    #[error("{0}")]
    Peaks(
        #[from]
        #[source]
        PeakListError,
    ),
    #[error("precursor mass must be finite and non-negative, got {0}")]
    InvalidPrecursor(f64),
}

/// A reference spectrum from the database, identified by the backend's
/// identifier and optionally annotated with its precursor mass.
///
/// Every constructor, deserialization included, validates the peaks and the
/// precursor mass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "CandidateRecord"))]
pub struct Candidate {
    id: String,
    #[cfg_attr(feature = "serde", serde(serialize_with = "peak_list_serde::serialize"))]
    peaks: PeakList,
    precursor_mass: Option<f64>,
}

impl Candidate {
    pub fn new<S: Into<String>>(
        id: S,
        peaks: PeakList,
        precursor_mass: Option<f64>,
    ) -> Result<Self, CandidateError> {
        if let Some(p) = precursor_mass {
            if !p.is_finite() || p < 0.0 {
                return Err(CandidateError::InvalidPrecursor(p));
            }
        }
        Ok(Self {
            id: id.into(),
            peaks,
            precursor_mass,
        })
    }

    /// Build a candidate from the parallel mass and intensity arrays a
    /// backend returns
    pub fn from_arrays<S: Into<String>>(
        id: S,
        masses: &[f64],
        intensities: &[f64],
        precursor_mass: Option<f64>,
    ) -> Result<Self, CandidateError> {
        let peaks = PeakList::from_arrays(masses, intensities)?;
        Self::new(id, peaks, precursor_mass)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peaks(&self) -> &PeakList {
        &self.peaks
    }

    pub fn precursor_mass(&self) -> Option<f64> {
        self.precursor_mass
    }

    pub fn into_id(self) -> String {
        self.id
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.precursor_mass {
            Some(p) => write!(
                f,
                "Candidate({}, {} peaks, precursor {p})",
                self.id,
                self.len()
            ),
            None => write!(f, "Candidate({}, {} peaks)", self.id, self.len()),
        }
    }
}

/// The unchecked wire form of a [`Candidate`]
#[cfg(feature = "serde")]
#[derive(Debug, Deserialize)]
struct CandidateRecord {
    id: String,
    peaks: Vec<Peak>,
    #[serde(default)]
    precursor_mass: Option<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<CandidateRecord> for Candidate {
    type Error = CandidateError;

    fn try_from(value: CandidateRecord) -> Result<Self, Self::Error> {
        let peaks = PeakList::new(value.peaks)?;
        Self::new(value.id, peaks, value.precursor_mass)
    }
}

#[cfg(feature = "serde")]
pub(crate) mod peak_list_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::peaks::{Peak, PeakList};

    pub fn serialize<S: Serializer>(peaks: &PeakList, serializer: S) -> Result<S::Ok, S::Error> {
        peaks.as_slice().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PeakList, D::Error> {
        let peaks = Vec::<Peak>::deserialize(deserializer)?;
        PeakList::new(peaks).map_err(serde::de::Error::custom)
    }
}
