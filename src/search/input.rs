use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::SearchError;
use crate::mass_error::Tolerance;
use crate::params::{ExtraParams, Field, IonizationMode};
use crate::peaks::{PeakList, PeakListError};
use crate::score::ScoringFunction;

/// Ways a search request can be malformed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInputError {
    #[error("The query spectrum has no peaks")]
    EmptyQuery,
    #[error("The query peaks are malformed: {0}")]
    Peaks(
        #[from]
        #[source]
        PeakListError,
    ),
    #[error("Precursor mass must be finite and non-negative, got {0}")]
    InvalidPrecursor(f64),
    #[error(
        "Weighted cosine exponents must be finite, got mz^{mz_power} * intensity^{intensity_power}"
    )]
    InvalidWeights { mz_power: f64, intensity_power: f64 },
    #[error("Input must contain a {0} column")]
    MissingColumn(Field),
    #[error(
        "All input columns must have the same length: {field} has {length}, expected {expected}"
    )]
    ColumnLengthMismatch {
        field: Field,
        length: usize,
        expected: usize,
    },
}

/// A query spectrum and the parameters to search the database with.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchInput {
    #[cfg_attr(feature = "serde", serde(with = "crate::spectrum::peak_list_serde"))]
    pub peaks: PeakList,
    pub precursor_mass: f64,
    pub precursor_tolerance: Tolerance,
    /// The tolerance used when aligning peaks. Falls back to the precursor
    /// tolerance when unset.
    pub fragment_tolerance: Option<Tolerance>,
    pub min_matched_peaks: usize,
    pub scoring: ScoringFunction,
    pub mode: IonizationMode,
    pub extra_params: ExtraParams,
}

impl SearchInput {
    /// Create a search for `peaks` around `precursor_mass`, requiring at
    /// least one matched peak, scored by cosine distance in positive mode.
    pub fn new(peaks: PeakList, precursor_mass: f64, precursor_tolerance: Tolerance) -> Self {
        Self {
            peaks,
            precursor_mass,
            precursor_tolerance,
            fragment_tolerance: None,
            min_matched_peaks: 1,
            scoring: ScoringFunction::default(),
            mode: IonizationMode::default(),
            extra_params: ExtraParams::default(),
        }
    }

    pub fn from_arrays(
        masses: &[f64],
        intensities: &[f64],
        precursor_mass: f64,
        precursor_tolerance: Tolerance,
    ) -> Result<Self, InvalidInputError> {
        let peaks = PeakList::from_arrays(masses, intensities)?;
        Ok(Self::new(peaks, precursor_mass, precursor_tolerance))
    }

    /// Build the query from a column map. [`Field::MZ`] and [`Field::INT`]
    /// are required and every column present must have the same length.
    /// Columns other than those two are checked for length but otherwise
    /// not used.
    pub fn from_columns<I>(
        columns: I,
        precursor_mass: f64,
        precursor_tolerance: Tolerance,
    ) -> Result<Self, InvalidInputError>
    where
        I: IntoIterator<Item = (Field, Vec<f64>)>,
    {
        let mut expected: Option<usize> = None;
        let mut masses = None;
        let mut intensities = None;
        for (field, values) in columns {
            match expected {
                None => expected = Some(values.len()),
                Some(n) if n != values.len() => {
                    return Err(InvalidInputError::ColumnLengthMismatch {
                        field,
                        length: values.len(),
                        expected: n,
                    })
                }
                Some(_) => {}
            }
            match field {
                Field::MZ => masses = Some(values),
                Field::INT => intensities = Some(values),
                _ => {}
            }
        }
        let masses = masses.ok_or(InvalidInputError::MissingColumn(Field::MZ))?;
        let intensities = intensities.ok_or(InvalidInputError::MissingColumn(Field::INT))?;
        Self::from_arrays(&masses, &intensities, precursor_mass, precursor_tolerance)
    }

    pub fn with_fragment_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.fragment_tolerance = Some(tolerance);
        self
    }

    pub fn with_min_matched_peaks(mut self, min_matched_peaks: usize) -> Self {
        self.min_matched_peaks = min_matched_peaks;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringFunction) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_mode(mut self, mode: IonizationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_extra_params(mut self, extra_params: ExtraParams) -> Self {
        self.extra_params = extra_params;
        self
    }

    /// The tolerance peaks are aligned under
    pub fn alignment_tolerance(&self) -> Tolerance {
        self.fragment_tolerance.unwrap_or(self.precursor_tolerance)
    }

    /// Check the request is well formed before any backend work happens
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.peaks.is_empty() {
            return Err(InvalidInputError::EmptyQuery.into());
        }
        if !self.precursor_mass.is_finite() || self.precursor_mass < 0.0 {
            return Err(InvalidInputError::InvalidPrecursor(self.precursor_mass).into());
        }
        if let ScoringFunction::WeightedCosine(w) = self.scoring {
            if !w.mz_power.is_finite() || !w.intensity_power.is_finite() {
                return Err(InvalidInputError::InvalidWeights {
                    mz_power: w.mz_power,
                    intensity_power: w.intensity_power,
                }
                .into());
            }
        }
        self.precursor_tolerance.validate()?;
        if let Some(tol) = self.fragment_tolerance {
            tol.validate()?;
        }
        Ok(())
    }
}
