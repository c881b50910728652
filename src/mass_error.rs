//! Mass tolerances and the acceptance windows they describe.
//!
//! A [`Tolerance`] is either an absolute width in mass units or a relative
//! width in parts-per-million of the reference mass. Resolving a tolerance
//! against a reference mass produces an inclusive `(low, high)` window.
use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The unit a bare tolerance value is expressed in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ToleranceUnit {
    #[default]
    PPM,
    /// Plain mass units (Da or Th), no scaling
    Plain,
}

impl Display for ToleranceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PPM => f.write_str("ppm"),
            Self::Plain => f.write_str("Da"),
        }
    }
}

/// A mass tolerance, either absolute or relative to the reference mass.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Tolerance {
    /// A half-width in mass units
    Absolute(f64),
    /// A half-width in parts-per-million of the reference mass
    PPM(f64),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToleranceError {
    #[error("Tolerance width must be non-negative, got {0}")]
    Negative(f64),
    #[error("Tolerance width must be finite, got {0}")]
    NotFinite(f64),
    #[error("Reference mass must be finite and non-negative, got {0}")]
    InvalidReference(f64),
    #[error("Could not parse tolerance from {0:?}")]
    Unparsable(String),
}

impl Tolerance {
    pub fn new(value: f64, unit: ToleranceUnit) -> Self {
        match unit {
            ToleranceUnit::PPM => Self::PPM(value),
            ToleranceUnit::Plain => Self::Absolute(value),
        }
    }

    pub fn unit(&self) -> ToleranceUnit {
        match self {
            Self::Absolute(_) => ToleranceUnit::Plain,
            Self::PPM(_) => ToleranceUnit::PPM,
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Self::Absolute(v) | Self::PPM(v) => *v,
        }
    }

    /// Check that the tolerance width is finite and non-negative
    pub fn validate(&self) -> Result<(), ToleranceError> {
        let v = self.value();
        if !v.is_finite() {
            Err(ToleranceError::NotFinite(v))
        } else if v < 0.0 {
            Err(ToleranceError::Negative(v))
        } else {
            Ok(())
        }
    }

    /// The half-width of the window around `reference`
    #[inline]
    pub fn width(&self, reference: f64) -> f64 {
        match self {
            Self::Absolute(delta) => *delta,
            Self::PPM(fraction) => reference * fraction / 1e6,
        }
    }

    /// The inclusive window around `reference` without validating either
    /// argument. A negative width produces an inverted window that contains
    /// nothing.
    #[inline]
    pub fn bounds(&self, reference: f64) -> (f64, f64) {
        let w = self.width(reference);
        (reference - w, reference + w)
    }

    /// The window [`Tolerance::bounds`] widened by the rounding error of
    /// `reference ± width`, so that a mass written exactly on the edge still
    /// falls inside. An inverted window is left as it is.
    #[inline]
    pub fn matching_bounds(&self, reference: f64) -> (f64, f64) {
        let w = self.width(reference);
        if w.is_nan() || w < 0.0 {
            return (reference - w, reference + w);
        }
        let slack = (reference.abs() + w).max(1.0) * EDGE_ULPS * f64::EPSILON;
        (reference - w - slack, reference + w + slack)
    }

    /// Test whether `mass` lies within the window around `reference`,
    /// bounds included. `NaN` is never contained.
    #[inline]
    pub fn contains(&self, reference: f64, mass: f64) -> bool {
        let (low, high) = self.matching_bounds(reference);
        low <= mass && mass <= high
    }
}

const EDGE_ULPS: f64 = 4.0;

/// Resolve `tolerance` against `reference_mass`, producing the inclusive
/// `(low, high)` acceptance window.
///
/// A [`Tolerance::PPM`] tolerance on a zero reference mass yields a zero-width
/// window. Use [`Tolerance::Absolute`] for references at or near zero.
pub fn resolve(tolerance: Tolerance, reference_mass: f64) -> Result<(f64, f64), ToleranceError> {
    tolerance.validate()?;
    if !reference_mass.is_finite() || reference_mass < 0.0 {
        return Err(ToleranceError::InvalidReference(reference_mass));
    }
    Ok(tolerance.bounds(reference_mass))
}

impl Display for Tolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value(), self.unit())
    }
}

impl FromStr for Tolerance {
    type Err = ToleranceError;

    /// Parse `"5ppm"`, `"0.02Da"`, `"0.02Th"` or a bare number, which is
    /// read as an absolute tolerance.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let lowered = s.to_ascii_lowercase();
        let (number, unit) = if let Some(v) = lowered.strip_suffix("ppm") {
            (v, ToleranceUnit::PPM)
        } else if let Some(v) = lowered
            .strip_suffix("da")
            .or_else(|| lowered.strip_suffix("th"))
        {
            (v, ToleranceUnit::Plain)
        } else {
            (lowered.as_str(), ToleranceUnit::Plain)
        };
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| ToleranceError::Unparsable(s.to_string()))?;
        let tol = Tolerance::new(value, unit);
        tol.validate()?;
        Ok(tol)
    }
}

impl From<mzpeaks::Tolerance> for Tolerance {
    fn from(value: mzpeaks::Tolerance) -> Self {
        match value {
            mzpeaks::Tolerance::PPM(v) => Self::PPM(v),
            mzpeaks::Tolerance::Da(v) => Self::Absolute(v),
        }
    }
}

impl From<Tolerance> for mzpeaks::Tolerance {
    fn from(value: Tolerance) -> Self {
        match value {
            Tolerance::PPM(v) => Self::PPM(v),
            Tolerance::Absolute(v) => Self::Da(v),
        }
    }
}
