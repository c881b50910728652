use std::fmt;

use mzpeaks::CentroidPeak;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single (mass, intensity) observation of a spectrum.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Peak {
    pub mass: f64,
    pub intensity: f64,
}

impl Peak {
    pub fn new(mass: f64, intensity: f64) -> Self {
        Self { mass, intensity }
    }

    /// A peak is usable when its mass is finite and non-negative and its
    /// intensity is finite and non-negative.
    pub fn is_valid(&self) -> bool {
        self.mass.is_finite()
            && self.mass >= 0.0
            && self.intensity.is_finite()
            && self.intensity >= 0.0
    }

    /// The weighted contribution `mass ^ mz_power * intensity ^ intensity_power`
    #[inline]
    pub fn weighted(&self, mz_power: f64, intensity_power: f64) -> f64 {
        let m = if mz_power == 0.0 {
            1.0
        } else {
            self.mass.powf(mz_power)
        };
        let i = if intensity_power == 1.0 {
            self.intensity
        } else {
            self.intensity.powf(intensity_power)
        };
        m * i
    }
}

impl fmt::Display for Peak {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Peak({}, {})", self.mass, self.intensity)
    }
}

impl From<(f64, f64)> for Peak {
    fn from((mass, intensity): (f64, f64)) -> Self {
        Self::new(mass, intensity)
    }
}

impl From<&CentroidPeak> for Peak {
    fn from(value: &CentroidPeak) -> Self {
        Self::new(value.mz, value.intensity as f64)
    }
}
