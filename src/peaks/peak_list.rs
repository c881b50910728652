use std::fmt;
use std::ops;

use thiserror::Error;

use super::peak::Peak;

/// Errors raised when building a [`PeakList`] from raw arrays
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PeakListError {
    #[error("mass array ({masses}) does not match size of intensity array ({intensities})")]
    ArraySizeMismatch { masses: usize, intensities: usize },
    #[error("Peak {index} has an invalid mass {value}")]
    InvalidMass { index: usize, value: f64 },
    #[error("Peak {index} has an invalid intensity {value}")]
    InvalidIntensity { index: usize, value: f64 },
}

/// The validated peaks of one spectrum, in their original order.
///
/// A peak's index is its position in this list. The list also holds the
/// permutation that visits peaks in ascending mass order, so that mass
/// windows can be located by binary search without reordering the peaks.
/// Duplicate masses are kept as-is.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct PeakList {
    peaks: Vec<Peak>,
    order: Vec<usize>,
}

impl PeakList {
    pub fn new(peaks: Vec<Peak>) -> Result<Self, PeakListError> {
        for (index, p) in peaks.iter().enumerate() {
            if !p.mass.is_finite() || p.mass < 0.0 {
                return Err(PeakListError::InvalidMass {
                    index,
                    value: p.mass,
                });
            }
            if !p.intensity.is_finite() || p.intensity < 0.0 {
                return Err(PeakListError::InvalidIntensity {
                    index,
                    value: p.intensity,
                });
            }
        }
        let order = Self::sort_order(&peaks);
        Ok(Self { peaks, order })
    }

    /// Build a peak list from parallel mass and intensity arrays, which must
    /// be the same length.
    pub fn from_arrays(masses: &[f64], intensities: &[f64]) -> Result<Self, PeakListError> {
        if masses.len() != intensities.len() {
            return Err(PeakListError::ArraySizeMismatch {
                masses: masses.len(),
                intensities: intensities.len(),
            });
        }
        let peaks = masses
            .iter()
            .zip(intensities.iter())
            .map(|(m, i)| Peak::new(*m, *i))
            .collect();
        Self::new(peaks)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn sort_order(peaks: &[Peak]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..peaks.len()).collect();
        // Stable, so equal masses keep their input order
        order.sort_by(|a, b| peaks[*a].mass.total_cmp(&peaks[*b].mass));
        order
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Peak> {
        self.peaks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Peak> {
        self.peaks.iter()
    }

    pub fn as_slice(&self) -> &[Peak] {
        &self.peaks
    }

    pub fn masses(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.mass).collect()
    }

    pub fn intensities(&self) -> Vec<f64> {
        self.peaks.iter().map(|p| p.intensity).collect()
    }

    /// Peak indices in ascending mass order
    pub fn mass_order(&self) -> &[usize] {
        &self.order
    }

    /// The indices, in ascending mass order, of every peak whose mass lies in
    /// `[low, high]`.
    pub fn indices_between(&self, low: f64, high: f64) -> &[usize] {
        if low > high || self.order.is_empty() {
            return &self.order[0..0];
        }
        let start = self.order.partition_point(|i| self.peaks[*i].mass < low);
        let end = self.order.partition_point(|i| self.peaks[*i].mass <= high);
        &self.order[start..end.max(start)]
    }

    pub fn base_peak(&self) -> Option<&Peak> {
        self.peaks
            .iter()
            .max_by(|a, b| a.intensity.total_cmp(&b.intensity))
    }
}

impl ops::Index<usize> for PeakList {
    type Output = Peak;

    fn index(&self, i: usize) -> &Self::Output {
        &self.peaks[i]
    }
}

impl fmt::Display for PeakList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PeakList(<{} Peaks>)", self.len())
    }
}

impl<'a> IntoIterator for &'a PeakList {
    type Item = &'a Peak;
    type IntoIter = std::slice::Iter<'a, Peak>;

    fn into_iter(self) -> Self::IntoIter {
        self.peaks.iter()
    }
}

impl TryFrom<Vec<Peak>> for PeakList {
    type Error = PeakListError;

    fn try_from(value: Vec<Peak>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&mzpeaks::PeakSet> for PeakList {
    type Error = PeakListError;

    fn try_from(value: &mzpeaks::PeakSet) -> Result<Self, Self::Error> {
        Self::new(value.iter().map(Peak::from).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_arrays() {
        let peaks = PeakList::from_arrays(&[300.0, 100.0, 200.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[0], Peak::new(300.0, 1.0));
        assert_eq!(peaks.mass_order(), &[1, 2, 0]);
        assert_eq!(peaks.masses(), vec![300.0, 100.0, 200.0]);
        assert_eq!(peaks.base_peak(), Some(&Peak::new(200.0, 3.0)));
    }

    #[test]
    fn test_size_mismatch() {
        let err = PeakList::from_arrays(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            PeakListError::ArraySizeMismatch {
                masses: 4,
                intensities: 3
            }
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PeakList::from_arrays(&[1.0, -2.0], &[1.0, 1.0]),
            Err(PeakListError::InvalidMass { index: 1, .. })
        ));
        assert!(matches!(
            PeakList::from_arrays(&[1.0, 2.0], &[f64::NAN, 1.0]),
            Err(PeakListError::InvalidIntensity { index: 0, .. })
        ));
    }

    #[test]
    fn test_duplicates_kept() {
        let peaks = PeakList::from_arrays(&[150.0, 150.0, 149.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks.mass_order(), &[2, 0, 1]);
    }

    #[test]
    fn test_indices_between() {
        let peaks =
            PeakList::from_arrays(&[100.0, 250.0, 200.0, 199.9, 400.0], &[1.0; 5]).unwrap();
        assert_eq!(peaks.indices_between(199.9, 250.0), &[3, 2, 1]);
        assert_eq!(peaks.indices_between(500.0, 600.0), &[] as &[usize]);
        assert_eq!(peaks.indices_between(0.0, 99.0), &[] as &[usize]);
        assert_eq!(peaks.indices_between(300.0, 200.0), &[] as &[usize]);
        assert_eq!(PeakList::empty().indices_between(0.0, 10.0), &[] as &[usize]);
    }
}
