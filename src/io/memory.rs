//! An in-memory spectral library that serves candidates through the
//! [`DatabaseGateway`] interface.
#[cfg(feature = "serde")]
use std::io;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::traits::{CandidateStream, DatabaseGateway, GatewayError};
use crate::params::{ExtraParams, IonizationMode};
use crate::spectrum::Candidate;

/// A library spectrum together with the ionization mode it was acquired in.
/// Entries without a mode are served for any mode.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LibraryEntry {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub candidate: Candidate,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: Option<IonizationMode>,
}

impl LibraryEntry {
    pub fn new(candidate: Candidate, mode: Option<IonizationMode>) -> Self {
        Self { candidate, mode }
    }

    fn accepts(&self, window: Option<(f64, f64)>, mode: IonizationMode) -> bool {
        if self.mode.is_some_and(|m| m != mode) {
            return false;
        }
        match (window, self.candidate.precursor_mass()) {
            (Some((low, high)), Some(p)) => low <= p && p <= high,
            _ => true,
        }
    }
}

/// A [`DatabaseGateway`] over a list of spectra held in memory.
///
/// The gateway pre-filters by ionization mode and precursor window. Entries
/// without a precursor mass are always served. No keys of the extra
/// parameters are recognized.
#[derive(Debug, Default, Clone)]
pub struct MemoryGateway {
    entries: Vec<LibraryEntry>,
}

impl MemoryGateway {
    pub fn new(entries: Vec<LibraryEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, candidate: Candidate, mode: Option<IonizationMode>) {
        self.entries.push(LibraryEntry::new(candidate, mode));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LibraryEntry> {
        self.entries.iter()
    }

    /// Read a JSON array of library entries, each an object with `id`,
    /// `peaks` (a list of `{"mass", "intensity"}` objects) and optional
    /// `precursor_mass` and `mode` keys.
    #[cfg(feature = "serde")]
    pub fn from_json<R: io::Read>(reader: R) -> Result<Self, GatewayError> {
        let entries: Vec<LibraryEntry> =
            serde_json::from_reader(reader).map_err(GatewayError::other)?;
        log::debug!("Loaded {} library entries", entries.len());
        Ok(Self::new(entries))
    }
}

impl FromIterator<Candidate> for MemoryGateway {
    fn from_iter<T: IntoIterator<Item = Candidate>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(|c| LibraryEntry::new(c, None)).collect())
    }
}

impl DatabaseGateway for MemoryGateway {
    fn fetch_candidates(
        &self,
        precursor_window: Option<(f64, f64)>,
        mode: IonizationMode,
        _params: &ExtraParams,
    ) -> Result<CandidateStream<'_>, GatewayError> {
        let iter = self
            .entries
            .iter()
            .filter(move |e| e.accepts(precursor_window, mode))
            .map(|e| Ok::<_, GatewayError>(e.candidate.clone()));
        Ok(Box::new(iter))
    }
}
