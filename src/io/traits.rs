use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::params::{ExtraParams, IonizationMode};
use crate::spectrum::{Candidate, CandidateError};

/// Errors a database backend may report while producing candidates
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend did not produce candidates within the allotted time
    #[error("The database backend did not respond within {0:?}")]
    Timeout(Duration),
    /// The backend returned a record that is not a usable spectrum
    #[error("Candidate {id} is malformed: {source}")]
    MalformedCandidate {
        id: String,
        #[source]
        source: CandidateError,
    },
    /// The backend refused or could not serve the request
    #[error("The database backend is unavailable: {0}")]
    Unavailable(String),
    /// Any other failure raised by the backend's own machinery
    #[error("An error occurred in the database backend: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GatewayError {
    pub fn malformed<S: Into<String>>(id: S, source: CandidateError) -> Self {
        Self::MalformedCandidate {
            id: id.into(),
            source,
        }
    }

    pub fn other<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self::Other(Box::new(error))
    }
}

/// A lazy, finite, single-pass sequence of candidates
pub type CandidateStream<'a> =
    Box<dyn Iterator<Item = Result<Candidate, GatewayError>> + Send + 'a>;

/// The read interface of a spectral database.
///
/// Implementations are free to pre-filter by precursor window, ionization
/// mode, or anything recognized in `params`. The search engine re-checks the
/// precursor window on every candidate it receives regardless.
///
/// A gateway is shared by concurrent searches, so any connection state it
/// keeps must be synchronized internally.
pub trait DatabaseGateway: Send + Sync {
    /// Start a candidate query.
    ///
    /// `precursor_window` is the inclusive `(low, high)` precursor mass range
    /// of interest, or `None` when the caller does not restrict it. The
    /// returned stream is consumed once.
    fn fetch_candidates(
        &self,
        precursor_window: Option<(f64, f64)>,
        mode: IonizationMode,
        params: &ExtraParams,
    ) -> Result<CandidateStream<'_>, GatewayError>;
}

impl<T: DatabaseGateway + ?Sized> DatabaseGateway for &T {
    fn fetch_candidates(
        &self,
        precursor_window: Option<(f64, f64)>,
        mode: IonizationMode,
        params: &ExtraParams,
    ) -> Result<CandidateStream<'_>, GatewayError> {
        (**self).fetch_candidates(precursor_window, mode, params)
    }
}

impl<T: DatabaseGateway + ?Sized> DatabaseGateway for Box<T> {
    fn fetch_candidates(
        &self,
        precursor_window: Option<(f64, f64)>,
        mode: IonizationMode,
        params: &ExtraParams,
    ) -> Result<CandidateStream<'_>, GatewayError> {
        (**self).fetch_candidates(precursor_window, mode, params)
    }
}

impl<T: DatabaseGateway + ?Sized> DatabaseGateway for Arc<T> {
    fn fetch_candidates(
        &self,
        precursor_window: Option<(f64, f64)>,
        mode: IonizationMode,
        params: &ExtraParams,
    ) -> Result<CandidateStream<'_>, GatewayError> {
        (**self).fetch_candidates(precursor_window, mode, params)
    }
}
