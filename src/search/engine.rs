use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use thiserror::Error;

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use super::input::{InvalidInputError, SearchInput};
use super::output::{MatchResult, SearchOutput};
use crate::align::align;
use crate::io::{DatabaseGateway, GatewayError};
use crate::mass_error::{self, Tolerance, ToleranceError};
use crate::score::{score, ScoringFunction, UnsupportedScoringFunctionError, WeightedCosine};
use crate::spectrum::Candidate;

/// The ways a search can fail. A failed search never yields partial results.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The request was rejected before any backend work
    #[error("Invalid search input: {0}")]
    InvalidInput(
        #[from]
        #[source]
        InvalidInputError,
    ),
    #[error("Invalid tolerance: {0}")]
    InvalidTolerance(
        #[from]
        #[source]
        ToleranceError,
    ),
    #[error("{0}")]
    UnsupportedScoringFunction(
        #[from]
        #[source]
        UnsupportedScoringFunctionError,
    ),
    /// The database backend failed, timed out, or produced a malformed record
    #[error("Search backend error: {0}")]
    Backend(
        #[from]
        #[source]
        GatewayError,
    ),
    #[error("The search was cancelled")]
    Cancelled,
}

/// Engine-wide settings shared by every search it runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    /// The exponents applied when a search selects the weighted cosine by tag
    pub weighted_cosine: WeightedCosine,
    /// The most wall time a search may spend pulling candidates from the
    /// backend, unbounded when `None`
    pub backend_timeout: Option<Duration>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            weighted_cosine: WeightedCosine::default(),
            backend_timeout: None,
        }
    }
}

impl SearchConfig {
    pub fn with_weighted_cosine(mut self, weighted_cosine: WeightedCosine) -> Self {
        self.weighted_cosine = weighted_cosine;
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = Some(timeout);
        self
    }
}

/// A shared flag that asks a running search to stop. Clones observe the
/// same flag.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything resolved once per search before candidates are evaluated
#[derive(Debug)]
struct SearchPlan<'a> {
    input: &'a SearchInput,
    precursor_window: (f64, f64),
    fragment_tolerance: Tolerance,
    started: Instant,
}

/// Wraps a candidate stream and charges only the time spent inside its
/// `next` calls against the backend timeout. Once that budget is exceeded
/// the stream yields a single [`GatewayError::Timeout`] and then ends.
struct TimedStream<I> {
    inner: I,
    timeout: Option<Duration>,
    spent: Duration,
    finished: bool,
}

impl<I> TimedStream<I> {
    fn new(inner: I, timeout: Option<Duration>, spent: Duration) -> Self {
        Self {
            inner,
            timeout,
            spent,
            finished: false,
        }
    }
}

impl<I: Iterator<Item = Result<Candidate, GatewayError>>> Iterator for TimedStream<I> {
    type Item = Result<Candidate, GatewayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let timeout = match self.timeout {
            Some(timeout) => timeout,
            None => return self.inner.next(),
        };
        let pulled = Instant::now();
        let item = self.inner.next();
        self.spent += pulled.elapsed();
        if self.spent > timeout {
            self.finished = true;
            warn!(
                "The database backend spent {:?} producing candidates, over {timeout:?}",
                self.spent
            );
            return Some(Err(GatewayError::Timeout(timeout)));
        }
        if item.is_none() {
            self.finished = true;
        }
        item
    }
}

/// Searches a spectral database for the candidates most similar to a query.
///
/// The engine holds only its configuration, so one instance can serve any
/// number of concurrent searches.
#[derive(Debug, Default, Clone)]
pub struct SearchEngine {
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Look up a scoring function by its tag, applying the configured
    /// exponents to `wcosine`
    pub fn scoring_function(&self, tag: &str) -> Result<ScoringFunction, SearchError> {
        let function = match tag.parse::<ScoringFunction>()? {
            ScoringFunction::WeightedCosine(_) => {
                ScoringFunction::WeightedCosine(self.config.weighted_cosine)
            }
            other => other,
        };
        Ok(function)
    }

    /// Fetch candidates for `input` from `gateway` and rank them by distance
    pub fn search<G: DatabaseGateway + ?Sized>(
        &self,
        gateway: &G,
        input: &SearchInput,
    ) -> Result<SearchOutput, SearchError> {
        self.search_with_cancel(gateway, input, &CancellationToken::new())
    }

    /// As [`SearchEngine::search`], stopping with [`SearchError::Cancelled`]
    /// once `cancel` is set
    pub fn search_with_cancel<G: DatabaseGateway + ?Sized>(
        &self,
        gateway: &G,
        input: &SearchInput,
        cancel: &CancellationToken,
    ) -> Result<SearchOutput, SearchError> {
        let plan = self.plan(input)?;
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        let fetching = Instant::now();
        let stream = gateway
            .fetch_candidates(Some(plan.precursor_window), input.mode, &input.extra_params)
            .map_err(|e| {
                warn!("Failed to query the database backend: {e}");
                SearchError::Backend(e)
            })?;
        let spent = fetching.elapsed();
        if let Some(timeout) = self.config.backend_timeout {
            if spent > timeout {
                warn!("The database backend took {spent:?} to start, exceeding {timeout:?}");
                return Err(GatewayError::Timeout(timeout).into());
            }
        }
        self.run(&plan, TimedStream::new(stream, self.config.backend_timeout, spent), cancel)
    }

    /// Rank an already obtained sequence of candidates against `input`.
    ///
    /// The precursor window is applied here as well, so the sequence need not
    /// be pre-filtered.
    pub fn search_candidates<I>(
        &self,
        input: &SearchInput,
        candidates: I,
    ) -> Result<SearchOutput, SearchError>
    where
        I: IntoIterator<Item = Result<Candidate, GatewayError>>,
        I::IntoIter: Send,
    {
        let plan = self.plan(input)?;
        let stream = TimedStream::new(
            candidates.into_iter(),
            self.config.backend_timeout,
            Duration::ZERO,
        );
        self.run(&plan, stream, &CancellationToken::new())
    }

    fn plan<'a>(&self, input: &'a SearchInput) -> Result<SearchPlan<'a>, SearchError> {
        input.validate()?;
        mass_error::resolve(input.precursor_tolerance, input.precursor_mass)?;
        let precursor_window = input
            .precursor_tolerance
            .matching_bounds(input.precursor_mass);
        debug!(
            "Searching {} query peaks with precursor window {:?} ({} around {}) using {}",
            input.peaks.len(),
            precursor_window,
            input.precursor_tolerance,
            input.precursor_mass,
            input.scoring,
        );
        Ok(SearchPlan {
            input,
            precursor_window,
            fragment_tolerance: input.alignment_tolerance(),
            started: Instant::now(),
        })
    }

    fn run<I>(
        &self,
        plan: &SearchPlan,
        candidates: I,
        cancel: &CancellationToken,
    ) -> Result<SearchOutput, SearchError>
    where
        I: Iterator<Item = Result<Candidate, GatewayError>> + Send,
    {
        #[cfg(feature = "parallelism")]
        let evaluated: Vec<Option<MatchResult>> = candidates
            .par_bridge()
            .map(|item| self.step(plan, cancel, item))
            .collect::<Result<_, _>>()?;
        #[cfg(not(feature = "parallelism"))]
        let evaluated: Vec<Option<MatchResult>> = candidates
            .map(|item| self.step(plan, cancel, item))
            .collect::<Result<_, _>>()?;

        // The stream may have ended while the token was being set
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let n_candidates = evaluated.len();
        let results: Vec<MatchResult> = evaluated.into_iter().flatten().collect();
        debug!(
            "Scored {} of {} candidates in {:?}",
            results.len(),
            n_candidates,
            plan.started.elapsed()
        );
        Ok(SearchOutput::ranked(plan.input.peaks.len(), results))
    }

    fn step(
        &self,
        plan: &SearchPlan,
        cancel: &CancellationToken,
        item: Result<Candidate, GatewayError>,
    ) -> Result<Option<MatchResult>, SearchError> {
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        let candidate = item.map_err(|e| {
            warn!("The database backend failed while producing candidates: {e}");
            SearchError::Backend(e)
        })?;
        Ok(self.evaluate(plan, candidate))
    }

    fn evaluate(&self, plan: &SearchPlan, candidate: Candidate) -> Option<MatchResult> {
        let input = plan.input;
        if let Some(precursor) = candidate.precursor_mass() {
            let (low, high) = plan.precursor_window;
            if !(low <= precursor && precursor <= high) {
                trace!(
                    "Skipping {}: precursor {precursor} outside {low}-{high}",
                    candidate.id()
                );
                return None;
            }
        }

        let alignment = align(&input.peaks, candidate.peaks(), plan.fragment_tolerance);
        let matched = alignment.matched_count();
        if matched < input.min_matched_peaks {
            trace!(
                "Skipping {}: {matched} matched peaks, {} required",
                candidate.id(),
                input.min_matched_peaks
            );
            return None;
        }

        let distance = score(&input.peaks, candidate.peaks(), &alignment, input.scoring);
        Some(MatchResult::new(candidate.into_id(), distance, alignment))
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;
    use crate::io::{CandidateStream, MemoryGateway};
    use crate::params::{ExtraParams, IonizationMode};
    use crate::spectrum::CandidateError;

    fn query() -> SearchInput {
        SearchInput::from_arrays(
            &[100.0, 150.0, 200.0],
            &[10.0, 5.0, 1.0],
            300.0,
            Tolerance::Absolute(0.5),
        )
        .unwrap()
    }

    fn candidate(id: &str, masses: &[f64], precursor: Option<f64>) -> Candidate {
        let intensities = vec![1.0; masses.len()];
        Candidate::from_arrays(id, masses, &intensities, precursor).unwrap()
    }

    fn library() -> MemoryGateway {
        [
            Candidate::from_arrays(
                "same",
                &[100.0, 150.0, 200.0],
                &[10.0, 5.0, 1.0],
                Some(300.1),
            )
            .unwrap(),
            candidate("two", &[100.1, 150.1], Some(300.0)),
            candidate("one", &[200.0], None),
            candidate("heavy", &[100.0, 150.0, 200.0], Some(450.0)),
        ]
        .into_iter()
        .collect()
    }

    struct FailingGateway;

    impl DatabaseGateway for FailingGateway {
        fn fetch_candidates(
            &self,
            _precursor_window: Option<(f64, f64)>,
            _mode: IonizationMode,
            _params: &ExtraParams,
        ) -> Result<CandidateStream<'_>, GatewayError> {
            Err(GatewayError::Unavailable("connection refused".into()))
        }
    }

    struct SlowGateway(Duration);

    impl DatabaseGateway for SlowGateway {
        fn fetch_candidates(
            &self,
            _precursor_window: Option<(f64, f64)>,
            _mode: IonizationMode,
            _params: &ExtraParams,
        ) -> Result<CandidateStream<'_>, GatewayError> {
            let delay = self.0;
            Ok(Box::new((0..4).map(move |i| {
                thread::sleep(delay);
                Ok(candidate(&format!("slow{i}"), &[100.0], None))
            })))
        }
    }

    #[test_log::test]
    fn test_search_ranks_and_filters() {
        let engine = SearchEngine::default();
        let output = engine.search(&library(), &query()).unwrap();

        let ids: Vec<_> = output.iter().map(|r| r.candidate_id()).collect();
        assert_eq!(ids, ["same", "two", "one"]);
        assert!(output.best().unwrap().distance().abs() < 1e-12);
        for r in &output {
            assert!((0.0..=1.0).contains(&r.distance()));
        }

        let strict = query().with_min_matched_peaks(2);
        let output = engine.search(&library(), &strict).unwrap();
        let ids: Vec<_> = output.iter().map(|r| r.candidate_id()).collect();
        assert_eq!(ids, ["same", "two"]);
    }

    #[test_log::test]
    fn test_engine_rechecks_precursor_window() {
        let engine = SearchEngine::default();
        let candidates = vec![
            Ok(candidate("inside", &[100.0], Some(300.5))),
            Ok(candidate("outside", &[100.0], Some(300.51))),
        ];
        let output = engine.search_candidates(&query(), candidates).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output.best().unwrap().candidate_id(), "inside");
    }

    #[test_log::test]
    fn test_idempotent() {
        let engine = SearchEngine::default();
        let input = query().with_scoring(ScoringFunction::weighted());
        let first = engine.search(&library(), &input).unwrap();
        let second = engine.search(&library(), &input).unwrap();
        assert_eq!(first, second);
    }

    #[test_log::test]
    fn test_invalid_input_stops_before_backend() {
        let engine = SearchEngine::default();
        let input = SearchInput::new(
            crate::peaks::PeakList::empty(),
            300.0,
            Tolerance::Absolute(0.5),
        );
        let err = engine.search(&FailingGateway, &input).unwrap_err();
        assert!(matches!(
            err,
            SearchError::InvalidInput(InvalidInputError::EmptyQuery)
        ));

        let input = query().with_fragment_tolerance(Tolerance::Absolute(-0.1));
        assert!(matches!(
            engine.search(&FailingGateway, &input),
            Err(SearchError::InvalidTolerance(_))
        ));
    }

    #[test_log::test]
    fn test_backend_failures() {
        let engine = SearchEngine::default();
        let err = engine.search(&FailingGateway, &query()).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Backend(GatewayError::Unavailable(_))
        ));

        let candidates = vec![
            Ok(candidate("fine", &[100.0], None)),
            Err(GatewayError::Unavailable("lost connection".into())),
        ];
        assert!(matches!(
            engine.search_candidates(&query(), candidates),
            Err(SearchError::Backend(_))
        ));
    }

    #[test_log::test]
    fn test_cancelled() {
        let engine = SearchEngine::default();
        let token = CancellationToken::new();
        let observer = token.clone();
        token.cancel();
        assert!(observer.is_cancelled());
        assert!(matches!(
            engine.search_with_cancel(&library(), &query(), &observer),
            Err(SearchError::Cancelled)
        ));
    }

    #[test_log::test]
    fn test_backend_timeout() {
        let gateway = SlowGateway(Duration::from_millis(20));
        let engine = SearchEngine::new(
            SearchConfig::default().with_backend_timeout(Duration::from_millis(5)),
        );
        assert!(matches!(
            engine.search(&gateway, &query()),
            Err(SearchError::Backend(GatewayError::Timeout(_)))
        ));

        let engine = SearchEngine::default();
        let gateway = SlowGateway(Duration::from_millis(1));
        assert_eq!(engine.search(&gateway, &query()).unwrap().len(), 4);
    }

    #[test_log::test]
    fn test_scoring_function_lookup() {
        let engine = SearchEngine::new(
            SearchConfig::default().with_weighted_cosine(WeightedCosine::new(1.0, 0.5)),
        );
        assert_eq!(
            engine.scoring_function("wcosine").unwrap(),
            ScoringFunction::WeightedCosine(WeightedCosine::new(1.0, 0.5))
        );
        assert_eq!(engine.scoring_function("cosine").unwrap(), ScoringFunction::Cosine);
        assert!(matches!(
            engine.scoring_function("spectral_entropy"),
            Err(SearchError::UnsupportedScoringFunction(_))
        ));
    }

    /// Stalls for `delay` on the call that ends an otherwise empty stream,
    /// optionally cancelling `token` while it does
    struct StallingGateway {
        delay: Duration,
        token: Option<CancellationToken>,
    }

    impl DatabaseGateway for StallingGateway {
        fn fetch_candidates(
            &self,
            _precursor_window: Option<(f64, f64)>,
            _mode: IonizationMode,
            _params: &ExtraParams,
        ) -> Result<CandidateStream<'_>, GatewayError> {
            let delay = self.delay;
            let token = self.token.clone();
            Ok(Box::new(std::iter::from_fn(move || {
                thread::sleep(delay);
                if let Some(token) = &token {
                    token.cancel();
                }
                None
            })))
        }
    }

    #[test_log::test]
    fn test_timeout_on_stream_end() {
        let gateway = StallingGateway {
            delay: Duration::from_millis(50),
            token: None,
        };
        let engine = SearchEngine::new(
            SearchConfig::default().with_backend_timeout(Duration::from_millis(5)),
        );
        assert!(matches!(
            engine.search(&gateway, &query()),
            Err(SearchError::Backend(GatewayError::Timeout(_)))
        ));

        let gateway = StallingGateway {
            delay: Duration::ZERO,
            token: None,
        };
        assert!(engine.search(&gateway, &query()).unwrap().is_empty());
    }

    #[test_log::test]
    fn test_cancelled_on_stream_end() {
        let token = CancellationToken::new();
        let gateway = StallingGateway {
            delay: Duration::from_millis(1),
            token: Some(token.clone()),
        };
        assert!(matches!(
            SearchEngine::default().search_with_cancel(&gateway, &query(), &token),
            Err(SearchError::Cancelled)
        ));
    }

    #[test_log::test]
    fn test_timeout_counts_only_backend_time() {
        let items = (0..3).map(|i| Ok(candidate(&format!("c{i}"), &[100.0], None)));
        let mut stream = TimedStream::new(items, Some(Duration::from_millis(5)), Duration::ZERO);
        let mut n = 0;
        for item in stream.by_ref() {
            assert!(item.is_ok());
            n += 1;
            // Time spent by the consumer between pulls is not charged
            thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(n, 3);
        assert!(stream.spent < Duration::from_millis(5));

        let items = (0..3).map(|i| Ok(candidate(&format!("c{i}"), &[100.0], None)));
        let mut stream = TimedStream::new(
            items,
            Some(Duration::from_millis(5)),
            Duration::from_millis(6),
        );
        assert!(matches!(stream.next(), Some(Err(GatewayError::Timeout(_)))));
        assert!(stream.next().is_none());
    }

    #[test_log::test]
    fn test_precursor_window_edges() {
        let engine = SearchEngine::default();
        let input = SearchInput::from_arrays(&[100.0], &[1.0], 252.1009, Tolerance::Absolute(0.2))
            .unwrap();
        let candidates = vec![
            Ok(candidate("upper", &[100.0], Some(252.3009))),
            Ok(candidate("lower", &[100.0], Some(251.9009))),
            Ok(candidate("beyond", &[100.0], Some(252.30091))),
        ];
        let output = engine.search_candidates(&input, candidates).unwrap();
        let ids: Vec<_> = output.iter().map(|r| r.candidate_id()).collect();
        assert_eq!(ids, ["lower", "upper"]);
    }

    #[test_log::test]
    fn test_unusable_precursor_never_scored() {
        assert!(matches!(
            Candidate::from_arrays("nan", &[100.0], &[1.0], Some(f64::NAN)),
            Err(CandidateError::InvalidPrecursor(p)) if p.is_nan()
        ));

        let engine = SearchEngine::default();
        let candidates = [Some(300.0), Some(f64::NAN)].into_iter().map(|p| {
            Candidate::from_arrays("c", &[100.0], &[1.0], p)
                .map_err(|e| GatewayError::malformed("c", e))
        });
        assert!(matches!(
            engine.search_candidates(&query(), candidates),
            Err(SearchError::Backend(GatewayError::MalformedCandidate { .. }))
        ));
    }
}
