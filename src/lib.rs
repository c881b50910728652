pub mod align;
pub mod io;
pub mod mass_error;
pub mod params;
pub mod peaks;
pub mod prelude;
pub mod score;
pub mod search;
pub mod spectrum;

pub use crate::mass_error::{Tolerance, ToleranceError, ToleranceUnit};
pub use crate::peaks::{Peak, PeakList, PeakListError};

pub use crate::align::{align, Alignment};
pub use crate::score::{score, ScoringFunction, UnsupportedScoringFunctionError, WeightedCosine};

pub use crate::io::{DatabaseGateway, GatewayError, MemoryGateway};
pub use crate::params::{ExtraParams, Field, IonizationMode, Value};
pub use crate::spectrum::{Candidate, CandidateError};

pub use crate::search::{
    CancellationToken, InvalidInputError, MatchResult, ResultTable, SearchConfig, SearchEngine,
    SearchError, SearchInput, SearchOutput,
};
