pub use crate::io::traits::{CandidateStream, DatabaseGateway};
pub use crate::mass_error::{Tolerance, ToleranceUnit};
pub use crate::params::IonizationMode;
pub use crate::score::ScoringFunction;
pub use crate::search::{SearchEngine, SearchInput};
