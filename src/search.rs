//! Query a [`DatabaseGateway`](crate::io::DatabaseGateway) for spectra
//! resembling a query spectrum, and rank what comes back.
mod engine;
mod input;
mod output;
pub mod table;

pub use crate::search::engine::{CancellationToken, SearchConfig, SearchEngine, SearchError};
pub use crate::search::input::{InvalidInputError, SearchInput};
pub use crate::search::output::{MatchResult, SearchOutput};
pub use crate::search::table::{Column, ColumnData, ResultTable};
