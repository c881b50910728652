mod memory;
pub mod traits;

pub use crate::io::memory::{LibraryEntry, MemoryGateway};
pub use crate::io::traits::{CandidateStream, DatabaseGateway, GatewayError};
