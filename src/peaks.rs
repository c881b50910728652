pub mod peak;
pub mod peak_list;

pub use crate::peaks::peak::Peak;
pub use crate::peaks::peak_list::{PeakList, PeakListError};
