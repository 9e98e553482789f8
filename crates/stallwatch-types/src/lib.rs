pub mod region;
pub mod types;

pub use region::{CaptureRegion, RegionFraction};
pub use types::*;
