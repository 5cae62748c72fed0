//! Session state and the staged processing run.

pub mod params;
pub mod processor;
mod worker;

pub use params::{MIN_GAIN, ProcessingParameters, clamp_gain};
pub use processor::HdrProcessor;
