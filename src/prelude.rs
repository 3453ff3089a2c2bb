//! Import the capability traits in one line.

pub use crate::command::ResetControl as _;
pub use crate::sampler::SampleAlarm as _;
pub use crate::sampler::SampleSource as _;

pub use fugit::RateExtU32 as _;
