//! Time utilities
//!
//! - **[`duration`]**: parsing and formatting of compact duration strings
//!
//! Clock abstractions used for deterministic timeout tests live next to the
//! circuit breaker and are re-exported here.

pub mod duration;

pub use duration::{format_duration, parse_duration, DurationParseError};

#[cfg(feature = "runtime")]
pub use crate::resilience::{Clock, MockClock, SystemClock};
