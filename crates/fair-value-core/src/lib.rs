mod checked;
pub mod error;
pub mod stats;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "valuation")]
pub mod report;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::FairValueError;
pub use types::*;

/// Standard result type for all fair-value operations
pub type FairValueResult<T> = Result<T, FairValueError>;
