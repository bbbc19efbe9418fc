pub mod calendar;
pub mod cashflows;
pub mod error;
pub mod gateway;
pub mod time_value;
pub mod types;

#[cfg(feature = "performance")]
pub mod performance;

#[cfg(feature = "diversification")]
pub mod diversification;

#[cfg(feature = "narrative")]
pub mod narrative;

#[cfg(all(feature = "performance", feature = "diversification"))]
pub mod analysis;

pub use calendar::{AnalysisWindow, MonthKey};
pub use error::{PortfolioEngineError, RateSolverError};
pub use types::*;

/// Standard result type for all portfolio-engine operations
pub type PortfolioEngineResult<T> = Result<T, PortfolioEngineError>;
