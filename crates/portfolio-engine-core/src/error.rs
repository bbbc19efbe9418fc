use rust_decimal::Decimal;
use thiserror::Error;

/// Failure modes of the internal-rate-of-return solver.
///
/// Callers inside the engine never propagate these: they downgrade to a
/// `None` rate plus a warning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateSolverError {
    #[error("XIRR requires at least 2 cash flows, got {count}")]
    TooFewCashflows { count: usize },

    #[error("XIRR requires at least one outflow and one inflow")]
    NoSignChange,

    #[error("XIRR did not converge after {iterations} iterations (residual: {last_residual})")]
    DidNotConverge {
        iterations: u32,
        last_residual: Decimal,
    },
}

#[derive(Debug, Error)]
pub enum PortfolioEngineError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Rate solver failure: {0}")]
    RateSolver(#[from] RateSolverError),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Data gateway error: {0}")]
    Gateway(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PortfolioEngineError {
    /// Decimal arithmetic left the representable range.
    pub fn overflow(context: impl std::fmt::Display) -> Self {
        PortfolioEngineError::InsufficientData(format!("Decimal overflow in {context}"))
    }
}

impl From<serde_json::Error> for PortfolioEngineError {
    fn from(e: serde_json::Error) -> Self {
        PortfolioEngineError::SerializationError(e.to_string())
    }
}
