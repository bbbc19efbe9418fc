//! Contribution-based performance analytics.
//!
//! - **Price normalisation**: sparse month→price maps made dense over the window
//! - **Aggregation**: invested capital, current value, absolute return, CAGR
//! - **XIRR**: fund- and portfolio-level money-weighted return
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

pub mod aggregate;
pub mod prices;

pub use aggregate::{
    analyze_performance, analyze_performance_with, FundPerformanceResult,
    PortfolioPerformanceSummary,
};
pub use prices::{normalize_price_series, NormalizedPrices};
