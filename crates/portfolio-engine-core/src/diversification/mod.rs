//! Diversification and concentration diagnostics.
//!
//! Funds are weighted by invested capital and their classification metadata
//! is folded into asset, category, sector and market-cap distributions.
//! Fixed threshold bands then flag concentration. Descriptive only: nothing
//! here recommends a rebalance.

pub mod allocation;
pub mod concentration;

pub use allocation::{
    analyze_diversification, analyze_diversification_with, DiversificationResult, FundWeight,
};
pub use concentration::{
    evaluate_concentration, ConcentrationThresholds, RiskFinding, RiskKind, Severity,
    ThresholdBand,
};
