use chrono::NaiveDate;
use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use portfolio_engine_core::analysis::PortfolioSnapshot;
use portfolio_engine_core::time_value::{self, SolverConfig};
use portfolio_engine_core::with_metadata;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_snapshot(snapshot_json: &str) -> NapiResult<PortfolioSnapshot> {
    serde_json::from_str(snapshot_json).map_err(to_napi_error)
}

fn elapsed_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

// ---------------------------------------------------------------------------
// Snapshot analyses
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_performance(snapshot_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let start = Instant::now();
    let resolved = snapshot.resolve().map_err(to_napi_error)?;
    let summary = portfolio_engine_core::performance::analyze_performance_with(
        &snapshot.funds,
        &resolved.price_series,
        &snapshot.window,
        &snapshot.options.solver,
    )
    .map_err(to_napi_error)?;
    let output = with_metadata(
        "Contribution-based performance",
        &snapshot.options.solver,
        summary.warnings.clone(),
        elapsed_us(start),
        summary,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_diversification(snapshot_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let start = Instant::now();
    let resolved = snapshot.resolve().map_err(to_napi_error)?;
    let result = portfolio_engine_core::diversification::analyze_diversification_with(
        &snapshot.funds,
        &resolved.classifications,
        &resolved.templates,
        &snapshot.window,
        &snapshot.options.thresholds,
    )
    .map_err(to_napi_error)?;
    let output = with_metadata(
        "Invested-capital weighted diversification",
        &snapshot.options.thresholds,
        result.warnings.clone(),
        elapsed_us(start),
        result,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_portfolio(snapshot_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&snapshot_json)?;
    let start = Instant::now();
    let analysis = snapshot.analyze().map_err(to_napi_error)?;
    let mut warnings = analysis.performance.warnings.clone();
    warnings.extend(analysis.diversification.warnings.iter().cloned());
    let output = with_metadata(
        "Performance and diversification over one snapshot",
        &snapshot.options,
        warnings,
        elapsed_us(start),
        analysis,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Rate solver
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct XirrRequest {
    flows: Vec<DatedFlow>,
    #[serde(default)]
    solver: SolverConfig,
}

#[derive(Deserialize)]
struct DatedFlow {
    date: NaiveDate,
    amount: Decimal,
}

#[derive(Serialize)]
struct XirrResponse {
    xirr: Decimal,
    flow_count: usize,
}

#[napi]
pub fn xirr(input_json: String) -> NapiResult<String> {
    let request: XirrRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let start = Instant::now();
    let dated: Vec<(NaiveDate, Decimal)> = request.flows.iter().map(|f| (f.date, f.amount)).collect();
    let rate = time_value::xirr(&dated, &request.solver).map_err(to_napi_error)?;
    let output = with_metadata(
        "XIRR over actual days / 365.25",
        &request.solver,
        Vec::new(),
        elapsed_us(start),
        XirrResponse {
            xirr: rate,
            flow_count: dated.len(),
        },
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}
