use clap::Args;
use serde_json::{json, Value};
use std::time::Instant;

use portfolio_engine_core::performance::analyze_performance_with;
use portfolio_engine_core::with_metadata;

use crate::input;

/// Arguments for performance analysis
#[derive(Args)]
pub struct PerformanceArgs {
    /// Path to a JSON or YAML portfolio snapshot (stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_performance(args: PerformanceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = input::load_snapshot(&args.input)?;
    let start = Instant::now();

    let resolved = snapshot.resolve()?;
    let summary = analyze_performance_with(
        &snapshot.funds,
        &resolved.price_series,
        &snapshot.window,
        &snapshot.options.solver,
    )?;

    let warnings = summary.warnings.clone();
    let output = with_metadata(
        "Monthly unit accumulation at gap-filled prices; CAGR over actual days / 365.25; XIRR by Newton-Raphson with bisection fallback",
        &json!({
            "window": snapshot.window,
            "solver": snapshot.options.solver,
            "cashflow_dating": "first day of each contribution month",
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        summary,
    );
    Ok(serde_json::to_value(output)?)
}
