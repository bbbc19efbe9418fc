use clap::Args;
use serde_json::{json, Value};
use std::time::Instant;

use portfolio_engine_core::diversification::analyze_diversification_with;
use portfolio_engine_core::with_metadata;

use crate::input;

/// Arguments for diversification analysis
#[derive(Args)]
pub struct DiversificationArgs {
    /// Path to a JSON or YAML portfolio snapshot (stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_diversification(args: DiversificationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = input::load_snapshot(&args.input)?;
    let start = Instant::now();

    let resolved = snapshot.resolve()?;
    let result = analyze_diversification_with(
        &snapshot.funds,
        &resolved.classifications,
        &resolved.templates,
        &snapshot.window,
        &snapshot.options.thresholds,
    )?;

    let warnings = result.warnings.clone();
    let output = with_metadata(
        "Funds weighted by scheduled contributions in the window; sector and market-cap look-through from category templates, else fund records",
        &json!({
            "window": snapshot.window,
            "thresholds": snapshot.options.thresholds,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        result,
    );
    Ok(serde_json::to_value(output)?)
}
