use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use portfolio_engine_core::analysis::PortfolioAnalysis;
use portfolio_engine_core::narrative::{narrate_all, RiskNarrative};
use portfolio_engine_core::with_metadata;

use crate::input;

/// Arguments for the combined analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to a JSON or YAML portfolio snapshot (stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Attach a headline and recommendation to every concentration finding
    #[arg(long)]
    pub narrate: bool,
}

#[derive(Serialize)]
struct AnalyzeOutput {
    #[serde(flatten)]
    analysis: PortfolioAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    narratives: Option<Vec<RiskNarrative>>,
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = input::load_snapshot(&args.input)?;
    let start = Instant::now();

    let analysis = snapshot.analyze()?;
    let narratives = args
        .narrate
        .then(|| narrate_all(&analysis.diversification.concentration_risks));

    let warnings: Vec<String> = analysis
        .performance
        .warnings
        .iter()
        .chain(analysis.diversification.warnings.iter())
        .cloned()
        .collect();

    let output = with_metadata(
        "Performance and diversification over one snapshot",
        &snapshot.options,
        warnings,
        start.elapsed().as_micros() as u64,
        AnalyzeOutput {
            analysis,
            narratives,
        },
    );
    Ok(serde_json::to_value(output)?)
}
