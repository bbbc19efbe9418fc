use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use portfolio_engine_core::time_value::{self, SolverConfig};
use portfolio_engine_core::with_metadata;

use crate::input;

/// Arguments for a standalone XIRR solve
#[derive(Args)]
pub struct XirrArgs {
    /// Path to a JSON or YAML file: {"flows": [{"date", "amount"}], "solver"?}
    #[arg(long)]
    pub input: Option<String>,

    /// Dated flows as date:amount, comma-separated (e.g. "2023-01-01:-1000,2024-01-01:1100")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub flows: Option<Vec<String>>,

    /// Starting rate for Newton-Raphson
    #[arg(long)]
    pub guess: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct XirrInput {
    flows: Vec<DatedFlow>,
    #[serde(default)]
    solver: SolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatedFlow {
    date: NaiveDate,
    amount: Decimal,
}

#[derive(Debug, Serialize)]
struct XirrOutput {
    xirr: Decimal,
    flow_count: usize,
    first_date: NaiveDate,
    last_date: NaiveDate,
    net_flow: Decimal,
}

fn parse_flow(raw: &str) -> Result<DatedFlow, Box<dyn std::error::Error>> {
    let (date, amount) = raw
        .trim()
        .split_once(':')
        .ok_or_else(|| format!("Expected date:amount, got '{raw}'"))?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date in '{raw}': {e}"))?;
    let amount: Decimal = amount
        .parse()
        .map_err(|e| format!("Invalid amount in '{raw}': {e}"))?;
    Ok(DatedFlow { date, amount })
}

fn get_input(args: &XirrArgs) -> Result<XirrInput, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        input::file::read_document(path)
    } else if let Some(ref raw) = args.flows {
        let flows = raw
            .iter()
            .map(|f| parse_flow(f))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(XirrInput {
            flows,
            solver: SolverConfig::default(),
        })
    } else if let Some(xirr_input) = input::stdin::read_stdin()? {
        Ok(xirr_input)
    } else {
        Err("Provide --flows or --input file or pipe JSON/YAML via stdin".into())
    }
}

pub fn run_xirr(args: XirrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut xirr_input = get_input(&args)?;
    if let Some(guess) = args.guess {
        xirr_input.solver.guess = guess;
    }
    let start = Instant::now();

    let dated: Vec<(NaiveDate, Decimal)> =
        xirr_input.flows.iter().map(|f| (f.date, f.amount)).collect();
    let rate = time_value::xirr(&dated, &xirr_input.solver)?;

    // xirr() rejects fewer than two flows, so both ends exist here.
    let first_date = dated.iter().map(|(d, _)| *d).min().ok_or("no cash flows")?;
    let last_date = dated.iter().map(|(d, _)| *d).max().ok_or("no cash flows")?;

    let output = with_metadata(
        "XIRR over actual days / 365.25 from the earliest flow",
        &xirr_input.solver,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        XirrOutput {
            xirr: rate,
            flow_count: dated.len(),
            first_date,
            last_date,
            net_flow: dated.iter().map(|(_, a)| *a).sum(),
        },
    );
    Ok(serde_json::to_value(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_flow_negative_amount() {
        let flow = parse_flow("2023-01-01:-1000.50").unwrap();
        assert_eq!(flow.date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(flow.amount, dec!(-1000.50));
    }

    #[test]
    fn test_parse_flow_rejects_missing_separator() {
        assert!(parse_flow("2023-01-01 -1000").is_err());
        assert!(parse_flow("2023-13-01:5").is_err());
    }
}
