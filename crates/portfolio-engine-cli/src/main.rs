mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analyze::AnalyzeArgs;
use commands::diversification::DiversificationArgs;
use commands::performance::PerformanceArgs;
use commands::xirr::XirrArgs;

/// Contribution-based portfolio analytics
#[derive(Parser)]
#[command(
    name = "pfe",
    version,
    about = "Contribution-based portfolio performance and diversification analysis",
    long_about = "Reads a portfolio snapshot (funds, contribution schedules, monthly prices \
                  and classification data) and reports invested capital, current value, \
                  CAGR, XIRR, allocation breakdowns and concentration risks with decimal \
                  precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Invested capital, current value, returns, CAGR and XIRR
    Performance(PerformanceArgs),
    /// Asset, category, sector and market-cap allocation with concentration flags
    Diversification(DiversificationArgs),
    /// Performance and diversification in one pass
    Analyze(AnalyzeArgs),
    /// Solve XIRR for a set of dated cash flows
    Xirr(XirrArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Performance(args) => commands::performance::run_performance(args),
        Commands::Diversification(args) => commands::diversification::run_diversification(args),
        Commands::Analyze(args) => commands::analyze::run_analyze(args),
        Commands::Xirr(args) => commands::xirr::run_xirr(args),
        Commands::Version => {
            println!("pfe {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
