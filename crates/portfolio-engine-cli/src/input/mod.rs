pub mod file;
pub mod stdin;

use portfolio_engine_core::analysis::PortfolioSnapshot;

/// Load a snapshot from `--input`, falling back to piped stdin.
pub fn load_snapshot(path: &Option<String>) -> Result<PortfolioSnapshot, Box<dyn std::error::Error>> {
    let snapshot: PortfolioSnapshot = if let Some(ref path) = path {
        file::read_document(path)?
    } else if let Some(snapshot) = stdin::read_stdin()? {
        snapshot
    } else {
        return Err("--input <snapshot.json|yaml> or a snapshot piped to stdin required".into());
    };
    tracing::debug!(
        funds = snapshot.funds.len(),
        window = %format!("{}..{}", snapshot.window.start, snapshot.window.end),
        "loaded portfolio snapshot"
    );
    Ok(snapshot)
}
