use serde::{Deserialize, Serialize};

use crate::calendar::AnalysisWindow;
use crate::diversification::{analyze_diversification_with, ConcentrationThresholds, DiversificationResult};
use crate::gateway::{resolve_inputs, InMemoryGateway, ResolvedInputs};
use crate::performance::{analyze_performance_with, PortfolioPerformanceSummary};
use crate::time_value::SolverConfig;
use crate::types::*;
use crate::PortfolioEngineResult;

/// Tunables shared by both analysers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub solver: SolverConfig,
    pub thresholds: ConcentrationThresholds,
}

/// Performance and diversification over the same fund list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub performance: PortfolioPerformanceSummary,
    pub diversification: DiversificationResult,
}

/// Run both analysers. They share inputs but not results.
pub fn analyze_portfolio(
    funds: &[FundPosition],
    price_series: &PriceSeriesMap,
    classifications: &ClassificationMap,
    templates: &TemplateMap,
    window: &AnalysisWindow,
    options: &AnalysisOptions,
) -> PortfolioEngineResult<PortfolioAnalysis> {
    let performance = analyze_performance_with(funds, price_series, window, &options.solver)?;
    let diversification =
        analyze_diversification_with(funds, classifications, templates, window, &options.thresholds)?;
    Ok(PortfolioAnalysis {
        performance,
        diversification,
    })
}

/// A self-contained analysis request: the fund list plus every piece of
/// reference data it needs, as read from a JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub window: AnalysisWindow,
    pub funds: Vec<FundPosition>,
    #[serde(default)]
    pub price_series: PriceSeriesMap,
    #[serde(default)]
    pub classifications: Vec<ClassificationRecord>,
    #[serde(default)]
    pub templates: Vec<HoldingTemplate>,
    #[serde(default)]
    pub options: AnalysisOptions,
}

impl PortfolioSnapshot {
    /// Resolve the snapshot's reference data through an in-memory gateway.
    pub fn resolve(&self) -> PortfolioEngineResult<ResolvedInputs> {
        let gateway = InMemoryGateway::new(
            self.price_series.clone(),
            self.classifications.clone(),
            self.templates.clone(),
        )?;
        resolve_inputs(&gateway, &self.funds)
    }

    pub fn analyze(&self) -> PortfolioEngineResult<PortfolioAnalysis> {
        let resolved = self.resolve()?;
        analyze_portfolio(
            &self.funds,
            &resolved.price_series,
            &resolved.classifications,
            &resolved.templates,
            &self.window,
            &self.options,
        )
    }
}
