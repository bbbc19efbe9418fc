use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calendar::AnalysisWindow;
use crate::cashflows::scheduled_amount;
use crate::diversification::concentration::{
    evaluate_concentration, ConcentrationInputs, ConcentrationThresholds, RiskFinding,
    OTHER_ASSET_BUCKET, UNCLASSIFIED_CATEGORY_BUCKET,
};
use crate::error::PortfolioEngineError;
use crate::types::*;
use crate::PortfolioEngineResult;

/// A fund's share of the portfolio's invested capital.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundWeight {
    pub fund_name: String,
    pub invested: Money,
    pub weight_percent: Percent,
    /// Whether classification metadata was found for the fund.
    pub classified: bool,
}

/// Weighted composition of the portfolio and its concentration flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversificationResult {
    /// Every fund supplied, including zero-weight ones.
    pub fund_count: usize,
    pub classified_fund_count: usize,
    pub total_invested: Money,
    pub fund_weights: Vec<FundWeight>,
    /// Asset type → percent of invested capital. Sums to 100.
    pub asset_allocation: BTreeMap<String, Percent>,
    /// Category → percent of invested capital. Sums to 100.
    pub category_distribution: BTreeMap<String, Percent>,
    /// Sector → percent of invested capital, looked through the funds that
    /// carry sector data. Sums to `sector_coverage_percent`.
    pub sector_exposure: BTreeMap<String, Percent>,
    /// Large / Mid / Small → percent of invested capital.
    pub market_cap_exposure: BTreeMap<String, Percent>,
    /// Share of invested capital with sector data behind it.
    pub sector_coverage_percent: Percent,
    /// Herfindahl-Hirschman index of the asset allocation, 0-1 scale.
    pub concentration_hhi: Decimal,
    pub concentration_risks: Vec<RiskFinding>,
    pub warnings: Vec<String>,
}

/// Analyse diversification with the default concentration thresholds.
pub fn analyze_diversification(
    funds: &[FundPosition],
    classifications: &ClassificationMap,
    templates: &TemplateMap,
    window: &AnalysisWindow,
) -> PortfolioEngineResult<DiversificationResult> {
    analyze_diversification_with(
        funds,
        classifications,
        templates,
        window,
        &ConcentrationThresholds::default(),
    )
}

/// Weight each fund by its scheduled invested capital and fold its
/// classification into portfolio-level distributions, then flag
/// concentration.
pub fn analyze_diversification_with(
    funds: &[FundPosition],
    classifications: &ClassificationMap,
    templates: &TemplateMap,
    window: &AnalysisWindow,
    thresholds: &ConcentrationThresholds,
) -> PortfolioEngineResult<DiversificationResult> {
    window.validate()?;
    for fund in funds {
        fund.validate()?;
    }

    let mut warnings: Vec<String> = Vec::new();

    let mut invested_by_fund: Vec<(&FundPosition, Money)> = Vec::with_capacity(funds.len());
    for fund in funds {
        invested_by_fund.push((fund, scheduled_amount(fund, window)?));
    }
    let total_invested = checked_sum(invested_by_fund.iter().map(|(_, amt)| *amt), "portfolio invested capital")?;

    // Raw weights on a 0-1 scale; converted to percent once at the end.
    let mut asset_weights: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut category_weights: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut sector_weights: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut cap_weights: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut sector_covered = Decimal::ZERO;

    let mut fund_weights: Vec<FundWeight> = Vec::with_capacity(funds.len());
    let mut classified_fund_count = 0;

    for (fund, invested) in &invested_by_fund {
        let record = classifications.get(&fund.name);
        if record.is_some() {
            classified_fund_count += 1;
        } else {
            tracing::debug!(fund = %fund.name, "no classification metadata");
        }

        let weight = if total_invested.is_zero() {
            Decimal::ZERO
        } else {
            *invested / total_invested
        };
        fund_weights.push(FundWeight {
            fund_name: fund.name.clone(),
            invested: *invested,
            weight_percent: to_percent(weight)
                .ok_or_else(|| PortfolioEngineError::overflow(format!("weight of fund {}", fund.name)))?,
            classified: record.is_some(),
        });

        if weight.is_zero() {
            continue;
        }

        let Some(record) = record else {
            *asset_weights.entry(OTHER_ASSET_BUCKET.to_string()).or_insert(Decimal::ZERO) += weight;
            *category_weights
                .entry(UNCLASSIFIED_CATEGORY_BUCKET.to_string())
                .or_insert(Decimal::ZERO) += weight;
            continue;
        };

        *asset_weights.entry(record.asset_type.to_string()).or_insert(Decimal::ZERO) += weight;
        *category_weights.entry(record.category.clone()).or_insert(Decimal::ZERO) += weight;

        // Category template first, the record's own look-through second.
        let template = templates.get(&record.category);
        let sectors = match template {
            Some(t) if !t.sector_allocation.is_empty() => &t.sector_allocation,
            _ => &record.sector_exposure,
        };
        let caps = match template {
            Some(t) if !t.market_cap.is_empty() => t.market_cap,
            _ => record.market_cap_exposure,
        };

        if !sectors.is_empty() {
            sector_covered += weight;
            for (sector, pct) in sectors {
                add_look_through(&mut sector_weights, sector, weight, *pct, &fund.name)?;
            }
        }
        if !caps.is_empty() {
            for (bucket, pct) in caps.buckets() {
                add_look_through(&mut cap_weights, bucket, weight, pct, &fund.name)?;
            }
        }
    }

    if total_invested.is_zero() && !funds.is_empty() {
        push_warning(
            &mut warnings,
            "No contributions fall inside the analysis window; allocation is empty".into(),
        );
    }
    let unclassified: Vec<&str> = fund_weights
        .iter()
        .filter(|w| !w.classified)
        .map(|w| w.fund_name.as_str())
        .collect();
    if !unclassified.is_empty() {
        push_warning(
            &mut warnings,
            format!("No classification data for: {}", unclassified.join(", ")),
        );
    }

    let concentration_hhi: Decimal = asset_weights.values().map(|w| w * w).sum();

    let asset_allocation = to_percent_map(&asset_weights)?;
    let category_distribution = to_percent_map(&category_weights)?;
    let sector_exposure = to_percent_map(&sector_weights)?;
    let market_cap_exposure = to_percent_map(&cap_weights)?;

    let weights_for_risk: Vec<(String, Percent)> = fund_weights
        .iter()
        .filter(|w| !w.weight_percent.is_zero())
        .map(|w| (w.fund_name.clone(), w.weight_percent))
        .collect();
    let (concentration_risks, risk_warnings) = evaluate_concentration(
        &ConcentrationInputs {
            asset_allocation: &asset_allocation,
            category_distribution: &category_distribution,
            sector_exposure: &sector_exposure,
            fund_weights: &weights_for_risk,
            fund_count: funds.len(),
        },
        thresholds,
    );
    for w in risk_warnings {
        push_warning(&mut warnings, w);
    }

    Ok(DiversificationResult {
        fund_count: funds.len(),
        classified_fund_count,
        total_invested,
        fund_weights,
        asset_allocation,
        category_distribution,
        sector_exposure,
        market_cap_exposure,
        sector_coverage_percent: to_percent(sector_covered)
            .ok_or_else(|| PortfolioEngineError::overflow("sector coverage"))?,
        concentration_hhi,
        concentration_risks,
        warnings,
    })
}

/// 0-1 weight → percent, 2 dp, half away from zero.
fn to_percent(weight: Decimal) -> Option<Percent> {
    weight
        .checked_mul(dec!(100))
        .map(|pct| pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Accumulated 0-1 weights (shares of the whole portfolio) to percent.
fn to_percent_map(weights: &BTreeMap<String, Decimal>) -> PortfolioEngineResult<BTreeMap<String, Percent>> {
    weights
        .iter()
        .map(|(k, w)| {
            to_percent(*w)
                .map(|pct| (k.clone(), pct))
                .ok_or_else(|| PortfolioEngineError::overflow(format!("exposure to {k}")))
        })
        .collect()
}

/// Add a fund's `weight × percent / 100` to one look-through bucket.
fn add_look_through(
    weights: &mut BTreeMap<String, Decimal>,
    bucket: &str,
    weight: Decimal,
    percent: Percent,
    fund_name: &str,
) -> PortfolioEngineResult<()> {
    let overflow = || PortfolioEngineError::overflow(format!("look-through exposure of fund {fund_name}"));
    let share = weight
        .checked_mul(percent)
        .and_then(|v| v.checked_div(dec!(100)))
        .ok_or_else(overflow)?;
    let entry = weights.entry(bucket.to_string()).or_insert(Decimal::ZERO);
    *entry = entry.checked_add(share).ok_or_else(overflow)?;
    Ok(())
}

fn push_warning(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{message}");
    warnings.push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::MonthKey;

    fn window() -> AnalysisWindow {
        AnalysisWindow::new(MonthKey::new(2023, 1).unwrap(), MonthKey::new(2023, 12).unwrap()).unwrap()
    }

    fn lump(name: &str, amount: Decimal) -> FundPosition {
        FundPosition {
            name: name.into(),
            declared_type: String::new(),
            recurring: vec![],
            one_time: vec![OneTimeContribution {
                amount,
                year: 2023,
                month: 1,
            }],
        }
    }

    #[test]
    fn test_to_percent_rounds_half_away_from_zero() {
        assert_eq!(to_percent(dec!(0.123450)), Some(dec!(12.35)));
        assert_eq!(to_percent(dec!(1) / dec!(3)), Some(dec!(33.33)));
    }

    #[test]
    fn test_hhi_single_asset_is_one() {
        let funds = vec![lump("A", dec!(100)), lump("B", dec!(300))];
        let mut classes = ClassificationMap::new();
        for name in ["A", "B"] {
            classes.insert(
                name.into(),
                ClassificationRecord {
                    fund_name: name.into(),
                    asset_type: AssetType::Debt,
                    category: "Liquid".into(),
                    sector_exposure: BTreeMap::new(),
                    market_cap_exposure: MarketCapSplit::default(),
                },
            );
        }
        let result = analyze_diversification(&funds, &classes, &TemplateMap::new(), &window()).unwrap();
        assert_eq!(result.concentration_hhi, Decimal::ONE);
        assert_eq!(result.asset_allocation["Debt"], dec!(100));
        assert!(result.sector_exposure.is_empty());
        assert_eq!(result.sector_coverage_percent, Decimal::ZERO);
    }

    #[test]
    fn test_empty_portfolio() {
        let result =
            analyze_diversification(&[], &ClassificationMap::new(), &TemplateMap::new(), &window()).unwrap();
        assert_eq!(result.fund_count, 0);
        assert!(result.asset_allocation.is_empty());
        assert!(result.concentration_risks.is_empty());
        // Fewer than three funds is always worth a warning.
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_record_exposure_used_without_template() {
        let funds = vec![lump("A", dec!(100))];
        let mut classes = ClassificationMap::new();
        classes.insert(
            "A".into(),
            ClassificationRecord {
                fund_name: "A".into(),
                asset_type: AssetType::Equity,
                category: "Thematic".into(),
                sector_exposure: BTreeMap::from([
                    ("Technology".to_string(), dec!(60)),
                    ("Healthcare".to_string(), dec!(40)),
                ]),
                market_cap_exposure: MarketCapSplit {
                    large: dec!(50),
                    mid: dec!(30),
                    small: dec!(20),
                },
            },
        );
        let result = analyze_diversification(&funds, &classes, &TemplateMap::new(), &window()).unwrap();
        assert_eq!(result.sector_exposure["Technology"], dec!(60));
        assert_eq!(result.market_cap_exposure["Small"], dec!(20));
        assert_eq!(result.sector_coverage_percent, dec!(100));
    }
}
