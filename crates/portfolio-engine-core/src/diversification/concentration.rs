use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Percent;

/// Catch-all buckets that never raise asset or category findings.
pub const OTHER_ASSET_BUCKET: &str = "Other";
pub const UNCLASSIFIED_CATEGORY_BUCKET: &str = "Unclassified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    AssetConcentration,
    CategoryConcentration,
    SectorConcentration,
    SingleFundDominance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

/// One concentration flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub kind: RiskKind,
    /// The asset type, category, sector or fund name that is concentrated.
    pub subject: String,
    pub percent: Percent,
    pub severity: Severity,
}

/// A two-level threshold. Both edges are exclusive: a share must be strictly
/// above `medium` to be medium and strictly above `high` to be high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub medium: Percent,
    pub high: Percent,
}

impl ThresholdBand {
    pub const fn new(medium: Percent, high: Percent) -> Self {
        Self { medium, high }
    }

    pub fn classify(&self, percent: Percent) -> Option<Severity> {
        if percent > self.high {
            Some(Severity::High)
        } else if percent > self.medium {
            Some(Severity::Medium)
        } else {
            None
        }
    }
}

/// Concentration limits; defaults are the house rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcentrationThresholds {
    pub asset: ThresholdBand,
    pub category: ThresholdBand,
    pub sector: ThresholdBand,
    pub single_fund: ThresholdBand,
    /// Portfolios with fewer funds get a warning.
    pub min_fund_count: usize,
}

impl Default for ConcentrationThresholds {
    fn default() -> Self {
        Self {
            asset: ThresholdBand::new(dec!(60), dec!(80)),
            category: ThresholdBand::new(dec!(50), dec!(70)),
            sector: ThresholdBand::new(dec!(30), dec!(40)),
            single_fund: ThresholdBand::new(dec!(40), dec!(50)),
            min_fund_count: 3,
        }
    }
}

/// Inputs to the evaluator, all already in percent.
#[derive(Debug, Clone, Copy)]
pub struct ConcentrationInputs<'a> {
    pub asset_allocation: &'a BTreeMap<String, Percent>,
    pub category_distribution: &'a BTreeMap<String, Percent>,
    pub sector_exposure: &'a BTreeMap<String, Percent>,
    /// (fund name, weight percent)
    pub fund_weights: &'a [(String, Percent)],
    pub fund_count: usize,
}

/// Apply every threshold rule independently. Returns findings and warnings.
pub fn evaluate_concentration(
    inputs: &ConcentrationInputs<'_>,
    thresholds: &ConcentrationThresholds,
) -> (Vec<RiskFinding>, Vec<String>) {
    let mut findings = Vec::new();
    let mut warnings = Vec::new();

    findings.extend(flag_buckets(
        RiskKind::AssetConcentration,
        inputs
            .asset_allocation
            .iter()
            .filter(|(k, _)| k.as_str() != OTHER_ASSET_BUCKET),
        &thresholds.asset,
    ));
    findings.extend(flag_buckets(
        RiskKind::CategoryConcentration,
        inputs
            .category_distribution
            .iter()
            .filter(|(k, _)| k.as_str() != UNCLASSIFIED_CATEGORY_BUCKET),
        &thresholds.category,
    ));
    findings.extend(flag_buckets(
        RiskKind::SectorConcentration,
        inputs.sector_exposure.iter(),
        &thresholds.sector,
    ));
    findings.extend(flag_buckets(
        RiskKind::SingleFundDominance,
        inputs.fund_weights.iter().map(|(name, pct)| (name, pct)),
        &thresholds.single_fund,
    ));

    if inputs.fund_count < thresholds.min_fund_count {
        warnings.push(format!(
            "Portfolio holds only {} fund(s); at least {} are recommended for diversification",
            inputs.fund_count, thresholds.min_fund_count
        ));
    }

    (findings, warnings)
}

fn flag_buckets<'a, I>(kind: RiskKind, buckets: I, band: &ThresholdBand) -> Vec<RiskFinding>
where
    I: Iterator<Item = (&'a String, &'a Decimal)>,
{
    let mut flagged: Vec<RiskFinding> = buckets
        .filter_map(|(subject, pct)| {
            band.classify(*pct).map(|severity| RiskFinding {
                kind,
                subject: subject.clone(),
                percent: *pct,
                severity,
            })
        })
        .collect();
    flagged.sort_by(|a, b| b.percent.cmp(&a.percent).then_with(|| a.subject.cmp(&b.subject)));
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn evaluate(asset: &[(&str, Decimal)]) -> Vec<RiskFinding> {
        let assets = map(asset);
        let empty = BTreeMap::new();
        let inputs = ConcentrationInputs {
            asset_allocation: &assets,
            category_distribution: &empty,
            sector_exposure: &empty,
            fund_weights: &[],
            fund_count: 5,
        };
        evaluate_concentration(&inputs, &ConcentrationThresholds::default()).0
    }

    #[test]
    fn test_band_edges_are_exclusive() {
        let band = ThresholdBand::new(dec!(60), dec!(80));
        assert_eq!(band.classify(dec!(60)), None);
        assert_eq!(band.classify(dec!(60.01)), Some(Severity::Medium));
        assert_eq!(band.classify(dec!(80)), Some(Severity::Medium));
        assert_eq!(band.classify(dec!(80.01)), Some(Severity::High));
    }

    #[test]
    fn test_asset_exactly_80_is_medium_not_high() {
        let findings = evaluate(&[("Equity", dec!(80.00)), ("Debt", dec!(20.00))]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn test_asset_above_80_is_high() {
        let findings = evaluate(&[("Equity", dec!(80.01)), ("Debt", dec!(19.99))]);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].kind, RiskKind::AssetConcentration);
    }

    #[test]
    fn test_other_bucket_never_flagged() {
        let findings = evaluate(&[("Other", dec!(100))]);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_rules_fire_independently() {
        let assets = map(&[("Equity", dec!(90))]);
        let categories = map(&[("Large Cap", dec!(55))]);
        let sectors = map(&[("Financials", dec!(41)), ("IT", dec!(35))]);
        let weights = vec![("Alpha".to_string(), dec!(45))];
        let inputs = ConcentrationInputs {
            asset_allocation: &assets,
            category_distribution: &categories,
            sector_exposure: &sectors,
            fund_weights: &weights,
            fund_count: 2,
        };
        let (findings, warnings) = evaluate_concentration(&inputs, &ConcentrationThresholds::default());
        let kinds: Vec<RiskKind> = findings.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RiskKind::AssetConcentration,
                RiskKind::CategoryConcentration,
                RiskKind::SectorConcentration,
                RiskKind::SectorConcentration,
                RiskKind::SingleFundDominance,
            ]
        );
        assert_eq!(findings[2].subject, "Financials");
        assert_eq!(findings[2].severity, Severity::High);
        assert_eq!(findings[3].severity, Severity::Medium);
        assert_eq!(findings[4].severity, Severity::Medium);
        assert_eq!(warnings.len(), 1);
    }
}
