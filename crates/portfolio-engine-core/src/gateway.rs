//! Data-gateway seam between storage and the engine.
//!
//! The engine only ever receives resolved in-memory maps. Whatever owns the
//! storage implements [`PortfolioDataGateway`]; [`resolve_inputs`] walks a
//! fund list through it once and hands back the maps the analysers expect.

use std::collections::HashMap;

use crate::error::PortfolioEngineError;
use crate::types::*;
use crate::PortfolioEngineResult;

/// Lookups the engine's inputs are resolved through.
///
/// `Ok(None)` means "no such record"; `Err` is reserved for the backing store
/// itself failing.
pub trait PortfolioDataGateway {
    fn price_series(&self, fund_name: &str) -> PortfolioEngineResult<Option<RawPriceSeries>>;

    fn classification(&self, fund_name: &str) -> PortfolioEngineResult<Option<ClassificationRecord>>;

    fn holding_template(&self, category: &str) -> PortfolioEngineResult<Option<HoldingTemplate>>;
}

/// Everything the analysers need for one fund list.
#[derive(Debug, Clone, Default)]
pub struct ResolvedInputs {
    pub price_series: PriceSeriesMap,
    pub classifications: ClassificationMap,
    pub templates: TemplateMap,
}

/// Resolve prices, classifications and category templates for `funds`.
pub fn resolve_inputs<G: PortfolioDataGateway + ?Sized>(
    gateway: &G,
    funds: &[FundPosition],
) -> PortfolioEngineResult<ResolvedInputs> {
    let mut resolved = ResolvedInputs::default();

    for fund in funds {
        if resolved.price_series.contains_key(&fund.name)
            || resolved.classifications.contains_key(&fund.name)
        {
            continue;
        }
        if let Some(series) = gateway.price_series(&fund.name)? {
            resolved.price_series.insert(fund.name.clone(), series);
        }
        if let Some(record) = gateway.classification(&fund.name)? {
            if !resolved.templates.contains_key(&record.category) {
                if let Some(template) = gateway.holding_template(&record.category)? {
                    resolved.templates.insert(record.category.clone(), template);
                }
            }
            resolved.classifications.insert(fund.name.clone(), record);
        }
    }

    tracing::debug!(
        funds = funds.len(),
        priced = resolved.price_series.len(),
        classified = resolved.classifications.len(),
        templates = resolved.templates.len(),
        "resolved analysis inputs"
    );
    Ok(resolved)
}

/// Gateway over owned maps; the snapshot loader for the CLI and bindings.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    price_series: PriceSeriesMap,
    classifications: ClassificationMap,
    templates: TemplateMap,
}

impl InMemoryGateway {
    pub fn new(
        price_series: PriceSeriesMap,
        classifications: Vec<ClassificationRecord>,
        templates: Vec<HoldingTemplate>,
    ) -> PortfolioEngineResult<Self> {
        let mut by_fund: ClassificationMap = HashMap::with_capacity(classifications.len());
        for record in classifications {
            if by_fund.contains_key(&record.fund_name) {
                return Err(PortfolioEngineError::InvalidInput {
                    field: "classifications".into(),
                    reason: format!("Duplicate classification for fund '{}'", record.fund_name),
                });
            }
            by_fund.insert(record.fund_name.clone(), record);
        }
        let mut by_category: TemplateMap = HashMap::with_capacity(templates.len());
        for template in templates {
            if by_category.contains_key(&template.category) {
                return Err(PortfolioEngineError::InvalidInput {
                    field: "templates".into(),
                    reason: format!("Duplicate holding template for category '{}'", template.category),
                });
            }
            by_category.insert(template.category.clone(), template);
        }
        Ok(Self {
            price_series,
            classifications: by_fund,
            templates: by_category,
        })
    }
}

impl PortfolioDataGateway for InMemoryGateway {
    fn price_series(&self, fund_name: &str) -> PortfolioEngineResult<Option<RawPriceSeries>> {
        Ok(self.price_series.get(fund_name).cloned())
    }

    fn classification(&self, fund_name: &str) -> PortfolioEngineResult<Option<ClassificationRecord>> {
        Ok(self.classifications.get(fund_name).cloned())
    }

    fn holding_template(&self, category: &str) -> PortfolioEngineResult<Option<HoldingTemplate>> {
        Ok(self.templates.get(category).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn record(fund: &str, category: &str) -> ClassificationRecord {
        ClassificationRecord {
            fund_name: fund.into(),
            asset_type: AssetType::Equity,
            category: category.into(),
            sector_exposure: BTreeMap::new(),
            market_cap_exposure: MarketCapSplit::default(),
        }
    }

    fn fund(name: &str) -> FundPosition {
        FundPosition {
            name: name.into(),
            declared_type: String::new(),
            recurring: vec![],
            one_time: vec![],
        }
    }

    #[test]
    fn test_resolves_only_requested_funds() {
        let mut prices = PriceSeriesMap::new();
        prices.insert("A".into(), BTreeMap::from([("2023-01".to_string(), dec!(10))]));
        prices.insert("B".into(), BTreeMap::from([("2023-01".to_string(), dec!(20))]));
        let gateway = InMemoryGateway::new(
            prices,
            vec![record("A", "Large Cap"), record("B", "Mid Cap")],
            vec![HoldingTemplate {
                category: "Large Cap".into(),
                sector_allocation: BTreeMap::new(),
                market_cap: MarketCapSplit::default(),
            }],
        )
        .unwrap();

        let resolved = resolve_inputs(&gateway, &[fund("A"), fund("Missing")]).unwrap();
        assert_eq!(resolved.price_series.len(), 1);
        assert!(resolved.classifications.contains_key("A"));
        assert!(!resolved.classifications.contains_key("Missing"));
        assert!(resolved.templates.contains_key("Large Cap"));
        assert!(!resolved.templates.contains_key("Mid Cap"));
    }

    #[test]
    fn test_duplicate_classification_rejected() {
        let err = InMemoryGateway::new(
            PriceSeriesMap::new(),
            vec![record("A", "X"), record("A", "Y")],
            vec![],
        );
        assert!(err.is_err());
    }

    struct FailingGateway;

    impl PortfolioDataGateway for FailingGateway {
        fn price_series(&self, _: &str) -> PortfolioEngineResult<Option<RawPriceSeries>> {
            Err(PortfolioEngineError::Gateway("store offline".into()))
        }
        fn classification(&self, _: &str) -> PortfolioEngineResult<Option<ClassificationRecord>> {
            Ok(None)
        }
        fn holding_template(&self, _: &str) -> PortfolioEngineResult<Option<HoldingTemplate>> {
            Ok(None)
        }
    }

    #[test]
    fn test_gateway_failure_propagates() {
        let result = resolve_inputs(&FailingGateway, &[fund("A")]);
        assert!(matches!(result, Err(PortfolioEngineError::Gateway(_))));
    }
}
