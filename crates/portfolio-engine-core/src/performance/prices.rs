use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::calendar::{AnalysisWindow, MonthKey};
use crate::cashflows::DensePrices;
use crate::types::RawPriceSeries;

/// A gap-filled price series covering every month of the window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedPrices {
    /// Empty when the fund has no usable observation at all.
    pub prices: DensePrices,
    /// Raw keys that could not be parsed as a month.
    pub rejected_keys: Vec<String>,
    /// Raw keys naming a month an earlier key already supplied. Keys are
    /// visited in sorted order, so `"2023-02"` wins over `"2023-2"`.
    pub duplicate_keys: Vec<String>,
    /// Window months that had no direct observation.
    pub filled_months: usize,
}

impl NormalizedPrices {
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn closing_price(&self, window: &AnalysisWindow) -> Option<Decimal> {
        self.prices.get(&window.end).copied()
    }
}

/// Normalise keys and fill gaps across `window`.
///
/// A missing month takes the nearest earlier observation (observations before
/// the window count), else the nearest later one. Non-positive prices are
/// treated as missing.
pub fn normalize_price_series(raw: &RawPriceSeries, window: &AnalysisWindow) -> NormalizedPrices {
    let mut known: BTreeMap<MonthKey, Decimal> = BTreeMap::new();
    let mut seen: BTreeSet<MonthKey> = BTreeSet::new();
    let mut rejected_keys = Vec::new();
    let mut duplicate_keys = Vec::new();

    for (key, price) in raw {
        let Ok(month) = key.parse::<MonthKey>() else {
            rejected_keys.push(key.clone());
            continue;
        };
        if !seen.insert(month) {
            duplicate_keys.push(key.clone());
            continue;
        }
        if *price > Decimal::ZERO {
            known.insert(month, *price);
        }
    }

    if known.is_empty() {
        return NormalizedPrices {
            prices: DensePrices::new(),
            rejected_keys,
            duplicate_keys,
            filled_months: 0,
        };
    }

    let mut prices = DensePrices::new();
    let mut filled_months = 0;
    for month in window.months() {
        if let Some(price) = known.get(&month) {
            prices.insert(month, *price);
            continue;
        }
        filled_months += 1;
        let carried = known
            .range(..month)
            .next_back()
            .or_else(|| known.range(month..).next())
            .map(|(_, p)| *p);
        if let Some(price) = carried {
            prices.insert(month, price);
        }
    }

    NormalizedPrices {
        prices,
        rejected_keys,
        duplicate_keys,
        filled_months,
    }
}
