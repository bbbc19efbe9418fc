use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::calendar::MonthKey;
use crate::error::PortfolioEngineError;
use crate::PortfolioEngineResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Percentages on a 0-100 scale.
pub type Percent = Decimal;

/// Year fractions or counts
pub type Years = Decimal;

/// Sum that reports overflow as an error instead of panicking.
pub fn checked_sum<I>(values: I, context: &str) -> PortfolioEngineResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| {
        acc.checked_add(v).ok_or_else(|| PortfolioEngineError::overflow(context))
    })
}

/// Raw month-key → price observations for one fund, exactly as stored.
pub type RawPriceSeries = BTreeMap<String, Decimal>;

/// Fund name → raw price observations.
pub type PriceSeriesMap = HashMap<String, RawPriceSeries>;

/// Fund name → classification metadata.
pub type ClassificationMap = HashMap<String, ClassificationRecord>;

/// Category → holding template.
pub type TemplateMap = HashMap<String, HoldingTemplate>;

// ---------------------------------------------------------------------------
// Contributions
// ---------------------------------------------------------------------------

/// A fixed monthly investment into a fund, optionally open-ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringContribution {
    pub amount: Money,
    pub start_year: i32,
    pub start_month: u32,
    #[serde(default)]
    pub is_ongoing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_month: Option<u32>,
}

impl RecurringContribution {
    pub fn start(&self) -> PortfolioEngineResult<MonthKey> {
        MonthKey::new(self.start_year, self.start_month)
    }

    /// Declared end month. `None` for ongoing plans and for incomplete
    /// entries (not ongoing, but missing an end field).
    pub fn declared_end(&self) -> PortfolioEngineResult<Option<MonthKey>> {
        if self.is_ongoing {
            return Ok(None);
        }
        match (self.end_year, self.end_month) {
            (Some(year), Some(month)) => MonthKey::new(year, month).map(Some),
            _ => Ok(None),
        }
    }

    /// Not ongoing and no usable end date.
    pub fn is_incomplete(&self) -> bool {
        !self.is_ongoing && (self.end_year.is_none() || self.end_month.is_none())
    }
}

/// A single investment at a specific month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneTimeContribution {
    pub amount: Money,
    pub year: i32,
    pub month: u32,
}

impl OneTimeContribution {
    pub fn month_key(&self) -> PortfolioEngineResult<MonthKey> {
        MonthKey::new(self.year, self.month)
    }
}

/// One fund held in the portfolio together with its contribution history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundPosition {
    /// Join key into price series and classification metadata.
    pub name: String,
    #[serde(default)]
    pub declared_type: String,
    #[serde(default)]
    pub recurring: Vec<RecurringContribution>,
    #[serde(default)]
    pub one_time: Vec<OneTimeContribution>,
}

impl FundPosition {
    /// Reject values that can only come from a caller bug.
    pub fn validate(&self) -> PortfolioEngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(PortfolioEngineError::InvalidInput {
                field: "funds.name".into(),
                reason: "Fund name cannot be empty.".into(),
            });
        }
        for (i, c) in self.recurring.iter().enumerate() {
            if c.amount <= Decimal::ZERO {
                return Err(PortfolioEngineError::InvalidInput {
                    field: format!("funds.{}.recurring[{i}].amount", self.name),
                    reason: "Contribution amount must be positive.".into(),
                });
            }
            c.start().map_err(|_| PortfolioEngineError::InvalidInput {
                field: format!("funds.{}.recurring[{i}].start_month", self.name),
                reason: format!("Month must be in 1..=12, got {}", c.start_month),
            })?;
            if let Some(month) = c.end_month {
                if !(1..=12).contains(&month) {
                    return Err(PortfolioEngineError::InvalidInput {
                        field: format!("funds.{}.recurring[{i}].end_month", self.name),
                        reason: format!("Month must be in 1..=12, got {month}"),
                    });
                }
            }
        }
        for (i, c) in self.one_time.iter().enumerate() {
            if c.amount <= Decimal::ZERO {
                return Err(PortfolioEngineError::InvalidInput {
                    field: format!("funds.{}.one_time[{i}].amount", self.name),
                    reason: "Contribution amount must be positive.".into(),
                });
            }
            c.month_key().map_err(|_| PortfolioEngineError::InvalidInput {
                field: format!("funds.{}.one_time[{i}].month", self.name),
                reason: format!("Month must be in 1..=12, got {}", c.month),
            })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Classification reference data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetType {
    Equity,
    Debt,
    Hybrid,
    Gold,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssetType::Equity => "Equity",
            AssetType::Debt => "Debt",
            AssetType::Hybrid => "Hybrid",
            AssetType::Gold => "Gold",
        };
        f.write_str(label)
    }
}

/// Large / Mid / Small cap split in percent. Should sum to at most 100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketCapSplit {
    #[serde(default)]
    pub large: Percent,
    #[serde(default)]
    pub mid: Percent,
    #[serde(default)]
    pub small: Percent,
}

impl MarketCapSplit {
    pub fn is_empty(&self) -> bool {
        self.large.is_zero() && self.mid.is_zero() && self.small.is_zero()
    }

    /// Labelled buckets in display order.
    pub fn buckets(&self) -> [(&'static str, Percent); 3] {
        [("Large", self.large), ("Mid", self.mid), ("Small", self.small)]
    }
}

/// Static classification of one fund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub fund_name: String,
    pub asset_type: AssetType,
    pub category: String,
    #[serde(default)]
    pub sector_exposure: BTreeMap<String, Percent>,
    #[serde(default)]
    pub market_cap_exposure: MarketCapSplit,
}

/// Representative holdings of a fund category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingTemplate {
    pub category: String,
    #[serde(default)]
    pub sector_allocation: BTreeMap<String, Percent>,
    #[serde(default)]
    pub market_cap: MarketCapSplit,
}

// ---------------------------------------------------------------------------
// Output envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fund() -> FundPosition {
        FundPosition {
            name: "Index Fund".into(),
            declared_type: "Equity".into(),
            recurring: vec![RecurringContribution {
                amount: dec!(1000),
                start_year: 2022,
                start_month: 1,
                is_ongoing: true,
                end_year: None,
                end_month: None,
            }],
            one_time: vec![],
        }
    }

    #[test]
    fn test_valid_fund_passes() {
        assert!(fund().validate().is_ok());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut f = fund();
        f.recurring[0].amount = dec!(-5);
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_bad_one_time_month_rejected() {
        let mut f = fund();
        f.one_time.push(OneTimeContribution {
            amount: dec!(10),
            year: 2022,
            month: 14,
        });
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_incomplete_recurring_detected() {
        let mut f = fund();
        f.recurring[0].is_ongoing = false;
        f.recurring[0].end_year = Some(2023);
        assert!(f.recurring[0].is_incomplete());
        assert_eq!(f.recurring[0].declared_end().unwrap(), None);
        // Incomplete is a data-quality issue, not a caller bug.
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_fund_defaults_from_json() {
        let f: FundPosition = serde_json::from_str(r#"{"name": "Gold ETF"}"#).unwrap();
        assert!(f.recurring.is_empty());
        assert!(f.one_time.is_empty());
        assert_eq!(f.declared_type, "");
    }
}
