use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calendar::{AnalysisWindow, MonthKey};
use crate::cashflows::{expand_one_time, expand_recurring, Cashflow, ContributionDetail};
use crate::error::PortfolioEngineError;
use crate::performance::prices::normalize_price_series;
use crate::time_value::{self, SolverConfig};
use crate::types::*;
use crate::PortfolioEngineResult;

/// Performance of a single fund at the window close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundPerformanceResult {
    pub fund_name: String,
    pub declared_type: String,
    pub total_invested: Money,
    pub current_value: Money,
    pub total_units: Decimal,
    pub closing_price: Decimal,
    pub absolute_return: Money,
    /// `None` when nothing was invested.
    pub absolute_return_percent: Option<Percent>,
    pub internal_rate_of_return: Option<Rate>,
    pub cashflows: Vec<Cashflow>,
    pub contributions: Vec<ContributionDetail>,
}

/// Portfolio totals plus every analysable fund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioPerformanceSummary {
    pub window: AnalysisWindow,
    pub funds: Vec<FundPerformanceResult>,
    pub total_invested: Money,
    pub current_value: Money,
    pub absolute_return: Money,
    pub absolute_return_percent: Option<Percent>,
    pub cagr: Option<Rate>,
    pub internal_rate_of_return: Option<Rate>,
    pub earliest_cashflow: Option<MonthKey>,
    pub years_elapsed: Option<Years>,
    /// Funds excluded from totals because no price could be resolved.
    pub unanalyzed_funds: Vec<String>,
    pub warnings: Vec<String>,
}

/// Analyse performance with the default solver configuration.
pub fn analyze_performance(
    funds: &[FundPosition],
    price_series: &PriceSeriesMap,
    window: &AnalysisWindow,
) -> PortfolioEngineResult<PortfolioPerformanceSummary> {
    analyze_performance_with(funds, price_series, window, &SolverConfig::default())
}

/// Expand every fund's contributions against its price series, value the
/// holdings at the window close, and derive absolute return, CAGR and XIRR.
pub fn analyze_performance_with(
    funds: &[FundPosition],
    price_series: &PriceSeriesMap,
    window: &AnalysisWindow,
    solver: &SolverConfig,
) -> PortfolioEngineResult<PortfolioPerformanceSummary> {
    window.validate()?;
    for fund in funds {
        fund.validate()?;
    }
    let closing_date = window.closing_date()?;

    let mut warnings: Vec<String> = Vec::new();
    let mut results: Vec<FundPerformanceResult> = Vec::new();
    let mut unanalyzed_funds: Vec<String> = Vec::new();

    for fund in funds {
        tracing::debug!(fund = %fund.name, "expanding contributions");

        let normalized = match price_series.get(&fund.name) {
            Some(raw) => normalize_price_series(raw, window),
            None => Default::default(),
        };
        if !normalized.rejected_keys.is_empty() {
            push_warning(
                &mut warnings,
                format!(
                    "Ignored unrecognised price keys for fund {}: {}",
                    fund.name,
                    normalized.rejected_keys.join(", ")
                ),
            );
        }
        if !normalized.duplicate_keys.is_empty() {
            push_warning(
                &mut warnings,
                format!(
                    "Ignored price keys repeating an earlier month for fund {}: {}",
                    fund.name,
                    normalized.duplicate_keys.join(", ")
                ),
            );
        }
        let closing_price = match normalized.closing_price(window) {
            Some(price) => price,
            None => {
                push_warning(&mut warnings, format!("No price data for fund {}", fund.name));
                unanalyzed_funds.push(fund.name.clone());
                continue;
            }
        };

        let mut cashflows: Vec<Cashflow> = Vec::new();
        let mut contributions: Vec<ContributionDetail> = Vec::new();

        for (i, c) in fund.recurring.iter().enumerate() {
            if c.is_incomplete() {
                push_warning(
                    &mut warnings,
                    format!(
                        "Recurring contribution {} of fund {} is not ongoing and has no end date; ignored",
                        i + 1,
                        fund.name
                    ),
                );
            }
            let expansion = expand_recurring(&fund.name, c, &normalized.prices, window)?;
            cashflows.extend(expansion.cashflows);
            contributions.push(expansion.detail);
        }
        for c in &fund.one_time {
            if c.month_key()? > window.end {
                push_warning(
                    &mut warnings,
                    format!(
                        "One-time contribution of {} to fund {} in {} is after the window end {}; excluded",
                        c.amount,
                        fund.name,
                        c.month_key()?,
                        window.end
                    ),
                );
            }
            let expansion = expand_one_time(&fund.name, c, &normalized.prices, window)?;
            cashflows.extend(expansion.cashflows);
            contributions.push(expansion.detail);
        }

        let skipped: u32 = contributions.iter().map(|d| d.skipped_months).sum();
        if skipped > 0 {
            push_warning(
                &mut warnings,
                format!("Fund {} has {skipped} contribution month(s) without a price; skipped", fund.name),
            );
        }

        let context = format!("valuation of fund {}", fund.name);
        let total_invested = checked_sum(contributions.iter().map(|d| d.invested), &context)?;
        let total_units = checked_sum(contributions.iter().map(|d| d.units), &context)?;
        let current_value = total_units
            .checked_mul(closing_price)
            .ok_or_else(|| PortfolioEngineError::overflow(&context))?;
        let absolute_return = current_value
            .checked_sub(total_invested)
            .ok_or_else(|| PortfolioEngineError::overflow(&context))?;

        let internal_rate_of_return = if cashflows.is_empty() {
            None
        } else {
            solve_rate(&cashflows, current_value, closing_date, solver, &fund.name, &mut warnings)?
        };

        results.push(FundPerformanceResult {
            fund_name: fund.name.clone(),
            declared_type: fund.declared_type.clone(),
            total_invested,
            current_value,
            total_units,
            closing_price,
            absolute_return,
            absolute_return_percent: percent_of(absolute_return, total_invested),
            internal_rate_of_return,
            cashflows,
            contributions,
        });
    }

    let total_invested = checked_sum(results.iter().map(|r| r.total_invested), "portfolio totals")?;
    let current_value = checked_sum(results.iter().map(|r| r.current_value), "portfolio totals")?;
    let absolute_return = current_value
        .checked_sub(total_invested)
        .ok_or_else(|| PortfolioEngineError::overflow("portfolio totals"))?;

    let earliest_cashflow = results
        .iter()
        .flat_map(|r| r.cashflows.iter().map(|c| c.month))
        .min();

    let years_elapsed = match earliest_cashflow {
        Some(month) => Some(time_value::year_fraction(month.first_day()?, closing_date)),
        None => None,
    };

    let cagr = match years_elapsed {
        Some(years) if years > Decimal::ZERO && !total_invested.is_zero() => {
            compound_annual_growth(total_invested, current_value, years)
        }
        _ => None,
    };

    let all_cashflows: Vec<Cashflow> = results.iter().flat_map(|r| r.cashflows.iter().cloned()).collect();
    let internal_rate_of_return = if all_cashflows.is_empty() {
        None
    } else {
        solve_rate(&all_cashflows, current_value, closing_date, solver, "portfolio", &mut warnings)?
    };

    Ok(PortfolioPerformanceSummary {
        window: *window,
        funds: results,
        total_invested,
        current_value,
        absolute_return,
        absolute_return_percent: percent_of(absolute_return, total_invested),
        cagr,
        internal_rate_of_return,
        earliest_cashflow,
        years_elapsed,
        unanalyzed_funds,
        warnings,
    })
}

/// XIRR over the outflows plus a closing inflow. Solver failures become
/// `None` and a warning.
fn solve_rate(
    cashflows: &[Cashflow],
    closing_value: Money,
    closing_date: NaiveDate,
    solver: &SolverConfig,
    subject: &str,
    warnings: &mut Vec<String>,
) -> PortfolioEngineResult<Option<Rate>> {
    let mut flows: Vec<(NaiveDate, Money)> = Vec::with_capacity(cashflows.len() + 1);
    for c in cashflows {
        flows.push((c.month.first_day()?, -c.amount));
    }
    flows.push((closing_date, closing_value));

    match time_value::xirr(&flows, solver) {
        Ok(rate) => Ok(Some(rate)),
        Err(e) => {
            push_warning(warnings, format!("XIRR unavailable for {subject}: {e}"));
            Ok(None)
        }
    }
}

/// `(current / invested)^(1/years) − 1`. A total loss is exactly −100%.
fn compound_annual_growth(invested: Money, current: Money, years: Years) -> Option<Rate> {
    let ratio = current.checked_div(invested)?;
    if ratio <= Decimal::ZERO {
        return Some(dec!(-1));
    }
    let exponent = Decimal::ONE.checked_div(years)?;
    ratio.checked_powd(exponent).map(|growth| growth - Decimal::ONE)
}

fn percent_of(part: Money, whole: Money) -> Option<Percent> {
    if whole.is_zero() {
        None
    } else {
        dec!(100).checked_mul(part)?.checked_div(whole)
    }
}

fn push_warning(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{message}");
    warnings.push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn mk(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    #[test]
    fn test_cagr_doubling_over_two_years() {
        let cagr = compound_annual_growth(dec!(100), dec!(121), dec!(2)).unwrap();
        assert!((cagr - dec!(0.1)).abs() < dec!(0.000001), "got {cagr}");
    }

    #[test]
    fn test_cagr_total_loss() {
        assert_eq!(compound_annual_growth(dec!(100), dec!(0), dec!(3)), Some(dec!(-1)));
    }

    #[test]
    fn test_percent_of_zero_is_none() {
        assert_eq!(percent_of(dec!(5), dec!(0)), None);
        assert_eq!(percent_of(dec!(5), dec!(50)), Some(dec!(10)));
    }

    #[test]
    fn test_missing_fund_prices_excluded_with_warning() {
        let window = AnalysisWindow::new(mk(2023, 1), mk(2023, 12)).unwrap();
        let funds = vec![FundPosition {
            name: "Ghost Fund".into(),
            declared_type: "Equity".into(),
            recurring: vec![],
            one_time: vec![OneTimeContribution {
                amount: dec!(1000),
                year: 2023,
                month: 3,
            }],
        }];
        let summary = analyze_performance(&funds, &PriceSeriesMap::new(), &window).unwrap();
        assert!(summary.funds.is_empty());
        assert_eq!(summary.unanalyzed_funds, vec!["Ghost Fund".to_string()]);
        assert!(summary.warnings.iter().any(|w| w.contains("No price data for fund Ghost Fund")));
        assert_eq!(summary.total_invested, Decimal::ZERO);
        assert_eq!(summary.cagr, None);
        assert_eq!(summary.internal_rate_of_return, None);
    }

    #[test]
    fn test_fund_without_contributions_still_reported() {
        let window = AnalysisWindow::new(mk(2023, 1), mk(2023, 12)).unwrap();
        let funds = vec![FundPosition {
            name: "Idle Fund".into(),
            declared_type: "Debt".into(),
            recurring: vec![],
            one_time: vec![],
        }];
        let mut prices = PriceSeriesMap::new();
        prices.insert(
            "Idle Fund".into(),
            BTreeMap::from([("2023-01".to_string(), dec!(15))]),
        );
        let summary = analyze_performance(&funds, &prices, &window).unwrap();
        assert_eq!(summary.funds.len(), 1);
        assert_eq!(summary.funds[0].absolute_return_percent, None);
        assert_eq!(summary.funds[0].internal_rate_of_return, None);
        assert_eq!(summary.funds[0].closing_price, dec!(15));
    }
}
