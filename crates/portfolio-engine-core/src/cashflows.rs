//! Contribution expansion.
//!
//! Turns recurring and one-time contribution records into concrete monthly
//! cashflows and unit purchases against a dense price series, always clamped
//! to the analysis window. The price-free [`scheduled_amount`] gives the
//! capital a fund is *scheduled* to receive inside the window, which is what
//! diversification weights by.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::calendar::{month_range, AnalysisWindow, MonthKey};
use crate::error::PortfolioEngineError;
use crate::types::{FundPosition, Money, OneTimeContribution, RecurringContribution};
use crate::PortfolioEngineResult;

/// Month → positive price, as produced by the price normalizer.
pub type DensePrices = BTreeMap<MonthKey, Decimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashflowKind {
    Recurring,
    OneTime,
}

/// A single dated investment. Amounts are positive here; the solver sees
/// them as outflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cashflow {
    pub month: MonthKey,
    pub amount: Money,
    pub fund_name: String,
    pub kind: CashflowKind,
}

/// Per-contribution breakdown for debugging and display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionDetail {
    pub kind: CashflowKind,
    pub amount: Money,
    /// Effective (clamped) first month; `None` when nothing fell in the window.
    pub start: Option<MonthKey>,
    /// Effective last month; equals `start` for one-time contributions.
    pub end: Option<MonthKey>,
    /// Months inside the window the contribution was due.
    pub scheduled_months: u32,
    /// Months actually priced and invested.
    pub installments: u32,
    /// Scheduled months with no resolvable price.
    pub skipped_months: u32,
    pub units: Decimal,
    pub invested: Money,
}

/// Expansion of one contribution record.
#[derive(Debug, Clone)]
pub struct ContributionExpansion {
    pub detail: ContributionDetail,
    pub cashflows: Vec<Cashflow>,
}

/// Why a contribution produced no schedule at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleGap {
    /// Not ongoing and missing an end field.
    Incomplete,
    /// Entirely before or after the window, or end before start.
    OutsideWindow,
}

/// Effective inclusive month span of a recurring contribution.
pub fn recurring_span(
    contribution: &RecurringContribution,
    window: &AnalysisWindow,
) -> PortfolioEngineResult<Result<(MonthKey, MonthKey), ScheduleGap>> {
    if contribution.is_incomplete() {
        return Ok(Err(ScheduleGap::Incomplete));
    }
    let start = contribution.start()?.max(window.start);
    let end = contribution
        .declared_end()?
        .map_or(window.end, |declared| declared.min(window.end));
    if start > window.end || start > end {
        return Ok(Err(ScheduleGap::OutsideWindow));
    }
    Ok(Ok((start, end)))
}

/// Effective month of a one-time contribution: clamped up to the window
/// start, excluded when after the window end.
pub fn one_time_month(
    contribution: &OneTimeContribution,
    window: &AnalysisWindow,
) -> PortfolioEngineResult<Option<MonthKey>> {
    let month = contribution.month_key()?;
    if month > window.end {
        return Ok(None);
    }
    Ok(Some(month.max(window.start)))
}

/// Expand a recurring contribution against a dense price series.
pub fn expand_recurring(
    fund_name: &str,
    contribution: &RecurringContribution,
    prices: &DensePrices,
    window: &AnalysisWindow,
) -> PortfolioEngineResult<ContributionExpansion> {
    let mut detail = ContributionDetail {
        kind: CashflowKind::Recurring,
        amount: contribution.amount,
        start: None,
        end: None,
        scheduled_months: 0,
        installments: 0,
        skipped_months: 0,
        units: Decimal::ZERO,
        invested: Decimal::ZERO,
    };
    let mut cashflows = Vec::new();

    let (start, end) = match recurring_span(contribution, window)? {
        Ok(span) => span,
        Err(_) => return Ok(ContributionExpansion { detail, cashflows }),
    };
    detail.start = Some(start);
    detail.end = Some(end);

    for month in month_range(start, end) {
        detail.scheduled_months += 1;
        match prices.get(&month) {
            Some(price) if *price > Decimal::ZERO => {
                let overflow = || PortfolioEngineError::overflow(format!("contributions to fund {fund_name}"));
                let units = contribution.amount.checked_div(*price).ok_or_else(overflow)?;
                detail.units = detail.units.checked_add(units).ok_or_else(overflow)?;
                detail.invested = detail.invested.checked_add(contribution.amount).ok_or_else(overflow)?;
                detail.installments += 1;
                cashflows.push(Cashflow {
                    month,
                    amount: contribution.amount,
                    fund_name: fund_name.to_string(),
                    kind: CashflowKind::Recurring,
                });
            }
            _ => detail.skipped_months += 1,
        }
    }

    Ok(ContributionExpansion { detail, cashflows })
}

/// Expand a one-time contribution against a dense price series.
pub fn expand_one_time(
    fund_name: &str,
    contribution: &OneTimeContribution,
    prices: &DensePrices,
    window: &AnalysisWindow,
) -> PortfolioEngineResult<ContributionExpansion> {
    let mut detail = ContributionDetail {
        kind: CashflowKind::OneTime,
        amount: contribution.amount,
        start: None,
        end: None,
        scheduled_months: 0,
        installments: 0,
        skipped_months: 0,
        units: Decimal::ZERO,
        invested: Decimal::ZERO,
    };
    let mut cashflows = Vec::new();

    let Some(month) = one_time_month(contribution, window)? else {
        return Ok(ContributionExpansion { detail, cashflows });
    };
    detail.start = Some(month);
    detail.end = Some(month);
    detail.scheduled_months = 1;

    match prices.get(&month) {
        Some(price) if *price > Decimal::ZERO => {
            detail.units = contribution
                .amount
                .checked_div(*price)
                .ok_or_else(|| PortfolioEngineError::overflow(format!("contributions to fund {fund_name}")))?;
            detail.invested = contribution.amount;
            detail.installments = 1;
            cashflows.push(Cashflow {
                month,
                amount: contribution.amount,
                fund_name: fund_name.to_string(),
                kind: CashflowKind::OneTime,
            });
        }
        _ => detail.skipped_months = 1,
    }

    Ok(ContributionExpansion { detail, cashflows })
}

/// Capital scheduled into the fund inside the window, ignoring prices.
pub fn scheduled_amount(fund: &FundPosition, window: &AnalysisWindow) -> PortfolioEngineResult<Money> {
    let overflow = || PortfolioEngineError::overflow(format!("scheduled amount of fund {}", fund.name));
    let mut total = Decimal::ZERO;
    for contribution in &fund.recurring {
        if let Ok((start, end)) = recurring_span(contribution, window)? {
            let months = start.months_until(&end) + 1;
            let amount = contribution
                .amount
                .checked_mul(Decimal::from(months))
                .ok_or_else(overflow)?;
            total = total.checked_add(amount).ok_or_else(overflow)?;
        }
    }
    for contribution in &fund.one_time {
        if one_time_month(contribution, window)?.is_some() {
            total = total.checked_add(contribution.amount).ok_or_else(overflow)?;
        }
    }
    Ok(total)
}
