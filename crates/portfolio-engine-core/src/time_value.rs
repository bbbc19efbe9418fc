use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{PortfolioEngineError, RateSolverError};
use crate::types::{Money, Rate, Years};
use crate::PortfolioEngineResult;

const DAYS_PER_YEAR: Decimal = dec!(365.25);
const MIN_RATE: Decimal = dec!(-0.99);
const MAX_NEWTON_RATE: Decimal = dec!(100.0);
const MAX_BISECTION_RATE: Decimal = dec!(10.0);
const RATE_STEP_EPSILON: Decimal = dec!(0.000000000001);
const MAX_BISECTION_ITERATIONS: u32 = 200;

/// Tuning for the XIRR root finder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Starting rate for Newton-Raphson.
    pub guess: Rate,
    /// Absolute NPV residual accepted as a root.
    pub tolerance: Decimal,
    /// Newton iteration cap; bisection gets its own fixed budget.
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            guess: dec!(0.1),
            tolerance: dec!(0.0000001),
            max_iterations: 100,
        }
    }
}

/// Actual days between two dates over a 365.25-day year.
pub fn year_fraction(from: NaiveDate, to: NaiveDate) -> Years {
    Decimal::from((to - from).num_days()) / DAYS_PER_YEAR
}

/// Net present value of dated flows, discounted to the earliest date.
pub fn xnpv(rate: Rate, dated_flows: &[(NaiveDate, Money)]) -> PortfolioEngineResult<Money> {
    if rate <= dec!(-1) {
        return Err(PortfolioEngineError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    let flows = to_year_fractions(dated_flows);
    evaluate(&flows, rate).map(|(npv, _)| npv).ok_or_else(|| {
        PortfolioEngineError::InsufficientData(format!(
            "NPV at rate {rate} overflows decimal precision"
        ))
    })
}

/// Extended IRR for irregular cash flow dates.
///
/// Time is measured from the earliest date in the series, so input order
/// does not matter.
pub fn xirr(
    dated_flows: &[(NaiveDate, Money)],
    config: &SolverConfig,
) -> Result<Rate, RateSolverError> {
    if dated_flows.len() < 2 {
        return Err(RateSolverError::TooFewCashflows {
            count: dated_flows.len(),
        });
    }
    xirr_year_fractions(&to_year_fractions(dated_flows), config)
}

/// XIRR on flows already expressed as (years from base, amount).
///
/// Newton-Raphson from `config.guess`; if that stalls or leaves the
/// representable range, bisection over [-0.99, 10].
pub fn xirr_year_fractions(
    flows: &[(Years, Money)],
    config: &SolverConfig,
) -> Result<Rate, RateSolverError> {
    if flows.len() < 2 {
        return Err(RateSolverError::TooFewCashflows { count: flows.len() });
    }
    let has_outflow = flows.iter().any(|(_, cf)| *cf < Decimal::ZERO);
    let has_inflow = flows.iter().any(|(_, cf)| *cf > Decimal::ZERO);
    if !has_outflow || !has_inflow {
        return Err(RateSolverError::NoSignChange);
    }
    // Every flow on one date: NPV is the same at every rate.
    if flows.iter().all(|(t, _)| *t == flows[0].0) {
        return Err(RateSolverError::DidNotConverge {
            iterations: 0,
            last_residual: flows.iter().map(|(_, cf)| *cf).sum(),
        });
    }

    let newton_residual = match newton(flows, config) {
        Ok(rate) => return Ok(rate),
        Err(residual) => residual,
    };
    tracing::debug!(
        residual = %newton_residual,
        "XIRR Newton-Raphson did not converge; falling back to bisection"
    );
    bisection(flows, config).map_err(|last_residual| RateSolverError::DidNotConverge {
        iterations: config.max_iterations + MAX_BISECTION_ITERATIONS,
        last_residual,
    })
}

fn to_year_fractions(dated_flows: &[(NaiveDate, Money)]) -> Vec<(Years, Money)> {
    let base_date = match dated_flows.iter().map(|(d, _)| *d).min() {
        Some(d) => d,
        None => return Vec::new(),
    };
    dated_flows
        .iter()
        .map(|(date, amount)| (year_fraction(base_date, *date), *amount))
        .collect()
}

/// NPV and dNPV/dr at `rate`. `None` when the arithmetic leaves Decimal range.
fn evaluate(flows: &[(Years, Money)], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r <= Decimal::ZERO {
        return None;
    }

    let mut npv_val = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    for (years, amount) in flows {
        if years.is_zero() {
            npv_val = npv_val.checked_add(*amount)?;
            continue;
        }
        let discount = match one_plus_r.checked_powd(*years) {
            Some(d) if !d.is_zero() => d,
            // Growth factor too large to represent: the term is negligible.
            None if one_plus_r > Decimal::ONE => continue,
            _ => return None,
        };
        let pv = amount.checked_div(discount)?;
        npv_val = npv_val.checked_add(pv)?;
        dnpv = dnpv.checked_sub(years.checked_mul(pv)?.checked_div(one_plus_r)?)?;
    }
    Some((npv_val, dnpv))
}

/// Returns the last residual on failure.
fn newton(flows: &[(Years, Money)], config: &SolverConfig) -> Result<Rate, Decimal> {
    let mut rate = config.guess;
    let mut last_residual = Decimal::MAX;

    for _ in 0..config.max_iterations {
        let (npv_val, dnpv) = evaluate(flows, rate).ok_or(last_residual)?;
        last_residual = npv_val;

        if npv_val.abs() < config.tolerance {
            return Ok(rate);
        }
        if dnpv.is_zero() {
            return Err(last_residual);
        }

        let step = npv_val.checked_div(dnpv).ok_or(last_residual)?;
        rate -= step;

        if rate < MIN_RATE {
            rate = MIN_RATE;
        } else if rate > MAX_NEWTON_RATE {
            rate = MAX_NEWTON_RATE;
        }

        // A stalled step is only a root if the residual agrees.
        if step.abs() < RATE_STEP_EPSILON {
            let (npv_val, _) = evaluate(flows, rate).ok_or(last_residual)?;
            return if npv_val.abs() < config.tolerance {
                Ok(rate)
            } else {
                Err(npv_val)
            };
        }
    }

    Err(last_residual)
}

fn bisection(flows: &[(Years, Money)], config: &SolverConfig) -> Result<Rate, Decimal> {
    let mut lo = MIN_RATE;
    let mut hi = MAX_BISECTION_RATE;
    let (mut f_lo, _) = evaluate(flows, lo).ok_or(Decimal::MAX)?;
    let (f_hi, _) = evaluate(flows, hi).ok_or(Decimal::MAX)?;

    if f_lo.is_zero() {
        return Ok(lo);
    }
    if f_hi.is_zero() {
        return Ok(hi);
    }
    if f_lo.is_sign_negative() == f_hi.is_sign_negative() {
        return Err(f_lo.abs().min(f_hi.abs()));
    }

    let mut last_residual = f_lo;
    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let (f_mid, _) = evaluate(flows, mid).ok_or(last_residual)?;
        last_residual = f_mid;

        if f_mid.abs() < config.tolerance || (hi - lo).abs() < RATE_STEP_EPSILON {
            return Ok(mid);
        }
        if f_mid.is_sign_negative() == f_lo.is_sign_negative() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Err(last_residual)
}
