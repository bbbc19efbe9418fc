use chrono::NaiveDate;
use portfolio_engine_core::time_value::{self, SolverConfig};
use portfolio_engine_core::RateSolverError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Rate solver: XIRR and XNPV
// ===========================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_xirr_known_answer_21_percent() {
    let flows = vec![(dec!(0), dec!(-100)), (dec!(1.0), dec!(121))];
    let rate = time_value::xirr_year_fractions(&flows, &SolverConfig::default()).unwrap();
    assert!(
        (rate - dec!(0.21)).abs() < dec!(0.0001),
        "Expected XIRR ~21%, got {}",
        rate
    );
}

#[test]
fn test_xirr_monthly_contributions_positive_growth() {
    // 12 monthly outflows of 1,000 and a 13,000 closing value.
    let mut flows: Vec<(NaiveDate, Decimal)> = (1..=12)
        .map(|m| (date(2022, m, 1), dec!(-1000)))
        .collect();
    flows.push((date(2022, 12, 1), dec!(13000)));

    let rate = time_value::xirr(&flows, &SolverConfig::default()).unwrap();
    assert!(rate > dec!(0.10) && rate < dec!(0.40), "got {}", rate);

    // The rate zeroes XNPV.
    let npv = time_value::xnpv(rate, &flows).unwrap();
    assert!(npv.abs() < dec!(0.001), "residual {}", npv);
}

#[test]
fn test_xirr_no_inflow_is_no_sign_change() {
    let flows = vec![
        (date(2022, 1, 1), dec!(-100)),
        (date(2022, 6, 1), dec!(-100)),
    ];
    assert_eq!(
        time_value::xirr(&flows, &SolverConfig::default()),
        Err(RateSolverError::NoSignChange)
    );
}

#[test]
fn test_xirr_empty_series() {
    assert_eq!(
        time_value::xirr(&[], &SolverConfig::default()),
        Err(RateSolverError::TooFewCashflows { count: 0 })
    );
}

#[test]
fn test_xirr_from_custom_guess() {
    let flows = vec![(dec!(0), dec!(-100)), (dec!(1.0), dec!(121))];
    let config = SolverConfig {
        guess: dec!(-0.5),
        ..SolverConfig::default()
    };
    let rate = time_value::xirr_year_fractions(&flows, &config).unwrap();
    assert!((rate - dec!(0.21)).abs() < dec!(0.0001), "got {}", rate);
}

#[test]
fn test_xirr_error_message_is_descriptive() {
    let err = time_value::xirr_year_fractions(&[(dec!(0), dec!(5)), (dec!(1), dec!(5))], &SolverConfig::default())
        .unwrap_err();
    assert!(err.to_string().contains("outflow"));
}
