//! Month-granular time keys and analysis windows.
//!
//! Every date the engine reasons about is a calendar month. A [`MonthKey`]
//! orders chronologically and renders as the sortable string `"YYYY-MM"`;
//! an [`AnalysisWindow`] is an inclusive pair of keys that replaces any notion
//! of a global "current date".

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::PortfolioEngineError;
use crate::PortfolioEngineResult;

/// A (year, month) pair. Field order gives chronological `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Build a key, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> PortfolioEngineResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(PortfolioEngineError::InvalidInput {
                field: "month".into(),
                reason: format!("Month must be in 1..=12, got {month}"),
            });
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Signed number of months from `self` to `other` (0 when equal).
    pub fn months_until(&self, other: &MonthKey) -> i64 {
        let from = self.year as i64 * 12 + (self.month as i64 - 1);
        let to = other.year as i64 * 12 + (other.month as i64 - 1);
        to - from
    }

    /// First calendar day of the month; the date every cashflow is booked on.
    pub fn first_day(&self) -> PortfolioEngineResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| {
            PortfolioEngineError::DateError(format!("{self} is outside the supported date range"))
        })
    }

    /// Sortable `"YYYY-MM"` key.
    pub fn to_key_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = PortfolioEngineError;

    /// Accepts `YYYY-MM`, `YYYY-M`, `YYYY/MM` and `YYYY-MM-DD` (day ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PortfolioEngineError::DateError(format!("Unrecognised month key '{s}'"));
        let trimmed = s.trim();
        let mut parts = trimmed.split(['-', '/']);
        let year_part = parts.next().ok_or_else(invalid)?;
        let month_part = parts.next().ok_or_else(invalid)?;
        if let Some(day) = parts.next() {
            if day.is_empty() || !day.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
        }
        if parts.next().is_some() || year_part.len() != 4 {
            return Err(invalid());
        }
        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        let month: u32 = month_part.parse().map_err(|_| invalid())?;
        MonthKey::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Every month from `start` to `end` inclusive; empty when `start > end`.
pub fn month_range(start: MonthKey, end: MonthKey) -> Vec<MonthKey> {
    let mut months = Vec::new();
    let mut current = start;
    while current <= end {
        months.push(current);
        current = current.succ();
    }
    months
}

/// Inclusive historical period over which prices exist and analysis runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: MonthKey,
    pub end: MonthKey,
}

impl AnalysisWindow {
    pub fn new(start: MonthKey, end: MonthKey) -> PortfolioEngineResult<Self> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    /// Deserialised windows bypass `new`, so entry points re-check here.
    pub fn validate(&self) -> PortfolioEngineResult<()> {
        if self.end < self.start {
            return Err(PortfolioEngineError::InvalidInput {
                field: "window".into(),
                reason: format!(
                    "Window end {} is before window start {}",
                    self.end, self.start
                ),
            });
        }
        self.closing_date()?;
        self.start.first_day()?;
        Ok(())
    }

    pub fn months(&self) -> Vec<MonthKey> {
        month_range(self.start, self.end)
    }

    pub fn month_count(&self) -> usize {
        (self.start.months_until(&self.end) + 1).max(0) as usize
    }

    pub fn contains(&self, month: &MonthKey) -> bool {
        *month >= self.start && *month <= self.end
    }

    /// Valuation date for closing inflows and elapsed-time math.
    pub fn closing_date(&self) -> PortfolioEngineResult<NaiveDate> {
        self.end.first_day()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    #[test]
    fn test_key_string_is_zero_padded_and_sortable() {
        assert_eq!(mk(2023, 4).to_key_string(), "2023-04");
        assert!(mk(2023, 12).to_key_string() < mk(2024, 1).to_key_string());
    }

    #[test]
    fn test_month_out_of_range_rejected() {
        assert!(MonthKey::new(2023, 0).is_err());
        assert!(MonthKey::new(2023, 13).is_err());
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!("2021-3".parse::<MonthKey>().unwrap(), mk(2021, 3));
        assert_eq!("2021/03".parse::<MonthKey>().unwrap(), mk(2021, 3));
        assert_eq!("2021-03-17".parse::<MonthKey>().unwrap(), mk(2021, 3));
        assert!("21-03".parse::<MonthKey>().is_err());
        assert!("2021-13".parse::<MonthKey>().is_err());
        assert!("march".parse::<MonthKey>().is_err());
    }

    #[test]
    fn test_range_crosses_year_boundary() {
        let months = month_range(mk(2022, 11), mk(2023, 2));
        assert_eq!(
            months,
            vec![mk(2022, 11), mk(2022, 12), mk(2023, 1), mk(2023, 2)]
        );
        assert!(month_range(mk(2023, 2), mk(2022, 11)).is_empty());
    }

    #[test]
    fn test_months_until() {
        assert_eq!(mk(2022, 11).months_until(&mk(2023, 2)), 3);
        assert_eq!(mk(2023, 2).months_until(&mk(2022, 11)), -3);
    }

    #[test]
    fn test_window_validation() {
        assert!(AnalysisWindow::new(mk(2024, 1), mk(2023, 12)).is_err());
        let window = AnalysisWindow::new(mk(2023, 1), mk(2023, 12)).unwrap();
        assert_eq!(window.month_count(), 12);
        assert_eq!(window.months().len(), 12);
        assert!(window.contains(&mk(2023, 6)));
        assert!(!window.contains(&mk(2024, 1)));
    }

    #[test]
    fn test_serde_round_trip_as_string() {
        let json = serde_json::to_string(&mk(2020, 7)).unwrap();
        assert_eq!(json, "\"2020-07\"");
        let back: MonthKey = serde_json::from_str("\"2020-7\"").unwrap();
        assert_eq!(back, mk(2020, 7));
    }
}
