//! Progressive Bracket Tax Calculator
//!
//! Computes tax owed on taxable income under an ordered, gapless bracket
//! table. All monetary math is `rust_decimal` end-to-end; currency results
//! are rounded to 2 decimal places and rates to 4, only at the boundary of
//! each computation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TaxError;

/// Filing status selecting which bracket table applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilingStatus {
    Single,
    MarriedJoint,
    HeadOfHousehold,
}

impl Default for FilingStatus {
    fn default() -> Self {
        Self::Single
    }
}

impl std::fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilingStatus::Single => write!(f, "Single"),
            FilingStatus::MarriedJoint => write!(f, "Married Filing Jointly"),
            FilingStatus::HeadOfHousehold => write!(f, "Head of Household"),
        }
    }
}

impl std::str::FromStr for FilingStatus {
    type Err = TaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SINGLE" => Ok(Self::Single),
            "MARRIED_JOINT" | "MARRIED_FILING_JOINTLY" => Ok(Self::MarriedJoint),
            "HEAD_OF_HOUSEHOLD" => Ok(Self::HeadOfHousehold),
            other => Err(TaxError::UnknownFilingStatus(other.to_string())),
        }
    }
}

/// One bracket of a progressive table.
///
/// Ranges are half-open `[min_income, max_income)` so that exactly one
/// bracket contains any non-negative income; an income sitting exactly on a
/// boundary belongs to the higher bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Marginal rate for income inside this bracket (e.g. 0.22)
    pub rate: Decimal,
    /// Income where the bracket begins (inclusive)
    pub min_income: Decimal,
    /// Income where the bracket ends (exclusive); `None` for the unbounded top
    pub max_income: Option<Decimal>,
    /// Schedule this bracket was published for
    pub filing_status: FilingStatus,
    /// Tax year of the table
    pub tax_year: u16,
}

impl TaxBracket {
    /// Whether `income` falls inside this bracket's half-open range
    pub fn contains(&self, income: Decimal) -> bool {
        income >= self.min_income && self.max_income.map_or(true, |max| income < max)
    }

    /// Width of the bracket; `None` for the unbounded top bracket
    pub fn width(&self) -> Option<Decimal> {
        self.max_income.map(|max| max - self.min_income)
    }
}

/// Result of a single bracket-table computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketTaxOutcome {
    /// Total tax owed, rounded to cents
    pub tax: Decimal,
    /// Rate of the bracket containing the income
    pub marginal_rate: Decimal,
    /// `tax / income` (0 when income is 0)
    pub effective_rate: Decimal,
    /// Brackets the accumulation walk touched, in ascending order
    pub applicable_brackets: Vec<TaxBracket>,
}

/// A validated progressive bracket table.
///
/// Construction guarantees the table is non-empty, starts at 0, is ordered,
/// gapless and non-overlapping, and ends in an unbounded top bracket, so any
/// finite income is contained by exactly one bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketTable {
    brackets: Vec<TaxBracket>,
}

impl BracketTable {
    pub fn new(brackets: Vec<TaxBracket>) -> Result<Self, TaxError> {
        let first = brackets
            .first()
            .ok_or_else(|| TaxError::BracketCoverageGap("bracket table is empty".to_string()))?;
        if first.min_income != Decimal::ZERO {
            return Err(TaxError::BracketCoverageGap(format!(
                "first bracket starts at {} instead of 0",
                first.min_income
            )));
        }

        for bracket in &brackets {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(TaxError::BracketCoverageGap(format!(
                    "bracket rate {} outside [0, 1]",
                    bracket.rate
                )));
            }
            if let Some(max) = bracket.max_income {
                if max <= bracket.min_income {
                    return Err(TaxError::BracketCoverageGap(format!(
                        "bracket range [{}, {}) is empty or inverted",
                        bracket.min_income, max
                    )));
                }
            }
        }

        for pair in brackets.windows(2) {
            match pair[0].max_income {
                Some(max) if max == pair[1].min_income => {}
                Some(max) => {
                    return Err(TaxError::BracketCoverageGap(format!(
                        "bracket ending at {} is not adjacent to bracket starting at {}",
                        max, pair[1].min_income
                    )));
                }
                None => {
                    return Err(TaxError::BracketCoverageGap(
                        "unbounded bracket is not the last bracket".to_string(),
                    ));
                }
            }
        }

        let last = brackets.last().ok_or_else(|| {
            TaxError::BracketCoverageGap("bracket table is empty".to_string())
        })?;
        if last.max_income.is_some() {
            return Err(TaxError::BracketCoverageGap(
                "top bracket must be unbounded".to_string(),
            ));
        }

        Ok(Self { brackets })
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Compute tax owed on `income` under this table.
    ///
    /// Walks brackets in ascending order, taxing the slice of income that
    /// falls inside each. The marginal rate comes from an independent
    /// containment scan so it stays correct regardless of how the
    /// accumulation walk is ordered.
    pub fn compute(&self, income: Decimal) -> Result<BracketTaxOutcome, TaxError> {
        if income < Decimal::ZERO {
            return Err(TaxError::InvalidAmount(format!(
                "taxable income must be non-negative, got {income}"
            )));
        }

        let mut tax = Decimal::ZERO;
        let mut remaining = income;
        let mut applicable = Vec::new();

        for bracket in &self.brackets {
            if remaining <= Decimal::ZERO {
                break;
            }
            let slice = match bracket.width() {
                Some(width) => width.min(remaining),
                None => remaining,
            };
            tax += slice * bracket.rate;
            remaining -= slice;
            applicable.push(bracket.clone());
        }

        let marginal_rate = self
            .brackets
            .iter()
            .find(|bracket| bracket.contains(income))
            .map(|bracket| bracket.rate)
            .ok_or_else(|| {
                TaxError::BracketCoverageGap(format!("no bracket contains income {income}"))
            })?;

        let effective_rate = if income.is_zero() {
            Decimal::ZERO
        } else {
            tax / income
        };
        if effective_rate < Decimal::ZERO || effective_rate > Decimal::ONE {
            return Err(TaxError::BracketCoverageGap(format!(
                "effective rate {effective_rate} outside [0, 1] for income {income}"
            )));
        }

        Ok(BracketTaxOutcome {
            tax: tax.round_dp(2),
            marginal_rate: marginal_rate.round_dp(4),
            effective_rate: effective_rate.round_dp(4),
            applicable_brackets: applicable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn bracket(
        rate: Decimal,
        min_income: Decimal,
        max_income: Option<Decimal>,
    ) -> TaxBracket {
        TaxBracket {
            rate,
            min_income,
            max_income,
            filing_status: FilingStatus::Single,
            tax_year: 2024,
        }
    }

    fn simple_table() -> BracketTable {
        BracketTable::new(vec![
            bracket(dec!(0.10), dec!(0), Some(dec!(10000))),
            bracket(dec!(0.20), dec!(10000), Some(dec!(50000))),
            bracket(dec!(0.30), dec!(50000), None),
        ])
        .unwrap()
    }

    #[test]
    fn test_zero_income() {
        let outcome = simple_table().compute(Decimal::ZERO).unwrap();
        assert_eq!(outcome.tax, Decimal::ZERO);
        assert_eq!(outcome.effective_rate, Decimal::ZERO);
        assert_eq!(outcome.marginal_rate, dec!(0.10));
    }

    #[test]
    fn test_accumulation_across_brackets() {
        // 10,000 * 0.10 + 20,000 * 0.20 = 5,000
        let outcome = simple_table().compute(dec!(30000)).unwrap();
        assert_eq!(outcome.tax, dec!(5000.00));
        assert_eq!(outcome.marginal_rate, dec!(0.20));
        assert_eq!(outcome.effective_rate, dec!(0.1667));
        assert_eq!(outcome.applicable_brackets.len(), 2);
    }

    #[test]
    fn test_boundary_income_takes_higher_marginal_rate() {
        let outcome = simple_table().compute(dec!(10000)).unwrap();
        assert_eq!(outcome.tax, dec!(1000.00));
        assert_eq!(outcome.marginal_rate, dec!(0.20));
    }

    #[test]
    fn test_negative_income_rejected() {
        let err = simple_table().compute(dec!(-1)).unwrap_err();
        assert!(matches!(err, TaxError::InvalidAmount(_)));
    }

    #[test]
    fn test_empty_table_rejected() {
        let err = BracketTable::new(vec![]).unwrap_err();
        assert!(matches!(err, TaxError::BracketCoverageGap(_)));
    }

    #[test]
    fn test_gap_rejected() {
        let err = BracketTable::new(vec![
            bracket(dec!(0.10), dec!(0), Some(dec!(10000))),
            bracket(dec!(0.20), dec!(15000), None),
        ])
        .unwrap_err();
        assert!(matches!(err, TaxError::BracketCoverageGap(_)));
    }

    #[test]
    fn test_bounded_top_bracket_rejected() {
        let err = BracketTable::new(vec![
            bracket(dec!(0.10), dec!(0), Some(dec!(10000))),
            bracket(dec!(0.20), dec!(10000), Some(dec!(50000))),
        ])
        .unwrap_err();
        assert!(matches!(err, TaxError::BracketCoverageGap(_)));
    }

    #[test]
    fn test_rate_above_one_rejected() {
        let err = BracketTable::new(vec![bracket(dec!(1.5), dec!(0), None)]).unwrap_err();
        assert!(matches!(err, TaxError::BracketCoverageGap(_)));
    }

    #[test]
    fn test_filing_status_parse() {
        assert_eq!(
            "married_joint".parse::<FilingStatus>().unwrap(),
            FilingStatus::MarriedJoint
        );
        assert!(matches!(
            "quadruple".parse::<FilingStatus>(),
            Err(TaxError::UnknownFilingStatus(_))
        ));
    }

    #[test]
    fn test_continuity_at_bracket_boundaries() {
        let table = simple_table();
        for boundary in [dec!(10000), dec!(50000)] {
            let below = table.compute(boundary - dec!(0.01)).unwrap();
            let at = table.compute(boundary).unwrap();
            assert!((at.tax - below.tax).abs() <= dec!(0.01));
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_tax_is_monotonic_in_income(lo in 0u32..1_000_000, delta in 0u32..1_000_000) {
            let table = simple_table();
            let lower = table.compute(Decimal::from(lo)).unwrap();
            let upper = table.compute(Decimal::from(lo) + Decimal::from(delta)).unwrap();
            prop_assert!(lower.tax <= upper.tax);
        }

        #[test]
        fn prop_effective_rate_bounded_by_marginal(income in 1u32..2_000_000) {
            let outcome = simple_table().compute(Decimal::from(income)).unwrap();
            prop_assert!(outcome.effective_rate >= Decimal::ZERO);
            prop_assert!(outcome.effective_rate <= outcome.marginal_rate);
        }
    }
}
