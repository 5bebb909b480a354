//! Federal bracket tables
//!
//! 2024 IRS ordinary-income tables for the three supported filing statuses.
//! Tables are validated on construction, so a lookup either returns a table
//! satisfying the coverage invariant or fails with `BracketTableMissing`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::brackets::{BracketTable, BracketTaxOutcome, FilingStatus, TaxBracket};
use crate::error::TaxError;

/// The tax year tables are currently published for
pub const CURRENT_TAX_YEAR: u16 = 2024;

fn build_table(
    filing_status: FilingStatus,
    tax_year: u16,
    spans: &[(Decimal, Decimal, Option<Decimal>)],
) -> Result<BracketTable, TaxError> {
    let brackets = spans
        .iter()
        .map(|&(rate, min_income, max_income)| TaxBracket {
            rate,
            min_income,
            max_income,
            filing_status,
            tax_year,
        })
        .collect();
    BracketTable::new(brackets)
}

/// Look up the federal ordinary-income table for a filing status and year.
pub fn federal_table(
    filing_status: FilingStatus,
    tax_year: u16,
) -> Result<BracketTable, TaxError> {
    if tax_year != CURRENT_TAX_YEAR {
        return Err(TaxError::BracketTableMissing {
            filing_status,
            tax_year,
        });
    }

    let spans: [(Decimal, Decimal, Option<Decimal>); 7] = match filing_status {
        FilingStatus::Single => [
            (dec!(0.10), dec!(0), Some(dec!(11_600))),
            (dec!(0.12), dec!(11_600), Some(dec!(47_150))),
            (dec!(0.22), dec!(47_150), Some(dec!(100_525))),
            (dec!(0.24), dec!(100_525), Some(dec!(191_950))),
            (dec!(0.32), dec!(191_950), Some(dec!(243_725))),
            (dec!(0.35), dec!(243_725), Some(dec!(609_350))),
            (dec!(0.37), dec!(609_350), None),
        ],
        FilingStatus::MarriedJoint => [
            (dec!(0.10), dec!(0), Some(dec!(23_200))),
            (dec!(0.12), dec!(23_200), Some(dec!(94_300))),
            (dec!(0.22), dec!(94_300), Some(dec!(201_050))),
            (dec!(0.24), dec!(201_050), Some(dec!(383_900))),
            (dec!(0.32), dec!(383_900), Some(dec!(487_450))),
            (dec!(0.35), dec!(487_450), Some(dec!(731_200))),
            (dec!(0.37), dec!(731_200), None),
        ],
        FilingStatus::HeadOfHousehold => [
            (dec!(0.10), dec!(0), Some(dec!(16_550))),
            (dec!(0.12), dec!(16_550), Some(dec!(63_100))),
            (dec!(0.22), dec!(63_100), Some(dec!(100_500))),
            (dec!(0.24), dec!(100_500), Some(dec!(191_950))),
            (dec!(0.32), dec!(191_950), Some(dec!(243_700))),
            (dec!(0.35), dec!(243_700), Some(dec!(609_350))),
            (dec!(0.37), dec!(609_350), None),
        ],
    };

    build_table(filing_status, tax_year, &spans)
}

/// Compute federal tax owed on `income` for a filing status and year.
pub fn compute_federal_tax(
    income: Decimal,
    filing_status: FilingStatus,
    tax_year: u16,
) -> Result<BracketTaxOutcome, TaxError> {
    let outcome = federal_table(filing_status, tax_year)?.compute(income)?;
    tracing::debug!(
        "federal tax for {} ({}, {}): {} at marginal {}",
        income,
        filing_status,
        tax_year,
        outcome.tax,
        outcome.marginal_rate
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_single_filer_50k() {
        // 11,600 * 0.10 + 35,550 * 0.12 + 2,850 * 0.22
        let outcome =
            compute_federal_tax(dec!(50000), FilingStatus::Single, CURRENT_TAX_YEAR).unwrap();
        assert_eq!(outcome.tax, dec!(6053.00));
        assert_eq!(outcome.marginal_rate, dec!(0.22));
        assert_eq!(outcome.effective_rate, dec!(0.1211));
    }

    #[test]
    fn test_single_filer_at_first_boundary() {
        let outcome =
            compute_federal_tax(dec!(11600), FilingStatus::Single, CURRENT_TAX_YEAR).unwrap();
        assert_eq!(outcome.tax, dec!(1160.00));
        assert_eq!(outcome.marginal_rate, dec!(0.12));
    }

    #[test]
    fn test_married_joint_brackets_are_wider() {
        let single =
            compute_federal_tax(dec!(50000), FilingStatus::Single, CURRENT_TAX_YEAR).unwrap();
        let joint =
            compute_federal_tax(dec!(50000), FilingStatus::MarriedJoint, CURRENT_TAX_YEAR)
                .unwrap();
        assert!(joint.tax < single.tax);
        assert_eq!(joint.marginal_rate, dec!(0.12));
    }

    #[test]
    fn test_unpublished_year_is_missing() {
        let err = federal_table(FilingStatus::Single, 1999).unwrap_err();
        assert!(matches!(err, TaxError::BracketTableMissing { tax_year: 1999, .. }));
    }

    #[test]
    fn test_all_tables_validate() {
        for status in [
            FilingStatus::Single,
            FilingStatus::MarriedJoint,
            FilingStatus::HeadOfHousehold,
        ] {
            let table = federal_table(status, CURRENT_TAX_YEAR).unwrap();
            assert_eq!(table.brackets().len(), 7);
        }
    }

    #[test]
    fn test_continuity_across_all_single_boundaries() {
        let table = federal_table(FilingStatus::Single, CURRENT_TAX_YEAR).unwrap();
        for bracket in table.brackets() {
            if let Some(max) = bracket.max_income {
                let below = table.compute(max - dec!(0.01)).unwrap();
                let at = table.compute(max).unwrap();
                assert!((at.tax - below.tax).abs() <= dec!(0.01));
            }
        }
    }
}
