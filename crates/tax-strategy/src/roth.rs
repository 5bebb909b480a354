//! Roth Conversion Tax Calculator
//!
//! Marginal tax impact of converting from a traditional to a Roth account,
//! plus a future-value/NPV projection of the converted principal, and a
//! bounded binary-search optimizer over the conversion amount.
//!
//! The optimizer is a bounded local heuristic, not a guaranteed global
//! optimum: the step direction compares a weighted marginal cost rate to the
//! discount rate, which is not monotonic in the conversion amount, so the
//! best-seen candidate is tracked explicitly.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tax_tables::{federal_table, FilingStatus, StateRegistry, TaxError, CURRENT_TAX_YEAR};

use crate::config::OptimizationConfig;
use crate::types::{OptimizationResult, ScenarioSample, TaxCalculationResult};

/// Conversions below this amount are out of scope for optimization
pub const MIN_CONVERSION: Decimal = dec!(1_000);
/// Conversions above this amount are out of scope for optimization
pub const MAX_CONVERSION: Decimal = dec!(500_000);
/// Baseline growth rate the converted principal is assumed to compound at,
/// independent of the caller-supplied discount rate
pub const ASSUMED_GROWTH_RATE: Decimal = dec!(0.07);

/// Search stops once the bisection interval is narrower than this
const SEARCH_TOLERANCE: Decimal = dec!(100);

/// `(1 + rate)^years` by repeated multiplication; horizons are at most 40.
fn compound_factor(rate: Decimal, years: u32) -> Decimal {
    let base = Decimal::ONE + rate;
    (0..years).fold(Decimal::ONE, |factor, _| factor * base)
}

/// Tax impact and projection for a single conversion amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RothConversionOutcome {
    pub tax_impact: TaxCalculationResult,
    /// Converted amount compounded at the assumed growth rate
    pub future_value: Decimal,
    /// Future value discounted back at the caller's discount rate
    pub npv: Decimal,
}

/// Roth conversion calculator over a state registry
#[derive(Debug, Clone)]
pub struct RothConversionCalculator {
    states: StateRegistry,
    tax_year: u16,
}

impl RothConversionCalculator {
    pub fn new(states: StateRegistry) -> Self {
        Self {
            states,
            tax_year: CURRENT_TAX_YEAR,
        }
    }

    /// Tax impact and FV/NPV projection of converting `conversion_amount`.
    ///
    /// The amount must lie inside `MIN_CONVERSION..=MAX_CONVERSION`; the band
    /// is a business rule, enforced rather than recommended.
    pub fn compute(
        &self,
        current_income: Decimal,
        conversion_amount: Decimal,
        filing_status: FilingStatus,
        state_code: &str,
        time_horizon_years: u32,
        discount_rate: Decimal,
    ) -> Result<RothConversionOutcome, TaxError> {
        if current_income < Decimal::ZERO {
            return Err(TaxError::InvalidAmount(format!(
                "current income must be non-negative, got {current_income}"
            )));
        }
        if conversion_amount < MIN_CONVERSION || conversion_amount > MAX_CONVERSION {
            return Err(TaxError::InvalidAmount(format!(
                "conversion amount {conversion_amount} outside allowed band \
                 {MIN_CONVERSION}..={MAX_CONVERSION}"
            )));
        }
        if !(1..=40).contains(&time_horizon_years) {
            return Err(TaxError::InvalidConfig(format!(
                "time horizon must be within 1..=40 years, got {time_horizon_years}"
            )));
        }
        if discount_rate < dec!(0.01) || discount_rate > dec!(0.15) {
            return Err(TaxError::InvalidConfig(format!(
                "discount rate must be within 0.01..=0.15, got {discount_rate}"
            )));
        }

        let total_income = current_income + conversion_amount;
        let table = federal_table(filing_status, self.tax_year)?;
        let with_conversion = table.compute(total_income)?;
        let without_conversion = table.compute(current_income)?;
        let federal_impact = with_conversion.tax - without_conversion.tax;

        let state_with =
            self.states
                .compute_state_tax(total_income, state_code, filing_status)?;
        let state_without =
            self.states
                .compute_state_tax(current_income, state_code, filing_status)?;
        let state_impact = state_with - state_without;

        let total_impact = federal_impact + state_impact;
        let effective_rate = total_impact / conversion_amount;

        let future_value =
            conversion_amount * compound_factor(ASSUMED_GROWTH_RATE, time_horizon_years);
        let npv = future_value / compound_factor(discount_rate, time_horizon_years);

        Ok(RothConversionOutcome {
            tax_impact: TaxCalculationResult {
                federal_tax_impact: federal_impact.round_dp(2),
                state_tax_impact: state_impact.round_dp(2),
                effective_tax_rate: effective_rate.round_dp(4),
                marginal_tax_rate: with_conversion.marginal_rate,
                taxable_income: total_income.round_dp(2),
                applicable_brackets: with_conversion.applicable_brackets,
            },
            future_value: future_value.round_dp(2),
            npv: npv.round_dp(2),
        })
    }

    /// Binary search over `[MIN_CONVERSION, min(balance, MAX_CONVERSION)]`
    /// for the conversion with the best risk- and state-weighted net NPV.
    pub fn optimize(
        &self,
        current_income: Decimal,
        traditional_balance: Decimal,
        filing_status: FilingStatus,
        state_code: &str,
        config: &OptimizationConfig,
    ) -> Result<OptimizationResult, TaxError> {
        config.validate()?;
        if traditional_balance < MIN_CONVERSION {
            return Err(TaxError::InvalidAmount(format!(
                "traditional balance {traditional_balance} below minimum conversion \
                 {MIN_CONVERSION}"
            )));
        }

        let risk_factor = config.risk_factor();
        let mut lo = MIN_CONVERSION;
        let mut hi = traditional_balance.min(MAX_CONVERSION);

        let mut scenarios = Vec::new();
        let mut best: Option<(Decimal, RothConversionOutcome, Decimal)> = None;

        let evaluate = |amount: Decimal,
                        scenarios: &mut Vec<ScenarioSample>,
                        best: &mut Option<(Decimal, RothConversionOutcome, Decimal)>|
         -> Result<(Decimal, Decimal), TaxError> {
            let outcome = self.compute(
                current_income,
                amount,
                filing_status,
                state_code,
                config.time_horizon_years,
                config.discount_rate,
            )?;
            let weighted_impact = outcome.tax_impact.federal_tax_impact
                + outcome.tax_impact.state_tax_impact * config.state_tax_weight;
            let effective_rate = outcome.tax_impact.effective_tax_rate;
            let score = outcome.npv - risk_factor * weighted_impact;
            scenarios.push(ScenarioSample {
                amount,
                savings: score.round_dp(2),
            });
            let improves = match best {
                Some((_, _, incumbent)) => score > *incumbent,
                None => true,
            };
            if improves {
                *best = Some((amount, outcome, score));
            }
            Ok((weighted_impact, effective_rate))
        };

        let (_, hi_effective) = evaluate(hi, &mut scenarios, &mut best)?;
        if hi > lo {
            evaluate(lo, &mut scenarios, &mut best)?;
        }

        while hi - lo > SEARCH_TOLERANCE {
            let mid = ((lo + hi) / dec!(2)).round_dp(2);
            let (weighted_impact, _) = evaluate(mid, &mut scenarios, &mut best)?;

            // Step right while the weighted marginal cost rate stays below
            // the discount rate, left otherwise.
            let weighted_rate = risk_factor * weighted_impact / mid;
            if weighted_rate < config.discount_rate {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let (recommended_amount, outcome, score) = best.ok_or(TaxError::SearchExhausted)?;
        tracing::debug!(
            "roth search settled on {} (score {}) after {} evaluations",
            recommended_amount,
            score,
            scenarios.len()
        );

        let potential_savings = ((hi_effective - outcome.tax_impact.effective_tax_rate)
            * recommended_amount)
            .max(Decimal::ZERO)
            .round_dp(2);

        Ok(OptimizationResult {
            recommended_amount,
            tax_impact: outcome.tax_impact,
            npv_savings: score.round_dp(2),
            potential_savings,
            alternative_scenarios: scenarios,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tax_tables::StateRegistry;

    fn calculator() -> RothConversionCalculator {
        RothConversionCalculator::new(StateRegistry::default())
    }

    #[test]
    fn test_band_enforced() {
        let calc = calculator();
        for amount in [dec!(999.99), dec!(500_000.01), dec!(0)] {
            let err = calc
                .compute(dec!(50000), amount, FilingStatus::Single, "TX", 20, dec!(0.07))
                .unwrap_err();
            assert!(matches!(err, TaxError::InvalidAmount(_)), "amount {amount}");
        }
    }

    #[test]
    fn test_future_value_and_npv() {
        // Growth and discount both 7%: the factors cancel exactly.
        let outcome = calc_10k_over(10, dec!(0.07));
        assert_eq!(outcome.npv, dec!(10000.00));
        // 10,000 * 1.07^10 = 19,671.51
        assert_eq!(outcome.future_value, dec!(19671.51));
    }

    #[test]
    fn test_npv_shrinks_with_higher_discount_rate() {
        let cheap = calc_10k_over(10, dec!(0.03));
        let dear = calc_10k_over(10, dec!(0.12));
        assert!(cheap.npv > dear.npv);
    }

    fn calc_10k_over(years: u32, discount: Decimal) -> RothConversionOutcome {
        calculator()
            .compute(dec!(50000), dec!(10000), FilingStatus::Single, "TX", years, discount)
            .unwrap()
    }

    #[test]
    fn test_conversion_tax_matches_differencing() {
        let outcome = calculator()
            .compute(dec!(40000), dec!(20000), FilingStatus::Single, "TX", 20, dec!(0.07))
            .unwrap();
        let with_conversion =
            tax_tables::compute_federal_tax(dec!(60000), FilingStatus::Single, 2024).unwrap();
        let without =
            tax_tables::compute_federal_tax(dec!(40000), FilingStatus::Single, 2024).unwrap();
        assert_eq!(
            outcome.tax_impact.federal_tax_impact,
            with_conversion.tax - without.tax
        );
    }

    #[test]
    fn test_optimize_rejects_balance_below_minimum() {
        let err = calculator()
            .optimize(
                dec!(50000),
                dec!(500),
                FilingStatus::Single,
                "TX",
                &OptimizationConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, TaxError::InvalidAmount(_)));
    }

    #[test]
    fn test_optimize_returns_best_seen_candidate() {
        let result = calculator()
            .optimize(
                dec!(60000),
                dec!(200000),
                FilingStatus::Single,
                "CA",
                &OptimizationConfig::default(),
            )
            .unwrap();
        assert!(result.recommended_amount >= MIN_CONVERSION);
        assert!(result.recommended_amount <= dec!(200000));
        // The recommendation is the best-scored evaluated candidate.
        let best_sample = result
            .alternative_scenarios
            .iter()
            .max_by_key(|sample| sample.savings)
            .unwrap();
        assert_eq!(best_sample.amount, result.recommended_amount);
        assert_eq!(best_sample.savings, result.npv_savings);
    }

    #[test]
    fn test_optimize_is_idempotent() {
        let calc = calculator();
        let config = OptimizationConfig::default();
        let first = calc
            .optimize(dec!(60000), dec!(150000), FilingStatus::Single, "NY", &config)
            .unwrap();
        let second = calc
            .optimize(dec!(60000), dec!(150000), FilingStatus::Single, "NY", &config)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_higher_risk_tolerance_biases_toward_larger_conversions() {
        let calc = calculator();
        let mut cautious = OptimizationConfig::default();
        cautious.risk_tolerance = 1;
        let mut bold = OptimizationConfig::default();
        bold.risk_tolerance = 5;

        let small = calc
            .optimize(dec!(80000), dec!(300000), FilingStatus::Single, "CA", &cautious)
            .unwrap();
        let large = calc
            .optimize(dec!(80000), dec!(300000), FilingStatus::Single, "CA", &bold)
            .unwrap();
        assert!(large.recommended_amount >= small.recommended_amount);
    }
}
