//! Capital Gains Tax Calculator
//!
//! Computes the marginal federal+state impact of realizing additional gains
//! on top of a base income by differencing: `tax(base + gains) - tax(base)`.
//! Differencing, not a separate gains rate, is what captures
//! bracket-crossing effects. Federal treatment is identical for short- and
//! long-term gains in this model; only state rules consume the gains type.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tax_tables::{
    federal_table, CapitalGainsType, FilingStatus, GainsTreatment, StateRegistry, TaxError,
    CURRENT_TAX_YEAR,
};

use crate::types::{OptimizationResult, ScenarioSample, TaxCalculationResult};

/// Candidate cutoffs for the coarse realization grid.
///
/// The grid is deliberately coarse (low/medium/high/full); callers needing
/// finer granularity supply denser thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizationThresholds {
    pub low: Decimal,
    pub medium: Decimal,
    pub high: Decimal,
}

impl Default for RealizationThresholds {
    fn default() -> Self {
        Self {
            low: dec!(10_000),
            medium: dec!(25_000),
            high: dec!(50_000),
        }
    }
}

impl RealizationThresholds {
    /// Candidate amounts below the available total, plus the total itself,
    /// ascending and deduplicated.
    pub fn candidates(&self, total_available: Decimal) -> Vec<Decimal> {
        let mut amounts: Vec<Decimal> = [self.low, self.medium, self.high]
            .into_iter()
            .filter(|amount| *amount > Decimal::ZERO && *amount < total_available)
            .collect();
        amounts.push(total_available);
        amounts.sort();
        amounts.dedup();
        amounts
    }
}

/// Marginal capital-gains tax calculator over a state registry
#[derive(Debug, Clone)]
pub struct CapitalGainsCalculator {
    states: StateRegistry,
    tax_year: u16,
}

impl CapitalGainsCalculator {
    pub fn new(states: StateRegistry) -> Self {
        Self {
            states,
            tax_year: CURRENT_TAX_YEAR,
        }
    }

    pub fn states(&self) -> &StateRegistry {
        &self.states
    }

    /// Marginal federal+state impact of realizing `gains_amount` on top of
    /// `base_income`.
    pub fn compute(
        &self,
        gains_amount: Decimal,
        gains_type: CapitalGainsType,
        base_income: Decimal,
        filing_status: FilingStatus,
        state_code: &str,
    ) -> Result<TaxCalculationResult, TaxError> {
        if gains_amount < Decimal::ZERO {
            return Err(TaxError::InvalidAmount(format!(
                "gains amount must be non-negative, got {gains_amount}"
            )));
        }
        if base_income < Decimal::ZERO {
            return Err(TaxError::InvalidAmount(format!(
                "base income must be non-negative, got {base_income}"
            )));
        }

        let total_income = base_income + gains_amount;
        let table = federal_table(filing_status, self.tax_year)?;
        let with_gains = table.compute(total_income)?;
        let without_gains = table.compute(base_income)?;
        let federal_impact = with_gains.tax - without_gains.tax;

        let state_impact =
            self.state_impact(gains_amount, gains_type, base_income, filing_status, state_code)?;

        let total_impact = federal_impact + state_impact;
        let effective_rate = if gains_amount.is_zero() {
            Decimal::ZERO
        } else {
            total_impact / gains_amount
        };

        tracing::debug!(
            "capital gains impact for {} ({:?}) on base {}: federal {} state {}",
            gains_amount,
            gains_type,
            base_income,
            federal_impact,
            state_impact
        );

        Ok(TaxCalculationResult {
            federal_tax_impact: federal_impact.round_dp(2),
            state_tax_impact: state_impact.round_dp(2),
            effective_tax_rate: effective_rate.round_dp(4),
            marginal_tax_rate: with_gains.marginal_rate,
            taxable_income: total_income.round_dp(2),
            applicable_brackets: with_gains.applicable_brackets,
        })
    }

    fn state_impact(
        &self,
        gains_amount: Decimal,
        gains_type: CapitalGainsType,
        base_income: Decimal,
        filing_status: FilingStatus,
        state_code: &str,
    ) -> Result<Decimal, TaxError> {
        let profile = self.states.profile(state_code)?;
        match profile.capital_gains_rules.treatment(gains_type) {
            GainsTreatment::Exempt => Ok(Decimal::ZERO),
            GainsTreatment::FlatRate(rate) => Ok(gains_amount * rate),
            GainsTreatment::Ordinary => {
                let with_gains = self.states.compute_state_tax(
                    base_income + gains_amount,
                    state_code,
                    filing_status,
                )?;
                let without_gains =
                    self.states
                        .compute_state_tax(base_income, state_code, filing_status)?;
                Ok(with_gains - without_gains)
            }
        }
    }

    /// Coarse-grid heuristic: evaluate the effective rate at each threshold
    /// candidate and recommend the cheapest. Potential savings is the
    /// effective-rate gap between full realization and the chosen amount,
    /// multiplied by the chosen amount.
    pub fn optimal_realization(
        &self,
        total_available: Decimal,
        base_income: Decimal,
        filing_status: FilingStatus,
        state_code: &str,
    ) -> Result<OptimizationResult, TaxError> {
        self.optimal_realization_with(
            &RealizationThresholds::default(),
            total_available,
            base_income,
            filing_status,
            state_code,
        )
    }

    pub fn optimal_realization_with(
        &self,
        thresholds: &RealizationThresholds,
        total_available: Decimal,
        base_income: Decimal,
        filing_status: FilingStatus,
        state_code: &str,
    ) -> Result<OptimizationResult, TaxError> {
        if total_available < Decimal::ZERO {
            return Err(TaxError::InvalidAmount(format!(
                "available gains must be non-negative, got {total_available}"
            )));
        }
        if total_available.is_zero() {
            return Ok(OptimizationResult::not_applicable(base_income));
        }

        // Realization planning assumes long-term lots; short-term
        // realization is never tax-favored.
        let gains_type = CapitalGainsType::LongTerm;

        let full = self.compute(
            total_available,
            gains_type,
            base_income,
            filing_status,
            state_code,
        )?;

        let mut scenarios = Vec::new();
        let mut best: Option<(Decimal, TaxCalculationResult)> = None;
        for amount in thresholds.candidates(total_available) {
            let result = self.compute(amount, gains_type, base_income, filing_status, state_code)?;
            let savings = ((full.effective_tax_rate - result.effective_tax_rate) * amount)
                .max(Decimal::ZERO)
                .round_dp(2);
            scenarios.push(ScenarioSample { amount, savings });

            let better = match &best {
                Some((_, incumbent)) => result.effective_tax_rate < incumbent.effective_tax_rate,
                None => true,
            };
            if better {
                best = Some((amount, result));
            }
        }

        let (recommended_amount, tax_impact) = best.ok_or(TaxError::SearchExhausted)?;
        let potential_savings = ((full.effective_tax_rate - tax_impact.effective_tax_rate)
            * recommended_amount)
            .max(Decimal::ZERO)
            .round_dp(2);

        Ok(OptimizationResult {
            recommended_amount,
            tax_impact,
            npv_savings: potential_savings,
            potential_savings,
            alternative_scenarios: scenarios,
        })
    }
}
