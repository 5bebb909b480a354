//! Optimization Driver
//!
//! Sequentially optimizes the Roth conversion first, then capital-gains
//! realization against the shifted income base, and combines the two legs
//! into a single risk-adjusted score. The order is fixed because each
//! strategy changes the taxable-income base the other operates against.

use rust_decimal::Decimal;
use serde::Serialize;
use tax_tables::{CapitalGainsType, FilingStatus, StateRegistry, TaxError};

use crate::cache::{NoopCache, ResultCache};
use crate::capital_gains::{CapitalGainsCalculator, RealizationThresholds};
use crate::config::OptimizationConfig;
use crate::roth::RothConversionCalculator;
use crate::types::{
    CalculationParameters, CombinedOptimizationResult, OptimizationResult, ScenarioSample,
    TaxCalculationResult,
};

#[derive(Serialize)]
struct CacheKey<'a> {
    current_income: Decimal,
    traditional_balance: Decimal,
    capital_gains: Decimal,
    filing_status: FilingStatus,
    state_code: &'a str,
    config: &'a OptimizationConfig,
}

/// Two-strategy tax optimizer over a shared state registry
pub struct TaxStrategyOptimizer {
    roth: RothConversionCalculator,
    gains: CapitalGainsCalculator,
    thresholds: RealizationThresholds,
    cache: Box<dyn ResultCache>,
}

impl TaxStrategyOptimizer {
    pub fn new(states: StateRegistry) -> Self {
        Self {
            roth: RothConversionCalculator::new(states.clone()),
            gains: CapitalGainsCalculator::new(states),
            thresholds: RealizationThresholds::default(),
            cache: Box::new(NoopCache),
        }
    }

    /// Inject a result cache shared with other callers.
    pub fn with_cache(mut self, cache: Box<dyn ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Override the realization grid cutoffs.
    pub fn with_thresholds(mut self, thresholds: RealizationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Optimize both strategies and combine their savings.
    ///
    /// A zero traditional balance or zero available gains makes that leg
    /// not-applicable rather than an error; a positive balance below the
    /// minimum conversion is rejected.
    pub fn optimize(
        &self,
        current_income: Decimal,
        traditional_balance: Decimal,
        capital_gains: Decimal,
        filing_status: FilingStatus,
        state_code: &str,
        config: &OptimizationConfig,
    ) -> Result<CombinedOptimizationResult, TaxError> {
        config.validate()?;
        for (name, amount) in [
            ("current income", current_income),
            ("traditional balance", traditional_balance),
            ("capital gains", capital_gains),
        ] {
            if amount < Decimal::ZERO {
                return Err(TaxError::InvalidAmount(format!(
                    "{name} must be non-negative, got {amount}"
                )));
            }
        }

        let key = serde_json::to_string(&CacheKey {
            current_income,
            traditional_balance,
            capital_gains,
            filing_status,
            state_code,
            config,
        })
        .unwrap_or_default();
        if let Some(hit) = self.cache.get(&key) {
            if let Ok(cached) = serde_json::from_str::<CombinedOptimizationResult>(&hit) {
                tracing::debug!("optimization cache hit for {}", state_code);
                return Ok(cached);
            }
        }

        let roth_conversion = if traditional_balance.is_zero() {
            OptimizationResult::not_applicable(current_income)
        } else {
            self.roth.optimize(
                current_income,
                traditional_balance,
                filing_status,
                state_code,
                config,
            )?
        };

        // The gains sweep sees the income base shifted by the conversion.
        let gains_base = current_income + roth_conversion.recommended_amount;
        let capital_gains_leg = if capital_gains.is_zero() {
            OptimizationResult::not_applicable(gains_base)
        } else {
            self.optimize_gains_leg(gains_base, capital_gains, filing_status, state_code, config)?
        };

        let combined_savings =
            (roth_conversion.npv_savings + capital_gains_leg.npv_savings).round_dp(2);
        let risk_adjusted_score = (combined_savings * config.risk_factor()).round_dp(2);
        tracing::debug!(
            "combined optimization for {}: roth {} gains {} score {}",
            state_code,
            roth_conversion.recommended_amount,
            capital_gains_leg.recommended_amount,
            risk_adjusted_score
        );

        let result = CombinedOptimizationResult {
            roth_conversion,
            capital_gains: capital_gains_leg,
            combined_savings,
            risk_adjusted_score,
        };
        if let Ok(serialized) = serde_json::to_string(&result) {
            self.cache.put(&key, serialized);
        }
        Ok(result)
    }

    /// Convenience wrapper over [`Self::optimize`] for callers handing over
    /// an assembled parameter bundle.
    pub fn optimize_parameters(
        &self,
        current_income: Decimal,
        params: &CalculationParameters,
        config: &OptimizationConfig,
    ) -> Result<CombinedOptimizationResult, TaxError> {
        self.optimize(
            current_income,
            params.traditional_ira_balance,
            params.capital_gains,
            params.filing_status,
            &params.tax_state,
            config,
        )
    }

    /// Threshold sweep over the realization grid, scored with the same
    /// risk/state weighting as the Roth search. The grid stays coarse on
    /// purpose; see `RealizationThresholds`.
    fn optimize_gains_leg(
        &self,
        base_income: Decimal,
        available_gains: Decimal,
        filing_status: FilingStatus,
        state_code: &str,
        config: &OptimizationConfig,
    ) -> Result<OptimizationResult, TaxError> {
        let risk_factor = config.risk_factor();
        let weighted_rate = |result: &TaxCalculationResult, amount: Decimal| {
            let weighted = result.federal_tax_impact
                + result.state_tax_impact * config.state_tax_weight;
            risk_factor * weighted / amount
        };

        let full = self.gains.compute(
            available_gains,
            CapitalGainsType::LongTerm,
            base_income,
            filing_status,
            state_code,
        )?;
        let full_rate = weighted_rate(&full, available_gains);

        let mut scenarios = Vec::new();
        let mut best: Option<(Decimal, TaxCalculationResult, Decimal)> = None;
        for amount in self.thresholds.candidates(available_gains) {
            let result = self.gains.compute(
                amount,
                CapitalGainsType::LongTerm,
                base_income,
                filing_status,
                state_code,
            )?;
            let rate = weighted_rate(&result, amount);
            let savings = ((full_rate - rate) * amount).max(Decimal::ZERO).round_dp(2);
            scenarios.push(ScenarioSample { amount, savings });

            let improves = match &best {
                Some((_, _, incumbent)) => rate < *incumbent,
                None => true,
            };
            if improves {
                best = Some((amount, result, rate));
            }
        }

        let (recommended_amount, tax_impact, best_rate) =
            best.ok_or(TaxError::SearchExhausted)?;
        let potential_savings = ((full_rate - best_rate) * recommended_amount)
            .max(Decimal::ZERO)
            .round_dp(2);

        Ok(OptimizationResult {
            recommended_amount,
            tax_impact,
            // Realization savings land in the current year, so their
            // present value is the savings amount itself.
            npv_savings: potential_savings,
            potential_savings,
            alternative_scenarios: scenarios,
        })
    }
}
