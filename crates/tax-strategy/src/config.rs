//! Optimization configuration

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tax_tables::TaxError;

/// Caller-supplied knobs for the optimization search.
///
/// The engine never mutates a config; `validate` is called once at the top
/// of each optimization entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationConfig {
    /// Years the converted principal stays invested (1 to 40)
    pub time_horizon_years: u32,
    /// Per-year discount rate for present-value math (0.01 to 0.15)
    pub discount_rate: Decimal,
    /// Risk tolerance from 1 (conservative) to 5 (aggressive)
    pub risk_tolerance: u8,
    /// Weight applied to the state portion of a weighted tax impact (0 to 1)
    pub state_tax_weight: Decimal,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            time_horizon_years: 20,
            discount_rate: dec!(0.07),
            risk_tolerance: 3,
            state_tax_weight: dec!(1.0),
        }
    }
}

impl OptimizationConfig {
    pub fn validate(&self) -> Result<(), TaxError> {
        if !(1..=40).contains(&self.time_horizon_years) {
            return Err(TaxError::InvalidConfig(format!(
                "time_horizon_years must be within 1..=40, got {}",
                self.time_horizon_years
            )));
        }
        if self.discount_rate < dec!(0.01) || self.discount_rate > dec!(0.15) {
            return Err(TaxError::InvalidConfig(format!(
                "discount_rate must be within 0.01..=0.15, got {}",
                self.discount_rate
            )));
        }
        if !(1..=5).contains(&self.risk_tolerance) {
            return Err(TaxError::InvalidConfig(format!(
                "risk_tolerance must be within 1..=5, got {}",
                self.risk_tolerance
            )));
        }
        if self.state_tax_weight < Decimal::ZERO || self.state_tax_weight > Decimal::ONE {
            return Err(TaxError::InvalidConfig(format!(
                "state_tax_weight must be within 0..=1, got {}",
                self.state_tax_weight
            )));
        }
        Ok(())
    }

    /// Risk factor `(6 - risk_tolerance)/5`: 1.0 at tolerance 1, 0.2 at
    /// tolerance 5. Higher tolerance discounts the weighted-impact penalty,
    /// biasing searches toward larger amounts.
    pub fn risk_factor(&self) -> Decimal {
        Decimal::from(6 - self.risk_tolerance) / dec!(5)
    }
}
